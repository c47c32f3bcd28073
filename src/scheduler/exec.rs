//! Per-signal execution, shared by every scheduler engine (§4.2 of the
//! component design: record start, resolve the effective timeout, build a
//! scoped cancellation, run, classify, record completion).

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant as TokioInstant;

use crate::cancel::CancelScope;
use crate::classify::{classify, ClassifyInput};
use crate::result::SignalResult;
use crate::signal::{Signal, TimeoutStrategy};
use crate::telemetry::trace_event;
use crate::types::{CancellationReason, Outcome};

/// The facts every engine needs to drive one signal's attempt, bundled so
/// `execute_signal`'s signature stays stable as engines are added. Owned
/// rather than borrowed so it can be held across a spawned task boundary.
#[derive(Clone)]
pub struct ExecutionContext {
    /// Monotonic anchor the whole run measures offsets from.
    pub run_start: TokioInstant,
    /// When the whole run's deadline expires.
    pub global_deadline: TokioInstant,
    /// `Options::cancel_on_global_timeout`.
    pub cancel_on_global_timeout: bool,
    /// `Options::cancel_individual_on_timeout`.
    pub cancel_individual_on_timeout: bool,
    /// Optional host override for a signal's effective timeout.
    pub timeout_strategy: Option<Arc<dyn TimeoutStrategy>>,
}

async fn wait_until(deadline: Option<TokioInstant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Drives one signal to completion under `scope` (a child the caller
/// derived from the run's cancellation fabric) and returns its classified
/// result.
///
/// Invokes `signal.execute` exactly once.
pub async fn execute_signal(
    signal: &dyn Signal,
    scope: CancelScope,
    ctx: &ExecutionContext,
    stage: Option<u32>,
) -> SignalResult {
    let started_at = offset(ctx.run_start);
    trace_event!(debug, signal = signal.name(), "signal.execute starting");

    let effective_timeout = match &ctx.timeout_strategy {
        Some(strategy) => strategy.timeout_for(signal.name(), signal.per_signal_timeout()),
        None => signal.per_signal_timeout(),
    };
    let per_signal_deadline = effective_timeout.map(|d| TokioInstant::now() + d);

    let operation = signal.execute(&scope);
    tokio::pin!(operation);

    let mut per_signal_timeout_fired = false;
    let mut global_timeout_fired = false;
    let mut completed_after_per_signal_deadline = false;

    let mut per_signal_armed = ctx.cancel_individual_on_timeout && per_signal_deadline.is_some();
    let mut global_armed = ctx.cancel_on_global_timeout;
    let mut watch_uncancelled_deadline = per_signal_deadline.is_some() && !ctx.cancel_individual_on_timeout;

    let outcome: Option<Outcome> = loop {
        tokio::select! {
            biased;
            out = &mut operation => break Some(out),
            () = scope.cancelled() => break None,
            () = wait_until(per_signal_deadline), if per_signal_armed => {
                per_signal_timeout_fired = true;
                per_signal_armed = false;
                scope.cancel(CancellationReason::PerSignalTimeout);
            }
            () = wait_until(Some(ctx.global_deadline)), if global_armed => {
                global_timeout_fired = true;
                global_armed = false;
                scope.cancel(CancellationReason::GlobalTimeout);
            }
            () = wait_until(per_signal_deadline), if watch_uncancelled_deadline => {
                watch_uncancelled_deadline = false;
                completed_after_per_signal_deadline = true;
            }
        }
    };

    if !global_timeout_fired && TokioInstant::now() >= ctx.global_deadline {
        global_timeout_fired = true;
    }

    // `None` means the outer loop cut the operation off directly; `Some(Outcome::Cancelled)`
    // means the operation observed its own scope and returned the acknowledgement
    // cooperatively. Both count as cancelled for classification purposes.
    let was_cancelled = matches!(outcome, None | Some(Outcome::Cancelled));
    let reason_at_cancel = scope.reason();
    let input = ClassifyInput {
        dependency_failed: false,
        failed_dependencies: Vec::new(),
        outcome,
        was_cancelled,
        per_signal_timeout_fired,
        global_timeout_fired,
        cancel_on_global_timeout: ctx.cancel_on_global_timeout,
        cancel_individual_on_timeout: ctx.cancel_individual_on_timeout,
        scope_cancelled_for_fail_fast: was_cancelled && reason_at_cancel == CancellationReason::ScopeCancelled,
        dependency_triggered_cancellation: was_cancelled && reason_at_cancel == CancellationReason::DependencyFailed,
        completed_after_per_signal_deadline,
    };

    let completed_at = offset(ctx.run_start);
    let result = SignalResult::from_classification(signal.name(), classify(&input), started_at, completed_at, stage);
    match result.status {
        crate::types::SignalStatus::Succeeded => {
            trace_event!(info, signal = %result.name, duration_ms = result.duration.as_millis() as u64, "signal.execute succeeded");
        }
        crate::types::SignalStatus::Failed => {
            trace_event!(warn, signal = %result.name, error = ?result.error, "signal.execute failed");
        }
        crate::types::SignalStatus::TimedOut => {
            trace_event!(warn, signal = %result.name, "signal.execute timed out");
        }
        _ => {
            trace_event!(debug, signal = %result.name, status = %result.status, "signal.execute ended");
        }
    }
    result
}

/// A result synthesized without ever invoking the signal's operation,
/// because a dependency failed before it became eligible to start.
pub fn skipped_result(
    name: &str,
    failed_dependencies: Vec<String>,
    offset: Duration,
    stage: Option<u32>,
) -> SignalResult {
    let input = ClassifyInput::skipped(failed_dependencies);
    SignalResult::from_classification(name, classify(&input), offset, offset, stage)
}

/// A result synthesized for a signal the scheduler never launched because
/// a fail-fast (or stage-level) stop request fired first.
pub fn scope_cancelled_result(name: &str, at: Duration, stage: Option<u32>) -> SignalResult {
    let input = ClassifyInput {
        was_cancelled: true,
        scope_cancelled_for_fail_fast: true,
        outcome: None,
        ..ClassifyInput::new(Outcome::Cancelled)
    };
    SignalResult::from_classification(name, classify(&input), at, at, stage)
}

fn offset(run_start: TokioInstant) -> Duration {
    TokioInstant::now().saturating_duration_since(run_start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelFabric;
    use crate::signal::ClosureSignal;
    use crate::types::SignalStatus;

    fn ctx(global_timeout: Duration) -> (CancelFabric, ExecutionContext) {
        let fabric = CancelFabric::new();
        let run_start = TokioInstant::now();
        let ctx = ExecutionContext {
            run_start,
            global_deadline: run_start + global_timeout,
            cancel_on_global_timeout: true,
            cancel_individual_on_timeout: true,
            timeout_strategy: None,
        };
        (fabric, ctx)
    }

    #[tokio::test]
    async fn successful_signal_is_succeeded() {
        let (fabric, ctx) = ctx(Duration::from_secs(5));
        let signal = ClosureSignal::new("db", |_scope| async { Outcome::Ok });
        let result = execute_signal(&signal, fabric.root_scope().child(), &ctx, None).await;
        assert_eq!(result.status, SignalStatus::Succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn per_signal_timeout_cancels_and_is_classified_timed_out() {
        let (fabric, ctx) = ctx(Duration::from_secs(5));
        let signal = ClosureSignal::new("slow", |scope| async move {
            scope.cancelled().await;
            Outcome::Cancelled
        })
        .with_timeout(Duration::from_millis(50));
        let scope = fabric.root_scope().child();
        let result = execute_signal(&signal, scope, &ctx, None).await;
        assert_eq!(result.status, SignalStatus::TimedOut);
        assert_eq!(result.cancellation_reason, CancellationReason::PerSignalTimeout);
    }
}
