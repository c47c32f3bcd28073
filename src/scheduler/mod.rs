//! The four scheduler engines (§4.4) and the shared per-signal execution
//! path they all drive through ([`exec`]).

pub mod exec;
mod dependency_aware;
mod parallel;
mod sequential;
mod staged;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant as TokioInstant;

use crate::cancel::CancelFabric;
use crate::graph::Graph;
use crate::options::{ExecutionMode, Options, Policy};
use crate::limiter::ConcurrencyLimiter;
use crate::registry::SignalRegistry;
use crate::result::{SignalResult, StageResult};
use crate::signal::{Signal, TimeoutStrategy};
use crate::slow::SlowSignalTracker;
use crate::stage::StageTable;

/// Everything every scheduler engine needs, bundled behind a single `Arc`
/// so a stage that early-promotes can detach its own remaining signals
/// into a background task without borrowing anything.
pub(crate) struct SchedulerContext {
    pub registry: Arc<SignalRegistry>,
    pub options: Arc<Options>,
    pub fabric: Arc<CancelFabric>,
    pub limiter: ConcurrencyLimiter,
    pub run_start: TokioInstant,
    pub global_deadline: TokioInstant,
    pub timeout_strategy: Option<Arc<dyn TimeoutStrategy>>,
    pub stopped: Arc<AtomicBool>,
}

impl SchedulerContext {
    pub fn exec_ctx(&self) -> exec::ExecutionContext {
        exec::ExecutionContext {
            run_start: self.run_start,
            global_deadline: self.global_deadline,
            cancel_on_global_timeout: self.options.cancel_on_global_timeout,
            cancel_individual_on_timeout: self.options.cancel_individual_on_timeout,
            timeout_strategy: self.timeout_strategy.clone(),
        }
    }

    pub fn offset_now(&self) -> Duration {
        TokioInstant::now().saturating_duration_since(self.run_start)
    }

    /// Records the global-wide stop request a `FailFast` policy triggers on
    /// the first non-success outcome. Idempotent.
    pub fn trigger_fail_fast_stop(&self) {
        if self.options.policy == Policy::FailFast {
            self.stopped.store(true, Ordering::SeqCst);
            self.fabric.stop_for_fail_fast();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Launches `signal` under a fresh child of the run's cancellation fabric,
/// honoring the concurrency limiter and any already-triggered stop request.
pub(crate) async fn launch(ctx: &Arc<SchedulerContext>, signal: &dyn Signal, stage: Option<u32>) -> SignalResult {
    let scope = ctx.fabric.root_scope().child();
    launch_with_scope(ctx, signal, scope, stage).await
}

/// Like [`launch`], but lets the caller keep the derived [`crate::cancel::CancelScope`]
/// so it can cancel the signal externally later (used by `DependencyAware`
/// to cancel in-flight descendants of a failed signal).
pub(crate) async fn launch_with_scope(
    ctx: &Arc<SchedulerContext>,
    signal: &dyn Signal,
    scope: crate::cancel::CancelScope,
    stage: Option<u32>,
) -> SignalResult {
    if ctx.is_stopped() {
        return exec::scope_cancelled_result(signal.name(), ctx.offset_now(), stage);
    }
    let _permit = ctx.limiter.acquire().await;
    if ctx.is_stopped() {
        return exec::scope_cancelled_result(signal.name(), ctx.offset_now(), stage);
    }
    exec::execute_signal(signal, scope, &ctx.exec_ctx(), stage).await
}

/// Drives the whole run per `ctx.options.execution_mode` and returns the
/// completed signal results (registration order) plus, for `Staged` runs,
/// the per-stage aggregates.
pub(crate) async fn run(
    ctx: &Arc<SchedulerContext>,
    graph: Option<&Graph>,
    stages: Option<&StageTable>,
    slow: &Mutex<SlowSignalTracker>,
) -> (Vec<SignalResult>, Vec<StageResult>) {
    match ctx.options.execution_mode {
        ExecutionMode::Parallel => (parallel::run(ctx, slow).await, Vec::new()),
        ExecutionMode::Sequential => (sequential::run(ctx, slow).await, Vec::new()),
        ExecutionMode::DependencyAware => {
            let graph = graph.expect("DependencyAware requires a dependency graph");
            (dependency_aware::run(ctx, graph, slow).await, Vec::new())
        }
        ExecutionMode::Staged => {
            let stages = stages.expect("Staged requires a stage table");
            staged::run(ctx, stages, slow).await
        }
    }
}
