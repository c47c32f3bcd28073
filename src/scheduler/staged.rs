//! The `Staged` engine (§4.4.4): ascending stage order, each stage run via
//! the `Parallel` engine's subset runner, with optional early promotion.
//!
//! A stage is "certain to fail" as soon as one of its signals lands on a
//! terminal non-success status: [`StageStatus::aggregate`] can then never
//! return [`StageStatus::Succeeded`] for that stage no matter how its
//! remaining signals finish, so there is nothing left to wait for before
//! starting the next stage. When `promote_next_stage_on_terminal_failure`
//! is set, the stage's still-in-flight signals are detached into a
//! background task and the next stage starts immediately; their results are
//! merged back in before this function returns.

use std::sync::Arc;

use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use parking_lot::Mutex;

use crate::options::Policy;
use crate::result::{SignalResult, StageResult, StageStatus};
use crate::signal::Signal;
use crate::slow::SlowSignalTracker;
use crate::stage::StageTable;

use super::{exec, launch, SchedulerContext};

pub(crate) async fn run(
    ctx: &Arc<SchedulerContext>,
    stages: &StageTable,
    slow: &Mutex<SlowSignalTracker>,
) -> (Vec<SignalResult>, Vec<StageResult>) {
    let mut all_results: Vec<Option<SignalResult>> = vec![None; ctx.registry.len()];
    let mut stage_results = Vec::new();
    let mut deferred: Vec<tokio::task::JoinHandle<Vec<(usize, SignalResult)>>> = Vec::new();

    for stage_num in stages.stages() {
        if ctx.is_stopped() {
            break;
        }
        let members = stages.members_of(stage_num);
        let names: Vec<String> = members
            .iter()
            .map(|&i| ctx.registry.iter().nth(i).unwrap().name().to_string())
            .collect();

        let subset: Vec<(usize, Arc<dyn Signal>)> = members
            .iter()
            .map(|&i| (i, Arc::clone(ctx.registry.iter().nth(i).unwrap())))
            .collect();

        let (settled, leftover) = if ctx.options.promote_next_stage_on_terminal_failure {
            run_stage_with_early_promotion(ctx, stage_num, subset, slow).await
        } else {
            let results = run_stage_to_completion(ctx, stage_num, &subset, slow).await;
            (results, None)
        };

        if let Some(handle) = leftover {
            deferred.push(handle);
        }

        let statuses: Vec<_> = settled.iter().map(|(_, r)| r.status).collect();
        let status = StageStatus::aggregate(&statuses);
        stage_results.push(StageResult {
            stage: stage_num,
            signals: names,
            status,
        });

        for (index, result) in settled {
            all_results[index] = Some(result);
        }
    }

    for handle in deferred {
        if let Ok(settled) = handle.await {
            for (index, result) in settled {
                all_results[index] = Some(result);
            }
        }
    }

    let results: Vec<SignalResult> = all_results
        .into_iter()
        .enumerate()
        .map(|(i, r)| {
            r.unwrap_or_else(|| {
                exec::scope_cancelled_result(
                    ctx.registry.iter().nth(i).unwrap().name(),
                    ctx.offset_now(),
                    Some(stages.stage_of(i)),
                )
            })
        })
        .collect();

    (results, stage_results)
}

async fn run_stage_to_completion(
    ctx: &Arc<SchedulerContext>,
    stage_num: u32,
    subset: &[(usize, Arc<dyn Signal>)],
    slow: &Mutex<SlowSignalTracker>,
) -> Vec<(usize, SignalResult)> {
    let mut in_flight = FuturesUnordered::new();
    for (index, signal) in subset {
        let index = *index;
        let signal = Arc::clone(signal);
        let ctx = Arc::clone(ctx);
        in_flight.push(async move {
            let result = launch(&ctx, signal.as_ref(), Some(stage_num)).await;
            (index, result)
        });
    }
    let mut results = Vec::with_capacity(subset.len());
    while let Some((index, result)) = in_flight.next().await {
        if ctx.options.policy == Policy::FailFast && !result.status.is_success() {
            ctx.trigger_fail_fast_stop();
        }
        slow.lock().record(result.name.clone(), result.duration);
        results.push((index, result));
    }
    results
}

/// Runs a stage's signals, but as soon as one lands on a terminal
/// non-success status, detaches the remainder into a background task and
/// returns immediately so the caller can start the next stage. The
/// settled-so-far results are returned directly; the rest arrive via the
/// join handle.
async fn run_stage_with_early_promotion(
    ctx: &Arc<SchedulerContext>,
    stage_num: u32,
    subset: Vec<(usize, Arc<dyn Signal>)>,
    slow: &Mutex<SlowSignalTracker>,
) -> (Vec<(usize, SignalResult)>, Option<tokio::task::JoinHandle<Vec<(usize, SignalResult)>>>) {
    let mut in_flight = FuturesUnordered::new();
    for (index, signal) in &subset {
        let index = *index;
        let signal = Arc::clone(signal);
        let ctx = Arc::clone(ctx);
        in_flight.push(async move {
            let result = launch(&ctx, signal.as_ref(), Some(stage_num)).await;
            (index, result)
        });
    }

    let mut settled = Vec::with_capacity(subset.len());
    let mut certain_to_fail = false;

    while let Some((index, result)) = in_flight.next().await {
        if ctx.options.policy == Policy::FailFast && !result.status.is_success() {
            ctx.trigger_fail_fast_stop();
        }
        slow.lock().record(result.name.clone(), result.duration);
        if !result.status.is_success() {
            certain_to_fail = true;
        }
        settled.push((index, result));
        if certain_to_fail {
            break;
        }
    }

    if !certain_to_fail || in_flight.is_empty() {
        return (settled, None);
    }

    let ctx = Arc::clone(ctx);
    let handle = tokio::spawn(async move {
        let mut rest = Vec::new();
        while let Some((index, result)) = in_flight.next().await {
            if ctx.options.policy == Policy::FailFast && !result.status.is_success() {
                ctx.trigger_fail_fast_stop();
            }
            rest.push((index, result));
        }
        rest
    });

    (settled, Some(handle))
}
