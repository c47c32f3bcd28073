//! The `Parallel` engine (§4.4.1): every signal eligible at time zero,
//! bounded only by the concurrency limiter.

use std::sync::Arc;

use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use parking_lot::Mutex;

use crate::options::Policy;
use crate::result::SignalResult;
use crate::signal::Signal;
use crate::slow::SlowSignalTracker;

use super::{launch, SchedulerContext};

pub(crate) async fn run(ctx: &Arc<SchedulerContext>, slow: &Mutex<SlowSignalTracker>) -> Vec<SignalResult> {
    let subset: Vec<(usize, Arc<dyn Signal>)> = ctx.registry.iter().enumerate().map(|(i, s)| (i, Arc::clone(s))).collect();
    let mut indexed = run_subset(ctx, &subset, slow).await;
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, result)| result).collect()
}

/// Runs `subset` (registry index, signal) pairs concurrently, bounded by
/// the shared concurrency limiter. Shared with `Staged`, which uses this
/// as the within-stage engine.
pub(crate) async fn run_subset(
    ctx: &Arc<SchedulerContext>,
    subset: &[(usize, Arc<dyn Signal>)],
    slow: &Mutex<SlowSignalTracker>,
) -> Vec<(usize, SignalResult)> {
    let mut in_flight = FuturesUnordered::new();
    for (index, signal) in subset {
        let index = *index;
        let signal = Arc::clone(signal);
        let ctx = Arc::clone(ctx);
        in_flight.push(async move {
            let result = launch(&ctx, signal.as_ref(), None).await;
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
