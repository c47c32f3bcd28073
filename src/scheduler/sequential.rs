//! The `Sequential` engine (§4.4.2): registration order, one signal at a
//! time.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::options::Policy;
use crate::result::SignalResult;
use crate::slow::SlowSignalTracker;

use super::{launch, SchedulerContext};

pub(crate) async fn run(ctx: &Arc<SchedulerContext>, slow: &Mutex<SlowSignalTracker>) -> Vec<SignalResult> {
    let mut results = Vec::with_capacity(ctx.registry.len());
    for signal in ctx.registry.iter() {
        let result = launch(ctx, signal.as_ref(), None).await;
        if ctx.options.policy == Policy::FailFast && !result.status.is_success() {
            ctx.trigger_fail_fast_stop();
        }
        slow.lock().record(result.name.clone(), result.duration);
        results.push(result);
    }
    results
}
