//! The `DependencyAware` engine (§4.4.3): Kahn's-algorithm scheduling over
//! a validated acyclic graph, with failure propagation.
//!
//! A node becomes eligible to launch only once every direct dependency has
//! resolved [`Succeeded`](crate::types::SignalStatus::Succeeded). Any other
//! terminal outcome of a direct dependency — `Failed`, `TimedOut`,
//! `Cancelled`, or `Skipped` itself — immediately and permanently marks
//! every direct dependent `Skipped`, which then cascades to its own
//! dependents in turn. A node can never be launched while it still has an
//! unresolved-successfully direct parent, so the skip cascade and the
//! launch loop never race.

use std::collections::VecDeque;
use std::sync::Arc;

use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use parking_lot::Mutex;

use crate::cancel::CancelScope;
use crate::graph::Graph;
use crate::options::Policy;
use crate::result::SignalResult;
use crate::slow::SlowSignalTracker;
use crate::types::SignalStatus;

use super::{exec, launch_with_scope, SchedulerContext};

pub(crate) async fn run(
    ctx: &Arc<SchedulerContext>,
    graph: &Graph,
    slow: &Mutex<SlowSignalTracker>,
) -> Vec<SignalResult> {
    let n = ctx.registry.len();
    let mut in_degree: Vec<usize> = (0..n).map(|i| graph.dependencies_of(i).len()).collect();
    let mut results: Vec<Option<SignalResult>> = vec![None; n];
    let mut scopes: Vec<Option<CancelScope>> = vec![None; n];
    let mut launched = vec![false; n];
    let mut skipped = vec![false; n];

    let mut ready: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    ready.sort_by_key(|&i| ctx.registry.iter().nth(i).unwrap().name().to_string());

    let mut in_flight = FuturesUnordered::new();

    let spawn = |ctx: &Arc<SchedulerContext>, index: usize, scopes: &mut Vec<Option<CancelScope>>| {
        let signal = Arc::clone(ctx.registry.iter().nth(index).unwrap());
        let scope = ctx.fabric.root_scope().child();
        scopes[index] = Some(scope.clone());
        let ctx = Arc::clone(ctx);
        async move {
            let result = launch_with_scope(&ctx, signal.as_ref(), scope, None).await;
            (index, result)
        }
    };

    for index in ready.drain(..) {
        launched[index] = true;
        in_flight.push(spawn(ctx, index, &mut scopes));
    }

    // Any node already known-unreachable at build time (shouldn't occur for
    // a validated graph with no orphaned nodes, but defends against a
    // disconnected graph with zero roots reachable) is handled by the
    // worklist below once its dependencies resolve.
    let mut skip_worklist: VecDeque<(usize, String)> = VecDeque::new();

    while !in_flight.is_empty() || !skip_worklist.is_empty() {
        if let Some((index, cause)) = skip_worklist.pop_front() {
            if results[index].is_some() || skipped[index] {
                continue;
            }
            skipped[index] = true;
            // Propagate the root failing ancestor(s) through a chain of
            // skips: a direct dependency that was itself skipped contributes
            // *its* `failed_dependencies` rather than its own name, so a
            // node several hops downstream of the actual failure still
            // names the failure, not just its immediate (also-skipped)
            // neighbor.
            let mut failed_dependencies: Vec<String> = Vec::new();
            for &d in graph.dependencies_of(index) {
                let Some(dep_result) = results[d].as_ref() else { continue };
                if dep_result.status == SignalStatus::Skipped {
                    for name in &dep_result.failed_dependencies {
                        if !failed_dependencies.contains(name) {
                            failed_dependencies.push(name.clone());
                        }
                    }
                } else if !dep_result.status.is_success() {
                    let name = ctx.registry.iter().nth(d).unwrap().name().to_string();
                    if !failed_dependencies.contains(&name) {
                        failed_dependencies.push(name);
                    }
                }
            }
            if failed_dependencies.is_empty() {
                failed_dependencies.push(cause);
            }
            let result = exec::skipped_result(
                ctx.registry.iter().nth(index).unwrap().name(),
                failed_dependencies,
                ctx.offset_now(),
                None,
            );
            slow.lock().record(result.name.clone(), result.duration);
            for &dependent in graph.dependents_of(index) {
                if !launched[dependent] && !skipped[dependent] {
                    skip_worklist.push_back((dependent, result.name.clone()));
                }
            }
            results[index] = Some(result);
            continue;
        }

        let Some((index, result)) = in_flight.next().await else {
            continue;
        };

        if ctx.options.policy == Policy::FailFast && !result.status.is_success() {
            ctx.trigger_fail_fast_stop();
        }
        slow.lock().record(result.name.clone(), result.duration);

        if result.status.is_success() {
            let mut newly_ready = Vec::new();
            for &dependent in graph.dependents_of(index) {
                if launched[dependent] || skipped[dependent] {
                    continue;
                }
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    newly_ready.push(dependent);
                }
            }
            newly_ready.sort_by_key(|&i| ctx.registry.iter().nth(i).unwrap().name().to_string());
            for dependent in newly_ready {
                launched[dependent] = true;
                in_flight.push(spawn(ctx, dependent, &mut scopes));
            }
        } else {
            for &dependent in graph.dependents_of(index) {
                if skipped[dependent] {
                    continue;
                }
                if launched[dependent] {
                    if ctx.options.cancel_dependents_on_failure {
                        if let Some(scope) = &scopes[dependent] {
                            scope.cancel(crate::types::CancellationReason::DependencyFailed);
                        }
                    }
                } else {
                    skip_worklist.push_back((dependent, result.name.clone()));
                }
            }
        }

        results[index] = Some(result);
    }

    results.into_iter().map(|r| r.expect("every node resolves exactly once")).collect()
}
