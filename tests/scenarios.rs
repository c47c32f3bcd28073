//! End-to-end scenario tests, one per literal input/output pair.

use std::sync::Arc;
use std::time::Duration;

use ignition_coordinator::{
    CancellationReason, ClosureSignal, ConfigurationError, Coordinator, ExecutionMode, Graph,
    Options, Outcome, Policy, Signal, SignalError, SignalRegistry, SignalStatus, StageTable,
};

fn sleeping(name: &str, millis: u64) -> Arc<dyn Signal> {
    Arc::new(ClosureSignal::new(name, move |_scope| async move {
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Outcome::Ok
    }))
}

#[tokio::test(start_paused = true)]
async fn s1_fail_fast_sequential_stops_on_first_failure() {
    let registry = SignalRegistry::builder()
        .register(Arc::new(ClosureSignal::new("db", |_s| async {
            Outcome::Err(SignalError::new("connect", "refused"))
        })))
        .unwrap()
        .register(Arc::new(ClosureSignal::new("cache", |_s| async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Outcome::Ok
        })))
        .unwrap()
        .build();
    let options = Options::builder()
        .execution_mode(ExecutionMode::Sequential)
        .policy(Policy::FailFast)
        .global_timeout(Duration::from_secs(1))
        .build()
        .unwrap();
    let coordinator = Coordinator::builder(registry, options).build().unwrap();
    let err = coordinator.wait_all().await.unwrap_err();
    assert_eq!(err.failures.len(), 1);

    let result = coordinator.get_result().await;
    assert_eq!(result.signal("db").unwrap().status, SignalStatus::Failed);
    let cache = result.signal("cache").unwrap();
    assert_eq!(cache.status, SignalStatus::Cancelled);
    assert_eq!(cache.cancellation_reason, CancellationReason::ScopeCancelled);
    assert_eq!(cache.duration, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn s2_parallel_best_effort_aggregates_all() {
    let registry = SignalRegistry::builder()
        .register(sleeping("a", 20))
        .unwrap()
        .register(Arc::new(ClosureSignal::new("b", |_s| async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Outcome::Err(SignalError::new("x", "boom"))
        })))
        .unwrap()
        .register(sleeping("c", 30))
        .unwrap()
        .build();
    let options = Options::builder()
        .execution_mode(ExecutionMode::Parallel)
        .policy(Policy::BestEffort)
        .global_timeout(Duration::from_secs(1))
        .build()
        .unwrap();
    let coordinator = Coordinator::builder(registry, options).build().unwrap();
    let result = coordinator.wait_all().await.unwrap();
    assert_eq!(result.signal("a").unwrap().status, SignalStatus::Succeeded);
    assert_eq!(result.signal("b").unwrap().status, SignalStatus::Failed);
    assert_eq!(result.signal("c").unwrap().status, SignalStatus::Succeeded);
    assert!(!result.timed_out);
}

#[tokio::test(start_paused = true)]
async fn s3_per_signal_timeout_with_cancellation() {
    let registry = SignalRegistry::builder()
        .register(Arc::new(
            ClosureSignal::new("slow", |scope| async move {
                tokio::select! {
                    () = scope.cancelled() => Outcome::Cancelled,
                    () = tokio::time::sleep(Duration::from_secs(2)) => Outcome::Ok,
                }
            })
            .with_timeout(Duration::from_millis(500)),
        ))
        .unwrap()
        .build();
    let options = Options::builder()
        .execution_mode(ExecutionMode::Parallel)
        .policy(Policy::BestEffort)
        .cancel_individual_on_timeout(true)
        .build()
        .unwrap();
    let coordinator = Coordinator::builder(registry, options).build().unwrap();
    let result = coordinator.wait_all().await.unwrap();
    let slow = result.signal("slow").unwrap();
    assert_eq!(slow.status, SignalStatus::TimedOut);
    assert_eq!(slow.cancellation_reason, CancellationReason::PerSignalTimeout);
    assert!(slow.duration >= Duration::from_millis(500) && slow.duration <= Duration::from_millis(550));
}

#[tokio::test(start_paused = true)]
async fn s4_global_timeout_without_hard_cancel_still_completes() {
    let registry = SignalRegistry::builder()
        .register(sleeping("a", 200))
        .unwrap()
        .register(sleeping("b", 200))
        .unwrap()
        .build();
    let options = Options::builder()
        .execution_mode(ExecutionMode::Parallel)
        .policy(Policy::BestEffort)
        .global_timeout(Duration::from_millis(100))
        .cancel_on_global_timeout(false)
        .build()
        .unwrap();
    let coordinator = Coordinator::builder(registry, options).build().unwrap();
    let result = coordinator.wait_all().await.unwrap();
    assert_eq!(result.signal("a").unwrap().status, SignalStatus::Succeeded);
    assert_eq!(result.signal("b").unwrap().status, SignalStatus::Succeeded);
    assert!(result.timed_out);
}

#[tokio::test(start_paused = true)]
async fn s5_dependency_aware_failure_propagation() {
    let ok = |name: &str| Arc::new(ClosureSignal::new(name, |_s| async { Outcome::Ok }));
    let registry = SignalRegistry::builder()
        .register(Arc::new(ClosureSignal::new("db", |_s| async {
            Outcome::Err(SignalError::new("connect", "refused"))
        })))
        .unwrap()
        .register(ok("cache"))
        .unwrap()
        .register(ok("cfg"))
        .unwrap()
        .register(ok("worker"))
        .unwrap()
        .register(ok("api"))
        .unwrap()
        .build();
    let graph = Graph::builder(&registry)
        .depends_on("api", "cfg")
        .unwrap()
        .depends_on("cache", "db")
        .unwrap()
        .depends_on("worker", "cache")
        .unwrap()
        .depends_on("worker", "cfg")
        .unwrap()
        .build()
        .unwrap();
    let options = Options::builder()
        .execution_mode(ExecutionMode::DependencyAware)
        .policy(Policy::BestEffort)
        .cancel_dependents_on_failure(true)
        .build()
        .unwrap();
    let coordinator = Coordinator::builder(registry, options).graph(graph).build().unwrap();
    let result = coordinator.wait_all().await.unwrap();

    assert_eq!(result.signal("db").unwrap().status, SignalStatus::Failed);
    let cache = result.signal("cache").unwrap();
    assert_eq!(cache.status, SignalStatus::Skipped);
    assert_eq!(cache.failed_dependencies, vec!["db".to_string()]);
    let worker = result.signal("worker").unwrap();
    assert_eq!(worker.status, SignalStatus::Skipped);
    assert_eq!(worker.failed_dependencies, vec!["db".to_string()]);
    assert_eq!(result.signal("cfg").unwrap().status, SignalStatus::Succeeded);
    assert_eq!(result.signal("api").unwrap().status, SignalStatus::Succeeded);
}

#[tokio::test(start_paused = true)]
async fn s6_staged_execution_linear_scaling() {
    let registry = SignalRegistry::builder()
        .register(sleeping("a0", 10))
        .unwrap()
        .register(sleeping("b0", 10))
        .unwrap()
        .register(sleeping("a1", 10))
        .unwrap()
        .register(sleeping("b1", 10))
        .unwrap()
        .register(sleeping("a2", 10))
        .unwrap()
        .register(sleeping("b2", 10))
        .unwrap()
        .build();
    let stages = StageTable::builder(6)
        .assign(0, 0)
        .assign(1, 0)
        .assign(2, 1)
        .assign(3, 1)
        .assign(4, 2)
        .assign(5, 2)
        .build();
    let options = Options::builder()
        .execution_mode(ExecutionMode::Staged)
        .policy(Policy::BestEffort)
        .build()
        .unwrap();
    let coordinator = Coordinator::builder(registry, options).stages(stages).build().unwrap();
    let result = coordinator.wait_all().await.unwrap();

    let stage0_end = result.signal("a0").unwrap().completed_at.max(result.signal("b0").unwrap().completed_at);
    let stage1_start = result.signal("a1").unwrap().started_at.min(result.signal("b1").unwrap().started_at);
    assert!(stage1_start >= stage0_end);

    assert!(result.total_duration < Duration::from_millis(60));
    assert_eq!(result.stage_results.len(), 3);
}

#[test]
fn s7_cycle_rejection_reports_the_cycle_path() {
    let registry = SignalRegistry::builder()
        .register(Arc::new(ClosureSignal::new("a", |_s| async { Outcome::Ok })))
        .unwrap()
        .register(Arc::new(ClosureSignal::new("b", |_s| async { Outcome::Ok })))
        .unwrap()
        .register(Arc::new(ClosureSignal::new("c", |_s| async { Outcome::Ok })))
        .unwrap()
        .build();
    let err = Graph::builder(&registry)
        .depends_on("b", "a")
        .unwrap()
        .depends_on("c", "b")
        .unwrap()
        .depends_on("a", "c")
        .unwrap()
        .build();
    match err {
        Err(ConfigurationError::CycleDetected { path }) => {
            assert!(path.len() >= 2);
            let joined = path.join(" -> ");
            for name in ["a", "b", "c"] {
                assert!(joined.contains(name));
            }
        }
        other => panic!("expected CycleDetected, got {other:?}"),
    }
}
