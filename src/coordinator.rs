//! The [`Coordinator`] facade (§4.1): owns the cached result, runs the
//! scheduler exactly once, and exposes `wait_all`/`get_result`/`state`.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tokio::time::Instant as TokioInstant;

use crate::cancel::CancelFabric;
use crate::error::{AggregateError, ConfigurationError, FailureCause, SignalFailure};
use crate::graph::Graph;
use crate::limiter::ConcurrencyLimiter;
use crate::options::{ExecutionMode, Options, Policy};
use crate::registry::SignalRegistry;
use crate::result::{CoordinatorState, RunResult};
use crate::scheduler::{self, SchedulerContext};
use crate::signal::TimeoutStrategy;
use crate::slow::SlowSignalTracker;
use crate::stage::StageTable;
use crate::telemetry::trace_event;
use crate::types::{CancellationReason, SignalStatus};

/// The cached outcome of a coordinator's single run.
struct RunOutcome {
    result: RunResult,
    error: Option<AggregateError>,
}

/// Runs a fixed set of signals exactly once and caches the aggregated
/// result.
///
/// Every `Coordinator` drives a single run. Concurrent callers to
/// [`Coordinator::wait_all`] observe a single execution: the first caller
/// runs the scheduler, and every other caller — concurrent or later —
/// shares the same cached outcome.
pub struct Coordinator {
    registry: Arc<SignalRegistry>,
    options: Arc<Options>,
    graph: Option<Graph>,
    stages: Option<StageTable>,
    timeout_strategy: Option<Arc<dyn TimeoutStrategy>>,
    fabric: Arc<CancelFabric>,
    state: Mutex<CoordinatorState>,
    outcome: OnceCell<RunOutcome>,
}

impl Coordinator {
    /// Starts building a coordinator over `registry` with `options`.
    #[must_use]
    pub fn builder(registry: SignalRegistry, options: Options) -> CoordinatorBuilder {
        CoordinatorBuilder {
            registry,
            options,
            graph: None,
            stages: None,
            timeout_strategy: None,
        }
    }

    /// Drives the run to completion. The first call runs the scheduler and
    /// caches the result; every later or concurrent call reuses it — no
    /// re-run path exists.
    ///
    /// # Errors
    /// Returns [`AggregateError`] when the active [`Policy`] requires
    /// surfacing this run's failures or its cancellation (§7). `get_result`
    /// still returns a complete `RunResult` regardless.
    pub async fn wait_all(&self) -> Result<RunResult, AggregateError> {
        let outcome = self.run_once().await;
        match &outcome.error {
            Some(err) => Err(err.clone()),
            None => Ok(outcome.result.clone()),
        }
    }

    /// Returns the completed run's result, running it first if necessary.
    /// Always well-formed: exactly one [`crate::result::SignalResult`] per
    /// registered signal, regardless of whether `wait_all` would raise.
    #[must_use]
    pub async fn get_result(&self) -> RunResult {
        self.run_once().await.result.clone()
    }

    /// The coordinator's current lifecycle state.
    #[must_use]
    pub fn state(&self) -> CoordinatorState {
        *self.state.lock()
    }

    /// Requests cancellation of the whole run from outside. Has no effect
    /// if the run has already finished.
    pub fn cancel(&self) {
        self.fabric.cancel_externally();
    }

    async fn run_once(&self) -> &RunOutcome {
        self.outcome.get_or_init(|| self.execute()).await
    }

    async fn execute(&self) -> RunOutcome {
        *self.state.lock() = CoordinatorState::Running;
        trace_event!(info, signals = self.registry.len(), mode = ?self.options.execution_mode, "coordinator.run starting");

        let run_start = TokioInstant::now();
        let global_deadline = run_start + self.options.global_timeout;
        let limiter = match self.options.max_degree_of_parallelism {
            Some(max) => ConcurrencyLimiter::bounded(max),
            None => ConcurrencyLimiter::unbounded(),
        };
        let ctx = Arc::new(SchedulerContext {
            registry: Arc::clone(&self.registry),
            options: Arc::clone(&self.options),
            fabric: Arc::clone(&self.fabric),
            limiter,
            run_start,
            global_deadline,
            timeout_strategy: self.timeout_strategy.clone(),
            stopped: Arc::new(AtomicBool::new(false)),
        });

        let slow = Mutex::new(SlowSignalTracker::new(self.options.slow_signal_log_count));
        let (signal_results, stage_results) =
            scheduler::run(&ctx, self.graph.as_ref(), self.stages.as_ref(), &slow).await;

        let total_duration = TokioInstant::now().saturating_duration_since(run_start);
        let global_deadline_fired = signal_results
            .iter()
            .any(|r| r.cancellation_reason == CancellationReason::GlobalTimeout)
            || total_duration >= self.options.global_timeout;
        let root_reason = self.fabric.root_scope().reason();
        let externally_cancelled = root_reason == CancellationReason::ExternalCancellation;

        let final_state = if global_deadline_fired {
            CoordinatorState::TimedOut
        } else if externally_cancelled {
            CoordinatorState::Faulted
        } else {
            CoordinatorState::Completed
        };
        *self.state.lock() = final_state;

        let result = RunResult {
            signal_results,
            stage_results,
            total_duration,
            timed_out: global_deadline_fired,
            final_state,
        };

        let error = self.aggregate_error(&result, externally_cancelled);

        trace_event!(
            info,
            final_state = ?final_state,
            failed = result.count_with_status(SignalStatus::Failed),
            timed_out_count = result.count_with_status(SignalStatus::TimedOut),
            "coordinator.run finished"
        );

        RunOutcome { result, error }
    }

    fn aggregate_error(&self, result: &RunResult, externally_cancelled: bool) -> Option<AggregateError> {
        let has_failure = result.count_with_status(SignalStatus::Failed) > 0;
        let has_timeout = result.count_with_status(SignalStatus::TimedOut) > 0;

        let should_raise = externally_cancelled
            || match self.options.policy {
                Policy::FailFast => has_failure || has_timeout,
                Policy::BestEffort => false,
                Policy::ContinueOnTimeout => has_failure,
            };

        if !should_raise {
            return None;
        }

        let failures = result
            .signal_results
            .iter()
            .filter_map(|r| {
                let cause = match r.status {
                    SignalStatus::Failed => FailureCause::Failed(r.error.clone().expect("Failed carries an error")),
                    SignalStatus::TimedOut => FailureCause::TimedOut,
                    SignalStatus::Cancelled if externally_cancelled => FailureCause::Cancelled,
                    _ => return None,
                };
                Some(SignalFailure {
                    name: r.name.clone(),
                    error: cause,
                })
            })
            .collect();

        Some(AggregateError { failures })
    }
}

/// Accumulates a coordinator's optional graph, stage table, and timeout
/// strategy before it is built.
pub struct CoordinatorBuilder {
    registry: SignalRegistry,
    options: Options,
    graph: Option<Graph>,
    stages: Option<StageTable>,
    timeout_strategy: Option<Arc<dyn TimeoutStrategy>>,
}

impl CoordinatorBuilder {
    /// Attaches the dependency graph `DependencyAware` mode requires.
    #[must_use]
    pub fn graph(mut self, graph: Graph) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Attaches the stage table `Staged` mode requires.
    #[must_use]
    pub fn stages(mut self, stages: StageTable) -> Self {
        self.stages = Some(stages);
        self
    }

    /// Attaches a host-supplied timeout override, consulted before each
    /// signal's own declared timeout.
    #[must_use]
    pub fn timeout_strategy(mut self, strategy: Arc<dyn TimeoutStrategy>) -> Self {
        self.timeout_strategy = Some(strategy);
        self
    }

    /// Validates mode/graph/stage consistency and builds the coordinator.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::InvalidOption`] if `DependencyAware`
    /// was selected without a graph, or `Staged` without a stage table.
    pub fn build(self) -> Result<Coordinator, ConfigurationError> {
        if self.options.execution_mode == ExecutionMode::DependencyAware && self.graph.is_none() {
            return Err(ConfigurationError::InvalidOption {
                option: "execution_mode",
                reason: "DependencyAware requires a graph; call `.graph(...)` before `build()`".to_string(),
            });
        }
        if self.options.execution_mode == ExecutionMode::Staged && self.stages.is_none() {
            return Err(ConfigurationError::InvalidOption {
                option: "execution_mode",
                reason: "Staged requires a stage table; call `.stages(...)` before `build()`".to_string(),
            });
        }
        Ok(Coordinator {
            registry: Arc::new(self.registry),
            options: Arc::new(self.options),
            graph: self.graph,
            stages: self.stages,
            timeout_strategy: self.timeout_strategy,
            fabric: Arc::new(CancelFabric::new()),
            state: Mutex::new(CoordinatorState::NotStarted),
            outcome: OnceCell::new(),
        })
    }
}
