//! Run configuration: policy, execution mode, and the knobs documented in
//! the data model.
//!
//! Built once via [`OptionsBuilder`] and validated exactly once, at
//! [`OptionsBuilder::build`] time — never mid-run. There is no dynamic
//! reconfiguration path.

use std::time::Duration;

use crate::error::ConfigurationError;

/// Governs stop-on-failure behavior and which non-success outcomes
/// `Coordinator::wait_all` surfaces as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// The first failure or timeout stops remaining work and causes
    /// `wait_all` to raise.
    FailFast,
    /// Failures never stop other signals or cause `wait_all` to raise; the
    /// caller inspects `RunResult`.
    BestEffort,
    /// Like `BestEffort`, but a timeout is never terminal — only an
    /// outright `Failed` outcome causes `wait_all` to raise.
    ContinueOnTimeout,
}

/// Selects which scheduler engine drives a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// All signals eligible at time zero, bounded only by the concurrency
    /// limiter.
    Parallel,
    /// Registration order, one signal at a time.
    Sequential,
    /// Driven by a dependency [`crate::graph::Graph`].
    DependencyAware,
    /// Driven by a [`crate::stage::StageTable`], ascending stage order.
    Staged,
}

/// The effective run configuration.
#[derive(Debug, Clone)]
pub struct Options {
    /// Stop-on-failure and error-surfacing behavior.
    pub policy: Policy,
    /// Which scheduler engine drives the run.
    pub execution_mode: ExecutionMode,
    /// Deadline for the entire run.
    pub global_timeout: Duration,
    /// When true, global deadline expiry hard-cancels in-flight signals.
    pub cancel_on_global_timeout: bool,
    /// When true, expiry of a per-signal timeout cancels that signal.
    pub cancel_individual_on_timeout: bool,
    /// `DependencyAware` only: cancel in-flight dependents immediately after
    /// a parent fails.
    pub cancel_dependents_on_failure: bool,
    /// Concurrency cap. `None` means unbounded.
    pub max_degree_of_parallelism: Option<usize>,
    /// How many of the slowest signals to report at run end.
    pub slow_signal_log_count: usize,
    /// `Staged` only: allow stage N+1 to begin once stage N is certain to
    /// fail, without waiting for its in-flight signals.
    pub promote_next_stage_on_terminal_failure: bool,
}

impl Options {
    /// Starts building options from sensible defaults: `BestEffort`,
    /// `Parallel`, a 30 second global timeout, both cancel-on-timeout flags
    /// set, unbounded concurrency, no slow-signal reporting, no early
    /// promotion.
    #[must_use]
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::new()
    }
}

/// Accumulates option values before a finalized, validated [`Options`] is
/// built.
#[derive(Debug, Clone)]
pub struct OptionsBuilder {
    policy: Policy,
    execution_mode: ExecutionMode,
    global_timeout: Duration,
    cancel_on_global_timeout: bool,
    cancel_individual_on_timeout: bool,
    cancel_dependents_on_failure: bool,
    max_degree_of_parallelism: Option<usize>,
    slow_signal_log_count: usize,
    promote_next_stage_on_terminal_failure: bool,
}

impl Default for OptionsBuilder {
    fn default() -> Self {
        Self {
            policy: Policy::BestEffort,
            execution_mode: ExecutionMode::Parallel,
            global_timeout: Duration::from_secs(30),
            cancel_on_global_timeout: true,
            cancel_individual_on_timeout: true,
            cancel_dependents_on_failure: false,
            max_degree_of_parallelism: None,
            slow_signal_log_count: 0,
            promote_next_stage_on_terminal_failure: false,
        }
    }
}

impl OptionsBuilder {
    /// Starts from the defaults documented on [`Options::builder`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the failure policy.
    #[must_use]
    pub fn policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets which scheduler engine drives the run.
    #[must_use]
    pub fn execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    /// Sets the whole-run deadline. Must be validated as positive by
    /// [`OptionsBuilder::build`].
    #[must_use]
    pub fn global_timeout(mut self, timeout: Duration) -> Self {
        self.global_timeout = timeout;
        self
    }

    /// Sets whether global deadline expiry hard-cancels in-flight signals.
    #[must_use]
    pub fn cancel_on_global_timeout(mut self, cancel: bool) -> Self {
        self.cancel_on_global_timeout = cancel;
        self
    }

    /// Sets whether a per-signal timeout cancels that signal's operation.
    #[must_use]
    pub fn cancel_individual_on_timeout(mut self, cancel: bool) -> Self {
        self.cancel_individual_on_timeout = cancel;
        self
    }

    /// Sets whether `DependencyAware` cancels in-flight dependents
    /// immediately after a parent fails.
    #[must_use]
    pub fn cancel_dependents_on_failure(mut self, cancel: bool) -> Self {
        self.cancel_dependents_on_failure = cancel;
        self
    }

    /// Caps concurrency at `max` simultaneously-running signals. Must be
    /// validated as positive by [`OptionsBuilder::build`].
    #[must_use]
    pub fn max_degree_of_parallelism(mut self, max: usize) -> Self {
        self.max_degree_of_parallelism = Some(max);
        self
    }

    /// Leaves concurrency unbounded (the default).
    #[must_use]
    pub fn unbounded_parallelism(mut self) -> Self {
        self.max_degree_of_parallelism = None;
        self
    }

    /// Sets how many of the slowest signals to report at run end.
    #[must_use]
    pub fn slow_signal_log_count(mut self, count: usize) -> Self {
        self.slow_signal_log_count = count;
        self
    }

    /// Enables early promotion of the next stage once the current one is
    /// certain to fail.
    #[must_use]
    pub fn promote_next_stage_on_terminal_failure(mut self, promote: bool) -> Self {
        self.promote_next_stage_on_terminal_failure = promote;
        self
    }

    /// Validates and finalizes the options.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::InvalidOption`] if `global_timeout` is
    /// zero or `max_degree_of_parallelism` was set to zero.
    pub fn build(self) -> Result<Options, ConfigurationError> {
        if self.global_timeout.is_zero() {
            return Err(ConfigurationError::InvalidOption {
                option: "global_timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_degree_of_parallelism == Some(0) {
            return Err(ConfigurationError::InvalidOption {
                option: "max_degree_of_parallelism",
                reason: "must be positive; use `unbounded_parallelism` for no limit".to_string(),
            });
        }
        Ok(Options {
            policy: self.policy,
            execution_mode: self.execution_mode,
            global_timeout: self.global_timeout,
            cancel_on_global_timeout: self.cancel_on_global_timeout,
            cancel_individual_on_timeout: self.cancel_individual_on_timeout,
            cancel_dependents_on_failure: self.cancel_dependents_on_failure,
            max_degree_of_parallelism: self.max_degree_of_parallelism,
            slow_signal_log_count: self.slow_signal_log_count,
            promote_next_stage_on_terminal_failure: self.promote_next_stage_on_terminal_failure,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_best_effort_parallel() {
        let options = Options::builder().build().unwrap();
        assert_eq!(options.policy, Policy::BestEffort);
        assert_eq!(options.execution_mode, ExecutionMode::Parallel);
        assert!(options.max_degree_of_parallelism.is_none());
    }

    #[test]
    fn zero_global_timeout_is_rejected() {
        let err = Options::builder().global_timeout(Duration::ZERO).build();
        assert!(matches!(err, Err(ConfigurationError::InvalidOption { option: "global_timeout", .. })));
    }

    #[test]
    fn zero_concurrency_limit_is_rejected() {
        let err = Options::builder().max_degree_of_parallelism(0).build();
        assert!(matches!(
            err,
            Err(ConfigurationError::InvalidOption { option: "max_degree_of_parallelism", .. })
        ));
    }

    #[test]
    fn builder_chain_sets_every_field() {
        let options = Options::builder()
            .policy(Policy::FailFast)
            .execution_mode(ExecutionMode::DependencyAware)
            .global_timeout(Duration::from_secs(5))
            .cancel_on_global_timeout(false)
            .cancel_individual_on_timeout(false)
            .cancel_dependents_on_failure(true)
            .max_degree_of_parallelism(4)
            .slow_signal_log_count(3)
            .promote_next_stage_on_terminal_failure(true)
            .build()
            .unwrap();
        assert_eq!(options.policy, Policy::FailFast);
        assert_eq!(options.execution_mode, ExecutionMode::DependencyAware);
        assert_eq!(options.global_timeout, Duration::from_secs(5));
        assert!(!options.cancel_on_global_timeout);
        assert!(!options.cancel_individual_on_timeout);
        assert!(options.cancel_dependents_on_failure);
        assert_eq!(options.max_degree_of_parallelism, Some(4));
        assert_eq!(options.slow_signal_log_count, 3);
        assert!(options.promote_next_stage_on_terminal_failure);
    }
}
