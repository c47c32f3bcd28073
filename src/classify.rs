//! The classifier: a pure function from raw completion facts to a
//! [`SignalStatus`].
//!
//! Classification never depends on scheduling order, wall-clock time of
//! day, or anything beyond the facts captured in [`ClassifyInput`] —
//! running the same inputs twice always yields the same
//! [`ClassifyOutcome`]. Rules are evaluated in order; the first matching
//! rule wins.

use crate::types::{CancellationReason, Outcome, SignalError, SignalStatus};

/// Every fact the classifier needs about one signal's attempt.
///
/// Constructing this is the scheduler's job: it alone knows which deadlines
/// fired and whether a dependency failed before the signal could start.
#[derive(Debug, Clone)]
pub struct ClassifyInput {
    /// The signal never started because a dependency terminated
    /// non-successfully first.
    pub dependency_failed: bool,
    /// Names of the failing ancestors, when `dependency_failed`.
    pub failed_dependencies: Vec<String>,
    /// What the signal's own operation resolved to, if it ran.
    pub outcome: Option<Outcome>,
    /// The signal's scope observed cancellation before or as the operation
    /// finished.
    pub was_cancelled: bool,
    /// The per-signal deadline fired at some point during this attempt.
    pub per_signal_timeout_fired: bool,
    /// The global deadline fired at some point during this attempt.
    pub global_timeout_fired: bool,
    /// `Options::cancel_on_global_timeout` for this run.
    pub cancel_on_global_timeout: bool,
    /// `Options::cancel_individual_on_timeout` for this run.
    pub cancel_individual_on_timeout: bool,
    /// Cancellation was injected by a fail-fast stop request rather than by
    /// an externally supplied cancellation.
    pub scope_cancelled_for_fail_fast: bool,
    /// Cancellation was injected because a dependency failed
    /// (`DependencyAware` with `cancel_dependents_on_failure`), cancelling
    /// an already in-flight descendant rather than skipping it outright.
    pub dependency_triggered_cancellation: bool,
    /// The operation finished, but strictly after its own per-signal
    /// deadline, and `cancel_individual_on_timeout` was false so it was
    /// never cancelled for it.
    pub completed_after_per_signal_deadline: bool,
}

impl ClassifyInput {
    /// The common case: the signal ran to completion with no cancellation
    /// or deadline involved. Use the builder-style `with_*` methods to
    /// layer in the facts that apply.
    #[must_use]
    pub fn new(outcome: Outcome) -> Self {
        Self {
            dependency_failed: false,
            failed_dependencies: Vec::new(),
            outcome: Some(outcome),
            was_cancelled: false,
            per_signal_timeout_fired: false,
            global_timeout_fired: false,
            cancel_on_global_timeout: false,
            cancel_individual_on_timeout: false,
            scope_cancelled_for_fail_fast: false,
            dependency_triggered_cancellation: false,
            completed_after_per_signal_deadline: false,
        }
    }

    /// The signal never started: a dependency failed first.
    #[must_use]
    pub fn skipped(failed_dependencies: Vec<String>) -> Self {
        Self {
            dependency_failed: true,
            failed_dependencies,
            outcome: None,
            ..Self::new(Outcome::Cancelled)
        }
    }
}

/// The classifier's verdict for one signal's attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyOutcome {
    /// The resolved status.
    pub status: SignalStatus,
    /// Diagnostic-only cancellation reason; never influences `status`
    /// beyond what already determined it.
    pub cancellation_reason: CancellationReason,
    /// Present when `status == Failed`.
    pub error: Option<SignalError>,
    /// Present when `status == Skipped`.
    pub failed_dependencies: Vec<String>,
}

/// Applies the seven ordered classification rules to `input`.
///
/// Pure: calling this twice with equal inputs returns equal outputs.
#[must_use]
pub fn classify(input: &ClassifyInput) -> ClassifyOutcome {
    // Rule 1: dependency failed before this signal could start.
    if input.dependency_failed {
        return ClassifyOutcome {
            status: SignalStatus::Skipped,
            cancellation_reason: CancellationReason::DependencyFailed,
            error: None,
            failed_dependencies: input.failed_dependencies.clone(),
        };
    }

    // Rule 2: clean success. Excludes a late, uncancelled completion — that
    // falls through to rule 7 instead, even though the operation itself
    // resolved to `Ok`.
    if matches!(input.outcome, Some(Outcome::Ok)) && !input.completed_after_per_signal_deadline {
        return ClassifyOutcome {
            status: SignalStatus::Succeeded,
            cancellation_reason: CancellationReason::None,
            error: None,
            failed_dependencies: Vec::new(),
        };
    }

    // Rule 3: cancelled and its own per-signal deadline fired.
    if input.was_cancelled && input.per_signal_timeout_fired {
        return ClassifyOutcome {
            status: SignalStatus::TimedOut,
            cancellation_reason: CancellationReason::PerSignalTimeout,
            error: None,
            failed_dependencies: Vec::new(),
        };
    }

    // Rule 4: cancelled by a global deadline configured to hard-cancel.
    if input.was_cancelled && input.global_timeout_fired && input.cancel_on_global_timeout {
        return ClassifyOutcome {
            status: SignalStatus::TimedOut,
            cancellation_reason: CancellationReason::GlobalTimeout,
            error: None,
            failed_dependencies: Vec::new(),
        };
    }

    // Rule 5: cancelled for any other reason (external request, or the
    // scheduler stopping remaining work after a fail-fast trigger).
    if input.was_cancelled {
        let reason = if input.scope_cancelled_for_fail_fast {
            CancellationReason::ScopeCancelled
        } else if input.dependency_triggered_cancellation {
            CancellationReason::DependencyFailed
        } else {
            CancellationReason::ExternalCancellation
        };
        return ClassifyOutcome {
            status: SignalStatus::Cancelled,
            cancellation_reason: reason,
            error: None,
            failed_dependencies: Vec::new(),
        };
    }

    // Rule 6: the operation ran and raised an error.
    if let Some(Outcome::Err(err)) = &input.outcome {
        return ClassifyOutcome {
            status: SignalStatus::Failed,
            cancellation_reason: CancellationReason::None,
            error: Some(err.clone()),
            failed_dependencies: Vec::new(),
        };
    }

    // Rule 7: completed, but strictly after its own deadline, uncancelled.
    if input.completed_after_per_signal_deadline {
        return ClassifyOutcome {
            status: SignalStatus::TimedOut,
            cancellation_reason: CancellationReason::PerSignalTimeout,
            error: None,
            failed_dependencies: Vec::new(),
        };
    }

    ClassifyOutcome {
        status: SignalStatus::Succeeded,
        cancellation_reason: CancellationReason::None,
        error: None,
        failed_dependencies: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_failure_wins_over_everything_else() {
        let mut input = ClassifyInput::skipped(vec!["db".to_string()]);
        input.outcome = Some(Outcome::Ok);
        let result = classify(&input);
        assert_eq!(result.status, SignalStatus::Skipped);
        assert_eq!(result.cancellation_reason, CancellationReason::DependencyFailed);
        assert_eq!(result.failed_dependencies, vec!["db".to_string()]);
    }

    #[test]
    fn clean_success() {
        let result = classify(&ClassifyInput::new(Outcome::Ok));
        assert_eq!(result.status, SignalStatus::Succeeded);
    }

    #[test]
    fn per_signal_timeout_cancellation() {
        let mut input = ClassifyInput::new(Outcome::Cancelled);
        input.was_cancelled = true;
        input.per_signal_timeout_fired = true;
        let result = classify(&input);
        assert_eq!(result.status, SignalStatus::TimedOut);
        assert_eq!(result.cancellation_reason, CancellationReason::PerSignalTimeout);
    }

    #[test]
    fn global_timeout_cancellation_requires_flag() {
        let mut input = ClassifyInput::new(Outcome::Cancelled);
        input.was_cancelled = true;
        input.global_timeout_fired = true;
        input.cancel_on_global_timeout = false;
        // Without the flag, falls through to rule 5: plain cancellation.
        let result = classify(&input);
        assert_eq!(result.status, SignalStatus::Cancelled);

        input.cancel_on_global_timeout = true;
        let result = classify(&input);
        assert_eq!(result.status, SignalStatus::TimedOut);
        assert_eq!(result.cancellation_reason, CancellationReason::GlobalTimeout);
    }

    #[test]
    fn fail_fast_cancellation_vs_external() {
        let mut input = ClassifyInput::new(Outcome::Cancelled);
        input.was_cancelled = true;
        let result = classify(&input);
        assert_eq!(result.cancellation_reason, CancellationReason::ExternalCancellation);

        input.scope_cancelled_for_fail_fast = true;
        let result = classify(&input);
        assert_eq!(result.cancellation_reason, CancellationReason::ScopeCancelled);
    }

    #[test]
    fn dependency_triggered_cancellation_reason() {
        let mut input = ClassifyInput::new(Outcome::Cancelled);
        input.was_cancelled = true;
        input.dependency_triggered_cancellation = true;
        let result = classify(&input);
        assert_eq!(result.status, SignalStatus::Cancelled);
        assert_eq!(result.cancellation_reason, CancellationReason::DependencyFailed);
    }

    #[test]
    fn operation_error_is_failed() {
        let err = SignalError::new("connect", "refused");
        let result = classify(&ClassifyInput::new(Outcome::Err(err.clone())));
        assert_eq!(result.status, SignalStatus::Failed);
        assert_eq!(result.error, Some(err));
    }

    #[test]
    fn late_completion_without_cancellation_is_timed_out() {
        let mut input = ClassifyInput::new(Outcome::Ok);
        input.completed_after_per_signal_deadline = true;
        input.cancel_individual_on_timeout = false;
        let result = classify(&input);
        assert_eq!(result.status, SignalStatus::TimedOut);
    }

    #[test]
    fn classifier_is_pure() {
        let input = {
            let mut i = ClassifyInput::new(Outcome::Cancelled);
            i.was_cancelled = true;
            i.per_signal_timeout_fired = true;
            i
        };
        assert_eq!(classify(&input), classify(&input));
    }
}
