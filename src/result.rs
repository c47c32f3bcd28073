//! The immutable records a run produces.

use std::time::Duration;

use crate::classify::ClassifyOutcome;
use crate::types::{CancellationReason, SignalError, SignalStatus};

/// One signal's complete, immutable attempt record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalResult {
    /// The signal's name.
    pub name: String,
    /// The classified status.
    pub status: SignalStatus,
    /// Offset from the run's monotonic start anchor.
    pub started_at: Duration,
    /// Offset from the run's monotonic start anchor.
    pub completed_at: Duration,
    /// `completed_at - started_at`, recorded directly rather than
    /// recomputed, so it stays exact even under clock-source jitter.
    pub duration: Duration,
    /// Present only when `status == Failed`.
    pub error: Option<SignalError>,
    /// Diagnostic-only; never influences equality of behavior.
    pub cancellation_reason: CancellationReason,
    /// Names of failing ancestors, present only when `status == Skipped`.
    pub failed_dependencies: Vec<String>,
    /// The stage this signal belonged to, when run under `Staged`.
    pub stage: Option<u32>,
}

impl SignalResult {
    /// Builds a result from a classifier verdict and the measured timing.
    #[must_use]
    pub fn from_classification(
        name: impl Into<String>,
        outcome: ClassifyOutcome,
        started_at: Duration,
        completed_at: Duration,
        stage: Option<u32>,
    ) -> Self {
        let duration = if outcome.status == SignalStatus::Skipped {
            Duration::ZERO
        } else {
            completed_at.saturating_sub(started_at)
        };
        Self {
            name: name.into(),
            status: outcome.status,
            started_at,
            completed_at,
            duration,
            error: outcome.error,
            cancellation_reason: outcome.cancellation_reason,
            failed_dependencies: outcome.failed_dependencies,
            stage,
        }
    }
}

/// One stage's aggregate outcome, present only for `Staged` runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    /// The stage number.
    pub stage: u32,
    /// The names of the signals that belong to this stage, in registration
    /// order.
    pub signals: Vec<String>,
    /// The stage's own aggregate status.
    pub status: StageStatus,
}

/// A stage's aggregate status, derived from the mix of its signals'
/// statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    /// Every signal in the stage succeeded.
    Succeeded,
    /// At least one signal failed and none timed out.
    Failed,
    /// At least one signal timed out.
    TimedOut,
    /// A mix of succeeded and non-succeeded signals with no outright
    /// failure or timeout driving it (e.g. some skipped, some succeeded).
    PartiallyCompleted,
}

impl StageStatus {
    /// Derives a stage's aggregate status from its signals' statuses.
    #[must_use]
    pub fn aggregate(statuses: &[SignalStatus]) -> Self {
        if statuses.iter().all(|s| *s == SignalStatus::Succeeded) {
            return Self::Succeeded;
        }
        if statuses.iter().any(|s| *s == SignalStatus::TimedOut) {
            return Self::TimedOut;
        }
        if statuses.iter().any(|s| *s == SignalStatus::Failed) {
            return Self::Failed;
        }
        Self::PartiallyCompleted
    }
}

/// The coordinator's lifecycle state. Transitions are monotonic:
/// `NotStarted -> Running -> {Completed, TimedOut, Faulted}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// `wait_all` has never been called.
    NotStarted,
    /// A run is in progress.
    Running,
    /// The run finished with no unresolved timeout or fault.
    Completed,
    /// The run finished with `timed_out == true`.
    TimedOut,
    /// The run finished because the whole run was cancelled.
    Faulted,
}

/// The immutable aggregate produced by a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Every registered signal's result, in registration order. Contains
    /// exactly one entry per registered signal.
    pub signal_results: Vec<SignalResult>,
    /// Present only for `Staged` runs, in ascending stage order.
    pub stage_results: Vec<StageResult>,
    /// End-to-end wall duration of the run, inclusive of scheduler
    /// overhead.
    pub total_duration: Duration,
    /// True if the global deadline fired, regardless of whether it
    /// hard-cancelled anything.
    pub timed_out: bool,
    /// The coordinator's final lifecycle state for this run.
    pub final_state: CoordinatorState,
}

impl RunResult {
    /// Looks up one signal's result by name.
    #[must_use]
    pub fn signal(&self, name: &str) -> Option<&SignalResult> {
        self.signal_results.iter().find(|r| r.name == name)
    }

    /// The count of signals with a given status.
    #[must_use]
    pub fn count_with_status(&self, status: SignalStatus) -> usize {
        self.signal_results.iter().filter(|r| r.status == status).count()
    }
}
