//! Signal status and cancellation-reason types.
//!
//! Cancellation in the coordinator is diagnostic, not a silent drop: every
//! non-success [`SignalResult`](crate::result::SignalResult) carries a
//! [`CancellationReason`] that explains *why* a signal was cut short, even
//! though the reason never changes how the signal is classified (see
//! [`crate::classify`]).

use core::fmt;

/// The terminal (or transient) state of a single signal within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalStatus {
    /// Registered but not yet started.
    Pending,
    /// Currently executing.
    Running,
    /// Completed without error before any deadline.
    Succeeded,
    /// The operation raised an error.
    Failed,
    /// The operation did not finish before its deadline.
    TimedOut,
    /// Never ran because a dependency terminated non-successfully.
    Skipped,
    /// Aborted by cancellation rather than by timeout or failure.
    Cancelled,
}

impl SignalStatus {
    /// Returns true for [`SignalStatus::Succeeded`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Returns true if this status represents a terminal outcome (anything
    /// other than [`SignalStatus::Pending`] or [`SignalStatus::Running`]).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    /// Returns the short name used in diagnostic records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Skipped => "skipped",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a signal was cancelled or skipped. Diagnostic only: never consulted
/// by the classifier to decide [`SignalStatus`], only attached to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CancellationReason {
    /// No cancellation occurred.
    #[default]
    None,
    /// The run's global deadline expired.
    GlobalTimeout,
    /// This signal's own deadline expired.
    PerSignalTimeout,
    /// A dependency of this signal terminated non-successfully.
    DependencyFailed,
    /// The scheduler cancelled remaining work after a fail-fast trigger.
    ScopeCancelled,
    /// The whole coordination run was cancelled as a unit.
    BundleCancelled,
    /// Cancellation was requested by the embedding application.
    ExternalCancellation,
}

impl CancellationReason {
    /// Short machine-readable name, used by [`crate::record`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::GlobalTimeout => "global_timeout",
            Self::PerSignalTimeout => "per_signal_timeout",
            Self::DependencyFailed => "dependency_failed",
            Self::ScopeCancelled => "scope_cancelled",
            Self::BundleCancelled => "bundle_cancelled",
            Self::ExternalCancellation => "external_cancellation",
        }
    }
}

impl fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_excludes_pending_and_running() {
        assert!(!SignalStatus::Pending.is_terminal());
        assert!(!SignalStatus::Running.is_terminal());
        assert!(SignalStatus::Succeeded.is_terminal());
        assert!(SignalStatus::Failed.is_terminal());
        assert!(SignalStatus::TimedOut.is_terminal());
        assert!(SignalStatus::Skipped.is_terminal());
        assert!(SignalStatus::Cancelled.is_terminal());
    }

    #[test]
    fn only_succeeded_is_success() {
        for status in [
            SignalStatus::Pending,
            SignalStatus::Running,
            SignalStatus::Failed,
            SignalStatus::TimedOut,
            SignalStatus::Skipped,
            SignalStatus::Cancelled,
        ] {
            assert!(!status.is_success(), "{status} should not be success");
        }
        assert!(SignalStatus::Succeeded.is_success());
    }

    #[test]
    fn default_cancellation_reason_is_none() {
        assert_eq!(CancellationReason::default(), CancellationReason::None);
    }
}
