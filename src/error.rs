//! Error taxonomy surfaced to the embedding application.
//!
//! Two families exist:
//!
//! - [`ConfigurationError`] — thrown synchronously from graph/registry/options
//!   construction. Never produces a [`crate::result::RunResult`].
//! - [`AggregateError`] — raised from [`crate::coordinator::Coordinator::wait_all`]
//!   only when the active [`crate::options::Policy`] requires surfacing a
//!   run's failures or timeouts; every other outcome is collected into the
//!   `RunResult` instead.

use crate::types::SignalError;
use std::fmt;

/// Malformed registration: cycles, unknown names, invalid option values,
/// duplicate signal names.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigurationError {
    /// Two signals were registered with the same name.
    #[error("duplicate signal name: {name}")]
    DuplicateSignalName {
        /// The name that was registered twice.
        name: String,
    },
    /// A graph edge referenced a signal name that was never registered.
    #[error("dependency graph references unknown signal: {name}")]
    UnknownSignal {
        /// The unregistered name.
        name: String,
    },
    /// The dependency graph contains a cycle.
    #[error("dependency graph contains a cycle: {}", format_cycle(.path))]
    CycleDetected {
        /// The cycle, in declaration order, e.g. `["a", "b", "c", "a"]`.
        path: Vec<String>,
    },
    /// An option value was out of its valid range.
    #[error("invalid option `{option}`: {reason}")]
    InvalidOption {
        /// The option name.
        option: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

fn format_cycle(path: &[String]) -> String {
    path.join(" → ")
}

/// One signal's non-success error, bundled for [`AggregateError`].
#[derive(Debug, Clone)]
pub struct SignalFailure {
    /// The signal's name.
    pub name: String,
    /// What went wrong.
    pub error: FailureCause,
}

/// The reason a given signal contributed to an [`AggregateError`].
#[derive(Debug, Clone)]
pub enum FailureCause {
    /// The signal's operation raised an error.
    Failed(SignalError),
    /// The signal did not complete before its deadline.
    TimedOut,
    /// The whole run was cancelled.
    Cancelled,
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(err) => write!(f, "failed: {err}"),
            Self::TimedOut => write!(f, "timed out"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Raised from [`crate::coordinator::Coordinator::wait_all`] when policy
/// requires surfacing the run's failures.
#[derive(Debug, Clone)]
pub struct AggregateError {
    /// Every non-success signal that contributed to this error.
    pub failures: Vec<SignalFailure>,
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} signal(s) did not succeed: ", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{} ({})", failure.name, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}
