//! The [`Signal`] abstraction: the smallest unit the coordinator drives.
//!
//! A signal is a named asynchronous operation with an optional per-signal
//! timeout. Its `execute` future must be invoked at most once per run —
//! the coordinator never retries (retry/backoff is the signal's own
//! responsibility, per the Non-goals).

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::cancel::CancelScope;
use crate::types::Outcome;

/// A future returned by [`Signal::execute`], boxed so `Signal` can be made
/// into a trait object (`Box<dyn Signal>`) for heterogeneous registries.
pub type SignalFuture<'a> = Pin<Box<dyn Future<Output = Outcome> + Send + 'a>>;

/// A named asynchronous readiness operation.
///
/// Implementations own their own retry policy, if any; the coordinator
/// invokes `execute` exactly once.
pub trait Signal: Send + Sync {
    /// The signal's name. Must be unique within a [`crate::registry::SignalRegistry`].
    fn name(&self) -> &str;

    /// The signal's own declared timeout, consulted only when no host-level
    /// timeout strategy overrides it.
    fn per_signal_timeout(&self) -> Option<Duration> {
        None
    }

    /// Runs the readiness check. `scope` observes cancellation from the
    /// coordinator's cancellation fabric (global deadline, per-signal
    /// deadline, dependency failure, or external cancellation, depending on
    /// configuration) — the implementation should poll it cooperatively at
    /// suspension points but is not required to.
    fn execute<'a>(&'a self, scope: &'a CancelScope) -> SignalFuture<'a>;
}

/// A host-supplied override for a signal's effective per-signal timeout.
///
/// Consulted before the signal's own declared timeout. Must be a pure
/// function of `(signal_name, default_timeout)` — it must not depend on
/// wall-clock state, or re-running the same configuration could produce
/// different classifications.
pub trait TimeoutStrategy: Send + Sync {
    /// Returns the effective timeout for `signal_name`, given its own
    /// declared `default_timeout`. Returning `None` here means "no
    /// timeout", not "fall back to the default" — return `default_timeout`
    /// unchanged to keep a signal's own declared value.
    fn timeout_for(&self, signal_name: &str, default_timeout: Option<Duration>) -> Option<Duration>;
}

/// Wraps an async closure as a [`Signal`], the common case for host code
/// that has no other reason to define a named type.
pub struct ClosureSignal<F> {
    name: String,
    timeout: Option<Duration>,
    func: F,
}

impl<F, Fut> ClosureSignal<F>
where
    F: Fn(CancelScope) -> Fut + Send + Sync,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    /// Wraps `func` as a named signal with no declared timeout.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            timeout: None,
            func,
        }
    }

    /// Sets this signal's declared per-signal timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl<F, Fut> Signal for ClosureSignal<F>
where
    F: Fn(CancelScope) -> Fut + Send + Sync,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn per_signal_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn execute<'a>(&'a self, scope: &'a CancelScope) -> SignalFuture<'a> {
        Box::pin((self.func)(scope.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelFabric;

    #[tokio::test]
    async fn closure_signal_executes_and_reports_name() {
        let sig = ClosureSignal::new("db", |_scope| async { Outcome::Ok });
        assert_eq!(sig.name(), "db");
        let fabric = CancelFabric::new();
        let scope = fabric.root_scope();
        let outcome = sig.execute(&scope).await;
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn closure_signal_carries_declared_timeout() {
        let sig = ClosureSignal::new("cache", |_scope| async { Outcome::Ok })
            .with_timeout(Duration::from_millis(250));
        assert_eq!(sig.per_signal_timeout(), Some(Duration::from_millis(250)));
    }
}
