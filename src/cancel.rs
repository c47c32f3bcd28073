//! The cancellation fabric: a tree of cancel-tokens.
//!
//! A single root per run composes the global-deadline source, the external
//! cancellation source, and the scheduler's own stop request. Each signal
//! receives a linked child [`CancelScope`] that additionally observes its
//! own per-signal deadline and, in `DependencyAware` mode, a
//! dependency-failure trigger. Cancelling a parent cancels every descendant;
//! cancelling a child is local and never propagates upward.
//!
//! Cancellation is cooperative: the scheduler signals and awaits, but a
//! signal's operation is responsible for observing the token promptly.
//! Already-recorded results are never mutated by a later cancellation — a
//! signal that finished before cancellation remains [`Succeeded`].
//!
//! [`Succeeded`]: crate::types::SignalStatus::Succeeded

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::types::CancellationReason;

struct TokenInner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// A cloneable, cheaply-shareable flag used to signal cancellation.
///
/// All clones share the same underlying state; cancelling one immediately
/// makes every clone observe `is_cancelled() == true`.
#[derive(Clone)]
struct CancelToken {
    inner: Arc<TokenInner>,
}

impl CancelToken {
    fn new() -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
            if self.is_cancelled() {
                return;
            }
        }
    }
}

/// One node in the cancellation fabric tree.
///
/// Cheap to clone (an `Arc` underneath) and safe to hold across an `.await`.
#[derive(Clone)]
pub struct CancelScope {
    own: CancelToken,
    reason: Arc<Mutex<Option<CancellationReason>>>,
    parent: Option<Box<CancelScope>>,
}

impl CancelScope {
    fn root() -> Self {
        Self {
            own: CancelToken::new(),
            reason: Arc::new(Mutex::new(None)),
            parent: None,
        }
    }

    /// Derives a child scope linked to this one. Cancelling `self` (or any
    /// of its ancestors) cancels the child; cancelling the child never
    /// affects `self`.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            own: CancelToken::new(),
            reason: Arc::new(Mutex::new(None)),
            parent: Some(Box::new(self.clone())),
        }
    }

    /// Cancels this scope (not its parent) with the given reason.
    ///
    /// Idempotent: only the first reason is recorded, matching the "first
    /// cause wins" diagnostic convention used throughout the coordinator.
    pub fn cancel(&self, reason: CancellationReason) {
        {
            let mut guard = self.reason.lock();
            if guard.is_none() {
                *guard = Some(reason);
            }
        }
        self.own.cancel();
    }

    /// Returns true if this scope or any ancestor has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.own.is_cancelled() || self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }

    /// Resolves when this scope or any ancestor is cancelled.
    pub async fn cancelled(&self) {
        match &self.parent {
            Some(parent) => {
                tokio::select! {
                    () = self.own.cancelled() => {}
                    () = parent.cancelled() => {}
                }
            }
            None => self.own.cancelled().await,
        }
    }

    /// The reason this scope (or, failing that, its nearest cancelled
    /// ancestor) was cancelled. [`CancellationReason::None`] if neither this
    /// scope nor any ancestor is cancelled.
    #[must_use]
    pub fn reason(&self) -> CancellationReason {
        if let Some(reason) = *self.reason.lock() {
            return reason;
        }
        match &self.parent {
            Some(parent) if parent.is_cancelled() => parent.reason(),
            _ => CancellationReason::None,
        }
    }
}

/// Owns the root of a run's cancellation fabric.
///
/// Composes the global-deadline source, the external cancellation source,
/// and the scheduler's own fail-fast stop request into a single root scope;
/// every signal's scope is a descendant of it.
pub struct CancelFabric {
    root: CancelScope,
}

impl CancelFabric {
    /// Creates a fresh, uncancelled fabric.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: CancelScope::root(),
        }
    }

    /// Returns the root scope. Driving code derives per-signal child scopes
    /// from it via [`CancelScope::child`].
    #[must_use]
    pub fn root_scope(&self) -> CancelScope {
        self.root.clone()
    }

    /// Cancels the whole run because the global deadline fired and
    /// `CancelOnGlobalTimeout` is set.
    pub fn cancel_on_global_timeout(&self) {
        self.root.cancel(CancellationReason::GlobalTimeout);
    }

    /// Cancels the whole run because the embedding application requested it.
    pub fn cancel_externally(&self) {
        self.root.cancel(CancellationReason::ExternalCancellation);
    }

    /// Cancels remaining in-flight work after a fail-fast trigger.
    pub fn stop_for_fail_fast(&self) {
        self.root.cancel(CancellationReason::ScopeCancelled);
    }
}

impl Default for CancelFabric {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_scope_is_not_cancelled() {
        let fabric = CancelFabric::new();
        assert!(!fabric.root_scope().is_cancelled());
    }

    #[test]
    fn cancelling_root_cancels_children() {
        let fabric = CancelFabric::new();
        let child = fabric.root_scope().child();
        let grandchild = child.child();
        assert!(!grandchild.is_cancelled());
        fabric.cancel_externally();
        assert!(child.is_cancelled());
        assert!(grandchild.is_cancelled());
    }

    #[test]
    fn cancelling_child_does_not_cancel_parent() {
        let fabric = CancelFabric::new();
        let root = fabric.root_scope();
        let child = root.child();
        child.cancel(CancellationReason::PerSignalTimeout);
        assert!(child.is_cancelled());
        assert!(!root.is_cancelled());
    }

    #[test]
    fn reason_reflects_first_cause() {
        let fabric = CancelFabric::new();
        let child = fabric.root_scope().child();
        child.cancel(CancellationReason::PerSignalTimeout);
        child.cancel(CancellationReason::DependencyFailed);
        assert_eq!(child.reason(), CancellationReason::PerSignalTimeout);
    }

    #[test]
    fn child_without_own_cancel_reports_parent_reason() {
        let fabric = CancelFabric::new();
        let child = fabric.root_scope().child();
        fabric.cancel_on_global_timeout();
        assert_eq!(child.reason(), CancellationReason::GlobalTimeout);
    }

    #[tokio::test]
    async fn cancelled_future_resolves_after_root_cancel() {
        let fabric = CancelFabric::new();
        let child = fabric.root_scope().child();
        let waiter = tokio::spawn({
            let child = child.clone();
            async move {
                child.cancelled().await;
            }
        });
        fabric.stop_for_fail_fast();
        waiter.await.expect("waiter task panicked");
    }
}
