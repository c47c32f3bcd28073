//! Bounding how many signals run concurrently.
//!
//! A thin wrapper over [`tokio::sync::Semaphore`]. An unbounded limiter
//! (the default) never blocks; a bounded one hands out permits FIFO and
//! releases them when the held [`ConcurrencyPermit`] is dropped, mirroring
//! the teacher's `Semaphore`/`SemaphorePermit` split between acquisition and
//! RAII release.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Caps the number of signals executing at once within a single run.
///
/// Clone freely: clones share the same underlying permit pool.
#[derive(Clone)]
pub struct ConcurrencyLimiter {
    inner: Option<Arc<Semaphore>>,
}

impl ConcurrencyLimiter {
    /// No cap: every acquire resolves immediately.
    #[must_use]
    pub fn unbounded() -> Self {
        Self { inner: None }
    }

    /// Caps concurrency at `max` simultaneously-running signals.
    ///
    /// # Panics
    /// Panics if `max` is zero; use [`ConcurrencyLimiter::unbounded`] for
    /// "no limit" instead of zero.
    #[must_use]
    pub fn bounded(max: usize) -> Self {
        assert!(max > 0, "concurrency limit must be positive; use `unbounded()` for no limit");
        Self {
            inner: Some(Arc::new(Semaphore::new(max))),
        }
    }

    /// Acquires one slot, waiting if the limiter is at capacity.
    ///
    /// # Panics
    /// Panics only if the underlying semaphore has been closed, which this
    /// type never does.
    pub async fn acquire(&self) -> ConcurrencyPermit {
        match &self.inner {
            Some(sem) => {
                let permit = Arc::clone(sem)
                    .acquire_owned()
                    .await
                    .expect("limiter semaphore is never closed");
                ConcurrencyPermit { _permit: Some(permit) }
            }
            None => ConcurrencyPermit { _permit: None },
        }
    }
}

/// A held concurrency slot. Releases automatically on drop.
pub struct ConcurrencyPermit {
    _permit: Option<OwnedSemaphorePermit>,
}
