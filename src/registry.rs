//! The set of signals registered for a run.
//!
//! Registration order is preserved and used as the tiebreaker wherever the
//! scheduler needs one (e.g. `Sequential` mode, or iteration order within a
//! stage). Names must be unique; a duplicate is rejected immediately rather
//! than silently shadowing the earlier registration.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ConfigurationError;
use crate::signal::Signal;

/// An immutable, ordered collection of registered signals.
///
/// Built via [`SignalRegistryBuilder`]; once built, a registry never changes
/// for the lifetime of the coordinator that owns it.
pub struct SignalRegistry {
    signals: Vec<Arc<dyn Signal>>,
    index_by_name: HashMap<String, usize>,
}

impl SignalRegistry {
    /// Starts building a new registry.
    #[must_use]
    pub fn builder() -> SignalRegistryBuilder {
        SignalRegistryBuilder::new()
    }

    /// The number of registered signals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// True if no signals are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Iterates signals in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Signal>> {
        self.signals.iter()
    }

    /// Looks up a signal by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Signal>> {
        self.index_by_name.get(name).map(|&i| &self.signals[i])
    }

    /// The registration-order position of a name, if registered.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index_by_name.get(name).copied()
    }

    /// Every registered name, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.signals.iter().map(|s| s.name())
    }
}

/// Accumulates signals before a [`SignalRegistry`] is finalized.
#[derive(Default)]
pub struct SignalRegistryBuilder {
    signals: Vec<Arc<dyn Signal>>,
    seen: HashMap<String, usize>,
}

impl SignalRegistryBuilder {
    /// An empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a signal, consuming and returning `self` for chaining.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::DuplicateSignalName`] immediately if
    /// `signal`'s name collides with one already registered.
    pub fn register(
        mut self,
        signal: Arc<dyn Signal>,
    ) -> Result<Self, ConfigurationError> {
        let name = signal.name().to_string();
        if self.seen.contains_key(&name) {
            return Err(ConfigurationError::DuplicateSignalName { name });
        }
        self.seen.insert(name, self.signals.len());
        self.signals.push(signal);
        Ok(self)
    }

    /// Finalizes the registry.
    #[must_use]
    pub fn build(self) -> SignalRegistry {
        SignalRegistry {
            signals: self.signals,
            index_by_name: self.seen,
        }
    }
}
