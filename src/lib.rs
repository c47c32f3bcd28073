//! Ignition coordinator: an embeddable library that awaits a set of
//! user-defined asynchronous readiness signals collectively and reports a
//! deterministic, aggregated outcome.
//!
//! Signals represent the preconditions an application needs before it
//! begins serving — database connections, message broker handshakes, cache
//! warmups, dependent HTTP services. The coordinator enforces timeouts,
//! execution orderings, failure policies, cancellation, and idempotent
//! result caching.
//!
//! # Quick start
//!
//! ```
//! use ignition_coordinator::{ClosureSignal, Coordinator, Options, Outcome, SignalRegistry};
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let registry = SignalRegistry::builder()
//!     .register(Arc::new(ClosureSignal::new("db", |_scope| async { Outcome::Ok })))
//!     .unwrap()
//!     .build();
//! let coordinator = Coordinator::builder(registry, Options::builder().build().unwrap())
//!     .build()
//!     .unwrap();
//! let result = coordinator.wait_all().await.unwrap();
//! assert!(result.signal("db").unwrap().status.is_success());
//! # }
//! ```
//!
//! # Module structure
//!
//! - [`signal`]: the [`signal::Signal`] trait and [`signal::ClosureSignal`] adapter.
//! - [`registry`]: the immutable, ordered [`registry::SignalRegistry`].
//! - [`graph`]: the dependency graph driving `DependencyAware` mode.
//! - [`stage`]: the stage table driving `Staged` mode.
//! - [`options`]: run configuration (policy, execution mode, timeouts, limits).
//! - [`cancel`]: the cancellation fabric every signal's scope descends from.
//! - [`classify`]: the pure classification function from raw facts to status.
//! - [`limiter`]: concurrency limiting.
//! - [`slow`]: bounded tracking of the slowest-completing signals.
//! - [`scheduler`]: the four execution engines and their shared per-signal path.
//! - [`coordinator`]: the [`coordinator::Coordinator`] facade.
//! - [`result`]: the immutable records a run produces.
//! - [`record`]: schema-versioned diagnostic exports (`RunRecording`, `Timeline`).
//! - [`error`]: the error taxonomy surfaced to the embedding application.
//! - [`types`]: shared closed-set types ([`types::Outcome`], [`types::SignalStatus`], etc.).
//!
//! # Non-goals
//!
//! No concrete readiness adapters (SQL, Redis, Kafka, HTTP), no
//! dependency-injection wiring, no logging sinks or metrics exporters, no
//! health-check HTTP adapter, no timeline export/replay/compare tooling, no
//! retry/backoff of signal operations, no cross-process persistence, no
//! dynamic add/remove of signals mid-run.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod cancel;
pub mod classify;
mod coordinator;
pub mod error;
pub mod graph;
pub mod limiter;
pub mod options;
pub mod record;
pub mod registry;
pub mod result;
mod scheduler;
pub mod signal;
pub mod slow;
pub mod stage;
mod telemetry;
pub mod types;

pub use cancel::{CancelFabric, CancelScope};
pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use error::{AggregateError, ConfigurationError, FailureCause, SignalFailure};
pub use graph::{Graph, GraphBuilder};
pub use limiter::{ConcurrencyLimiter, ConcurrencyPermit};
pub use options::{ExecutionMode, Options, OptionsBuilder, Policy};
pub use record::{RunRecording, Timeline, TimelineEvent};
pub use registry::{SignalRegistry, SignalRegistryBuilder};
pub use result::{CoordinatorState, RunResult, SignalResult, StageResult, StageStatus};
pub use signal::{ClosureSignal, Signal, SignalFuture, TimeoutStrategy};
pub use slow::{SlowSignal, SlowSignalTracker};
pub use stage::{StageTable, StageTableBuilder};
pub use types::{CancellationReason, Outcome, SignalError, SignalStatus};
