//! Structured logging emission points, gated by the `tracing-integration`
//! feature exactly as the crate's dependency table gates `tracing` itself:
//! when the feature is off these macros expand to nothing, so call sites
//! never need their own `#[cfg(...)]`.

#[cfg(feature = "tracing-integration")]
macro_rules! trace_event {
    (info, $($arg:tt)*) => { tracing::info!($($arg)*) };
    (warn, $($arg:tt)*) => { tracing::warn!($($arg)*) };
    (debug, $($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing-integration"))]
macro_rules! trace_event {
    ($level:ident, $($arg:tt)*) => {};
}

pub(crate) use trace_event;
