//! Telemetry hooks for workflow and stage lifecycle events.
//!
//! The engine takes a [`TelemetrySink`] as an explicit dependency and
//! defaults to [`NoOpTelemetrySink`]. Sinks only observe: results are the
//! same with or without one attached.

mod guarded;
mod sink;

pub(crate) use guarded::GuardedSink;
pub use sink::{
    CollectingTelemetrySink, LoggingTelemetrySink, NoOpTelemetrySink, TelemetryEvent,
    TelemetrySink,
};

#[cfg(test)]
pub use sink::MockTelemetrySink;
