//! Telemetry port
//!
//! Fire-and-forget sink. Implementations must not block and must swallow
//! their own failures.

use serde_json::{Map, Value};

/// Attribute bag attached to a telemetry record
pub type TelemetryAttributes = Map<String, Value>;

#[cfg_attr(test, mockall::automock)]
pub trait Telemetry: Send + Sync {
    fn log(&self, event_name: &str, latency_ms: f64, attributes: &TelemetryAttributes);
}

/// Sink that drops every record
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn log(&self, _event_name: &str, _latency_ms: f64, _attributes: &TelemetryAttributes) {}
}
