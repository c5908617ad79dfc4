//! Telemetry adapters

use crate::ports::{Telemetry, TelemetryAttributes};

/// Emits each record as a structured `tracing` event on target `telemetry`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn log(&self, event_name: &str, latency_ms: f64, attributes: &TelemetryAttributes) {
        let attributes = serde_json::Value::Object(attributes.clone());
        tracing::info!(
            target: "telemetry",
            event = event_name,
            latency_ms,
            attributes = %attributes,
        );
    }
}
