use serde_json::{Map, Value};
use uuid::Uuid;

use crate::models::consent::{ConsentCategory, ConsentSettings};
use crate::models::telemetry::TelemetryOutcome;
use crate::services::sanitizer::sanitize_event_payload;

/// Destination for sanitized telemetry events.
pub trait TelemetrySink: Send + Sync {
    fn emit(&self, event_id: Uuid, payload: &Map<String, Value>);
}

/// Emits each event as a structured log record on the `telemetry` target.
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn emit(&self, event_id: Uuid, payload: &Map<String, Value>) {
        let event = payload
            .get("event")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let fields = serde_json::Value::Object(payload.clone());
        tracing::info!(
            target: "telemetry",
            %event_id,
            event,
            payload = %fields,
            "📈 Telemetry event forwarded"
        );
    }
}

/// Sends an event to `sink` if the visitor allows analytics.
///
/// # Arguments
///
/// * `sink` - Where forwarded events go.
/// * `settings` - The visitor's consent.
/// * `event` - The event name.
/// * `payload` - The raw event fields. Only the sanitized copy leaves.
///
/// # Returns
///
/// Whether the event was forwarded or dropped.
pub fn forward_event(
    sink: &dyn TelemetrySink,
    settings: &ConsentSettings,
    event: &str,
    payload: &Map<String, Value>,
) -> TelemetryOutcome {
    if !settings.allows(ConsentCategory::Analytics) {
        tracing::debug!("🚫 Telemetry event dropped without analytics consent: {}", event);
        return TelemetryOutcome::dropped(event);
    }

    let event_id = Uuid::new_v4();
    sink.emit(event_id, &sanitize_event_payload(payload));
    TelemetryOutcome::forwarded(event, event_id)
}
