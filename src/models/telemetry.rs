use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryStatus {
    /// Sanitized and handed to the sink.
    Forwarded,
    /// Analytics consent is missing; nothing left the process.
    Dropped,
}

/// The response to a telemetry submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetryOutcome {
    pub status: TelemetryStatus,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Uuid>,
}

impl TelemetryOutcome {
    pub fn forwarded(event: impl Into<String>, event_id: Uuid) -> Self {
        Self {
            status: TelemetryStatus::Forwarded,
            event: event.into(),
            event_id: Some(event_id),
        }
    }

    pub fn dropped(event: impl Into<String>) -> Self {
        Self {
            status: TelemetryStatus::Dropped,
            event: event.into(),
            event_id: None,
        }
    }
}
