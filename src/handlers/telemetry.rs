use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::{Map, Value};

use crate::{
    error::Result,
    models::consent::ConsentSettings,
    models::telemetry::TelemetryStatus,
    services::telemetry as telemetry_service,
    state::AppState,
    validation::requests::validate_event,
};

/// Accepts an analytics event from the site.
///
/// Events are only forwarded with analytics consent, and only after every
/// free-text field has been sanitized.
pub async fn ingest_event(
    State(state): State<AppState>,
    Extension(settings): Extension<ConsentSettings>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<impl IntoResponse> {
    let event = validate_event(&payload)?;

    let outcome =
        telemetry_service::forward_event(state.telemetry.as_ref(), &settings, &event, &payload);

    let status = match outcome.status {
        TelemetryStatus::Forwarded => StatusCode::ACCEPTED,
        TelemetryStatus::Dropped => StatusCode::OK,
    };

    Ok((status, Json(outcome)))
}
