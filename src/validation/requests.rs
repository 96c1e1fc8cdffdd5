use garde::Validate;
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::models::consent::{ConsentCategory, UnknownCategory};

#[derive(Debug, Validate)]
struct EventName {
    #[garde(ascii, length(min = 1, max = 64))]
    name: String,
}

/// Validates the `event` field of a telemetry payload.
///
/// # Arguments
///
/// * `payload` - The raw event fields.
///
/// # Returns
///
/// The event name.
pub fn validate_event(payload: &Map<String, Value>) -> Result<String> {
    let name = payload
        .get("event")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Validation("Field 'event' must be a string".to_string()))?;

    let event = EventName {
        name: name.trim().to_string(),
    };
    event
        .validate()
        .map_err(|report| AppError::Validation(format!("Invalid event name: {}", report)))?;

    Ok(event.name)
}

/// Parses a consent category from a path segment.
pub fn validate_category(raw: &str) -> Result<ConsentCategory> {
    raw.parse()
        .map_err(|e: UnknownCategory| AppError::Validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_valid_event() {
        assert_eq!(validate_event(&map(json!({ "event": " page_view " }))).unwrap(), "page_view");
    }

    #[test]
    fn test_invalid_events() {
        assert!(validate_event(&map(json!({}))).is_err());
        assert!(validate_event(&map(json!({ "event": 5 }))).is_err());
        assert!(validate_event(&map(json!({ "event": "" }))).is_err());
        assert!(validate_event(&map(json!({ "event": "x".repeat(65) }))).is_err());
        assert!(validate_event(&map(json!({ "event": "đặt_lịch" }))).is_err());
    }

    #[test]
    fn test_category() {
        assert_eq!(validate_category("functional").unwrap(), ConsentCategory::Functional);
        assert!(matches!(validate_category("ads"), Err(AppError::Validation(_))));
    }
}
