use regex::{Captures, Regex};
use serde_json::{Map, Value};

/// Returned for input that is missing, empty or not text.
pub const FALLBACK: &str = "unknown_error";
/// Maximum length of sanitized text, in characters.
pub const MAX_LENGTH: usize = 255;
const ELLIPSIS: &str = "...";
/// Plain string values longer than this are scrubbed even under neutral keys.
const LONG_VALUE: usize = 100;

/// The kinds of personal data the sanitizer removes, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PiiCategory {
    Email,
    Phone,
    VietnamesePhone,
    Url,
    IpAddress,
    CreditCard,
    Ssn,
    PostalCode,
    UserName,
    VietnameseName,
    SensitiveFields,
}

impl PiiCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            PiiCategory::Email => "email",
            PiiCategory::Phone => "phone",
            PiiCategory::VietnamesePhone => "vietnamesePhone",
            PiiCategory::Url => "url",
            PiiCategory::IpAddress => "ipAddress",
            PiiCategory::CreditCard => "creditCard",
            PiiCategory::Ssn => "ssn",
            PiiCategory::PostalCode => "postalCode",
            PiiCategory::UserName => "userName",
            PiiCategory::VietnameseName => "vietnameseName",
            PiiCategory::SensitiveFields => "sensitiveFields",
        }
    }
}

/// A pattern and the function that rewrites each of its matches.
pub struct SanitizationRule {
    pub category: PiiCategory,
    matcher: Regex,
    replace: fn(&Captures<'_>) -> String,
}

impl SanitizationRule {
    fn new(category: PiiCategory, pattern: &str, replace: fn(&Captures<'_>) -> String) -> Self {
        Self {
            category,
            matcher: Regex::new(pattern).unwrap(),
            replace,
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }

    pub fn apply(&self, text: &str) -> String {
        self.matcher
            .replace_all(text, |caps: &Captures<'_>| (self.replace)(caps))
            .into_owned()
    }
}

fn keep_key(caps: &Captures<'_>, placeholder: &str) -> String {
    format!("{}{}{}", &caps[1], &caps[2], placeholder)
}

lazy_static::lazy_static! {
    /// Every rule, in the order it is applied. Later rules see the output
    /// of earlier ones.
    pub static ref RULES: Vec<SanitizationRule> = vec![
        SanitizationRule::new(
            PiiCategory::Email,
            r"(?i)[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}",
            |_| "[EMAIL]".to_string(),
        ),
        SanitizationRule::new(
            PiiCategory::Phone,
            r"(?:\+\d{1,3}[\s-]?)?(?:\(\d{3}\)|\b\d{3})[\s-]?\d{3}[\s-]?\d{4}\b",
            |_| "[PHONE]".to_string(),
        ),
        SanitizationRule::new(
            PiiCategory::VietnamesePhone,
            r"(?:\+84|\b84|\b0)[\s.-]?[35789]\d(?:[\s.-]?\d){7}\b",
            |_| "[PHONE]".to_string(),
        ),
        SanitizationRule::new(
            PiiCategory::Url,
            r#"(?i)\b(?:https?://|www\.)[^\s<>"']+"#,
            |_| "[URL]".to_string(),
        ),
        SanitizationRule::new(
            PiiCategory::IpAddress,
            r"(?i)\b(?:\d{1,3}\.){3}\d{1,3}\b|\b(?:[0-9a-f]{1,4}:){7}[0-9a-f]{1,4}\b",
            |_| "[IP]".to_string(),
        ),
        SanitizationRule::new(
            PiiCategory::CreditCard,
            r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}\b",
            |_| "[CARD]".to_string(),
        ),
        SanitizationRule::new(
            PiiCategory::Ssn,
            r"\b\d{3}-\d{2}-\d{4}\b",
            |_| "[SSN]".to_string(),
        ),
        SanitizationRule::new(
            PiiCategory::PostalCode,
            r"\b\d{5}(?:-\d{4})?\b",
            |_| "[POSTAL]".to_string(),
        ),
        SanitizationRule::new(
            PiiCategory::UserName,
            r"(?i)\b(user(?:name)?|login|account|customer|patient)(\s*[:=]\s*)([^\s,;&]+)",
            |caps| keep_key(caps, "[USER]"),
        ),
        // Family name followed by one to three capitalised given names.
        SanitizationRule::new(
            PiiCategory::VietnameseName,
            r"\b(?:Nguyễn|Nguyen|Trần|Tran|Lê|Phạm|Pham|Hoàng|Hoang|Huỳnh|Huynh|Phan|Vũ|Võ|Đặng|Dang|Bùi|Bui|Đỗ|Hồ|Ngô|Ngo|Dương|Duong|Lý)(?:\s+\p{Lu}[\p{L}\p{M}]*){1,3}",
            |_| "[NAME]".to_string(),
        ),
        SanitizationRule::new(
            PiiCategory::SensitiveFields,
            r#"(?i)\b(?:(password|passwd|pwd|secret|token|api[_-]?key|access[_-]?key|authorization|session(?:[_-]?id)?|cookie|otp|pin)(\s*[:=]\s*)("[^"]*"|'[^']*'|[^\s,;&]+)|bearer\s+[a-z0-9._~+/=-]+)"#,
            |caps| match caps.get(1) {
                Some(_) => keep_key(caps, "[REDACTED]"),
                None => "Bearer [REDACTED]".to_string(),
            },
        ),
    ];
}

/// Removes personal data from free text so it can leave the process.
///
/// Missing or empty input yields [`FALLBACK`]. The result never exceeds
/// [`MAX_LENGTH`] characters; truncated output ends with `...`.
pub fn sanitize_text(input: Option<&str>) -> String {
    let text = match input {
        Some(text) if !text.is_empty() => text,
        _ => return FALLBACK.to_string(),
    };

    let scrubbed = RULES
        .iter()
        .fold(text.to_string(), |acc, rule| rule.apply(&acc));

    truncate(scrubbed)
}

/// [`sanitize_text`] for arbitrary JSON; anything but a string yields the
/// fallback.
pub fn sanitize_value(value: &Value) -> String {
    match value {
        Value::String(text) => sanitize_text(Some(text)),
        _ => FALLBACK.to_string(),
    }
}

fn truncate(text: String) -> String {
    if text.chars().count() <= MAX_LENGTH {
        return text;
    }

    let mut truncated: String = text.chars().take(MAX_LENGTH - ELLIPSIS.len()).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

fn is_free_text_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    ["error", "message", "description"]
        .iter()
        .any(|marker| key.contains(marker))
}

fn needs_scrub(text: &str) -> bool {
    text.contains('@') || text.contains("http") || text.chars().count() > LONG_VALUE
}

/// Copies an event payload, scrubbing every field that may carry free text.
///
/// `event` is never touched. Keys mentioning an error, message or
/// description are always sanitized; other string values only when they
/// look like they could hold an address or are unusually long.
pub fn sanitize_event_payload(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| {
            let cleaned = if key == "event" {
                value.clone()
            } else if is_free_text_key(key) {
                Value::String(sanitize_value(value))
            } else {
                match value {
                    Value::String(text) if needs_scrub(text) => {
                        Value::String(sanitize_text(Some(text)))
                    }
                    _ => value.clone(),
                }
            };
            (key.clone(), cleaned)
        })
        .collect()
}

pub fn contains_pii(text: &str) -> bool {
    RULES.iter().any(|rule| rule.is_match(text))
}

/// Strings must be free of PII; objects must have no string property that
/// contains PII. Anything else is safe.
pub fn is_safe_for_tracking(value: &Value) -> bool {
    match value {
        Value::String(text) => !contains_pii(text),
        Value::Object(fields) => fields.values().all(|field| match field {
            Value::String(text) => !contains_pii(text),
            _ => true,
        }),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_order_is_fixed() {
        let order: Vec<_> = RULES.iter().map(|rule| rule.category.as_str()).collect();
        assert_eq!(
            order,
            [
                "email",
                "phone",
                "vietnamesePhone",
                "url",
                "ipAddress",
                "creditCard",
                "ssn",
                "postalCode",
                "userName",
                "vietnameseName",
                "sensitiveFields",
            ]
        );
    }

    #[test]
    fn test_email_redacted() {
        let out = sanitize_text(Some("Contact me at jane.doe@example.com"));
        assert!(out.contains("[EMAIL]"));
        assert!(!out.contains("jane.doe@example.com"));
    }

    #[test]
    fn test_phone_redacted() {
        assert!(sanitize_text(Some("Call 0901234567")).contains("[PHONE]"));
        assert!(sanitize_text(Some("Call +84 901 234 567 now")).contains("[PHONE]"));
        assert_eq!(sanitize_text(Some("(555) 123-4567")), "[PHONE]");
        assert_eq!(sanitize_text(Some("tel +1 555-123-4567")), "tel [PHONE]");
    }

    #[test]
    fn test_fallback_for_missing_input() {
        assert_eq!(sanitize_text(None), "unknown_error");
        assert_eq!(sanitize_text(Some("")), "unknown_error");
        assert_eq!(sanitize_value(&json!(42)), "unknown_error");
        assert_eq!(sanitize_value(&Value::Null), "unknown_error");
    }

    #[test]
    fn test_truncation() {
        let out = sanitize_text(Some(&"x".repeat(300)));
        assert_eq!(out.chars().count(), 255);
        assert!(out.ends_with("..."));

        let exact = "y".repeat(255);
        assert_eq!(sanitize_text(Some(&exact)), exact);
    }

    #[test]
    fn test_truncation_counts_characters() {
        let out = sanitize_text(Some(&"ư".repeat(400)));
        assert_eq!(out.chars().count(), 255);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_url_before_postal_code() {
        let out = sanitize_text(Some("fetch https://clinic.example/booking/70000 failed"));
        assert_eq!(out, "fetch [URL] failed");
        assert_eq!(sanitize_text(Some("zip 70000")), "zip [POSTAL]");
    }

    #[test]
    fn test_numeric_identifiers() {
        assert_eq!(sanitize_text(Some("from 192.168.1.20")), "from [IP]");
        assert_eq!(sanitize_text(Some("card 4111 1111 1111 1111")), "card [CARD]");
        assert_eq!(sanitize_text(Some("ssn 123-45-6789")), "ssn [SSN]");
    }

    #[test]
    fn test_key_value_fields_keep_key() {
        assert_eq!(
            sanitize_text(Some("login failed for username=thao91")),
            "login failed for username=[USER]"
        );
        assert_eq!(
            sanitize_text(Some("password: hunter2, token=abc.def")),
            "password: [REDACTED], token=[REDACTED]"
        );
        assert_eq!(
            sanitize_text(Some("Authorization header Bearer eyJhbGci.x.y")),
            "Authorization header Bearer [REDACTED]"
        );
    }

    #[test]
    fn test_vietnamese_name() {
        assert_eq!(
            sanitize_text(Some("Booking for Nguyễn Thị Mai rejected")),
            "Booking for [NAME] rejected"
        );
        assert_eq!(sanitize_text(Some("Tran Van An")), "[NAME]");
        assert_eq!(sanitize_text(Some("Pham lowercase")), "Pham lowercase");
    }

    #[test]
    fn test_earlier_placeholder_is_not_reconsumed() {
        assert_eq!(
            sanitize_text(Some("Nguyen jane@example.com")),
            "Nguyen [EMAIL]"
        );
    }

    #[test]
    fn test_clean_text_unchanged() {
        let text = "Booking form failed to load";
        assert_eq!(sanitize_text(Some(text)), text);
        assert!(!contains_pii(text));
    }

    #[test]
    fn test_event_payload() {
        let payload = json!({
            "event": "click",
            "error_message": "user a@b.com failed",
            "errorCode": 500,
            "page": "/treatments",
            "referrer": "https://search.example/?q=clinic",
            "contact": "me@example.com",
            "notes": "z".repeat(150),
            "count": 3
        });
        let out = sanitize_event_payload(payload.as_object().unwrap());

        assert_eq!(out["event"], "click");
        assert!(out["error_message"].as_str().unwrap().contains("[EMAIL]"));
        assert_eq!(out["errorCode"], "unknown_error");
        assert_eq!(out["page"], "/treatments");
        assert_eq!(out["referrer"], "[URL]");
        assert_eq!(out["contact"], "[EMAIL]");
        assert_eq!(out["notes"].as_str().unwrap().chars().count(), 150);
        assert_eq!(out["count"], 3);
    }

    fn padded(text: &str, len: usize) -> String {
        format!("{}{}", text, ".".repeat(len - text.chars().count()))
    }

    #[test]
    fn test_long_neutral_values_are_scrubbed() {
        let at_limit = padded("callback 555-123-4567 ", LONG_VALUE);
        let over_limit = padded("callback 555-123-4567 ", LONG_VALUE + 1);
        let payload = json!({
            "event": "booking_note",
            "short_note": at_limit.clone(),
            "long_note": over_limit,
        });
        let out = sanitize_event_payload(payload.as_object().unwrap());

        assert_eq!(out["short_note"], at_limit.as_str());

        let long_note = out["long_note"].as_str().unwrap();
        assert!(long_note.starts_with("callback [PHONE] "));
        assert!(!long_note.contains("555-123-4567"));
    }

    #[test]
    fn test_event_is_never_rewritten() {
        let payload = json!({ "event": "signup jane@example.com" });
        let out = sanitize_event_payload(payload.as_object().unwrap());
        assert_eq!(out["event"], "signup jane@example.com");
    }

    #[test]
    fn test_safe_for_tracking() {
        assert!(is_safe_for_tracking(&json!("page_view")));
        assert!(!is_safe_for_tracking(&json!("mail jane@example.com")));
        assert!(is_safe_for_tracking(&json!({ "a": "ok", "b": 4 })));
        assert!(!is_safe_for_tracking(&json!({ "a": "ok", "b": "0901234567" })));
        assert!(is_safe_for_tracking(&json!(12)));
        assert!(is_safe_for_tracking(&json!(["jane@example.com"])));
    }
}
