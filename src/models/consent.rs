use std::fmt;
use std::str::FromStr;

use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The current consent schema version. Stored records with any other
/// version are treated as absent.
pub const CONSENT_VERSION: &str = "1.0";
/// The name of the cookie holding the consent record.
pub const CONSENT_COOKIE_NAME: &str = "cookie-consent";
/// How long a consent decision is retained, in days.
pub const CONSENT_MAX_AGE_DAYS: i64 = 365;

/// A bucket of storage/tracking purposes that is granted or denied as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentCategory {
    Necessary,
    Analytics,
    Marketing,
    Functional,
}

impl ConsentCategory {
    pub const ALL: [ConsentCategory; 4] = [
        ConsentCategory::Necessary,
        ConsentCategory::Analytics,
        ConsentCategory::Marketing,
        ConsentCategory::Functional,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConsentCategory::Necessary => "necessary",
            ConsentCategory::Analytics => "analytics",
            ConsentCategory::Marketing => "marketing",
            ConsentCategory::Functional => "functional",
        }
    }
}

impl fmt::Display for ConsentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown consent category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for ConsentCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConsentCategory::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Errors raised while decoding a stored consent record.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The value is not valid percent-encoded UTF-8.
    #[error("Invalid encoding: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// The decoded value is not a consent record.
    #[error("Invalid record: {0}")]
    Json(#[from] sonic_rs::Error),
}

/// The persisted consent preference.
///
/// Wire format: a percent-encoded JSON object with exactly the keys
/// `necessary, analytics, marketing, functional, timestamp, version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    /// Always `true`. Required storage cannot be refused.
    pub necessary: bool,
    pub analytics: bool,
    pub marketing: bool,
    pub functional: bool,
    /// When the decision was made, in epoch milliseconds.
    pub timestamp: i64,
    pub version: String,
}

impl Default for ConsentRecord {
    fn default() -> Self {
        Self {
            necessary: true,
            analytics: false,
            marketing: false,
            functional: false,
            timestamp: 0,
            version: CONSENT_VERSION.to_string(),
        }
    }
}

impl ConsentRecord {
    /// Builds a record by laying `patch` over the defaults and stamping the
    /// current schema version and the given timestamp.
    pub fn from_patch(patch: &ConsentPatch, timestamp: i64) -> Self {
        let defaults = Self::default();
        Self {
            necessary: true,
            analytics: patch.analytics.unwrap_or(defaults.analytics),
            marketing: patch.marketing.unwrap_or(defaults.marketing),
            functional: patch.functional.unwrap_or(defaults.functional),
            timestamp,
            version: CONSENT_VERSION.to_string(),
        }
    }

    /// Returns the stored flag for `category`.
    pub fn granted(&self, category: ConsentCategory) -> bool {
        match category {
            ConsentCategory::Necessary => true,
            ConsentCategory::Analytics => self.analytics,
            ConsentCategory::Marketing => self.marketing,
            ConsentCategory::Functional => self.functional,
        }
    }

    pub fn is_current(&self) -> bool {
        self.version == CONSENT_VERSION
    }

    /// Serializes the record into its percent-encoded cookie value.
    pub fn encode(&self) -> Result<String, sonic_rs::Error> {
        let json = sonic_rs::to_string(self)?;
        Ok(utf8_percent_encode(&json, NON_ALPHANUMERIC).to_string())
    }

    /// Parses a percent-encoded cookie value.
    ///
    /// A stored `necessary: false` is ignored; the returned record always
    /// has `necessary == true`.
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        let json = percent_decode_str(raw).decode_utf8()?;
        let mut record: ConsentRecord = sonic_rs::from_str(&json)?;
        record.necessary = true;
        Ok(record)
    }
}

/// A partial consent decision. Unset fields fall back to whatever the
/// partial is merged over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functional: Option<bool>,
}

impl ConsentPatch {
    /// Grants every optional category.
    pub fn all() -> Self {
        Self {
            analytics: Some(true),
            marketing: Some(true),
            functional: Some(true),
        }
    }

    /// Denies every optional category.
    pub fn necessary_only() -> Self {
        Self {
            analytics: Some(false),
            marketing: Some(false),
            functional: Some(false),
        }
    }

    pub fn from_record(record: &ConsentRecord) -> Self {
        Self {
            analytics: Some(record.analytics),
            marketing: Some(record.marketing),
            functional: Some(record.functional),
        }
    }

    /// Sets a single category. `Necessary` cannot be changed and is ignored.
    pub fn with(mut self, category: ConsentCategory, granted: bool) -> Self {
        match category {
            ConsentCategory::Necessary => {}
            ConsentCategory::Analytics => self.analytics = Some(granted),
            ConsentCategory::Marketing => self.marketing = Some(granted),
            ConsentCategory::Functional => self.functional = Some(granted),
        }
        self
    }

    /// Lays `other` over `self`; fields set in `other` win.
    pub fn overlay(self, other: ConsentPatch) -> Self {
        Self {
            analytics: other.analytics.or(self.analytics),
            marketing: other.marketing.or(self.marketing),
            functional: other.functional.or(self.functional),
        }
    }
}

/// UI-facing view of the consent record. Derived, never persisted.
///
/// Once hydrated, `has_consented == !show_banner`. Before the first read
/// (`ConsentState::Unknown`) both are `false`, so the banner stays hidden
/// until the stored decision is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentSettings {
    pub show_banner: bool,
    pub has_consented: bool,
    pub consent: ConsentRecord,
}

impl ConsentSettings {
    /// Settings for a visitor who has not decided yet.
    pub fn pending() -> Self {
        Self {
            show_banner: true,
            has_consented: false,
            consent: ConsentRecord::default(),
        }
    }

    pub fn decided(consent: ConsentRecord) -> Self {
        Self {
            show_banner: false,
            has_consented: true,
            consent,
        }
    }

    /// `necessary` is always allowed. Everything else requires an explicit
    /// decision that grants it.
    pub fn allows(&self, category: ConsentCategory) -> bool {
        match category {
            ConsentCategory::Necessary => true,
            _ => self.has_consented && self.consent.granted(category),
        }
    }
}

/// Lifecycle of the consent state held by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentState {
    /// Nothing has been read from storage yet.
    Unknown,
    /// No valid record exists; the banner must be shown.
    PendingDecision,
    /// A concrete decision is in effect.
    Decided(ConsentRecord),
}

impl From<ConsentSettings> for ConsentState {
    fn from(settings: ConsentSettings) -> Self {
        if settings.has_consented {
            ConsentState::Decided(settings.consent)
        } else {
            ConsentState::PendingDecision
        }
    }
}

impl ConsentState {
    /// The settings view of this state. While `Unknown` the banner stays
    /// hidden so server and client output agree until the first read.
    pub fn settings(&self) -> ConsentSettings {
        match self {
            ConsentState::Unknown => ConsentSettings {
                show_banner: false,
                has_consented: false,
                consent: ConsentRecord::default(),
            },
            ConsentState::PendingDecision => ConsentSettings::pending(),
            ConsentState::Decided(record) => ConsentSettings::decided(record.clone()),
        }
    }
}
