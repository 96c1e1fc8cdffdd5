use serde::ser::{Serialize, SerializeTuple, Serializer};

use crate::models::consent::{ConsentCategory, ConsentRecord};

/// Whether the tag manager should treat the values as defaults or as a
/// change made by the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentCommand {
    Default,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentSignal {
    Granted,
    Denied,
}

impl From<bool> for ConsentSignal {
    fn from(granted: bool) -> Self {
        if granted {
            ConsentSignal::Granted
        } else {
            ConsentSignal::Denied
        }
    }
}

/// The tag manager's consent vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ConsentModeState {
    pub ad_storage: ConsentSignal,
    pub analytics_storage: ConsentSignal,
    pub functional_storage: ConsentSignal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_storage: Option<ConsentSignal>,
}

impl ConsentModeState {
    pub fn from_record(record: &ConsentRecord) -> Self {
        Self {
            ad_storage: record.granted(ConsentCategory::Marketing).into(),
            analytics_storage: record.granted(ConsentCategory::Analytics).into(),
            functional_storage: record.granted(ConsentCategory::Functional).into(),
            security_storage: None,
        }
    }

    /// Security storage is never subject to visitor consent.
    pub fn with_security_granted(mut self) -> Self {
        self.security_storage = Some(ConsentSignal::Granted);
        self
    }
}

/// One call to the tag manager's global function.
///
/// Serializes as the argument list `["consent", <command>, <state>]` so a
/// page can replay it verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsentModeCall {
    pub command: ConsentCommand,
    pub state: ConsentModeState,
}

impl Serialize for ConsentModeCall {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element("consent")?;
        tuple.serialize_element(&self.command)?;
        tuple.serialize_element(&self.state)?;
        tuple.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::consent::ConsentPatch;
    use serde_json::json;

    #[test]
    fn test_mapping_for_every_combination() {
        for bits in 0u8..8 {
            let (analytics, marketing, functional) = (bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
            let patch = ConsentPatch {
                analytics: Some(analytics),
                marketing: Some(marketing),
                functional: Some(functional),
            };
            let state = ConsentModeState::from_record(&ConsentRecord::from_patch(&patch, 0));

            assert_eq!(state.analytics_storage, ConsentSignal::from(analytics));
            assert_eq!(state.ad_storage, ConsentSignal::from(marketing));
            assert_eq!(state.functional_storage, ConsentSignal::from(functional));
            assert_eq!(state.security_storage, None);
        }
    }

    #[test]
    fn test_call_serializes_as_argument_list() {
        let call = ConsentModeCall {
            command: ConsentCommand::Default,
            state: ConsentModeState::from_record(&ConsentRecord::default()).with_security_granted(),
        };

        assert_eq!(
            serde_json::to_value(call).unwrap(),
            json!([
                "consent",
                "default",
                {
                    "ad_storage": "denied",
                    "analytics_storage": "denied",
                    "functional_storage": "denied",
                    "security_storage": "granted"
                }
            ])
        );
    }
}
