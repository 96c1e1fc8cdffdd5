use chrono::{Duration, Utc};

use crate::models::consent::{
    CONSENT_MAX_AGE_DAYS, ConsentCategory, ConsentPatch, ConsentRecord, ConsentSettings,
};
use crate::repositories::consent::ConsentStorage;
use crate::services::consent_mode::ConsentSynchronizer;

/// Where the store runs. Only a `Client` environment can reach the
/// persisted slot; on the `Server` side reads yield the default and writes
/// are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Client,
    Server,
}

/// The result of a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// The record as stamped and (if `persisted`) stored.
    pub record: ConsentRecord,
    /// Whether the storage backend accepted the record.
    pub persisted: bool,
}

/// Single-writer access to the persisted consent record.
///
/// No operation returns an error. Storage failures are logged and degrade
/// to the most restrictive state.
pub struct ConsentStore<S> {
    storage: S,
    synchronizer: ConsentSynchronizer,
    environment: Environment,
    max_age: Duration,
}

impl<S: ConsentStorage> ConsentStore<S> {
    /// Creates a new `ConsentStore` with the default retention window.
    ///
    /// # Arguments
    ///
    /// * `storage` - The persistence backend.
    /// * `synchronizer` - Notified after every successful write.
    /// * `environment` - Whether the persisted slot is reachable.
    pub fn new(storage: S, synchronizer: ConsentSynchronizer, environment: Environment) -> Self {
        Self {
            storage,
            synchronizer,
            environment,
            max_age: Duration::days(CONSENT_MAX_AGE_DAYS),
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn synchronizer(&self) -> &ConsentSynchronizer {
        &self.synchronizer
    }

    /// Reads the persisted record. Absent, unparsable and outdated records
    /// all yield the pending default.
    pub fn read(&self) -> ConsentSettings {
        match self.stored_record() {
            Some(record) => ConsentSettings::decided(record),
            None => ConsentSettings::pending(),
        }
    }

    /// Merges `patch` over the defaults, stamps it and persists it. The
    /// synchronizer is pushed only when the backend accepted the record.
    pub fn write(&self, patch: &ConsentPatch) -> WriteOutcome {
        let record = ConsentRecord::from_patch(patch, Utc::now().timestamp_millis());

        if self.environment == Environment::Server {
            tracing::debug!("Consent write skipped outside a client environment");
            return WriteOutcome {
                record,
                persisted: false,
            };
        }

        let encoded = match record.encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!("⚠️ Failed to encode consent record: {}", e);
                return WriteOutcome {
                    record,
                    persisted: false,
                };
            }
        };

        if let Err(e) = self.storage.set(&encoded, self.max_age) {
            tracing::warn!("⚠️ Failed to persist consent: {}", e);
            return WriteOutcome {
                record,
                persisted: false,
            };
        }

        tracing::info!(
            "✅ Consent saved: analytics={} marketing={} functional={}",
            record.analytics,
            record.marketing,
            record.functional
        );
        self.synchronizer.push(&record);

        WriteOutcome {
            record,
            persisted: true,
        }
    }

    /// Removes the persisted record, returning to the pre-consent state.
    pub fn reset(&self) {
        if self.environment == Environment::Server {
            tracing::debug!("Consent reset skipped outside a client environment");
            return;
        }

        match self.storage.clear() {
            Ok(()) => tracing::info!("🗑️ Consent reset"),
            Err(e) => tracing::warn!("⚠️ Failed to clear consent: {}", e),
        }
    }

    pub fn is_allowed(&self, category: ConsentCategory) -> bool {
        self.read().allows(category)
    }

    fn stored_record(&self) -> Option<ConsentRecord> {
        if self.environment == Environment::Server {
            return None;
        }

        let raw = match self.storage.get() {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("⚠️ Failed to read consent: {}", e);
                return None;
            }
        };

        let record = match ConsentRecord::decode(&raw) {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!("Ignoring unreadable consent record: {}", e);
                return None;
            }
        };

        if !record.is_current() {
            tracing::debug!("Ignoring consent record with version {}", record.version);
            return None;
        }

        Some(record)
    }
}
