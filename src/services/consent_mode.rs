use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::models::consent::ConsentRecord;
use crate::models::consent_mode::{ConsentCommand, ConsentModeCall, ConsentModeState};
use crate::repositories::consent::ConsentStorage;
use crate::services::consent_store::ConsentStore;

/// The tag manager's global consent function.
pub trait ConsentModeApi: Send + Sync {
    fn consent(&self, command: ConsentCommand, state: &ConsentModeState);
}

/// Buffers consent-mode calls so they can be handed to the page and
/// replayed against the real tag manager.
#[derive(Clone, Default)]
pub struct DataLayer {
    calls: Arc<Mutex<Vec<ConsentModeCall>>>,
}

impl DataLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns every buffered call.
    pub fn drain(&self) -> Vec<ConsentModeCall> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ConsentModeCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConsentModeApi for DataLayer {
    fn consent(&self, command: ConsentCommand, state: &ConsentModeState) {
        self.lock().push(ConsentModeCall {
            command,
            state: *state,
        });
    }
}

/// Pushes consent decisions to the tag manager, when one is present.
#[derive(Clone, Default)]
pub struct ConsentSynchronizer {
    api: Option<Arc<dyn ConsentModeApi>>,
}

impl ConsentSynchronizer {
    pub fn new(api: Arc<dyn ConsentModeApi>) -> Self {
        Self { api: Some(api) }
    }

    /// A synchronizer for an environment without a tag manager. Every call
    /// is a no-op.
    pub fn detached() -> Self {
        Self { api: None }
    }

    pub fn is_attached(&self) -> bool {
        self.api.is_some()
    }

    /// Signals the visitor's latest decision.
    pub fn push(&self, record: &ConsentRecord) {
        let Some(api) = &self.api else {
            return;
        };

        let state = ConsentModeState::from_record(record);
        api.consent(ConsentCommand::Update, &state);
        tracing::debug!(
            "📡 Consent mode update: ad={:?} analytics={:?} functional={:?}",
            state.ad_storage,
            state.analytics_storage,
            state.functional_storage
        );
    }

    /// Issues the initial default-consent signal from whatever is currently
    /// persisted. Called once per page load.
    pub fn initialize_defaults<S: ConsentStorage>(&self, store: &ConsentStore<S>) {
        let Some(api) = &self.api else {
            return;
        };

        let settings = store.read();
        let state = ConsentModeState::from_record(&settings.consent).with_security_granted();
        api.consent(ConsentCommand::Default, &state);
        tracing::debug!(
            "📡 Consent mode defaults issued (consented: {})",
            settings.has_consented
        );
    }
}
