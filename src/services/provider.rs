use tokio::sync::watch;

use crate::models::consent::{ConsentCategory, ConsentPatch, ConsentSettings, ConsentState};
use crate::repositories::consent::ConsentStorage;
use crate::services::consent_store::ConsentStore;

/// Session-scoped consent state.
///
/// Starts `Unknown` until [`hydrate`](Self::hydrate) performs the first read.
/// Every mutation goes through the store's write path and then refreshes
/// the local state; subscribers see each change.
pub struct ConsentProvider<S> {
    store: ConsentStore<S>,
    state: watch::Sender<ConsentState>,
}

impl<S: ConsentStorage> ConsentProvider<S> {
    pub fn new(store: ConsentStore<S>) -> Self {
        let (state, _) = watch::channel(ConsentState::Unknown);
        Self { store, state }
    }

    /// Loads the persisted decision into local state.
    pub fn hydrate(&self) -> ConsentState {
        let state = ConsentState::from(self.store.read());
        self.state.send_replace(state.clone());
        state
    }

    pub fn state(&self) -> ConsentState {
        self.state.borrow().clone()
    }

    pub fn settings(&self) -> ConsentSettings {
        self.state.borrow().settings()
    }

    /// A receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<ConsentState> {
        self.state.subscribe()
    }

    pub fn accept_all(&self) -> ConsentSettings {
        self.commit(ConsentPatch::all())
    }

    pub fn accept_necessary(&self) -> ConsentSettings {
        self.commit(ConsentPatch::necessary_only())
    }

    /// Changes the given categories, keeping the current value of the rest.
    pub fn update_consent(&self, patch: ConsentPatch) -> ConsentSettings {
        let base = match self.state() {
            ConsentState::Decided(record) => ConsentPatch::from_record(&record),
            ConsentState::Unknown | ConsentState::PendingDecision => ConsentPatch::default(),
        };
        self.commit(base.overlay(patch))
    }

    pub fn reset_consent(&self) -> ConsentSettings {
        self.store.reset();
        self.state.send_replace(ConsentState::PendingDecision);
        self.settings()
    }

    pub fn is_allowed(&self, category: ConsentCategory) -> bool {
        self.settings().allows(category)
    }

    fn commit(&self, patch: ConsentPatch) -> ConsentSettings {
        let outcome = self.store.write(&patch);

        let state = if outcome.persisted {
            ConsentState::from(self.store.read())
        } else {
            // Not persisted: the decision lives only as long as this session.
            tracing::warn!("⚠️ Consent kept in memory only");
            ConsentState::Decided(outcome.record)
        };

        self.state.send_replace(state);
        self.settings()
    }
}
