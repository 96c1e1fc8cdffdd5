use std::sync::Arc;

use tower_cookies::Cookies;

use crate::config::Config;
use crate::repositories::consent::CookieStorage;
use crate::services::consent_mode::{ConsentSynchronizer, DataLayer};
use crate::services::consent_store::{ConsentStore, Environment};
use crate::services::provider::ConsentProvider;
use crate::services::telemetry::{TelemetrySink, TracingSink};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Config,
    /// Where sanitized telemetry events are sent.
    pub telemetry: Arc<dyn TelemetrySink>,
}

impl AppState {
    /// Creates a new `AppState` that logs telemetry through `tracing`.
    pub fn new(config: Config) -> Self {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    pub fn with_sink(config: Config, telemetry: Arc<dyn TelemetrySink>) -> Self {
        tracing::info!(
            "✅ Consent cookie '{}' ({} days, secure: {})",
            config.consent_cookie_name,
            config.consent_max_age_days,
            config.secure_cookies
        );
        Self { config, telemetry }
    }

    /// A synchronizer that records consent-mode calls into `data_layer`, or
    /// a detached one when consent mode is disabled.
    pub fn synchronizer(&self, data_layer: &DataLayer) -> ConsentSynchronizer {
        if self.config.consent_mode_enabled {
            ConsentSynchronizer::new(Arc::new(data_layer.clone()))
        } else {
            ConsentSynchronizer::detached()
        }
    }

    /// A consent store over the request's cookie jar.
    pub fn consent_store(
        &self,
        cookies: Cookies,
        synchronizer: ConsentSynchronizer,
    ) -> ConsentStore<CookieStorage> {
        let storage = CookieStorage::new(
            cookies,
            self.config.consent_cookie_name.clone(),
            self.config.secure_cookies,
        );
        ConsentStore::new(storage, synchronizer, Environment::Client)
            .with_max_age(self.config.consent_max_age())
    }

    /// A hydrated provider for one request.
    pub fn consent_provider(
        &self,
        cookies: Cookies,
        data_layer: &DataLayer,
    ) -> ConsentProvider<CookieStorage> {
        let store = self.consent_store(cookies, self.synchronizer(data_layer));
        let provider = ConsentProvider::new(store);
        provider.hydrate();
        provider
    }
}
