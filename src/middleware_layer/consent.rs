use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use crate::{services::consent_mode::ConsentSynchronizer, state::AppState};

/// A middleware that reads the visitor's consent once and makes it
/// available to handlers as an `Extension<ConsentSettings>`.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `cookies` - The request cookies.
/// * `request` - The incoming request.
/// * `next` - The next middleware in the chain.
pub async fn load_consent(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let store = state.consent_store(cookies, ConsentSynchronizer::detached());
    let settings = store.read();

    tracing::debug!(
        "🍪 Consent loaded (consented: {}, analytics: {})",
        settings.has_consented,
        settings.consent.analytics
    );

    request.extensions_mut().insert(settings);
    next.run(request).await
}
