use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use tower_cookies::Cookies;

use crate::{
    error::Result,
    models::consent::{ConsentCategory, ConsentPatch, ConsentSettings},
    models::consent_mode::ConsentModeCall,
    services::consent_mode::DataLayer,
    state::AppState,
    validation::requests::validate_category,
};

/// The response payload for consent requests.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ConsentResponse {
    pub settings: ConsentSettings,
    /// Tag manager calls the page should replay, in order.
    pub consent_mode: Vec<ConsentModeCall>,
}

/// The response payload for a category query.
#[derive(Serialize, Debug)]
pub struct AllowedResponse {
    pub category: ConsentCategory,
    pub allowed: bool,
}

/// Returns the visitor's consent together with the default-consent signal
/// for the page load.
pub async fn get_consent(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<impl IntoResponse> {
    let data_layer = DataLayer::new();
    let store = state.consent_store(cookies, state.synchronizer(&data_layer));

    let settings = store.read();
    store.synchronizer().initialize_defaults(&store);

    tracing::debug!("🍪 Consent read (consented: {})", settings.has_consented);

    Ok(Json(ConsentResponse {
        settings,
        consent_mode: data_layer.drain(),
    }))
}

/// Handles the banner's "accept all" button.
pub async fn accept_all(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<impl IntoResponse> {
    let data_layer = DataLayer::new();
    let provider = state.consent_provider(cookies, &data_layer);
    let settings = provider.accept_all();

    Ok((
        StatusCode::OK,
        Json(ConsentResponse {
            settings,
            consent_mode: data_layer.drain(),
        }),
    ))
}

/// Handles the banner's "necessary only" button.
pub async fn accept_necessary(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<impl IntoResponse> {
    let data_layer = DataLayer::new();
    let provider = state.consent_provider(cookies, &data_layer);
    let settings = provider.accept_necessary();

    Ok((
        StatusCode::OK,
        Json(ConsentResponse {
            settings,
            consent_mode: data_layer.drain(),
        }),
    ))
}

/// Saves a custom selection from the preferences dialog. Categories absent
/// from the body keep their current value.
pub async fn update_consent(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(patch): Json<ConsentPatch>,
) -> Result<impl IntoResponse> {
    let data_layer = DataLayer::new();
    let provider = state.consent_provider(cookies, &data_layer);
    let settings = provider.update_consent(patch);

    Ok((
        StatusCode::OK,
        Json(ConsentResponse {
            settings,
            consent_mode: data_layer.drain(),
        }),
    ))
}

/// Withdraws the stored decision so the banner is shown again.
pub async fn reset_consent(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<impl IntoResponse> {
    let data_layer = DataLayer::new();
    let provider = state.consent_provider(cookies, &data_layer);
    let settings = provider.reset_consent();

    Ok((
        StatusCode::OK,
        Json(ConsentResponse {
            settings,
            consent_mode: data_layer.drain(),
        }),
    ))
}

/// Answers whether a category may be used for this visitor.
pub async fn is_allowed(
    Extension(settings): Extension<ConsentSettings>,
    Path(category): Path<String>,
) -> Result<impl IntoResponse> {
    let category = validate_category(&category)?;

    Ok(Json(AllowedResponse {
        category,
        allowed: settings.allows(category),
    }))
}
