use std::time::Duration;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use http::{HeaderValue, Method, header};
use tower_cookies::CookieManagerLayer;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

pub mod config;
pub mod error;
pub mod state;

pub mod models {
    pub mod consent;
    pub mod consent_mode;
    pub mod telemetry;
}

pub mod repositories {
    pub mod consent;
}

pub mod services {
    pub mod consent_mode;
    pub mod consent_store;
    pub mod provider;
    pub mod sanitizer;
    pub mod telemetry;
}

pub mod handlers {
    pub mod consent;
    pub mod health;
    pub mod telemetry;
}

pub mod middleware_layer {
    pub mod consent;
}

pub mod validation {
    pub mod requests;
}

use state::AppState;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("⚠️ Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::COOKIE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86400));

    let consent_routes = Router::new()
        .route(
            "/api/consent",
            get(handlers::consent::get_consent)
                .put(handlers::consent::update_consent)
                .delete(handlers::consent::reset_consent),
        )
        .route(
            "/api/consent/accept-all",
            post(handlers::consent::accept_all),
        )
        .route(
            "/api/consent/accept-necessary",
            post(handlers::consent::accept_necessary),
        )
        .with_state(state.clone());

    let consent_aware_routes = Router::new()
        .route(
            "/api/consent/allowed/{category}",
            get(handlers::consent::is_allowed),
        )
        .route(
            "/api/telemetry/events",
            post(handlers::telemetry::ingest_event),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::consent::load_consent,
        ))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(handlers::health::health))
        .merge(consent_routes)
        .merge(consent_aware_routes)
        .fallback(handlers::health::not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(CookieManagerLayer::new())
        .layer(cors)
}
