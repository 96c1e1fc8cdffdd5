#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Map, Value};
use tower::ServiceExt;
use uuid::Uuid;

use consent_gate::{
    config::Config,
    models::consent::{CONSENT_COOKIE_NAME, ConsentPatch, ConsentRecord},
    router,
    services::telemetry::TelemetrySink,
    state::AppState,
};

/// Captures forwarded telemetry instead of logging it.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<Map<String, Value>>>,
}

impl TelemetrySink for RecordingSink {
    fn emit(&self, _event_id: Uuid, payload: &Map<String, Value>) {
        self.events.lock().unwrap().push(payload.clone());
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub set_cookies: Vec<String>,
    pub body: Value,
}

impl TestResponse {
    /// The `name=value` pair of the consent cookie, ready for a `Cookie` header.
    pub fn consent_cookie(&self) -> Option<String> {
        self.set_cookies
            .iter()
            .find(|c| c.starts_with(&format!("{}=", CONSENT_COOKIE_NAME)))
            .and_then(|c| c.split(';').next())
            .map(str::to_string)
    }
}

pub fn app_with(config: Config) -> (Router, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let state = AppState::with_sink(config, sink.clone());
    (router(state), sink)
}

pub fn app() -> (Router, Arc<RecordingSink>) {
    app_with(Config::default())
}

/// A cookie header value holding `patch` stamped with the current version.
pub fn cookie_for(patch: ConsentPatch) -> String {
    let record = ConsentRecord::from_patch(&patch, 1_700_000_000_000);
    format!("{}={}", CONSENT_COOKIE_NAME, record.encode().unwrap())
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookies = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    TestResponse {
        status,
        set_cookies,
        body,
    }
}
