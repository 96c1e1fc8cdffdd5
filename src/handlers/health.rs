use axum::{Json, response::IntoResponse};
use serde::Serialize;

use crate::error::{AppError, Result};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

pub async fn not_found() -> Result<()> {
    Err(AppError::NotFound)
}
