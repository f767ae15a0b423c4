//! Health check endpoint

use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    classifier: bool,
    language_model: bool,
}

/// GET /health - Report which models were loaded at startup
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        classifier: state.classifier.is_some(),
        language_model: state.generator.is_some(),
    })
}
