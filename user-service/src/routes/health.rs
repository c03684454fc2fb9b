//! Liveness endpoint. Never touches the store.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::AppState;

pub const STATUS_MESSAGE: &str = "User service is up";

/// GET / and GET /health
async fn health() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": STATUS_MESSAGE })))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
}
