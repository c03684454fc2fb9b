//! Serves the OpenAPI document describing this service.

use std::sync::Arc;

use axum::Router;
use tower_http::services::ServeFile;

use crate::config::DocsConfig;
use crate::AppState;

pub fn router(config: &DocsConfig) -> Router<Arc<AppState>> {
    Router::new().route_service("/openapi.yaml", ServeFile::new(&config.openapi_path))
}
