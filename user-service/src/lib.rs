pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod store;
pub mod test_util;

pub use config::Config;
pub use error::Error;
pub use models::user::{Link, UserResource, UsersResponse};
pub use store::{MySqlStore, SqlParam, SqliteStore, StoreError, UserRow, UserStore};

use std::any::Any;
use std::sync::Arc;

use axum::http::header::InvalidHeaderValue;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{middleware, Json, Router};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CorsConfig;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn UserStore>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn UserStore>) -> Self {
        Self { config, store }
    }

    /// State with the store selected by `config.database`.
    pub fn from_config(config: Config) -> Self {
        let store = store::from_config(&config.database);
        Self::new(config, store)
    }
}

/// Build the full application: routes plus CORS, panic guard and request logging.
pub fn app(state: Arc<AppState>) -> Result<Router, InvalidHeaderValue> {
    let cors = cors_layer(&state.config.cors)?;

    Ok(routes::router(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(logging::request_logger)))
}

fn cors_layer(config: &CorsConfig) -> Result<CorsLayer, InvalidHeaderValue> {
    let layer = CorsLayer::new().allow_methods([Method::GET, Method::POST]);
    if config.origin == "*" {
        Ok(layer.allow_origin(AnyOrigin))
    } else {
        Ok(layer.allow_origin(config.origin.parse::<HeaderValue>()?))
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("Handler panicked: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}
