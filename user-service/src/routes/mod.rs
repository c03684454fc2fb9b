//! HTTP routes.

pub mod docs;
pub mod health;
pub mod users;

use std::sync::Arc;

use axum::Router;

use crate::AppState;

/// Build the service router (without middleware).
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router())
        .merge(users::router())
        .merge(docs::router(&state.config.docs))
        .with_state(state)
}
