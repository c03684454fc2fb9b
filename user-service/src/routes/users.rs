//! User lookup endpoints.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::{routing::get, Json, Router};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::user::{Link, UsersResponse, SEARCH_USER_BY_ID_PATH, SEARCH_USER_PATH};
use crate::store::{contains_pattern, SqlParam, LIKE_ESCAPE, USER_COLUMNS};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchUserParams {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchUserByIdParams {
    #[serde(default)]
    pub user_id: Option<String>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(SEARCH_USER_PATH, get(search_user))
        .route(SEARCH_USER_BY_ID_PATH, get(search_user_by_id))
}

fn select_all() -> String {
    format!("SELECT {} FROM Users ORDER BY user_id", USER_COLUMNS)
}

fn select_by_username_fragment() -> String {
    format!(
        "SELECT {} FROM Users WHERE username LIKE ? ESCAPE '{}' ORDER BY user_id",
        USER_COLUMNS, LIKE_ESCAPE
    )
}

fn select_by_id() -> String {
    format!("SELECT {} FROM Users WHERE user_id = ?", USER_COLUMNS)
}

/// GET /search_user - list users, optionally filtered by a username substring.
async fn search_user(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<SearchUserParams>, QueryRejection>,
) -> Result<Json<UsersResponse>> {
    let Query(params) = query?;
    let fragment = params.username.filter(|u| !u.is_empty());

    let (sql, binds) = match fragment.as_deref() {
        Some(fragment) => (
            select_by_username_fragment(),
            vec![SqlParam::Text(contains_pattern(fragment))],
        ),
        None => (select_all(), Vec::new()),
    };

    tracing::debug!(backend = state.store.backend(), filtered = fragment.is_some(), "Searching users");
    let rows = state.store.fetch_users(&sql, &binds).await?;

    Ok(Json(UsersResponse::new(
        rows,
        Link::username_search(fragment.as_deref()),
    )))
}

/// GET /search_user_by_id - fetch the user with an exact identifier.
async fn search_user_by_id(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<SearchUserByIdParams>, QueryRejection>,
) -> Result<Json<UsersResponse>> {
    let Query(params) = query?;
    let user_id = parse_user_id(params.user_id.as_deref())?;

    tracing::debug!(backend = state.store.backend(), user_id, "Fetching user by id");
    let rows = state
        .store
        .fetch_users(&select_by_id(), &[SqlParam::Int(user_id)])
        .await?;

    Ok(Json(UsersResponse::new(rows, Link::user_by_id(user_id))))
}

fn parse_user_id(raw: Option<&str>) -> Result<i64> {
    let raw = raw
        .filter(|v| !v.is_empty())
        .ok_or(Error::MissingParameter("user_id"))?;

    raw.trim().parse().map_err(|_| Error::InvalidParameter {
        name: "user_id",
        expected: "an integer",
    })
}
