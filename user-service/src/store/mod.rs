//! Data access layer for the Users table.
//!
//! The `UserStore` trait hides which relational backend answers a query.
//! Each call opens its own connection, runs exactly one statement with bound
//! parameters, and releases the connection before returning.

mod mysql;
mod sqlite;

pub use mysql::MySqlStore;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::config::{DatabaseConfig, StoreBackend};

/// Column list in the fixed positional order of a User row.
pub const USER_COLUMNS: &str =
    "user_id, username, email, first_name, last_name, phone_number, address, created_at";

/// Escape character used in `LIKE ... ESCAPE` clauses.
pub const LIKE_ESCAPE: char = '!';

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Int(i64),
    Text(String),
}

/// One row of the Users table, in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub user_id: i64,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database connection failed: {0}")]
    Connection(String),
    #[error("Database error: {0}")]
    Query(String),
    #[error("Database query timed out after {0}ms")]
    Timeout(u64),
    #[error("Unexpected column value: {0}")]
    Decode(String),
}

/// Read access to the Users table.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Short backend name for logs (e.g. "mysql").
    fn backend(&self) -> &'static str;

    /// Run a single query and return every matching row.
    ///
    /// `sql` must select [`USER_COLUMNS`] and use `?` placeholders; `params`
    /// are bound in order.
    async fn fetch_users(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<UserRow>, StoreError>;
}

/// Build the store selected by configuration.
pub fn from_config(config: &DatabaseConfig) -> Arc<dyn UserStore> {
    match config.backend {
        StoreBackend::Mysql => Arc::new(MySqlStore::new(config)),
        StoreBackend::Sqlite => Arc::new(SqliteStore::new(config)),
    }
}

/// Turn a username fragment into a `LIKE` pattern that matches it literally
/// anywhere in the value.
pub fn contains_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if c == '%' || c == '_' || c == LIKE_ESCAPE {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
