//! Fixtures shared by unit and integration tests.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection};

use crate::store::{SqlParam, StoreError, UserRow, UserStore};

const CREATE_USERS: &str = "CREATE TABLE IF NOT EXISTS Users (
    user_id INTEGER PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT,
    first_name TEXT,
    last_name TEXT,
    phone_number TEXT,
    address TEXT,
    created_at TEXT NOT NULL
)";

fn user(user_id: i64, username: &str, email: &str, first: &str, last: &str, created: (u32, u32)) -> UserRow {
    UserRow {
        user_id,
        username: username.to_string(),
        email: Some(email.to_string()),
        first_name: Some(first.to_string()),
        last_name: Some(last.to_string()),
        phone_number: Some(format!("555-01{:02}", user_id)),
        address: Some(format!("{} Main St", user_id * 10)),
        created_at: NaiveDate::from_ymd_opt(2024, created.0, created.1)
            .and_then(|d| d.and_hms_opt(9, 30, 15))
            .expect("valid fixture date"),
    }
}

/// Five users, including one with a `%` and one with a `'` in the username.
pub fn sample_users() -> Vec<UserRow> {
    let mut with_nulls = user(5, "o'brien", "ob@example.com", "Pat", "O'Brien", (5, 1));
    with_nulls.phone_number = None;
    with_nulls.address = None;

    vec![
        user(1, "alice", "alice@example.com", "Alice", "Anders", (1, 2)),
        user(2, "bob", "bob@example.com", "Bob", "Brown", (2, 3)),
        user(3, "alicia_k", "alicia@example.com", "Alicia", "Kim", (3, 4)),
        user(4, "100%real", "real@example.com", "Real", "Person", (4, 5)),
        with_nulls,
    ]
}

/// Create a SQLite database at `path` holding `users`.
pub fn seed_users(path: &Path, users: &[UserRow]) {
    let conn = Connection::open(path).expect("open fixture database");
    conn.execute(CREATE_USERS, []).expect("create Users table");
    for u in users {
        conn.execute(
            "INSERT INTO Users (user_id, username, email, first_name, last_name, phone_number, address, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                u.user_id,
                u.username,
                u.email,
                u.first_name,
                u.last_name,
                u.phone_number,
                u.address,
                u.created_at,
            ],
        )
        .expect("insert fixture user");
    }
}

/// Store that fails every call with the given error message.
pub struct FailingStore {
    message: String,
}

impl FailingStore {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl UserStore for FailingStore {
    fn backend(&self) -> &'static str {
        "failing"
    }

    async fn fetch_users(&self, _sql: &str, _params: &[SqlParam]) -> Result<Vec<UserRow>, StoreError> {
        Err(StoreError::Connection(self.message.clone()))
    }
}

/// Store that waits out its query timeout and then reports it, like a
/// backend whose server stopped answering.
pub struct SlowStore {
    timeout: Duration,
}

impl SlowStore {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl UserStore for SlowStore {
    fn backend(&self) -> &'static str {
        "slow"
    }

    async fn fetch_users(&self, _sql: &str, _params: &[SqlParam]) -> Result<Vec<UserRow>, StoreError> {
        tokio::time::sleep(self.timeout).await;
        Err(StoreError::Timeout(self.timeout.as_millis() as u64))
    }
}

/// Store that panics, for exercising the panic guard.
pub struct PanickingStore;

#[async_trait]
impl UserStore for PanickingStore {
    fn backend(&self) -> &'static str {
        "panicking"
    }

    async fn fetch_users(&self, _sql: &str, _params: &[SqlParam]) -> Result<Vec<UserRow>, StoreError> {
        panic!("store exploded: password=hunter2")
    }
}
