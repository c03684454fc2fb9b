//! MySQL store: one connection per call via sqlx.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Connection, Row};

use super::{SqlParam, StoreError, UserRow, UserStore};
use crate::config::DatabaseConfig;

/// Store backed by a MySQL server.
pub struct MySqlStore {
    options: MySqlConnectOptions,
    connect_timeout: Duration,
    query_timeout: Duration,
}

impl MySqlStore {
    pub fn new(config: &DatabaseConfig) -> Self {
        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password);
        if !config.name.is_empty() {
            options = options.database(&config.name);
        }

        Self {
            options,
            connect_timeout: config.connect_timeout(),
            query_timeout: config.query_timeout(),
        }
    }

    async fn connect(&self) -> Result<MySqlConnection, StoreError> {
        match tokio::time::timeout(self.connect_timeout, MySqlConnection::connect_with(&self.options)).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(StoreError::Connection(e.to_string())),
            Err(_) => Err(StoreError::Timeout(self.connect_timeout.as_millis() as u64)),
        }
    }

    async fn run(
        &self,
        conn: &mut MySqlConnection,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Vec<MySqlRow>, StoreError> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = match param {
                SqlParam::Int(v) => query.bind(*v),
                SqlParam::Text(s) => query.bind(s.clone()),
            };
        }

        match tokio::time::timeout(self.query_timeout, query.fetch_all(&mut *conn)).await {
            Ok(Ok(rows)) => Ok(rows),
            Ok(Err(e)) => Err(StoreError::Query(e.to_string())),
            Err(_) => Err(StoreError::Timeout(self.query_timeout.as_millis() as u64)),
        }
    }
}

#[async_trait]
impl UserStore for MySqlStore {
    fn backend(&self) -> &'static str {
        "mysql"
    }

    async fn fetch_users(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<UserRow>, StoreError> {
        let mut conn = self.connect().await?;
        let result = self.run(&mut conn, sql, params).await;

        // Release the connection whatever the query outcome was. A connection
        // that was mid-query when the timeout fired is dropped instead.
        if matches!(result, Err(StoreError::Timeout(_))) {
            drop(conn);
        } else if let Err(e) = conn.close().await {
            tracing::warn!("Failed to close MySQL connection cleanly: {}", e);
        }

        result?.iter().map(decode_row).collect()
    }
}

fn decode_row(row: &MySqlRow) -> Result<UserRow, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Decode(e.to_string());

    // DATETIME decodes as naive, TIMESTAMP as UTC.
    let created_at = match row.try_get::<NaiveDateTime, _>(7) {
        Ok(value) => value,
        Err(_) => row.try_get::<DateTime<Utc>, _>(7).map_err(decode)?.naive_utc(),
    };

    // INT UNSIGNED / BIGINT UNSIGNED keys only decode as u64.
    let user_id = match row.try_get::<i64, _>(0) {
        Ok(value) => value,
        Err(_) => unsigned_id(row.try_get::<u64, _>(0).map_err(decode)?)?,
    };

    Ok(UserRow {
        user_id,
        username: row.try_get(1).map_err(decode)?,
        email: row.try_get(2).map_err(decode)?,
        first_name: row.try_get(3).map_err(decode)?,
        last_name: row.try_get(4).map_err(decode)?,
        phone_number: row.try_get(5).map_err(decode)?,
        address: row.try_get(6).map_err(decode)?,
        created_at,
    })
}

fn unsigned_id(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Decode(format!("user_id {} is out of range", value)))
}
