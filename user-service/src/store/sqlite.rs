//! SQLite store: opens the database file read-only for each call.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::types::ToSqlOutput;
use rusqlite::{params_from_iter, Connection, InterruptHandle, OpenFlags, ToSql};

use super::{SqlParam, StoreError, UserRow, UserStore};
use crate::config::DatabaseConfig;

/// Store backed by a local SQLite file.
pub struct SqliteStore {
    path: PathBuf,
    query_timeout: Duration,
}

impl SqliteStore {
    pub fn new(config: &DatabaseConfig) -> Self {
        // Parse sqlite: prefix if present
        let path = config.path.strip_prefix("sqlite:").unwrap_or(&config.path);
        Self {
            path: PathBuf::from(path),
            query_timeout: config.query_timeout(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            SqlParam::Int(v) => Ok(ToSqlOutput::from(*v)),
            SqlParam::Text(s) => Ok(ToSqlOutput::from(s.as_str())),
        }
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn fetch_users(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<UserRow>, StoreError> {
        let path = self.path.clone();
        let timeout = self.query_timeout;
        let sql = sql.to_string();
        let params = params.to_vec();

        let cancel = Arc::new(Cancel::default());
        let worker_cancel = cancel.clone();
        let mut task = tokio::task::spawn_blocking(move || {
            query_blocking(&path, timeout, &sql, &params, &worker_cancel)
        });

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(joined) => joined
                .unwrap_or_else(|e| Err(StoreError::Query(format!("query task failed: {}", e)))),
            Err(_) => {
                cancel.cancel();
                // An interrupted statement fails at its next step, so this
                // returns quickly and the connection is closed before we report.
                if let Err(e) = task.await {
                    tracing::warn!("SQLite query task failed after interrupt: {}", e);
                }
                Err(StoreError::Timeout(timeout.as_millis() as u64))
            }
        }
    }
}

/// Lets the async side stop a statement running on a blocking thread.
#[derive(Default)]
struct Cancel {
    state: Mutex<CancelState>,
}

#[derive(Default)]
struct CancelState {
    cancelled: bool,
    handle: Option<InterruptHandle>,
}

impl Cancel {
    /// Record the connection's interrupt handle. Returns false if the caller
    /// already gave up, in which case the query must not start.
    fn register(&self, handle: InterruptHandle) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.cancelled {
            return false;
        }
        state.handle = Some(handle);
        true
    }

    fn cancel(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.cancelled = true;
        if let Some(handle) = state.handle.take() {
            handle.interrupt();
        }
    }
}

/// Open, query, and close. The statement and connection are dropped on
/// every return path.
fn query_blocking(
    path: &Path,
    timeout: Duration,
    sql: &str,
    params: &[SqlParam],
    cancel: &Cancel,
) -> Result<Vec<UserRow>, StoreError> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| StoreError::Connection(format!("{}: {}", path.display(), e)))?;
    conn.busy_timeout(timeout).map_err(map_error)?;
    if !cancel.register(conn.get_interrupt_handle()) {
        return Err(StoreError::Timeout(timeout.as_millis() as u64));
    }

    let mut stmt = conn.prepare(sql).map_err(map_error)?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            Ok(UserRow {
                user_id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                first_name: row.get(3)?,
                last_name: row.get(4)?,
                phone_number: row.get(5)?,
                address: row.get(6)?,
                created_at: row.get(7)?,
            })
        })
        .map_err(map_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(map_error)?;

    Ok(rows)
}

fn map_error(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::FromSqlConversionFailure(..) | rusqlite::Error::InvalidColumnType(..) => {
            StoreError::Decode(e.to_string())
        }
        other => StoreError::Query(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::USER_COLUMNS;
    use crate::test_util::{seed_users, sample_users};

    fn store_for(path: &Path) -> SqliteStore {
        SqliteStore::new(&DatabaseConfig::sqlite(path.to_string_lossy()))
    }

    #[test]
    fn test_sqlite_prefix_is_stripped() {
        let store = SqliteStore::new(&DatabaseConfig::sqlite("sqlite:/tmp/users.db"));
        assert_eq!(store.path(), Path::new("/tmp/users.db"));
    }

    #[tokio::test]
    async fn test_fetch_all_rows_in_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.db");
        seed_users(&path, &sample_users());

        let rows = store_for(&path)
            .fetch_users(&format!("SELECT {} FROM Users ORDER BY user_id", USER_COLUMNS), &[])
            .await
            .unwrap();

        assert_eq!(rows, sample_users());
    }

    #[tokio::test]
    async fn test_parameters_are_bound() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.db");
        seed_users(&path, &sample_users());

        let rows = store_for(&path)
            .fetch_users(
                &format!("SELECT {} FROM Users WHERE user_id = ?", USER_COLUMNS),
                &[SqlParam::Int(2)],
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].username, "bob");
    }

    #[tokio::test]
    async fn test_missing_file_is_a_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_for(&dir.path().join("absent.db"));

        let err = store
            .fetch_users(&format!("SELECT {} FROM Users", USER_COLUMNS), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Connection(_)));
    }

    // Counts far past anything that can finish within the timeout, and only
    // yields a row once the aggregate is done.
    const SLOW_QUERY: &str = "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n WHERE x < 100000000000)
        SELECT max(x), 'slow', NULL, NULL, NULL, NULL, NULL, '2024-01-01 00:00:00' FROM n";

    #[tokio::test]
    async fn test_slow_query_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.db");
        seed_users(&path, &[]);

        let mut config = DatabaseConfig::sqlite(path.to_string_lossy());
        config.query_timeout_ms = 200;

        let err = SqliteStore::new(&config)
            .fetch_users(SLOW_QUERY, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Timeout(200)));
        assert_eq!(err.to_string(), "Database query timed out after 200ms");
    }

    #[test]
    fn test_timed_out_query_releases_its_thread() {
        // A single blocking thread: the follow-up lookup only gets it back if
        // the slow statement was actually stopped.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .max_blocking_threads(1)
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("users.db");
            seed_users(&path, &sample_users());

            let mut config = DatabaseConfig::sqlite(path.to_string_lossy());
            config.query_timeout_ms = 200;
            let store = SqliteStore::new(&config);

            let started = std::time::Instant::now();
            let err = store.fetch_users(SLOW_QUERY, &[]).await.unwrap_err();
            assert!(matches!(err, StoreError::Timeout(_)));

            let rows = store
                .fetch_users(
                    &format!("SELECT {} FROM Users WHERE user_id = ?", USER_COLUMNS),
                    &[SqlParam::Int(1)],
                )
                .await
                .unwrap();
            assert_eq!(rows.len(), 1);
            assert!(started.elapsed() < Duration::from_secs(5));
        });
    }

    #[test]
    fn test_cancel_before_register_refuses_the_query() {
        let conn = Connection::open_in_memory().unwrap();
        let cancel = Cancel::default();
        cancel.cancel();
        assert!(!cancel.register(conn.get_interrupt_handle()));
    }

    #[tokio::test]
    async fn test_bad_sql_is_a_query_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.db");
        seed_users(&path, &[]);

        let err = store_for(&path)
            .fetch_users("SELECT nope FROM Nowhere", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));
    }
}
