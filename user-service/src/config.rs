//! Configuration for the user service.

use std::env;
use std::fmt;
use std::time::Duration;

use config::{Config as ConfigLoader, ConfigError, Environment, File, Source};
use serde::Deserialize;

/// Flat environment variables honoured for compatibility with existing
/// deployments, mapped to their configuration keys.
const LEGACY_ENV_VARS: &[(&str, &str)] = &[
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_USER", "database.user"),
    ("DB_PASSWORD", "database.password"),
    ("DB_NAME", "database.name"),
    ("CORS_ORIGIN", "cors.origin"),
];

/// Main configuration structure for the user service.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub docs: DocsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Which relational backend holds the Users table.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Mysql,
    /// Local SQLite file, read-only. Handy for development and tests.
    Sqlite,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Mysql => f.write_str("mysql"),
            StoreBackend::Sqlite => f.write_str("sqlite"),
        }
    }
}

/// Store connection settings.
#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Schema name (MySQL database).
    #[serde(default)]
    pub name: String,
    /// Database file for the sqlite backend.
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_query_timeout")]
    pub query_timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// Config pointing at a SQLite file.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: path.into(),
            ..Self::default()
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            host: default_db_host(),
            port: default_db_port(),
            user: String::new(),
            password: String::new(),
            name: String::new(),
            path: default_db_path(),
            connect_timeout_ms: default_connect_timeout(),
            query_timeout_ms: default_query_timeout(),
        }
    }
}

// Keeps the password out of logs.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("query_timeout_ms", &self.query_timeout_ms)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Allowed origin, or "*" for any.
    #[serde(default = "default_cors_origin")]
    pub origin: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origin: default_cors_origin(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocsConfig {
    #[serde(default = "default_openapi_path")]
    pub openapi_path: String,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            openapi_path: default_openapi_path(),
        }
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8889
}
fn default_db_host() -> String {
    "localhost".to_string()
}
fn default_db_port() -> u16 {
    3306
}
fn default_db_path() -> String {
    "./data/users.db".to_string()
}
fn default_connect_timeout() -> u64 {
    5_000
}
fn default_query_timeout() -> u64 {
    10_000
}
fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_openapi_path() -> String {
    "openapi.yaml".to_string()
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Flat variables `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_NAME`, `CORS_ORIGIN`
    /// 2. Environment variables (USER_SERVICE__SECTION__KEY format)
    /// 3. config.toml file (if present)
    /// 4. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let legacy = LEGACY_ENV_VARS
            .iter()
            .map(|(var, key)| (*key, env::var(var).ok()));
        Self::build(File::with_name("config").required(false), legacy)
    }

    fn build<S, I>(file: S, overrides: I) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
        I: IntoIterator<Item = (&'static str, Option<String>)>,
    {
        let mut builder = ConfigLoader::builder()
            .set_default("api.host", default_host())?
            .set_default("api.port", default_port() as i64)?
            .add_source(file)
            .add_source(
                Environment::with_prefix("USER_SERVICE")
                    .separator("__")
                    .try_parsing(true),
            );

        for (key, value) in overrides {
            builder = builder.set_override_option(key, value)?;
        }

        builder.build()?.try_deserialize()
    }
}
