//! User service - read-only HTTP lookups over the Users table.

use std::env;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use user_service::config::{DatabaseConfig, StoreBackend};
use user_service::{app, AppState, Config};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    println!("user-service {}", VERSION);
}

/// Where the store lives, without credentials.
fn store_location(db: &DatabaseConfig) -> String {
    match db.backend {
        StoreBackend::Mysql => format!("{}:{}/{}", db.host, db.port, db.name),
        StoreBackend::Sqlite => db.path.clone(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle --version / -V
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        print_version();
        return Ok(());
    }

    // Load configuration
    let config = Config::load().map_err(|e| {
        format!(
            "Failed to load configuration: {}. \
             Check config.toml or the USER_SERVICE__* / DB_* environment variables.",
            e
        )
    })?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting user-service {}", VERSION);
    tracing::info!(
        "Store backend: {} ({})",
        config.database.backend,
        store_location(&config.database)
    );

    let addr = format!("{}:{}", config.api.host, config.api.port);
    let state = Arc::new(AppState::from_config(config));
    let app = app(state).map_err(|e| format!("Invalid CORS origin: {}", e))?;

    // Start server
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
