//! Inventory store server entry point.
//!
//! Loads configuration from the environment (with CLI overrides), connects
//! to PostgreSQL, and serves the authenticated inventory API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use ctrlc::set_handler;
use pico_args::Arguments;
use stockroom::auth::{AuthManager, SessionManager};
use stockroom::db::{Database, PgUserRepository};
use stockroom::inventory::PgItemRepository;
use tracing::info;

use sr_server::api::{self, AppState};
use sr_server::config::ServerConfig;
use sr_server::logging;

const HELP: &str = "\
Run the inventory store server

USAGE:
  sr_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:3000]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND                Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL               PostgreSQL connection string
  PASSWORD_PEPPER            Password hashing pepper (required)
  SESSION_IDLE_TIMEOUT_SECS  Session idle timeout       [default: 600]
  LOCKOUT_THRESHOLD          Failed logins before lock  [default: 5]
  SESSION_COOKIE_SECURE      Secure cookie attribute    [default: true]
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind_override: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let db_url_override: Option<String> = pargs.opt_value_from_str("--db-url")?;

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    logging::init();

    let config = ServerConfig::from_env(bind_override, db_url_override)
        .map_err(|e| anyhow::anyhow!("Configuration error: {e}"))?;

    info!("Starting inventory store server at {}", config.bind);

    let db = Database::new(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {e}"))?;
    db.ensure_schema()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to prepare database schema: {e}"))?;

    info!("Database connected successfully");

    let pool = db.pool().clone();
    let users = Arc::new(PgUserRepository::new(pool.clone()));
    let items = Arc::new(PgItemRepository::new(pool));
    let sessions = Arc::new(SessionManager::with_idle_timeout(
        config.auth.idle_timeout(),
    ));
    let auth = Arc::new(
        AuthManager::new(users, sessions, config.security.password_pepper.clone())
            .with_lockout_threshold(config.auth.lockout_threshold),
    );

    let state = AppState {
        auth,
        items,
        db: Some(db.clone()),
        cookie_secure: config.security.cookie_secure,
    };

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {e}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {e}"))?;

    info!("Shutting down server...");
    db.close().await;

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
}
