//! Credential Checker - breached credential lookup service
//!
//! Serves exact and substring lookups of passwords and usernames against a
//! read-only SQLite corpus built from plain-text wordlists.

use cred_checker::{api, core, db};

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (handles CLI args, env vars, and config file)
    let (config, args) = match core::config::Config::load() {
        Ok(loaded) => loaded,
        Err(e) => {
            // Print error to stderr since logging isn't initialized yet
            eprintln!("Failed to load configuration: {}", e);
            return Err(core::error::CheckerError::from(e).into());
        }
    };

    // Initialize logging system based on configuration
    let _logger = match core::Logger::init(&config.logging) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return Err(e);
        }
    };

    info!("Configuration loaded successfully");
    info!("Starting Credential Checker v{}", env!("CARGO_PKG_VERSION"));
    info!(
        path = ?config.database.path,
        data_dir = ?config.data.data_dir,
        "Database configuration"
    );

    if args.setup {
        run_setup(&config)?;
        info!("Setup finished, exiting");
        return Ok(());
    }

    // Build the store on first start; a failed build only leaves the store
    // unavailable, the server still starts and reports 503 on lookups
    if !config.database.path.exists() && config.data.setup_on_start {
        info!("Database not found, building it from wordlists...");
        if let Err(e) = run_setup(&config) {
            warn!("Database setup failed: {:#}", e);
        }
    }

    let store: Arc<dyn db::CredentialStore> = match open_store(&config) {
        Ok(repo) => Arc::new(repo),
        Err(e) => {
            warn!("Credential store unavailable: {}", e);
            Arc::new(db::UnavailableStore::new(e.to_string()))
        }
    };

    info!("Initializing HTTP server...");
    let server_url = format!("http://{}:{}", config.server.host, config.server.port);
    let server = api::ApiServer::new(&config, store);

    info!(url = %server_url, "Server ready - starting to serve requests");

    // Start serving (this will block until shutdown signal)
    server.serve().await?;

    Ok(())
}

fn run_setup(config: &core::Config) -> Result<()> {
    let report = db::setup_database(
        &config.database.path,
        &config.data.passwords_dir(),
        &config.data.usernames_dir(),
    )
    .context("Failed to build credential database")?;

    info!(
        files = report.files.len(),
        total_passwords = report.total_passwords,
        total_usernames = report.total_usernames,
        lossy_lines = report.files.iter().map(|f| f.lossy_lines).sum::<usize>(),
        "Credential database built"
    );
    Ok(())
}

fn open_store(config: &core::Config) -> core::Result<db::CredentialRepository> {
    let settings = db::PoolSettings {
        pool_size: u32::try_from(config.database.connection_pool_size).unwrap_or(u32::MAX),
        busy_timeout: Duration::from_millis(config.database.busy_timeout),
        acquire_timeout: Duration::from_millis(config.database.acquire_timeout),
        query_timeout: Duration::from_millis(config.database.query_timeout),
    };

    let manager = db::DatabaseManager::open_read_only(&config.database.path, settings)?;
    info!(pool_size = manager.pool_size(), "Credential store opened read-only");

    Ok(db::CredentialRepository::new(Arc::new(manager)))
}
