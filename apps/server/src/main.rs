//! Pulselink server
//!
//! Loads configuration from the environment (and `.env`), opens the
//! encrypted credential store and serves the gateway until Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use pulselink_core::branding;
use pulselink_gateway::{DependenciesBuilder, GatewayServer, PulselinkConfig};
use pulselink_storage::{Database, FieldEncryptor, MasterKeyProvider, StaticKeyProvider};
use tokio::sync::Mutex;
use tracing::{error, info};

/// Get the logs directory path (under the local data directory)
fn get_logs_dir() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(branding::IDENTIFIER)
        .join("logs")
}

/// Initialize tracing with console and file logging
///
/// - Console: colored, compact format
/// - File: daily rotation in the local data directory
fn init_tracing() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let logs_dir = get_logs_dir();
    if let Err(e) = std::fs::create_dir_all(&logs_dir) {
        eprintln!("Warning: Failed to create logs directory: {}", e);
    }

    // Creates files like: pulselink.2026-01-22.log
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(branding::LOG_PREFIX)
        .filename_suffix("log")
        .build(&logs_dir)
        .context("Failed to create log file appender")?;
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    // RUST_LOG takes precedence
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(
            "info,pulselink_core=debug,pulselink_storage=debug,pulselink_gateway=debug,pulselink=debug",
        )?,
    };

    let console_layer = fmt::layer()
        .with_ansi(true)
        .compact()
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    // Must be kept alive for the duration of the program
    Ok(guard)
}

/// Field encryptor keyed by the hex master key from the environment.
fn build_encryptor(master_key_hex: &str) -> Result<Arc<FieldEncryptor>> {
    let key_provider = StaticKeyProvider::from_hex(master_key_hex)?;
    let master_key = key_provider.master_key()?;
    Ok(Arc::new(FieldEncryptor::new(&master_key)?))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for development)
    dotenvy::dotenv().ok();

    let _guard = init_tracing()?;
    info!("{} v{} starting", branding::DISPLAY_NAME, env!("CARGO_PKG_VERSION"));

    let config = PulselinkConfig::from_env()?;

    let master_key_hex = config.master_key.as_ref().with_context(|| {
        format!(
            "{} is required (64 hex characters)",
            branding::env_var("MASTER_KEY")
        )
    })?;
    let encryptor = build_encryptor(master_key_hex)?;

    let db_path = match &config.database_path {
        Some(path) => path.clone(),
        None => pulselink_storage::default_database_path()
            .context("No data directory available; set the database path explicitly")?,
    };
    let db = Arc::new(Mutex::new(Database::open(&db_path)?));
    info!("Database: {}", db_path.display());

    let dependencies = DependenciesBuilder::from_config(&config)
        .with_database(db, encryptor)
        .build()
        .map_err(anyhow::Error::msg)?;

    GatewayServer::new(config.gateway.clone(), dependencies)
        .run_until(shutdown_signal())
        .await
}
