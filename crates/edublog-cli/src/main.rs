//! edublog: terminal client for the edublog platform
//!
//! Usage:
//!   edublog            - Start the interactive session
//!   edublog --memory   - Keep credentials in memory only (no SQLite file)
//!   edublog --help     - Show help

mod cli;

use std::sync::Arc;

use edublog_api::{BlogClient, HttpAuthService};
use edublog_core::{
    Config, CredentialStore, MemoryCredentialStore, SessionManager, SqliteCredentialStore,
};
use tracing_subscriber::EnvFilter;

/// Run mode
enum RunMode {
    /// Interactive REPL backed by the SQLite credential store
    Cli,
    /// Interactive REPL with an in-memory credential store
    CliInMemory,
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args();

    match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("edublog {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting edublog...");
    tracing::info!("Backend: {}", config.api.base_url);

    let store: Arc<dyn CredentialStore> = match mode {
        RunMode::CliInMemory => Arc::new(MemoryCredentialStore::new()),
        _ => Arc::new(
            SqliteCredentialStore::open(&config.session.store_path).map_err(|e| {
                anyhow::anyhow!(
                    "Failed to open credential store {}: {}",
                    config.session.store_path,
                    e
                )
            })?,
        ),
    };

    let auth = HttpAuthService::new(&config.api)
        .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

    let session = Arc::new(SessionManager::new(
        store,
        Arc::new(auth),
        config.session.clone(),
    ));

    let client = BlogClient::new(&config.api, Arc::clone(&session))
        .map_err(|e| anyhow::anyhow!("Failed to create API client: {}", e))?;

    // Startup discards whatever was persisted; runs while the REPL shows the splash
    let startup = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.initialize().await })
    };

    let result = cli::run_cli(session, client).await;

    startup.abort();
    tracing::info!("Shutdown complete");
    result
}

/// Parse command line arguments
fn parse_args() -> RunMode {
    let args: Vec<String> = std::env::args().collect();

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--memory" | "-m" => return RunMode::CliInMemory,
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    RunMode::Cli
}

/// Print help message
fn print_help() {
    println!("edublog - terminal client for the edublog platform");
    println!();
    println!("Usage:");
    println!("  edublog            Start the interactive session");
    println!("  edublog --memory   Keep credentials in memory only");
    println!("  edublog --help     Show this help message");
    println!("  edublog --version  Show version");
    println!();
    println!("Environment Variables:");
    println!("  EDUBLOG_API_BASE_URL     Backend base URL (default: https://backend-techchalenge.vercel.app/api)");
    println!("  EDUBLOG_API_TIMEOUT_MS   Request timeout in ms (default: 10000)");
    println!("  EDUBLOG_SETTLE_DELAY_MS  Startup splash delay in ms (default: 1500)");
    println!("  EDUBLOG_STORE_PATH       Credential store path (default: data/edublog.db)");
    println!("  RUST_LOG                 Log filter (default: info)");
    println!();
    println!("Settings may also be placed in edublog.toml; environment variables take precedence.");
}
