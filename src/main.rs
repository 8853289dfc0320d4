use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use gestor::file::{build_object_store, FileSettings};
use gestor::{AppState, Config, Database, WebServer};

/// Config file path: first argument, else `GESTOR_CONFIG`, else `config.toml`.
fn config_path() -> String {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("GESTOR_CONFIG").ok())
        .unwrap_or_else(|| "config.toml".to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let path = config_path();

    // Load configuration
    let mut config = match Config::load(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {path}: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    // Initialize logging
    if let Err(e) = gestor::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        gestor::logging::init_console_only(&config.logging.level);
    }

    info!("gestor {}", env!("CARGO_PKG_VERSION"));

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> gestor::Result<()> {
    config.validate()?;

    let db = Database::open(&config.database.url, config.database.max_connections).await?;
    let objects = build_object_store(&config.storage).await?;

    let state = AppState::new(Arc::new(db), objects)
        .with_file_settings(FileSettings::from_config(&config.storage));

    info!(
        "Server configured on {}:{}",
        config.server.host, config.server.port
    );

    WebServer::new(&config.server, state)?.run().await
}
