// Confidant
// Main entry point for the confidant binary

use clap::Parser;
use confidant_engine::cli::{Cli, Command};
use confidant_engine::config::{Config, ConfigSource};
use confidant_engine::handlers::{handle_ask, handle_config, handle_start, OutputFormat};
use confidant_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let (config, source) = if let Some(config_path) = &cli.config {
        let config = Config::load_from_path(config_path)?;
        (config, ConfigSource::Loaded(config_path.clone()))
    } else {
        Config::load_or_create()?
    };

    // --log overrides the configured level; RUST_LOG overrides both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    match &source {
        ConfigSource::Created(path) => {
            tracing::info!("Wrote default configuration to {}", path.display())
        }
        ConfigSource::Loaded(path) => {
            tracing::debug!("Loaded configuration from {}", path.display())
        }
    }

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Confidant v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command() {
        Command::Start => {
            tracing::info!("Starting bot...");
            handle_start(&config).await
        }

        Command::Ask { text, user } => handle_ask(text, user, &config, format).await,

        Command::Config => handle_config(&config, format),
    }
}
