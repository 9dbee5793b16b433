use anyhow::Result;
use clap::Parser;
use post_generator::config::Config;
use post_generator::config_validator::ConfigValidator;
use post_generator::server::Server;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "post-generator")]
#[command(about = "Generates LinkedIn posts behind a rate-limited HTTP API")]
struct Cli {
    /// Port to listen on, overriding PORT
    #[arg(short, long)]
    port: Option<u16>,

    /// Env file to load instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load environment variables from .env file
    match &cli.env_file {
        Some(path) => {
            dotenv::from_path(path)
                .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", path.display(), e))?;
        }
        None => {
            dotenv::dotenv().ok();
        }
    }

    // Load configuration from environment; a missing provider key stops here
    let mut config = Config::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    if let Some(port) = cli.port {
        config = config.with_port(port);
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("post_generator={},tower_http=debug", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    ConfigValidator::validate(&config)
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    tracing::info!("Starting post generator service");
    tracing::info!(
        "Configuration: port={}, environment={}, model={}, trust_proxy_hops={}, allowed_origins={:?}",
        config.port,
        config.environment,
        config.openai_model,
        config.trust_proxy_hops,
        config.allowed_origins
    );

    // Create and run the server
    let server = Server::new(config)
        .map_err(|e| anyhow::anyhow!("Failed to create server: {}", e))?;

    server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
