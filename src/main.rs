//! Bucketdex server
//!
//! Loads configuration, the bucket tables and the catalog, then serves the
//! HTTP API until Ctrl+C or SIGTERM.
//!
//! Run with: cargo run --bin bucketdex -- --config bucketdex.toml

use anyhow::Context;
use bucketdex::api::{serve, ApiConfig, AppState};
use bucketdex::config::{generate_default_config, Config};
use bucketdex::service::IndexService;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "bucketdex")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Document store with bucketed secondary indexes")]
struct Cli {
    /// Config file (default: search the standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print a commented default config and exit
    #[arg(long)]
    print_config: bool,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", generate_default_config());
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::load_default(),
    };
    if let Some(port) = cli.port {
        config.api.port = port;
    }
    config.validate()?;
    config.logging.init()?;

    tracing::info!("Starting Bucketdex v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        artifact_dir = %config.buckets.artifact_dir,
        page_size = config.indexing.page_size,
        "Loading bucket tables"
    );

    let service = IndexService::from_config(&config)
        .await
        .context("initializing index service")?;

    let api_config = ApiConfig::from(&config.api);
    let state = AppState::new(Arc::new(service), api_config.clone());
    serve(state, &api_config).await?;

    tracing::info!("Bucketdex stopped");
    Ok(())
}
