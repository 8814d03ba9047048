//! Strata demo key-value service.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Instrument};

use strata_config::ConfigLoader;
use strata_demo::{build_router, AppState, Storage};
use strata_server::Server;
use strata_telemetry::{init_logging, service_span};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about = "Key-value service on the Strata pipeline")]
struct Cli {
    /// Configuration file (TOML or JSON).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address, overriding the configuration (e.g. 127.0.0.1:7777).
    #[arg(long)]
    addr: Option<String>,

    /// SQLite database file. Defaults to an in-memory database.
    #[arg(long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new().with_defaults().with_dotenv()?;
    if let Some(path) = &cli.config {
        loader = loader
            .with_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    }
    let mut config = loader.with_env_prefix("STRATA").load()?;
    if let Some(addr) = cli.addr {
        config.server.http_addr = addr;
        config.validate()?;
    }

    let log_config = config.logging.to_log_config();
    init_logging(&log_config)?;
    let span = service_span(&log_config);

    let storage = match &cli.database {
        Some(path) => Storage::open(path)
            .with_context(|| format!("failed to open database {}", path.display()))?,
        None => Storage::open_in_memory().context("failed to open in-memory database")?,
    };

    let router = build_router(Arc::new(AppState::new(storage)), config.codec.settings());
    let server = Server::new(config.server.to_server_config(), router);

    async move {
        info!(
            addr = %config.server.http_addr,
            database = ?cli.database,
            "starting strata-demo"
        );
        server.run().await
    }
    .instrument(span)
    .await?;

    Ok(())
}
