//! prodcat - product catalog HTTP API
//!
//! Loads `.env` and config.toml, then serves the catalog routes over a
//! self-healing MySQL connection.
//!
//! Usage:
//!   prodcat                          # listen on 127.0.0.1:3000
//!   prodcat --host 0.0.0.0 -p 8080   # custom bind address
//!   RUST_LOG=prodcat_server=debug prodcat   # fine-grained log control

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use prodcat_core::{load_dotenv, DbConfig};
use prodcat_server::ServerConfig;

#[derive(Debug, Parser)]
#[command(name = "prodcat", about = "Product catalog HTTP API", version)]
struct Cli {
    /// Address to bind the HTTP listener to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Allow requests from any origin instead of localhost only
    #[arg(long)]
    cors_permissive: bool,

    /// Enable debug logging (unless RUST_LOG is already set)
    #[arg(long)]
    debug: bool,
}

fn init_tracing(debug: bool) -> Result<()> {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(debug)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.debug)?;
    load_dotenv();

    let db_config = DbConfig::load().context("failed to load database configuration")?;
    info!(
        host = %db_config.host,
        port = db_config.port,
        database = %db_config.database,
        "database configuration loaded"
    );

    let config = ServerConfig {
        host: cli.host,
        port: cli.port,
        cors_permissive: cli.cors_permissive,
    };

    prodcat_server::serve(config, &db_config)
        .await
        .context("server error")?;

    Ok(())
}
