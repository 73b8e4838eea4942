use std::path::PathBuf;

use clap::Parser;
use shardhub::{HubServer, ServerConfig, ShardhubError, init_logging};

/// Coordination hub for sharded world servers.
#[derive(Debug, Parser)]
#[command(name = "shardhub", version, about)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on. Overrides `bind_addr` from the config file.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), ShardhubError> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }

    init_logging(&config.log_filter);
    if let Some(path) = &cli.config {
        tracing::info!(path = %path.display(), "config loaded");
    }

    let server = HubServer::builder().config(config).build().await?;
    tracing::info!(addr = ?server.local_addr(), "listening");

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("ctrl-c received");
        })
        .await
}
