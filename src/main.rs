use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use poster_relay::config::{Args, LogFormat};
use poster_relay::{Config, Relay, Server, relay};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    match args.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(env_filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(env_filter).init(),
    }

    let config = Config::from(&args);
    info!(metadata_url = %config.metadata_url, "starting poster-relay");

    let relay = Arc::new(Relay::new(&config).context("failed to build HTTP client")?);

    let mut server = Server::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;

    if let Some(paths) = &config.tls {
        let tls = paths
            .server_config()
            .with_context(|| format!("failed to load TLS material from {}", paths.cert.display()))?;
        server = server.with_tls(tls);
    }

    server.serve(relay::app(relay)).await?;
    Ok(())
}
