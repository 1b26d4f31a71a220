//! Toy HTTP server over the reliable datagram transport.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use reliable_transport::TransportConfig;
use tracing_subscriber::EnvFilter;

use reliable_app::HttpServer;

/// Serves the toy HTTP routing table over a reliable UDP transport.
#[derive(Parser, Debug)]
#[command(name = "reliable-httpd", about = "Reliable-transport HTTP server")]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:9000")]
    listen_addr: SocketAddr,

    /// Optional TOML file with transport tuning; CLI flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Receive timeout in seconds, overrides the config file.
    #[arg(long)]
    timeout_secs: Option<f64>,

    /// Max data-send retries, overrides the config file.
    #[arg(long)]
    max_retries: Option<u32>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            TransportConfig::from_toml_str(&text)?
        }
        None => TransportConfig::default(),
    };
    if let Some(secs) = cli.timeout_secs {
        config.timeout = std::time::Duration::from_secs_f64(secs);
    }
    if let Some(retries) = cli.max_retries {
        config.max_retries = retries;
    }

    tracing::info!(listen_addr = %cli.listen_addr, "reliable-httpd starting");

    let server = HttpServer::new(cli.listen_addr, config);
    loop {
        match server.serve_one() {
            Ok(()) => tracing::info!("connection served to completion"),
            Err(e) => tracing::warn!(error = %e, "connection ended with an error"),
        }
    }
}
