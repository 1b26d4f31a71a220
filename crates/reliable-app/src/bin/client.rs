//! Toy HTTP client over the reliable datagram transport.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reliable_transport::TransportConfig;
use tracing_subscriber::EnvFilter;

use reliable_app::HttpClient;

/// Issues a single request against a `reliable-httpd` server.
#[derive(Parser, Debug)]
#[command(name = "reliable-http-client", about = "Reliable-transport HTTP client")]
struct Cli {
    /// Local address to bind.
    #[arg(long, default_value = "127.0.0.1:0")]
    local_addr: SocketAddr,

    /// Server address to connect to.
    #[arg(long, default_value = "127.0.0.1:9000")]
    server_addr: SocketAddr,

    /// Optional TOML file with transport tuning; CLI flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Receive timeout in seconds, overrides the config file.
    #[arg(long)]
    timeout_secs: Option<f64>,

    /// Simulated drop probability in [0, 1], applied to this client's sends.
    #[arg(long, default_value_t = 0.0)]
    loss_prob: f64,

    /// Simulated corruption probability in [0, 1], applied to this client's sends.
    #[arg(long, default_value_t = 0.0)]
    corrupt_prob: f64,

    #[command(subcommand)]
    request: RequestCommand,
}

#[derive(Subcommand, Debug)]
enum RequestCommand {
    Get { path: String },
    Post { path: String, body: String },
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

    let http_client = HttpClient::new(cli.local_addr, cli.server_addr, config)
        .with_simulation(cli.loss_prob, cli.corrupt_prob);

    let response = match cli.request {
        RequestCommand::Get { path } => http_client.get(&path)?,
        RequestCommand::Post { path, body } => http_client.post(&path, &body)?,
    };

    println!("{response}");
    Ok(())
}
