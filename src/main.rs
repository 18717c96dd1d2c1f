use clap::Parser;
use log::{error, info};
use mock_upstream::*;
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, conflicts_with = "profile")]
    config: Option<PathBuf>,

    /// Built-in upstream profile to run (repeatable)
    #[arg(long, value_enum)]
    profile: Vec<Profile>,

    /// Bind address for every listener, overriding the configuration
    #[arg(short = 'l', long)]
    listen_addr: Option<IpAddr>,

    /// Serve Prometheus metrics on this port
    #[arg(short = 'm', long)]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();

    info!("Starting mock upstream...");

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            match MockConfig::from_file(path) {
                Ok(config) => config,
                Err(e) => {
                    error!("Failed to load configuration from {}: {}", path.display(), e);
                    return ExitCode::FAILURE;
                }
            }
        }
        None if !args.profile.is_empty() => {
            info!("Using built-in profiles: {:?}", args.profile);
            MockConfig::from_profiles(&args.profile)
        }
        None => {
            info!("No configuration given, using the default profiles");
            MockConfig::default()
        }
    };

    let config = match args.listen_addr {
        Some(addr) => config.with_listen_addr(addr),
        None => config,
    };
    let config = match args.metrics_port {
        Some(port) => config.with_metrics_port(port),
        None => config,
    };

    let metrics = match MetricsCollector::new() {
        Ok(metrics) => Arc::new(metrics),
        Err(e) => {
            error!("Failed to set up metrics: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Serving {} upstream(s)", config.upstreams.len());

    match serve_all(&config, metrics).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
