//! Route Guide server binary
//!
//! Run with: cargo run --bin route-server -- --help

use anyhow::Result;
use clap::Parser;
use route_guide::db;
use route_guide::server::{run_server, ServerConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "route-server")]
#[command(about = "Route guide gRPC demonstration server")]
struct Args {
    /// gRPC listen address
    #[arg(long, default_value = "[::1]:50051")]
    listen_addr: String,

    /// Path to the feature database file
    #[arg(long = "db_path", default_value = db::DEFAULT_DB_PATH)]
    db_path: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Number of worker threads for processing requests
    #[arg(long, default_value = "4")]
    worker_threads: usize,
}

async fn run_with_config(args: Args) -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let config = ServerConfig {
        listen_addr: args.listen_addr.clone(),
        db_path: args.db_path.clone(),
    };

    tracing::info!("=== Route Guide Server Configuration ===");
    tracing::info!("Worker threads: {}", args.worker_threads);
    tracing::info!("Listen address: {}", args.listen_addr);
    tracing::info!("DB path: {}", args.db_path.display());
    tracing::info!("========================================");

    run_server(config).await
}

fn main() -> Result<()> {
    let args = Args::parse();
    let worker_threads = args.worker_threads;

    // Build tokio runtime with specified number of worker threads
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?
        .block_on(run_with_config(args))
}
