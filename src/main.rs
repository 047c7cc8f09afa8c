use std::path::PathBuf;

use clap::Parser;
use frog::config::Config;
use frog::{Server, demo};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "frog")]
#[command(about = "Sample HTTP server with a few demo routes and a static file root", long_about = None)]
struct Cli {
    /// YAML configuration file (defaults to $FROG_CONFIG, then conf/frog.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the configured port
    #[arg(short, long)]
    port: Option<u16>,

    /// Overrides the configured worker thread count
    #[arg(short, long)]
    threads: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "frog=info".into()))
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let mut cfg = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    if let Some(port) = cli.port {
        cfg.server.port = port;
    }
    if let Some(threads) = cli.threads {
        cfg.server.threads = threads;
    }

    let document_root = cfg.document_root()?;
    tracing::info!(
        port = cfg.server.port,
        threads = cfg.server.threads,
        document_root = %document_root.display(),
        "frog starting"
    );

    let mut server = Server::with_config(cfg.server.clone());
    demo::register(&mut server, document_root);

    let runtime = server.runtime()?;
    let result = runtime.block_on(server.run_until(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Signal handling unavailable");
            std::future::pending::<()>().await;
        }
    }));
    runtime.shutdown_background();
    result
}
