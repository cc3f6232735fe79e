use anyhow::Context;
use clap::Parser;
use kvbench::prelude::*;
use metrics_exporter_prometheus::PrometheusBuilder;
use mock_store::{Latency, MemoryStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Drive the in-memory store with a configured workload and report its latency.
#[derive(Parser, Debug)]
#[command(version = "0.1")]
struct Cli {
    /// JSON benchmark configuration. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Prime the store by writing every key once before the measured run.
    #[arg(long)]
    load: bool,

    /// Skip the measured run.
    #[arg(long)]
    no_run: bool,

    /// Where to write the run report, overriding the config.
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Simulated write latency of the store, in milliseconds.
    #[arg(long, default_value_t = 0)]
    latency: u64,

    /// Fraction of store writes that fail.
    #[arg(long, default_value_t = 0.)]
    fail_ratio: f64,

    /// Serve Prometheus metrics on this address.
    #[arg(long)]
    metrics: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> ExitCode {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kvbench=info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(addr) = cli.metrics {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("installing Prometheus exporter")?;
        info!("Serving metrics on {addr}");
    }

    let mut config = match &cli.config {
        Some(path) => BenchmarkConfig::from_path(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => BenchmarkConfig::default(),
    };
    if let Some(report) = cli.report {
        config.report_path = report;
    }
    // Surface configuration mistakes before touching the store.
    config.validate()?;

    let mut store = MemoryStore::new()
        .latency(Latency::Fixed(Duration::from_millis(cli.latency)))
        .fail_ratio(cli.fail_ratio)
        .with_checker();
    if let Some(seed) = config.seed {
        store = store.seed(seed);
    }

    let mut benchmark = Benchmark::new(store, config);
    if cli.load {
        benchmark.load().await?;
    }
    if !cli.no_run {
        let report = benchmark.run().await?;
        info!(
            "Report written to {}",
            benchmark.config().report_path.display()
        );
        println!("{report}");
    }

    Ok(())
}
