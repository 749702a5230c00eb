use anyhow::{Context, Result};
use clap::Parser;
use load_client::client::HttpClient;
use load_client::config::{Args, RunConfig};
use load_client::scenario::run;
use load_client::statistics::{register_metadata, JobStatistics};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = RunConfig::try_from(Args::parse())?;
    println!("Server URI: {}", config.uri);
    println!("Warmup: {}", config.warmup.as_secs());
    println!("Duration: {}", config.duration.as_secs());
    println!("Protocol: {}", config.protocol);

    // Sequential loop, one thread is enough.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime")?;
    rt.block_on(run_client(config))
}

async fn run_client(config: RunConfig) -> Result<()> {
    let client = HttpClient::new(&config)?;
    let mut stats = JobStatistics::new();
    register_metadata(&mut stats);
    run(&config, &client, &mut stats).await?;
    stats.report()
}
