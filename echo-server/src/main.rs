use anyhow::{Context, Result};
use clap::Parser;
use echo_server::config::{Args, ServerConfig};
use echo_server::server::EchoServer;
use mimalloc::MiMalloc;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<()> {
    let config = ServerConfig::try_from(Args::parse())?;
    println!("Protocol: {}", config.protocols);
    init_logging(config.log_level);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime")?;
    rt.block_on(run_server(config))
}

fn init_logging(level: Option<LevelFilter>) {
    let filter = match level {
        Some(level) => {
            println!("Console Logging enabled with level '{level}'");
            EnvFilter::default().add_directive(level.into())
        }
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run_server(config: ServerConfig) -> Result<()> {
    let server = EchoServer::bind(&config).await?;
    println!("Server started.");
    info!(
        addr = %server.local_addr()?,
        tls = config.tls,
        protocols = %config.protocols,
        "Listening"
    );
    tokio::select! {
        res = server.serve() => res,
        res = tokio::signal::ctrl_c() => {
            res.context("Failed to listen for shutdown signal")?;
            info!("Shutting down");
            Ok(())
        }
    }
}
