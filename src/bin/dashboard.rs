use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use stackwatch::{
    api::{ApiConfig, ApiState, spawn_api_server},
    config::load_config,
    util::{get_addr, get_port},
};
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(about = "Dashboard for a compose-managed core and its connectors")]
struct Args {
    /// Port to run the server on (overrides DASHBOARD_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn init() {
    dotenv::dotenv().ok();

    let filter = filter::Targets::new()
        .with_targets(vec![
            ("stackwatch", LevelFilter::DEBUG),
            ("stackwatch_dashboard", LevelFilter::TRACE),
            ("tower_http", LevelFilter::INFO),
        ])
        .with_default(LevelFilter::WARN);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = load_config(args.config.as_deref())?;

    info!("managing core: {}", config.core_dir.display());
    info!("managing connectors: {}", config.connectors_dir.display());

    let api_config = ApiConfig {
        bind_addr: SocketAddr::from((get_addr(), args.port.unwrap_or_else(get_port))),
        static_dir: config.static_dir.clone(),
        enable_cors: true,
    };

    let addr = spawn_api_server(api_config, ApiState::new(config)).await?;
    info!("dashboard available at http://{addr}");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    Ok(())
}
