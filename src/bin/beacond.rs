use std::sync::Arc;

use beacon::{MemoryStore, MonitorEngine, config::read_config_file};
use clap::Parser;
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("beacon", LevelFilter::TRACE),
        ("beacond", LevelFilter::TRACE),
    ]);
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

    let config = read_config_file(&args.file)?;
    let (endpoints, webhooks) = config.materialize();

    let store = Arc::new(MemoryStore::new());
    for endpoint in endpoints {
        info!(
            "monitoring {} ({}) every {}s",
            endpoint.name, endpoint.url, endpoint.interval_secs
        );
        store.upsert_endpoint(endpoint).await;
    }
    for webhook in webhooks {
        store.insert_webhook(webhook).await;
    }

    let engine = MonitorEngine::new(store, config.engine.clone());

    let report = engine.start_all().await?;
    for (endpoint_id, reason) in &report.failed {
        error!("endpoint {endpoint_id} not monitored: {reason}");
    }

    tokio::signal::ctrl_c().await?;
    info!("received ctrl-c, shutting down");

    engine.stop_all().await;

    Ok(())
}
