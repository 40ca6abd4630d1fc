use std::sync::Arc;
use std::time::Duration;

use crate::{
    app::{ build_client, engine::{ console_delivery, run_delivery, run_engine }, fetch_initial_tickers },
    arbitrage::detector::ArbitrageDetector,
    config::Config,
    exchange::{
        client::ExchangeClient,
        connector::TungsteniteConnector,
        feed::{ ConnectionAttempts, MarketDataFeed },
    },
    scheduler::resync::run_resync,
    utils::{
        console::{ print_app_started, print_app_starting, print_config },
        shutdown::wait_for_shutdown,
    },
};
use anyhow::{ anyhow, Context, Result };
use tokio::sync::{ mpsc, watch };
use tracing::{ error, info, warn };

/// How long background tasks get to wind down after Ctrl+C
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub fn run_normal_mode(config: Config) -> Result<()> {
    print_app_starting();
    print_config(&config);

    let client = build_client(&config)?;

    let rt = tokio::runtime::Builder
        ::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    ctrlc
        ::set_handler(move || {
            info!("Received Ctrl+C, shutting down...");
            let _ = shutdown_tx.send(true);
        })
        .context("Error setting Ctrl-C handler")?;

    rt.block_on(run_pipeline(config, client, shutdown_rx))?;

    info!("Triangular arbitrage monitor stopped");
    Ok(())
}

async fn run_pipeline(
    config: Config,
    client: Arc<dyn ExchangeClient>,
    mut shutdown: watch::Receiver<bool>
) -> Result<()> {
    let tickers = fetch_initial_tickers(client.as_ref()).await?;

    let mut detector = ArbitrageDetector::new();
    let initial = detector.apply_snapshot(&tickers);

    let total_paths = detector.catalog().len();
    info!("Found {} triangular paths", total_paths);

    if total_paths == 0 {
        warn!("No triangular paths found among {} pairs", tickers.len());
        return Err(anyhow!("No triangular paths found. Cannot continue."));
    }

    let examples = detector
        .catalog()
        .paths()
        .iter()
        .take(5)
        .enumerate()
        .map(|(i, p)| format!("{:3}. {}", i + 1, p.route()))
        .collect::<Vec<_>>()
        .join("\n");
    info!("Sample paths: \n{}", examples);

    let (events_tx, events_rx) = mpsc::channel(config.event_buffer);
    let (snapshots_tx, snapshots_rx) = watch::channel(initial);

    let engine = tokio::spawn(run_engine(detector, events_rx, snapshots_tx, shutdown.clone()));

    let feed = MarketDataFeed::new(
        client.clone(),
        Arc::new(TungsteniteConnector),
        config.feed_settings(),
        ConnectionAttempts::new(config.max_connection_attempts),
        events_tx.clone()
    );
    let feed_shutdown = shutdown.clone();
    let feed_handle = tokio::spawn(async move {
        feed.run(feed_shutdown).await;
        feed.dropped_quotes()
    });

    let resync = tokio::spawn(
        run_resync(client.clone(), events_tx, config.resync_interval(), shutdown.clone())
    );

    let delivery = tokio::spawn(
        run_delivery(
            snapshots_rx,
            config.display_interval(),
            shutdown.clone(),
            console_delivery(config.display_top, config.min_profit)
        )
    );

    print_app_started();
    info!("\nPress Ctrl+C to exit");

    wait_for_shutdown(&mut shutdown).await;

    let joined = tokio::time::timeout(SHUTDOWN_GRACE, async {
        match feed_handle.await {
            Ok(dropped) => info!(dropped_quotes = dropped, "Feed task finished"),
            Err(e) => error!("Feed task failed: {}", e),
        }
        if let Err(e) = resync.await {
            error!("Re-sync task failed: {}", e);
        }
        match engine.await {
            Ok(detector) => {
                let stats = detector.stats();
                info!(
                    updates = stats.updates,
                    recomputed = stats.recomputed,
                    rebuilds = stats.rebuilds,
                    "Final engine stats"
                );
            }
            Err(e) => error!("Engine task failed: {}", e),
        }
        if let Err(e) = delivery.await {
            error!("Delivery task failed: {}", e);
        }
    }).await;

    if joined.is_err() {
        warn!("Background tasks did not stop within {:?}", SHUTDOWN_GRACE);
    }

    Ok(())
}
