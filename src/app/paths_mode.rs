use crate::{
    app::{ build_client, fetch_initial_tickers },
    arbitrage::detector::ArbitrageDetector,
    config::Config,
    utils::console::{ print_config, print_opportunities },
};
use anyhow::{ Context, Result };
use tracing::info;

/// Fetch one snapshot, rank every triangle from it, print and exit
pub fn run_paths_mode(config: Config) -> Result<()> {
    print_config(&config);

    let client = build_client(&config)?;

    let rt = tokio::runtime::Builder
        ::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    let tickers = rt.block_on(fetch_initial_tickers(client.as_ref()))?;

    let mut detector = ArbitrageDetector::new();
    let snapshot = detector.apply_snapshot(&tickers);

    let catalog = detector.catalog();
    let priced = catalog
        .paths()
        .iter()
        .filter(|p| p.value.is_some())
        .count();

    info!(
        pairs = tickers.len(),
        paths = catalog.len(),
        priced,
        profitable = snapshot.len(),
        "Snapshot report ready"
    );

    println!(
        "{} pairs, {} triangular paths, {} priced, {} profitable",
        tickers.len(),
        catalog.len(),
        priced,
        snapshot.len()
    );
    print_opportunities(&snapshot, config.display_top, config.min_profit);

    Ok(())
}
