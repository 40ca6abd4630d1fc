pub mod engine;
pub mod normal_mode;
pub mod paths_mode;

use std::sync::Arc;

use anyhow::{ anyhow, Context, Result };
use tracing::{ error, info };

use crate::{
    config::Config,
    exchange::{ client::ExchangeClient, kucoin::KucoinClient },
    models::kucoin_models::Ticker,
    scheduler::rate_limiter::RateLimiter,
    API_TIMEOUT,
};

/// REST client sharing one rate limiter across every caller
pub(crate) fn build_client(config: &Config) -> Result<Arc<dyn ExchangeClient>> {
    let limiter = Arc::new(RateLimiter::new(config.rate_limit()));
    let client = KucoinClient::new(&config.rest_url, limiter).context(
        "Failed to create KuCoin client"
    )?;

    info!("Using exchange: {}", client.name());
    Ok(Arc::new(client))
}

/// Startup snapshot, bounded by [`API_TIMEOUT`]
pub(crate) async fn fetch_initial_tickers(client: &dyn ExchangeClient) -> Result<Vec<Ticker>> {
    match tokio::time::timeout(API_TIMEOUT, client.get_all_tickers()).await {
        Ok(Ok(tickers)) => {
            info!("✓ Fetched {} tickers from {}", tickers.len(), client.name());
            Ok(tickers)
        }
        Ok(Err(e)) => {
            error!("Failed to fetch tickers: {}", e);
            Err(anyhow!("Failed to fetch tickers: {}", e))
        }
        Err(_) => {
            error!("Timed out while fetching tickers");
            Err(anyhow!("Timed out while fetching tickers"))
        }
    }
}
