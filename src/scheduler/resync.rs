use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{ mpsc, watch };
use tokio::time::{ Instant, MissedTickBehavior };
use tracing::{ error, info, warn };

use crate::exchange::client::ExchangeClient;
use crate::exchange::feed::MarketEvent;
use crate::utils::shutdown::wait_for_shutdown;

/// Periodically refetch the full ticker list so newly listed pairs join the
/// catalog. The first refresh happens one `interval` after start, since the
/// caller already seeded the engine with a snapshot.
pub async fn run_resync(
    client: Arc<dyn ExchangeClient>,
    events: mpsc::Sender<MarketEvent>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>
) {
    if interval.is_zero() {
        info!("Periodic catalog re-sync disabled");
        return;
    }

    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Catalog re-sync every {:?}", interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = wait_for_shutdown(&mut shutdown) => break,
        }

        let tickers = tokio::select! {
            fetched = client.get_all_tickers() => fetched,
            _ = wait_for_shutdown(&mut shutdown) => break,
        };

        match tickers {
            Ok(tickers) => {
                info!("Re-sync fetched {} tickers", tickers.len());
                if events.send(MarketEvent::Snapshot(tickers)).await.is_err() {
                    warn!("Engine stopped, ending re-sync");
                    break;
                }
            }
            Err(e) => {
                // Keep the current catalog; try again next interval
                error!("Re-sync failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::exchange::client::StreamToken;
    use crate::exchange::error::ExchangeError;
    use crate::models::kucoin_models::Ticker;

    /// Fails every other call
    #[derive(Default)]
    struct FlakyClient {
        calls: Mutex<Vec<Instant>>,
    }

    #[async_trait]
    impl ExchangeClient for FlakyClient {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn get_all_tickers(&self) -> Result<Vec<Ticker>, ExchangeError> {
            let mut calls = self.calls.lock();
            calls.push(Instant::now());
            if calls.len() % 2 == 0 {
                return Err(ExchangeError::EmptyResponse);
            }
            Ok(
                vec![Ticker {
                    symbol: "ETH-BTC".into(),
                    buy: Some(0.05),
                    sell: Some(0.0501),
                }]
            )
        }

        async fn get_public_token(&self) -> Result<StreamToken, ExchangeError> {
            Err(ExchangeError::EmptyInstanceServers)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_on_interval_and_survives_failures() {
        let client = Arc::new(FlakyClient::default());
        let (tx, mut rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown) = watch::channel(false);

        let start = Instant::now();
        let task = tokio::spawn(
            run_resync(client.clone(), tx, Duration::from_secs(300), shutdown)
        );

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert!(client.calls.lock().is_empty());

        tokio::time::sleep(Duration::from_secs(602)).await;
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        let calls = client.calls.lock().clone();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0] - start, Duration::from_secs(300));
        assert_eq!(calls[2] - start, Duration::from_secs(900));

        // Second call failed, so only two snapshots came through
        let mut snapshots = 0;
        while let Ok(MarketEvent::Snapshot(tickers)) = rx.try_recv() {
            assert_eq!(tickers.len(), 1);
            snapshots += 1;
        }
        assert_eq!(snapshots, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_disables_resync() {
        let client = Arc::new(FlakyClient::default());
        let (tx, _rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown) = watch::channel(false);

        run_resync(client.clone(), tx, Duration::ZERO, shutdown).await;
        assert!(client.calls.lock().is_empty());
    }
}
