use std::time::Duration;

use tokio::sync::{ mpsc, watch };
use tokio::time::MissedTickBehavior;
use tracing::{ info, warn };

use crate::{
    arbitrage::detector::ArbitrageDetector,
    exchange::feed::MarketEvent,
    models::opportunity::RankedSnapshot,
    utils::{ console::print_opportunities, shutdown::wait_for_shutdown },
};

const STATS_INTERVAL: Duration = Duration::from_secs(60);

/// Sole owner of the detector: applies events in arrival order and publishes
/// the latest ranking. Returns the detector once the event queue closes or
/// shutdown is requested.
pub async fn run_engine(
    mut detector: ArbitrageDetector,
    mut events: mpsc::Receiver<MarketEvent>,
    snapshots: watch::Sender<RankedSnapshot>,
    mut shutdown: watch::Receiver<bool>
) -> ArbitrageDetector {
    let mut stats_ticker = tokio::time::interval(STATS_INTERVAL);
    stats_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    stats_ticker.tick().await;

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(MarketEvent::Quote(update)) => {
                        if let Some(snapshot) = detector.on_quote_update(&update) {
                            snapshots.send_replace(snapshot);
                        }
                    }
                    Some(MarketEvent::Snapshot(tickers)) => {
                        snapshots.send_replace(detector.apply_snapshot(&tickers));
                    }
                    None => {
                        warn!("Market event queue closed");
                        break;
                    }
                }
            }
            _ = stats_ticker.tick() => {
                let stats = detector.stats();
                info!(
                    updates = stats.updates,
                    recomputed = stats.recomputed,
                    unavailable = stats.unavailable,
                    rebuilds = stats.rebuilds,
                    tracked = detector.tracked_symbols().count(),
                    "Engine stats"
                );
            }
            _ = wait_for_shutdown(&mut shutdown) => break,
        }
    }

    info!("Engine stopped");
    detector
}

/// Hand the newest ranking to `deliver` at most once per `interval`, starting
/// with the one the channel was seeded with. Intermediate snapshots are
/// skipped, never queued.
pub async fn run_delivery<F>(
    mut snapshots: watch::Receiver<RankedSnapshot>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut deliver: F
)
    where F: FnMut(&RankedSnapshot)
{
    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        deliver(&snapshot);

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = wait_for_shutdown(&mut shutdown) => break,
        }

        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = wait_for_shutdown(&mut shutdown) => break,
        }
    }
}

/// Console delivery with the configured row limit and threshold
pub fn console_delivery(top: usize, min_value: f64) -> impl FnMut(&RankedSnapshot) {
    move |snapshot| print_opportunities(snapshot, top, min_value)
}
