// src/arbitrage/detector.rs

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use ordered_float::OrderedFloat;
use tracing::{ debug, info, trace };

use crate::arbitrage::catalog::PathCatalog;
use crate::enums::direction::Direction;
use crate::models::{
    kucoin_models::Ticker,
    opportunity::{ RankedEntry, RankedSnapshot },
    quote::{ Quote, QuoteUpdate },
    symbol_map::SymbolMap,
    triangular_path::Leg,
};
use crate::quotes::store::QuoteStore;

/// Ranking key: value descending, then catalog order ascending
type RankKey = (Reverse<OrderedFloat<f64>>, usize);

/// Outcome of recomputing a single path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recalculation {
    /// Value and description were refreshed
    Updated,
    /// At least one leg lacked a usable price; previous value retained
    Unavailable,
}

/// Running counters, logged periodically by the engine task
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectorStats {
    pub updates: u64,
    pub recomputed: u64,
    pub unavailable: u64,
    pub rebuilds: u64,
}

/// Owns the quote store and the path catalog and keeps the ranking current.
///
/// Only one task ever holds the detector, so catalog and quotes are mutated
/// without locks. Work per quote update is bounded by the number of paths
/// that reference the updated symbol.
#[derive(Debug, Default)]
pub struct ArbitrageDetector {
    quotes: QuoteStore,
    catalog: PathCatalog,
    /// Profitable paths only
    ranking: BTreeSet<RankKey>,
    stats: DetectorStats,
}

/// Rate contributed by a leg and the price it was read from.
/// `None` when the quote cannot be used this tick.
#[inline]
pub fn leg_rate(leg: &Leg, quote: Option<&Quote>) -> Option<(f64, f64)> {
    let quote = quote?;
    match leg.direction {
        Direction::Forward => quote.bid.map(|bid| (bid, bid)),
        Direction::Inverse =>
            match quote.ask {
                Some(ask) if ask > 0.0 => Some((1.0 / ask, ask)),
                _ => None,
            }
    }
}

/// Percentage gain of a loop rounded to 3 decimals
#[inline]
pub fn loop_value(gain: f64) -> f64 {
    (((gain - 1.0) * 100.0 * 1000.0).round() / 1000.0) + 0.0
}

impl ArbitrageDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed quotes from a REST snapshot and swap in a freshly built catalog.
    /// The old catalog stays in place until the new one is complete.
    pub fn apply_snapshot(&mut self, tickers: &[Ticker]) -> RankedSnapshot {
        let start = Instant::now();

        let symbol_map = SymbolMap::from_pair_names(tickers.iter().map(|t| t.symbol.as_str()));
        let catalog = PathCatalog::build(&symbol_map);

        self.quotes.seed(tickers);
        self.catalog = catalog;
        self.ranking.clear();
        self.stats.rebuilds += 1;

        for idx in 0..self.catalog.len() {
            self.recompute_path(idx);
        }

        info!(
            pairs = self.quotes.len(),
            paths = self.catalog.len(),
            profitable = self.ranking.len(),
            "Catalog rebuilt from snapshot in {:?}",
            start.elapsed()
        );

        self.snapshot()
    }

    /// Apply a streamed quote change and recompute only the paths that use it.
    /// Returns `None` when nothing was recomputed.
    pub fn on_quote_update(&mut self, update: &QuoteUpdate) -> Option<RankedSnapshot> {
        self.stats.updates += 1;

        if !self.quotes.upsert(&update.symbol, update.bid, update.ask) {
            return None;
        }

        // Clone the small list of indices so the catalog can be borrowed mutably
        let affected: Vec<usize> = self.catalog.paths_for(&update.symbol).to_vec();
        if affected.is_empty() {
            return None;
        }

        for idx in affected {
            self.recompute_path(idx);
        }

        trace!(symbol = %update.symbol, profitable = self.ranking.len(), "Recomputed affected paths");

        Some(self.snapshot())
    }

    /// Recompute one path's value from the current quotes
    pub fn recompute_path(&mut self, idx: usize) -> Recalculation {
        let Some(path) = self.catalog.path(idx) else {
            return Recalculation::Unavailable;
        };

        let mut gain = 1.0;
        let mut prices = [0.0; 3];
        for (i, leg) in path.legs.iter().enumerate() {
            match leg_rate(leg, self.quotes.get(&leg.symbol)) {
                Some((rate, price)) => {
                    gain *= rate;
                    prices[i] = price;
                }
                None => {
                    self.stats.unavailable += 1;
                    return Recalculation::Unavailable;
                }
            }
        }

        let value = loop_value(gain);
        if !value.is_finite() {
            debug!(path = %path.route(), gain, "Discarding non-finite loop value");
            self.stats.unavailable += 1;
            return Recalculation::Unavailable;
        }

        let previous = path.value;

        let Some(path) = self.catalog.path_mut(idx) else {
            return Recalculation::Unavailable;
        };
        path.value = Some(value);
        path.describe(prices);

        if let Some(old) = previous.filter(|v| *v > 0.0) {
            self.ranking.remove(&(Reverse(OrderedFloat(old)), idx));
        }
        if value > 0.0 {
            self.ranking.insert((Reverse(OrderedFloat(value)), idx));
        }

        self.stats.recomputed += 1;
        Recalculation::Updated
    }

    /// All profitable paths, best first; ties keep catalog order
    pub fn snapshot(&self) -> RankedSnapshot {
        let entries = self.ranking
            .iter()
            .filter_map(|(Reverse(value), idx)| {
                self.catalog.path(*idx).map(|path| (path, value.into_inner()))
            })
            .enumerate()
            .map(|(i, (path, value))| RankedEntry {
                rank: i + 1,
                description: path.description.clone(),
                value,
            })
            .collect();

        RankedSnapshot { generated_at: Utc::now(), entries }
    }

    #[inline]
    pub fn catalog(&self) -> &PathCatalog {
        &self.catalog
    }

    #[inline]
    pub fn quotes(&self) -> &QuoteStore {
        &self.quotes
    }

    #[inline]
    pub fn stats(&self) -> DetectorStats {
        self.stats
    }

    /// Symbols the current catalog cares about
    pub fn tracked_symbols(&self) -> impl Iterator<Item = &Arc<str>> {
        self.catalog.index().keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker(symbol: &str, bid: f64, ask: f64) -> Ticker {
        Ticker { symbol: symbol.into(), buy: Some(bid), sell: Some(ask) }
    }

    fn scenario() -> Vec<Ticker> {
        vec![
            ticker("ETH-BTC", 0.05, 0.0501),
            ticker("BTC-USDT", 60000.0, 60010.0),
            ticker("ETH-USDT", 3000.0, 3002.0)
        ]
    }

    fn value_of(detector: &ArbitrageDetector, route: &str) -> Option<f64> {
        detector
            .catalog()
            .paths()
            .iter()
            .find(|p| p.route() == route)
            .and_then(|p| p.value)
    }

    const ETH_BTC_USDT: &str = "ETH to ETH-BTC/BTC to BTC-USDT/USDT to ETH-USDT/ETH";
    const BTC_USDT_ETH: &str = "BTC to BTC-USDT/USDT to ETH-USDT/ETH to ETH-BTC/BTC";
    const ETH_USDT_BTC: &str = "ETH to ETH-USDT/USDT to BTC-USDT/BTC to ETH-BTC/ETH";

    #[test]
    fn scenario_matches_hand_computation() {
        let mut detector = ArbitrageDetector::new();
        let snapshot = detector.apply_snapshot(&scenario());

        // ETH -> USDT at bid, USDT -> BTC at 1/ask, BTC -> ETH at 1/ask:
        // the BTC -> ETH -> USDT -> BTC loop read from a different start
        let expected = loop_value((3000.0 / 60010.0) * (1.0 / 0.0501));
        assert_eq!(value_of(&detector, ETH_USDT_BTC), Some(expected));
        assert_eq!(expected, -0.216);

        // Opposite direction: 0.05 * 60000 / 3002
        assert_eq!(value_of(&detector, ETH_BTC_USDT), Some(-0.067));
        assert_eq!(value_of(&detector, BTC_USDT_ETH), Some(-0.067));

        assert!(snapshot.is_empty());
    }

    #[test]
    fn value_follows_formula_and_is_idempotent() {
        let mut detector = ArbitrageDetector::new();
        detector.apply_snapshot(&scenario());

        let update = QuoteUpdate::new("ETH-BTC", Some(0.0505), Some(0.0506));
        let first = detector.on_quote_update(&update).unwrap();
        let value = value_of(&detector, ETH_BTC_USDT).unwrap();
        assert_eq!(value, loop_value(0.0505 * 60000.0 * (1.0 / 3002.0)));
        assert_eq!(value, 0.933);

        let second = detector.on_quote_update(&update).unwrap();
        assert_eq!(value_of(&detector, ETH_BTC_USDT), Some(value));
        assert_eq!(first.entries, second.entries);
    }

    #[test]
    fn ranking_is_descending_with_catalog_tie_break() {
        let mut detector = ArbitrageDetector::new();
        detector.apply_snapshot(&scenario());

        let snapshot = detector
            .on_quote_update(&QuoteUpdate::new("ETH-BTC", Some(0.0505), Some(0.0506)))
            .unwrap();

        // Both rotations of the same loop share a value; catalog order decides
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.entries[0].rank, 1);
        assert_eq!(snapshot.entries[1].rank, 2);
        assert_eq!(snapshot.entries[0].value, snapshot.entries[1].value);
        assert!(snapshot.entries[0].description.starts_with("ETH → BTC via ETH-BTC"));
        assert!(snapshot.entries[1].description.starts_with("BTC → USDT via BTC-USDT"));

        // Make the other direction more profitable
        let snapshot = detector
            .on_quote_update(&QuoteUpdate::new("ETH-USDT", Some(3200.0), Some(3300.0)))
            .unwrap();
        assert_eq!(snapshot.len(), 1);
        let values: Vec<f64> = snapshot.entries
            .iter()
            .map(|e| e.value)
            .collect();
        assert!(values.iter().all(|v| *v > 0.0));
        assert!(values.windows(2).all(|w| w[0] >= w[1]));
        assert!(snapshot.entries[0].description.starts_with("ETH → USDT via ETH-USDT"));
    }

    #[test]
    fn update_only_touches_referencing_paths() {
        let mut tickers = scenario();
        tickers.push(ticker("XRP-BTC", 0.00002, 0.000021));
        tickers.push(ticker("XRP-USDT", 1.2, 1.21));

        let mut detector = ArbitrageDetector::new();
        detector.apply_snapshot(&tickers);

        let before: Vec<(Option<f64>, String)> = detector
            .catalog()
            .paths()
            .iter()
            .map(|p| (p.value, p.description.clone()))
            .collect();

        detector.on_quote_update(&QuoteUpdate::new("XRP-USDT", Some(1.5), Some(1.51)));

        for (path, (value, description)) in detector.catalog().paths().iter().zip(before) {
            if !path.references("XRP-USDT") {
                assert_eq!(path.value, value);
                assert_eq!(path.description, description);
            }
        }
        assert!(
            detector
                .catalog()
                .paths()
                .iter()
                .any(|p| p.references("XRP-USDT"))
        );
    }

    #[test]
    fn zero_or_missing_ask_retains_previous_value() {
        let mut detector = ArbitrageDetector::new();
        detector.apply_snapshot(&scenario());
        let before = value_of(&detector, ETH_USDT_BTC);
        assert!(before.is_some());

        // ETH_USDT_BTC inverts BTC-USDT, so a zero ask makes it unusable
        detector.on_quote_update(&QuoteUpdate::new("BTC-USDT", Some(61000.0), Some(0.0)));
        assert_eq!(value_of(&detector, ETH_USDT_BTC), before);
        // Paths using BTC-USDT forward still recompute
        assert_eq!(
            value_of(&detector, ETH_BTC_USDT),
            Some(loop_value(0.05 * 61000.0 * (1.0 / 3002.0)))
        );

        for path in detector.catalog().paths() {
            if let Some(v) = path.value {
                assert!(v.is_finite());
            }
        }

        // Valid ask brings the path back
        detector.on_quote_update(&QuoteUpdate::new("BTC-USDT", None, Some(60010.0)));
        assert_eq!(
            value_of(&detector, ETH_USDT_BTC),
            Some(loop_value((3000.0 / 60010.0) * (1.0 / 0.0501)))
        );
    }

    #[test]
    fn paths_without_quotes_stay_uncomputed() {
        let mut detector = ArbitrageDetector::new();
        detector.apply_snapshot(
            &[
                ticker("ETH-BTC", 0.05, 0.0501),
                ticker("BTC-USDT", 60000.0, 60010.0),
                Ticker { symbol: "ETH-USDT".into(), buy: None, sell: None },
            ]
        );
        assert!(detector.catalog().paths().iter().all(|p| p.value.is_none()));

        // Only the bid arrives: forward legs become usable, inverse ones do not
        detector.on_quote_update(&QuoteUpdate::new("ETH-USDT", Some(3000.0), None));
        assert_eq!(value_of(&detector, ETH_USDT_BTC), Some(-0.216));
        assert_eq!(value_of(&detector, ETH_BTC_USDT), None);
    }

    #[test]
    fn unknown_symbol_emits_nothing() {
        let mut detector = ArbitrageDetector::new();
        detector.apply_snapshot(&scenario());
        assert!(detector.on_quote_update(&QuoteUpdate::new("DOGE-USDT", Some(0.1), Some(0.11))).is_none());
        assert!(detector.on_quote_update(&QuoteUpdate::new("ETH-BTC", None, None)).is_none());
        assert_eq!(detector.quotes().get("DOGE-USDT").and_then(|q| q.bid), Some(0.1));
    }

    #[test]
    fn snapshot_rebuild_replaces_catalog_and_ranking() {
        let mut detector = ArbitrageDetector::new();
        detector.apply_snapshot(&scenario());
        detector.on_quote_update(&QuoteUpdate::new("ETH-BTC", Some(0.0505), Some(0.0506)));
        assert_eq!(detector.snapshot().len(), 2);

        let snapshot = detector.apply_snapshot(&[ticker("ETH-BTC", 0.05, 0.0501)]);
        assert!(snapshot.is_empty());
        assert!(detector.catalog().is_empty());
        assert_eq!(detector.stats().rebuilds, 2);
    }

    #[test]
    fn leg_rate_guards_division() {
        let quote = Quote { bid: Some(2.0), ask: Some(0.0) };
        assert_eq!(leg_rate(&Leg::forward("A-B"), Some(&quote)), Some((2.0, 2.0)));
        assert_eq!(leg_rate(&Leg::inverse("A-B"), Some(&quote)), None);
        assert_eq!(leg_rate(&Leg::inverse("A-B"), Some(&Quote { bid: None, ask: Some(4.0) })), Some((0.25, 4.0)));
        assert_eq!(leg_rate(&Leg::forward("A-B"), None), None);
    }
}
