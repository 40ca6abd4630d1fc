// src/quotes/store.rs

use std::sync::Arc;

use ahash::AHashMap;
use tracing::debug;

use crate::models::{ kucoin_models::Ticker, quote::Quote };

/// Latest best bid/ask per traded pair
#[derive(Debug, Default)]
pub struct QuoteStore {
    /// Maps pair symbol to its last quote
    quotes: AHashMap<Arc<str>, Quote>,
}

impl QuoteStore {
    #[inline]
    pub fn new() -> Self {
        Self { quotes: AHashMap::with_capacity(2000) }
    }

    /// Merge whichever sides are present. An update carrying neither side is
    /// a no-op and does not create an entry; returns whether anything was applied.
    #[inline]
    pub fn upsert(&mut self, symbol: &Arc<str>, bid: Option<f64>, ask: Option<f64>) -> bool {
        let incoming = Quote::new(bid, ask);
        if incoming.bid.is_none() && incoming.ask.is_none() {
            return false;
        }

        match self.quotes.get_mut(symbol) {
            Some(quote) => quote.merge(incoming.bid, incoming.ask),
            None => {
                self.quotes.insert(symbol.clone(), incoming);
            }
        }
        true
    }

    #[inline]
    pub fn get(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.get(symbol)
    }

    /// Replace every quote with a fresh REST snapshot
    pub fn seed(&mut self, tickers: &[Ticker]) {
        self.quotes.clear();
        for ticker in tickers {
            self.quotes.insert(ticker.symbol.as_str().into(), Quote::new(ticker.buy, ticker.sell));
        }
        debug!(pairs = self.quotes.len(), "Seeded quote store from snapshot");
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Arc<str> {
        s.into()
    }

    #[test]
    fn upsert_merges_sides_independently() {
        let mut store = QuoteStore::new();
        assert!(store.upsert(&sym("ETH-BTC"), Some(0.05), None));
        assert_eq!(store.get("ETH-BTC"), Some(&Quote { bid: Some(0.05), ask: None }));

        assert!(store.upsert(&sym("ETH-BTC"), None, Some(0.0501)));
        assert_eq!(store.get("ETH-BTC"), Some(&Quote { bid: Some(0.05), ask: Some(0.0501) }));

        assert!(store.upsert(&sym("ETH-BTC"), Some(0.049), None));
        assert_eq!(store.get("ETH-BTC"), Some(&Quote { bid: Some(0.049), ask: Some(0.0501) }));
    }

    #[test]
    fn empty_upsert_is_noop() {
        let mut store = QuoteStore::new();
        assert!(!store.upsert(&sym("ETH-BTC"), None, None));
        assert!(store.get("ETH-BTC").is_none());
        assert!(!store.upsert(&sym("ETH-BTC"), Some(f64::NAN), None));
        assert!(store.is_empty());
    }

    #[test]
    fn seed_replaces_everything() {
        let mut store = QuoteStore::new();
        store.upsert(&sym("OLD-USDT"), Some(1.0), Some(1.1));
        store.seed(
            &[
                Ticker { symbol: "BTC-USDT".into(), buy: Some(60000.0), sell: Some(60010.0) },
                Ticker { symbol: "NEW-USDT".into(), buy: None, sell: None },
            ]
        );
        assert!(store.get("OLD-USDT").is_none());
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("NEW-USDT"), Some(&Quote::default()));
    }
}
