use std::fmt::Write;
use std::sync::Arc;

use crate::enums::direction::Direction;

/// One hop of a triangle, bound to the pair that carries it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leg {
    pub symbol: Arc<str>,
    pub direction: Direction,
}

impl Leg {
    #[inline]
    pub fn forward(symbol: impl Into<Arc<str>>) -> Self {
        Self { symbol: symbol.into(), direction: Direction::Forward }
    }

    #[inline]
    pub fn inverse(symbol: impl Into<Arc<str>>) -> Self {
        Self { symbol: symbol.into(), direction: Direction::Inverse }
    }
}

/// A closed loop d1 -> d2 -> d3 -> d1 over three distinct currencies
#[derive(Debug, Clone)]
pub struct TriangularPath {
    pub assets: [Arc<str>; 3],
    pub legs: [Leg; 3],
    /// Percentage gain rounded to 3 decimals, `None` until first computed
    pub value: Option<f64>,
    /// Hop-by-hop rendering of the last computation
    pub description: String,
}

impl TriangularPath {
    pub fn new(assets: [Arc<str>; 3], legs: [Leg; 3]) -> Self {
        let mut path = Self {
            assets,
            legs,
            value: None,
            description: String::new(),
        };
        path.description = path.route();
        path
    }

    /// Whether any leg trades on `symbol`
    #[inline]
    pub fn references(&self, symbol: &str) -> bool {
        self.legs.iter().any(|leg| &*leg.symbol == symbol)
    }

    /// Static route without prices, e.g. `BTC to ETH-BTC/ETH to ETH-USDT/USDT to BTC-USDT/BTC`
    pub fn route(&self) -> String {
        let [d1, d2, d3] = &self.assets;
        format!(
            "{} to {}/{} to {}/{} to {}/{}",
            d1,
            self.legs[0].symbol,
            d2,
            self.legs[1].symbol,
            d3,
            self.legs[2].symbol,
            d1
        )
    }

    /// Rebuild the description from the prices used on each hop
    pub fn describe(&mut self, prices: [f64; 3]) {
        self.description.clear();
        for (i, (leg, price)) in self.legs.iter().zip(prices).enumerate() {
            let from = &self.assets[i];
            let to = &self.assets[(i + 1) % 3];
            if i > 0 {
                self.description.push_str(" | ");
            }
            // Writing into a String cannot fail
            let _ = write!(
                self.description,
                "{} → {} via {} ({} @ {})",
                from,
                to,
                leg.symbol,
                leg.direction,
                price
            );
        }
    }
}
