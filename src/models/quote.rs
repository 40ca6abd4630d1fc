use std::sync::Arc;

/// Best bid/ask last observed for a traded pair.
///
/// Both sides start absent and are filled independently as the feed reports
/// them. A present price is always finite and non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quote {
    pub bid: Option<f64>,
    pub ask: Option<f64>,
}

impl Quote {
    #[inline]
    pub fn new(bid: Option<f64>, ask: Option<f64>) -> Self {
        Self { bid: sanitize_price(bid), ask: sanitize_price(ask) }
    }

    /// Merge whichever sides are present, keeping the others untouched
    #[inline]
    pub fn merge(&mut self, bid: Option<f64>, ask: Option<f64>) {
        if let Some(bid) = sanitize_price(bid) {
            self.bid = Some(bid);
        }
        if let Some(ask) = sanitize_price(ask) {
            self.ask = Some(ask);
        }
    }
}

/// Single quote change coming off the streaming feed
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteUpdate {
    pub symbol: Arc<str>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
}

impl QuoteUpdate {
    pub fn new(symbol: impl Into<Arc<str>>, bid: Option<f64>, ask: Option<f64>) -> Self {
        Self {
            symbol: symbol.into(),
            bid: sanitize_price(bid),
            ask: sanitize_price(ask),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bid.is_none() && self.ask.is_none()
    }
}

/// Drop prices that can never be used in a rate product
#[inline]
pub fn sanitize_price(price: Option<f64>) -> Option<f64> {
    price.filter(|p| p.is_finite() && *p >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_missing_side() {
        let mut quote = Quote::new(Some(1.0), Some(1.1));
        quote.merge(None, Some(1.2));
        assert_eq!(quote, Quote { bid: Some(1.0), ask: Some(1.2) });
    }

    #[test]
    fn invalid_prices_are_ignored() {
        let mut quote = Quote::new(Some(f64::NAN), Some(-3.0));
        assert_eq!(quote, Quote::default());

        quote.merge(Some(f64::INFINITY), Some(0.0));
        assert_eq!(quote.bid, None);
        assert_eq!(quote.ask, Some(0.0));
    }
}
