use std::fmt;
use std::sync::Arc;

/// Separator KuCoin uses between base and quote currency ("ETH-BTC")
pub const PAIR_SEPARATOR: char = '-';

/// Lightweight trading pair representation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    pub symbol: Arc<str>, // Using Arc<str> to reduce clone costs
    pub base_asset: Arc<str>,
    pub quote_asset: Arc<str>,
}

impl Symbol {
    /// Split a "BASE-QUOTE" pair. Returns `None` unless both sides are
    /// non-empty and different currencies.
    pub fn parse(symbol: &str) -> Option<Self> {
        let (base, quote) = symbol.split_once(PAIR_SEPARATOR)?;
        if base.is_empty() || quote.is_empty() || base == quote || quote.contains(PAIR_SEPARATOR) {
            return None;
        }

        Some(Self {
            symbol: symbol.into(),
            base_asset: base.into(),
            quote_asset: quote.into(),
        })
    }
}

/// Format a pair name the way the exchange does
#[inline]
pub fn format_pair(base: &str, quote: &str) -> String {
    format!("{}{}{}", base, PAIR_SEPARATOR, quote)
}

impl fmt::Display for Symbol {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base_asset, self.quote_asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dash_separated_pairs() {
        let sym = Symbol::parse("ETH-BTC").unwrap();
        assert_eq!(&*sym.base_asset, "ETH");
        assert_eq!(&*sym.quote_asset, "BTC");
        assert_eq!(sym.to_string(), "ETH/BTC");
        assert_eq!(format_pair("ETH", "BTC"), "ETH-BTC");
    }

    #[test]
    fn rejects_degenerate_pairs() {
        assert!(Symbol::parse("ETHBTC").is_none());
        assert!(Symbol::parse("-BTC").is_none());
        assert!(Symbol::parse("BTC-").is_none());
        assert!(Symbol::parse("BTC-BTC").is_none());
        assert!(Symbol::parse("A-B-C").is_none());
    }
}
