use std::sync::Arc;

use ahash::{ AHashMap, AHashSet };

use super::{ symbol::{ format_pair, Symbol }, triangular_path::Leg };

/// Known traded pairs plus the currencies they span, both in first-seen order
#[derive(Debug, Clone, Default)]
pub struct SymbolMap {
    symbols: AHashMap<Arc<str>, Symbol>,
    pairs: Vec<Symbol>,
    assets: Vec<Arc<str>>,
    seen_assets: AHashSet<Arc<str>>,
}

impl SymbolMap {
    #[inline]
    pub fn new() -> Self {
        Self {
            symbols: AHashMap::with_capacity(2000), // KuCoin lists ~1000 spot pairs
            pairs: Vec::with_capacity(2000),
            assets: Vec::with_capacity(1000),
            seen_assets: AHashSet::with_capacity(1000),
        }
    }

    /// Build from raw "BASE-QUOTE" names, skipping ones that do not parse
    pub fn from_pair_names<I, S>(names: I) -> Self where I: IntoIterator<Item = S>, S: AsRef<str> {
        let mut map = Self::new();
        for name in names {
            match Symbol::parse(name.as_ref()) {
                Some(symbol) => map.add_symbol(symbol),
                None => tracing::debug!(pair = name.as_ref(), "Skipping unparseable pair"),
            }
        }
        map
    }

    pub fn add_symbol(&mut self, symbol: Symbol) {
        if self.symbols.contains_key(&symbol.symbol) {
            return;
        }

        for asset in [&symbol.base_asset, &symbol.quote_asset] {
            if self.seen_assets.insert(asset.clone()) {
                self.assets.push(asset.clone());
            }
        }

        self.pairs.push(symbol.clone());
        self.symbols.insert(symbol.symbol.clone(), symbol);
    }

    #[inline]
    pub fn get(&self, symbol: &str) -> Option<&Symbol> {
        self.symbols.get(symbol)
    }

    /// Resolve the hop `from -> to`: the direct pair "FROM-TO" wins (forward),
    /// otherwise the reverse pair "TO-FROM" is used (inverse).
    pub fn resolve_leg(&self, from: &str, to: &str) -> Option<Leg> {
        if let Some(direct) = self.symbols.get(format_pair(from, to).as_str()) {
            return Some(Leg::forward(direct.symbol.clone()));
        }
        self.symbols
            .get(format_pair(to, from).as_str())
            .map(|reverse| Leg::inverse(reverse.symbol.clone()))
    }

    #[inline]
    pub fn pairs(&self) -> &[Symbol] {
        &self.pairs
    }

    #[inline]
    pub fn assets(&self) -> &[Arc<str>] {
        &self.assets
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
