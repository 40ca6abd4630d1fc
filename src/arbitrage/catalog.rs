// src/arbitrage/catalog.rs

use std::sync::Arc;
use std::time::Instant;

use ahash::AHashMap;
use smallvec::SmallVec;
use tracing::info;

use crate::models::{ symbol_map::SymbolMap, triangular_path::TriangularPath };

/// Catalog indices of the paths trading on one pair
pub type PathIndices = SmallVec<[usize; 8]>;

/// Back-reference from pair symbol to the paths that use it
pub type SymbolIndex = AHashMap<Arc<str>, PathIndices>;

/// Every triangle derivable from a set of pairs, plus the per-symbol index.
///
/// The same economic loop can appear more than once under different starting
/// currencies; each entry is still its own computation target.
#[derive(Debug, Default)]
pub struct PathCatalog {
    paths: Vec<TriangularPath>,
    index: SymbolIndex,
}

impl PathCatalog {
    /// Enumerate triangles: for each pair (d1, d2) and each other currency d3,
    /// keep the loop when d2 -> d3 and d3 -> d1 both resolve to a listed pair.
    pub fn build(symbol_map: &SymbolMap) -> Self {
        let start = Instant::now();
        let mut paths = Vec::with_capacity(symbol_map.len() * 4);

        for pair in symbol_map.pairs() {
            let d1 = &pair.base_asset;
            let d2 = &pair.quote_asset;

            let Some(first) = symbol_map.resolve_leg(d1, d2) else {
                continue;
            };

            for d3 in symbol_map.assets() {
                if d3 == d1 || d3 == d2 {
                    continue;
                }

                let Some(second) = symbol_map.resolve_leg(d2, d3) else {
                    continue;
                };
                let Some(third) = symbol_map.resolve_leg(d3, d1) else {
                    continue;
                };

                paths.push(
                    TriangularPath::new(
                        [d1.clone(), d2.clone(), d3.clone()],
                        [first.clone(), second, third]
                    )
                );
            }
        }

        let index = index_by_symbol(&paths);

        info!(
            pairs = symbol_map.len(),
            currencies = symbol_map.assets().len(),
            paths = paths.len(),
            "Identified triangular paths in {:?}",
            start.elapsed()
        );

        Self { paths, index }
    }

    #[inline]
    pub fn paths(&self) -> &[TriangularPath] {
        &self.paths
    }

    #[inline]
    pub fn path(&self, idx: usize) -> Option<&TriangularPath> {
        self.paths.get(idx)
    }

    #[inline]
    pub(crate) fn path_mut(&mut self, idx: usize) -> Option<&mut TriangularPath> {
        self.paths.get_mut(idx)
    }

    /// Catalog indices of the paths with a leg on `symbol`
    #[inline]
    pub fn paths_for(&self, symbol: &str) -> &[usize] {
        self.index
            .get(symbol)
            .map(|indices| indices.as_slice())
            .unwrap_or(&[])
    }

    #[inline]
    pub fn index(&self) -> &SymbolIndex {
        &self.index
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Register each path once under each of its leg symbols
pub fn index_by_symbol(paths: &[TriangularPath]) -> SymbolIndex {
    let mut index: SymbolIndex = AHashMap::with_capacity(paths.len());

    for (i, path) in paths.iter().enumerate() {
        for leg in &path.legs {
            let entry = index.entry(leg.symbol.clone()).or_default();
            if entry.last() != Some(&i) {
                entry.push(i);
            }
        }
    }

    index
}
