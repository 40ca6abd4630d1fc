use chrono::{ DateTime, Utc };
use serde::Serialize;

/// One profitable triangle in a ranked snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    /// 1-based position in the ranking
    pub rank: usize,
    #[serde(rename = "pathDescription")]
    pub description: String,
    /// Percentage gain, 3 decimals
    pub value: f64,
}

/// Full replacement list of currently profitable triangles, best first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedSnapshot {
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<RankedEntry>,
}

impl RankedSnapshot {
    pub fn empty() -> Self {
        Self { generated_at: Utc::now(), entries: Vec::new() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries at or above `min_value`, as the viewer-side filter applies it
    pub fn at_least(&self, min_value: f64) -> impl Iterator<Item = &RankedEntry> {
        self.entries.iter().filter(move |e| e.value >= min_value)
    }
}
