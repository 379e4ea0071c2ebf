// crates/barflow-core/src/types.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockMapError {
    #[error("glass type {glass} has negative stock {count}")]
    Negative { glass: String, count: i64 },

    #[error("stock total for glass type {0} overflowed")]
    Overflow(String),
}

/// Glass type → stock count for one location. Counts are never negative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockMap(BTreeMap<String, u64>);

impl StockMap {
    /// Builds a map from signed counts, summing repeated glass types.
    pub fn try_from_counts<I, S>(counts: I) -> Result<Self, StockMapError>
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (glass, count) in counts {
            let glass = glass.into();
            let count = u64::try_from(count).map_err(|_| StockMapError::Negative {
                glass: glass.clone(),
                count,
            })?;
            let entry: &mut u64 = map.entry(glass.clone()).or_default();
            *entry = entry
                .checked_add(count)
                .ok_or(StockMapError::Overflow(glass))?;
        }
        Ok(Self(map))
    }

    pub fn get(&self, glass: &str) -> Option<u64> {
        self.0.get(glass).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(glass, count)| (glass.as_str(), *count))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(glass, count)| (glass.clone(), serde_json::Value::from(*count)))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub name: String,
    pub stock: StockMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlassType {
    pub name: String,
    pub stock: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Drink {
    pub name: String,
    pub glass: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// Surrogate key assigned in load order.
    pub id: i64,
    pub location: String,
    pub drink: String,
    pub value: f64,
    /// Local time with its explicit UTC offset suffix, e.g. `2023-03-05 14:30:00+1:00`.
    pub timestamp: String,
}

/// The four datasets one run produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CanonicalDatasets {
    pub locations: Vec<Location>,
    pub glass_types: Vec<GlassType>,
    pub drinks: Vec<Drink>,
    pub transactions: Vec<Transaction>,
}
