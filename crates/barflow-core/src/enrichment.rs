use std::collections::{BTreeMap, HashSet};

use barflow_parser::schema::{BAR_NAME, DRINK_NAME, TRANS_TIME, VALUE};
use barflow_parser::{clean_glass_name, clean_name, clean_timestamp};
use polars::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::LocationConfig;
use crate::lookup::{DrinkLookup, LookupError};
use crate::types::{Drink, Transaction};

pub const TIMEZONE: &str = "TIMEZONE";

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
    #[error("transaction row {row_index} had a null {column}")]
    NullCell {
        row_index: usize,
        column: &'static str,
    },
    #[error("drink reference lookup for {drink} failed: {source}")]
    Lookup {
        drink: String,
        #[source]
        source: LookupError,
    },
    #[error("drink reference has no glass type for {0}")]
    NoMatch(String),
}

/// Drink name → glass type, filled at most once per drink for the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrinkCache {
    glasses: BTreeMap<String, String>,
}

impl DrinkCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, drink: &str) -> Option<&str> {
        self.glasses.get(drink).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.glasses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glasses.is_empty()
    }

    /// Entries already resolved are never overwritten.
    fn insert(&mut self, drink: &str, glass: String) -> &str {
        self.glasses.entry(drink.to_string()).or_insert(glass)
    }

    /// Drinks dataset, sorted by drink name.
    pub fn drinks(&self) -> Vec<Drink> {
        self.glasses
            .iter()
            .map(|(name, glass)| Drink {
                name: name.clone(),
                glass: glass.clone(),
            })
            .collect()
    }
}

/// Attaches location metadata to one transaction file's cleaned rows.
///
/// Output columns: `BAR_NAME`, `DRINK_NAME`, `VALUE`, `TRANS_TIME`, `TIMEZONE`.
/// Timestamps are rewritten with the location's UTC offset; the bar name and
/// drink names get the shared name normalization.
pub fn enrich(frame: &DataFrame, location: &LocationConfig) -> Result<DataFrame, EnrichmentError> {
    let height = frame.height();
    let bar_name = clean_name(location.name.trim());
    let times = frame.column(TRANS_TIME)?.as_materialized_series().str()?;
    let drinks = frame.column(DRINK_NAME)?.as_materialized_series().str()?;
    let values = frame.column(VALUE)?.as_materialized_series().f64()?;

    let mut cleaned_times = Vec::with_capacity(height);
    let mut cleaned_drinks = Vec::with_capacity(height);
    let mut cleaned_values = Vec::with_capacity(height);

    for row_index in 0..height {
        let time = times.get(row_index).ok_or(EnrichmentError::NullCell {
            row_index,
            column: TRANS_TIME,
        })?;
        let drink = drinks.get(row_index).ok_or(EnrichmentError::NullCell {
            row_index,
            column: DRINK_NAME,
        })?;
        let value = values.get(row_index).ok_or(EnrichmentError::NullCell {
            row_index,
            column: VALUE,
        })?;
        cleaned_times.push(clean_timestamp(time, &location.utc_offset));
        cleaned_drinks.push(clean_name(drink));
        cleaned_values.push(value);
    }

    let enriched = DataFrame::new(vec![
        Series::new(BAR_NAME.into(), vec![bar_name.as_str(); height]).into(),
        Series::new(DRINK_NAME.into(), cleaned_drinks).into(),
        Series::new(VALUE.into(), cleaned_values).into(),
        Series::new(TRANS_TIME.into(), cleaned_times).into(),
        Series::new(TIMEZONE.into(), vec![location.utc_offset.as_str(); height]).into(),
    ])?;
    Ok(enriched)
}

/// Distinct drink names of an enriched frame, in order of first appearance.
pub fn distinct_drinks(frame: &DataFrame) -> Result<Vec<String>, EnrichmentError> {
    let drinks = frame.column(DRINK_NAME)?.as_materialized_series().str()?;
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();
    for row_index in 0..frame.height() {
        let drink = drinks.get(row_index).ok_or(EnrichmentError::NullCell {
            row_index,
            column: DRINK_NAME,
        })?;
        if seen.insert(drink) {
            ordered.push(drink.to_string());
        }
    }
    Ok(ordered)
}

/// Resolves glass types for drinks through the reference lookup, consulting
/// the run's cache first so each distinct drink costs one request.
pub struct TransactionEnricher<'a, L: DrinkLookup + ?Sized> {
    lookup: &'a L,
    cache: DrinkCache,
    lookups: usize,
}

impl<'a, L: DrinkLookup + ?Sized> TransactionEnricher<'a, L> {
    pub fn new(lookup: &'a L, cache: DrinkCache) -> Self {
        Self {
            lookup,
            cache,
            lookups: 0,
        }
    }

    pub async fn resolve_drinks<I, S>(&mut self, names: I) -> Result<(), EnrichmentError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.resolve_drink(name.as_ref()).await?;
        }
        Ok(())
    }

    /// Returns the cached glass type, querying the reference on first sight.
    ///
    /// The first candidate is taken as authoritative: the service ranks an
    /// exact name match ahead of partial matches.
    pub async fn resolve_drink(&mut self, drink: &str) -> Result<String, EnrichmentError> {
        if let Some(glass) = self.cache.get(drink) {
            return Ok(glass.to_string());
        }

        let query = drink.replace('_', " ");
        self.lookups += 1;
        let candidates =
            self.lookup
                .search(&query)
                .await
                .map_err(|source| EnrichmentError::Lookup {
                    drink: drink.to_string(),
                    source,
                })?;

        let raw_glass = candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.glass)
            .filter(|glass| !glass.trim().is_empty())
            .ok_or_else(|| EnrichmentError::NoMatch(drink.to_string()))?;

        let glass = clean_glass_name(&clean_name(raw_glass.trim()));
        debug!(drink, glass = %glass, "Resolved drink glass type");
        Ok(self.cache.insert(drink, glass).to_string())
    }

    pub fn lookups(&self) -> usize {
        self.lookups
    }

    pub fn cache(&self) -> &DrinkCache {
        &self.cache
    }

    pub fn into_cache(self) -> DrinkCache {
        self.cache
    }
}

/// Builds the transactions dataset from enriched frames, numbering rows
/// from zero in load order across all frames.
pub fn transactions_from_frames(frames: &[DataFrame]) -> Result<Vec<Transaction>, EnrichmentError> {
    let mut transactions = Vec::with_capacity(frames.iter().map(DataFrame::height).sum());

    for frame in frames {
        let bars = frame.column(BAR_NAME)?.as_materialized_series().str()?;
        let drinks = frame.column(DRINK_NAME)?.as_materialized_series().str()?;
        let values = frame.column(VALUE)?.as_materialized_series().f64()?;
        let times = frame.column(TRANS_TIME)?.as_materialized_series().str()?;

        for row_index in 0..frame.height() {
            let null = |column| EnrichmentError::NullCell { row_index, column };
            transactions.push(Transaction {
                id: transactions.len() as i64,
                location: bars.get(row_index).ok_or_else(|| null(BAR_NAME))?.to_string(),
                drink: drinks.get(row_index).ok_or_else(|| null(DRINK_NAME))?.to_string(),
                value: values.get(row_index).ok_or_else(|| null(VALUE))?,
                timestamp: times.get(row_index).ok_or_else(|| null(TRANS_TIME))?.to_string(),
            });
        }
    }

    info!(rows = transactions.len(), "Assembled transactions dataset");
    Ok(transactions)
}
