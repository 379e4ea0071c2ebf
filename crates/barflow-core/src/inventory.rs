use std::collections::BTreeMap;

use barflow_parser::schema::{BAR_NAME, GLASS_NAME, STOCK};
use polars::prelude::*;
use thiserror::Error;

use crate::types::{GlassType, Location, StockMap, StockMapError};

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
    #[error(transparent)]
    Stock(#[from] StockMapError),
    #[error("aggregated inventory row {0} had a null {1}")]
    NullCell(usize, &'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventorySummary {
    /// Sorted by location name.
    pub locations: Vec<Location>,
    /// Sorted by glass-type name.
    pub glass_types: Vec<GlassType>,
}

/// Folds cleaned inventory rows (`BAR_NAME`, `GLASS_NAME`, `STOCK`) into
/// per-location stock maps and global per-glass totals.
///
/// Both groupings only sum, so the result does not depend on row order.
pub fn aggregate(inventory: &DataFrame) -> Result<InventorySummary, InventoryError> {
    if inventory.height() == 0 {
        return Ok(InventorySummary::default());
    }

    let per_location = inventory
        .clone()
        .lazy()
        .group_by([col(BAR_NAME), col(GLASS_NAME)])
        .agg([col(STOCK).sum()])
        .collect()?;

    let bars = per_location.column(BAR_NAME)?.as_materialized_series().str()?;
    let glasses = per_location
        .column(GLASS_NAME)?
        .as_materialized_series()
        .str()?;
    let counts = per_location.column(STOCK)?.as_materialized_series().i64()?;

    let mut by_location: BTreeMap<String, Vec<(String, i64)>> = BTreeMap::new();
    for idx in 0..per_location.height() {
        let bar = bars.get(idx).ok_or(InventoryError::NullCell(idx, BAR_NAME))?;
        let glass = glasses
            .get(idx)
            .ok_or(InventoryError::NullCell(idx, GLASS_NAME))?;
        let count = counts.get(idx).ok_or(InventoryError::NullCell(idx, STOCK))?;
        by_location
            .entry(bar.to_string())
            .or_default()
            .push((glass.to_string(), count));
    }

    let locations = by_location
        .into_iter()
        .map(|(name, counts)| {
            Ok(Location {
                name,
                stock: StockMap::try_from_counts(counts)?,
            })
        })
        .collect::<Result<Vec<_>, InventoryError>>()?;

    let totals = inventory
        .clone()
        .lazy()
        .group_by([col(GLASS_NAME)])
        .agg([col(STOCK).sum()])
        .collect()?;

    let glasses = totals.column(GLASS_NAME)?.as_materialized_series().str()?;
    let counts = totals.column(STOCK)?.as_materialized_series().i64()?;

    let mut glass_types = Vec::with_capacity(totals.height());
    for idx in 0..totals.height() {
        let name = glasses
            .get(idx)
            .ok_or(InventoryError::NullCell(idx, GLASS_NAME))?;
        let stock = counts.get(idx).ok_or(InventoryError::NullCell(idx, STOCK))?;
        if stock < 0 {
            return Err(StockMapError::Negative {
                glass: name.to_string(),
                count: stock,
            }
            .into());
        }
        glass_types.push(GlassType {
            name: name.to_string(),
            stock,
        });
    }
    glass_types.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(InventorySummary {
        locations,
        glass_types,
    })
}

/// Stacks the cleaned frames of several inventory files into one.
pub fn concat_frames(frames: Vec<DataFrame>) -> Result<DataFrame, InventoryError> {
    let mut iter = frames.into_iter();
    let Some(mut combined) = iter.next() else {
        return Ok(DataFrame::default());
    };
    for df in iter {
        combined.vstack_mut(&df)?;
    }
    Ok(combined)
}
