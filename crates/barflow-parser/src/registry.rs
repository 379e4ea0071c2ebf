use polars::prelude::*;

use crate::errors::{CleanError, ParserError};
use crate::formats::schema::{BAR_NAME, DRINK_NAME, GLASS_NAME, STOCK, TRANS_TIME, VALUE};
use crate::formats::{
    clean_glass_name, clean_name, clean_stock, clean_value, RecordCategory, SourceFormat,
};
use crate::model::NormalizedTable;
use crate::normalize::{normalize, read_raw_table};

/// Reads, normalizes and cleans one file of the given format.
///
/// Inventory files yield `BAR_NAME`, `GLASS_NAME` (strings) and `STOCK`
/// (i64). Transaction files yield `TRANS_TIME`, `DRINK_NAME` (strings, not yet
/// location-adjusted) and `VALUE` (f64).
pub fn parse_source_file(format: SourceFormat, contents: &[u8]) -> Result<DataFrame, ParserError> {
    let raw = read_raw_table(format, contents)?;
    let layout = format.layout();
    let table = normalize(raw, layout.field_map())?;

    match format.category() {
        RecordCategory::Inventory => inventory_frame(&table),
        RecordCategory::Transaction => transaction_frame(&table),
    }
}

/// A table without data rows becomes an empty frame with the canonical
/// columns, whatever its header looked like.
pub fn inventory_frame(table: &NormalizedTable) -> Result<DataFrame, ParserError> {
    if table.height() == 0 {
        return build_frame(
            table.format,
            vec![
                Series::new(BAR_NAME.into(), Vec::<String>::new()).into(),
                Series::new(GLASS_NAME.into(), Vec::<String>::new()).into(),
                Series::new(STOCK.into(), Vec::<i64>::new()).into(),
            ],
        );
    }

    let bars = required_text(table, BAR_NAME)?
        .into_iter()
        .map(|name| clean_name(&name))
        .collect::<Vec<_>>();
    let glasses = required_text(table, GLASS_NAME)?
        .into_iter()
        .map(|name| clean_glass_name(&clean_name(&name)))
        .collect::<Vec<_>>();
    let stock = column(table, STOCK)?
        .enumerate()
        .map(|(row_index, cell)| {
            clean_stock(cell).map_err(|source| ParserError::DataQuality {
                format: table.format,
                row_index,
                column: STOCK,
                source,
            })
        })
        .collect::<Result<Vec<i64>, _>>()?;

    build_frame(
        table.format,
        vec![
            Series::new(BAR_NAME.into(), bars).into(),
            Series::new(GLASS_NAME.into(), glasses).into(),
            Series::new(STOCK.into(), stock).into(),
        ],
    )
}

pub fn transaction_frame(table: &NormalizedTable) -> Result<DataFrame, ParserError> {
    if table.height() == 0 {
        return build_frame(
            table.format,
            vec![
                Series::new(TRANS_TIME.into(), Vec::<String>::new()).into(),
                Series::new(DRINK_NAME.into(), Vec::<String>::new()).into(),
                Series::new(VALUE.into(), Vec::<f64>::new()).into(),
            ],
        );
    }

    let times = required_text(table, TRANS_TIME)?;
    let drinks = required_text(table, DRINK_NAME)?;
    let values = column(table, VALUE)?
        .enumerate()
        .map(|(row_index, cell)| {
            clean_value(cell).map_err(|source| ParserError::DataQuality {
                format: table.format,
                row_index,
                column: VALUE,
                source,
            })
        })
        .collect::<Result<Vec<f64>, _>>()?;

    build_frame(
        table.format,
        vec![
            Series::new(TRANS_TIME.into(), times).into(),
            Series::new(DRINK_NAME.into(), drinks).into(),
            Series::new(VALUE.into(), values).into(),
        ],
    )
}

fn column<'a>(
    table: &'a NormalizedTable,
    name: &'static str,
) -> Result<impl Iterator<Item = Option<&'a str>> + 'a, ParserError> {
    table
        .column_values(name)
        .ok_or(ParserError::MissingColumn {
            format: table.format,
            column: name,
        })
}

fn required_text(table: &NormalizedTable, name: &'static str) -> Result<Vec<String>, ParserError> {
    column(table, name)?
        .enumerate()
        .map(|(row_index, cell)| {
            cell.map(str::to_string)
                .ok_or_else(|| ParserError::DataQuality {
                    format: table.format,
                    row_index,
                    column: name,
                    source: CleanError::Missing,
                })
        })
        .collect()
}

fn build_frame(format: &'static str, columns: Vec<Column>) -> Result<DataFrame, ParserError> {
    DataFrame::new(columns).map_err(|err| ParserError::Frame {
        format,
        message: err.to_string(),
    })
}
