use std::borrow::Cow;
use std::collections::HashSet;
use std::io::Read;

use csv::ReaderBuilder;
use flate2::read::GzDecoder;

use crate::errors::ParserError;
use crate::formats::{FieldMap, Layout, SourceFormat};
use crate::model::{NormalizedTable, RawTable};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Reads delimited bytes (optionally gzip-compressed) without interpreting
/// any row as a header.
pub fn read_raw_table(format: SourceFormat, contents: &[u8]) -> Result<RawTable, ParserError> {
    let bytes = decompress(format.name(), contents)?;
    let layout = format.layout();

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(layout.delimiter())
        .from_reader(bytes.as_ref());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| ParserError::Csv {
            format: format.name(),
            source,
        })?;
        rows.push(
            record
                .iter()
                .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                .collect(),
        );
    }

    let labels = match layout {
        Layout::Fixed { columns, .. } => {
            Some(columns.iter().map(|column| column.to_string()).collect())
        }
        Layout::Headed { .. } => None,
    };

    Ok(RawTable {
        format: format.name(),
        labels,
        rows,
    })
}

fn decompress<'a>(format: &'static str, contents: &'a [u8]) -> Result<Cow<'a, [u8]>, ParserError> {
    if !contents.starts_with(&GZIP_MAGIC) {
        return Ok(Cow::Borrowed(contents));
    }
    let mut decoded = Vec::new();
    GzDecoder::new(contents)
        .read_to_end(&mut decoded)
        .map_err(|source| ParserError::Decompress { format, source })?;
    Ok(Cow::Owned(decoded))
}

/// Maps a raw table onto canonical column labels.
///
/// Columns with no value in any row are dropped first. With a field map the
/// first row is taken as the header: it is removed from the data, uppercased
/// and renamed through the map (labels absent from the map keep their
/// uppercased text). Without one, the raw table's positional labels are used
/// as-is. Every surviving cell is uppercased.
///
/// A header with no data rows yields an empty table; only a headed layout
/// with no header at all is an error.
pub fn normalize(raw: RawTable, field_map: Option<&FieldMap>) -> Result<NormalizedTable, ParserError> {
    let format = raw.format;
    let width = raw.width();

    // A headerless layout with no rows still has its positional columns.
    let kept: Vec<usize> = if raw.rows.is_empty() {
        (0..width).collect()
    } else {
        (0..width)
            .filter(|&column| (0..raw.rows.len()).any(|row| raw.cell(row, column).is_some()))
            .collect()
    };

    let (columns, data_start) = match field_map {
        Some(fields) => {
            if raw.rows.is_empty() {
                return Err(ParserError::MissingHeader { format });
            }
            let columns = kept
                .iter()
                .map(|&column| {
                    let label = raw
                        .cell(0, column)
                        .map(str::to_uppercase)
                        .unwrap_or_else(|| format!("UNNAMED_{column}"));
                    match fields.canonical(&label) {
                        Some(canonical) => canonical.to_string(),
                        None => label,
                    }
                })
                .collect::<Vec<_>>();
            (columns, 1)
        }
        None => {
            let columns = kept
                .iter()
                .map(|&column| {
                    raw.labels
                        .as_ref()
                        .and_then(|labels| labels.get(column))
                        .cloned()
                        .unwrap_or_else(|| format!("COLUMN_{column}"))
                })
                .collect::<Vec<_>>();
            (columns, 0)
        }
    };

    let mut seen = HashSet::new();
    for column in &columns {
        if !seen.insert(column.as_str()) {
            return Err(ParserError::DuplicateColumn {
                format,
                column: column.clone(),
            });
        }
    }

    let rows: Vec<Vec<Option<String>>> = (data_start..raw.rows.len())
        .map(|row| {
            kept.iter()
                .map(|&column| raw.cell(row, column).map(str::to_uppercase))
                .collect()
        })
        .collect();

    Ok(NormalizedTable {
        format,
        columns,
        rows,
    })
}
