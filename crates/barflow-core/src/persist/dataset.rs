use std::collections::HashSet;

use serde_json::Value;

use super::PersistError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Float,
    Json,
    /// Text with an explicit UTC offset, stored as `TIMESTAMPTZ`.
    TimestampTz,
}

impl ColumnKind {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnKind::Text => "TEXT",
            ColumnKind::Integer => "BIGINT",
            ColumnKind::Float => "DOUBLE PRECISION",
            ColumnKind::Json => "JSONB",
            ColumnKind::TimestampTz => "TIMESTAMPTZ",
        }
    }

    fn accepts(&self, cell: &CellValue) -> bool {
        matches!(
            (self, cell),
            (_, CellValue::Null)
                | (ColumnKind::Text, CellValue::Text(_))
                | (ColumnKind::TimestampTz, CellValue::Text(_))
                | (ColumnKind::Integer, CellValue::Integer(_))
                | (ColumnKind::Float, CellValue::Float(_))
                | (ColumnKind::Json, CellValue::Json(_))
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind }
    }
}

/// `column` must match an existing `table.target` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub table: &'static str,
    pub target: &'static str,
}

impl ForeignKey {
    pub const fn new(column: &'static str, table: &'static str, target: &'static str) -> Self {
        Self {
            column,
            table,
            target,
        }
    }
}

/// Target table layout. Natural-key columns are part of `columns` and double
/// as the upsert conflict target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub key_columns: &'static [&'static str],
    pub columns: &'static [ColumnSpec],
    pub foreign_keys: &'static [ForeignKey],
}

impl TableSpec {
    pub fn is_key(&self, column: &str) -> bool {
        self.key_columns.iter().any(|key| *key == column)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn key_indices(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, column)| self.is_key(column.name))
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn value_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|column| !self.is_key(column.name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Json(Value),
}

/// Rows of one canonical table, checked against its layout.
pub trait TableRecord {
    fn table() -> &'static TableSpec;
    fn cells(&self) -> Vec<CellValue>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    spec: &'static TableSpec,
    rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    pub fn new(spec: &'static TableSpec, rows: Vec<Vec<CellValue>>) -> Result<Self, PersistError> {
        if spec.key_columns.is_empty() {
            return Err(PersistError::NoNaturalKey(spec.name));
        }
        let declared = spec
            .key_columns
            .iter()
            .copied()
            .chain(spec.foreign_keys.iter().map(|fk| fk.column));
        for column in declared {
            if spec.column_index(column).is_none() {
                return Err(PersistError::UnknownKeyColumn {
                    table: spec.name,
                    column,
                });
            }
        }

        let key_indices = spec.key_indices();
        let mut seen_keys = HashSet::with_capacity(rows.len());

        for (row_index, row) in rows.iter().enumerate() {
            if row.len() != spec.columns.len() {
                return Err(PersistError::RowShape {
                    table: spec.name,
                    row_index,
                    expected: spec.columns.len(),
                    found: row.len(),
                });
            }
            for (column, cell) in spec.columns.iter().zip(row) {
                if !column.kind.accepts(cell) {
                    return Err(PersistError::CellType {
                        table: spec.name,
                        row_index,
                        column: column.name,
                    });
                }
                if *cell == CellValue::Null && spec.is_key(column.name) {
                    return Err(PersistError::NullKey {
                        table: spec.name,
                        row_index,
                        column: column.name,
                    });
                }
            }

            let key: Vec<String> = key_indices
                .iter()
                .map(|&idx| format!("{:?}", row[idx]))
                .collect();
            if !seen_keys.insert(key) {
                return Err(PersistError::DuplicateKey {
                    table: spec.name,
                    row_index,
                });
            }
        }

        Ok(Self { spec, rows })
    }

    pub fn from_records<R: TableRecord>(records: &[R]) -> Result<Self, PersistError> {
        Self::new(R::table(), records.iter().map(TableRecord::cells).collect())
    }

    pub fn spec(&self) -> &'static TableSpec {
        self.spec
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
