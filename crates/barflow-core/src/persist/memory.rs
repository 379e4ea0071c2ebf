use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{CellValue, Dataset, Store, StoreError, TableSpec};

#[derive(Debug, Clone)]
struct MemoryTable {
    columns: Vec<&'static str>,
    /// Positions of the primary-key columns; `None` for unkeyed tables.
    key: Option<Vec<usize>>,
    rows: Vec<Vec<CellValue>>,
}

impl MemoryTable {
    fn position(&self, key: &[usize], row: &[CellValue]) -> Option<usize> {
        self.rows
            .iter()
            .position(|existing| key.iter().all(|&idx| existing[idx] == row[idx]))
    }
}

/// Rejects rows whose foreign key values are absent from the referenced
/// table. Null values reference nothing and pass.
fn check_references(
    tables: &BTreeMap<String, MemoryTable>,
    table: &str,
    spec: &TableSpec,
    rows: &[Vec<CellValue>],
) -> Result<(), StoreError> {
    for fk in spec.foreign_keys {
        let Some(column) = spec.column_index(fk.column) else {
            continue;
        };
        let referenced = tables
            .get(fk.table)
            .ok_or_else(|| StoreError::MissingTable(fk.table.to_string()))?;
        let target = referenced
            .columns
            .iter()
            .position(|name| *name == fk.target)
            .ok_or_else(|| {
                StoreError::Rejected(format!("table {} has no column {}", fk.table, fk.target))
            })?;

        for row in rows {
            let value = &row[column];
            if *value == CellValue::Null {
                continue;
            }
            if !referenced.rows.iter().any(|parent| parent[target] == *value) {
                return Err(StoreError::MissingReference {
                    table: table.to_string(),
                    column: fk.column,
                    references: fk.table.to_string(),
                    value: match value {
                        CellValue::Text(text) => text.clone(),
                        other => format!("{other:?}"),
                    },
                });
            }
        }
    }
    Ok(())
}

/// Store kept entirely in process memory, with the same key and upsert
/// semantics as the Postgres store, foreign keys included. Backs `--dry-run`
/// and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<BTreeMap<String, MemoryTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a table's rows in insertion order.
    pub fn rows(&self, table: &str) -> Option<Vec<Vec<CellValue>>> {
        let tables = self.tables.lock().ok()?;
        tables.get(table).map(|t| t.rows.clone())
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables
            .lock()
            .map(|tables| tables.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, MemoryTable>>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Rejected("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        Ok(self.lock()?.contains_key(table))
    }

    async fn create_table(
        &self,
        table: &str,
        spec: &TableSpec,
        keyed: bool,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if tables.contains_key(table) {
            return Err(StoreError::TableExists(table.to_string()));
        }
        tables.insert(
            table.to_string(),
            MemoryTable {
                columns: spec.columns.iter().map(|c| c.name).collect(),
                key: keyed.then(|| spec.key_indices()),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    async fn insert_rows(&self, table: &str, dataset: &Dataset) -> Result<u64, StoreError> {
        let mut tables = self.lock()?;
        let keyed = tables
            .get(table)
            .ok_or_else(|| StoreError::MissingTable(table.to_string()))?
            .key
            .is_some();
        if keyed {
            check_references(&tables, table, dataset.spec(), dataset.rows())?;
        }
        let target = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::MissingTable(table.to_string()))?;

        let columns: Vec<&str> = dataset.spec().columns.iter().map(|c| c.name).collect();
        if columns != target.columns {
            return Err(StoreError::Rejected(format!(
                "column layout of {} does not match table {table}",
                dataset.spec().name
            )));
        }

        if let Some(key) = target.key.clone() {
            for row in dataset.rows() {
                if target.position(&key, row).is_some() {
                    return Err(StoreError::Rejected(format!(
                        "duplicate primary key in table {table}"
                    )));
                }
                target.rows.push(row.clone());
            }
        } else {
            target.rows.extend(dataset.rows().iter().cloned());
        }
        Ok(dataset.len() as u64)
    }

    async fn upsert_from(&self, staging: &str, spec: &TableSpec) -> Result<u64, StoreError> {
        let mut tables = self.lock()?;
        let incoming = tables
            .get(staging)
            .ok_or_else(|| StoreError::MissingTable(staging.to_string()))?
            .rows
            .clone();
        check_references(&tables, spec.name, spec, &incoming)?;
        let target = tables
            .get_mut(spec.name)
            .ok_or_else(|| StoreError::MissingTable(spec.name.to_string()))?;
        let key = target.key.clone().ok_or_else(|| {
            StoreError::Rejected(format!("table {} has no primary key", spec.name))
        })?;
        let has_values = spec.value_columns().next().is_some();

        let mut affected = 0;
        for row in incoming {
            match target.position(&key, &row) {
                Some(idx) if has_values => {
                    target.rows[idx] = row;
                    affected += 1;
                }
                Some(_) => {}
                None => {
                    target.rows.push(row);
                    affected += 1;
                }
            }
        }
        Ok(affected)
    }

    async fn drop_table(&self, table: &str) -> Result<(), StoreError> {
        self.lock()?.remove(table);
        Ok(())
    }
}
