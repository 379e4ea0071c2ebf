//! Reconciles an in-memory dataset with the store by natural key.
//!
//! A missing table is created with its natural key as primary key and filled
//! directly. An existing table is merged through a uniquely named staging
//! table with `INSERT .. SELECT .. ON CONFLICT .. DO UPDATE`; the staging
//! table is dropped whether or not the merge succeeded.

mod dataset;
mod memory;
mod postgres;
pub mod tables;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

pub use dataset::{
    CellValue, ColumnKind, ColumnSpec, Dataset, ForeignKey, TableRecord, TableSpec,
};
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("table '{0}' does not exist")]
    MissingTable(String),

    #[error("table '{0}' already exists")]
    TableExists(String),

    #[error("{table}.{column} value {value} has no match in {references}")]
    MissingReference {
        table: String,
        column: &'static str,
        references: String,
        value: String,
    },

    #[error("store rejected the operation: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("table {0} declares no natural key")]
    NoNaturalKey(&'static str),

    #[error("table {table} declares key column {column} that it does not contain")]
    UnknownKeyColumn {
        table: &'static str,
        column: &'static str,
    },

    #[error("{table} row {row_index} has {found} cells, expected {expected}")]
    RowShape {
        table: &'static str,
        row_index: usize,
        expected: usize,
        found: usize,
    },

    #[error("{table} row {row_index} has a value of the wrong type for {column}")]
    CellType {
        table: &'static str,
        row_index: usize,
        column: &'static str,
    },

    #[error("{table} row {row_index} has a null natural key column {column}")]
    NullKey {
        table: &'static str,
        row_index: usize,
        column: &'static str,
    },

    #[error("{table} row {row_index} repeats the natural key of an earlier row")]
    DuplicateKey {
        table: &'static str,
        row_index: usize,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Table-level operations the persister needs from a backing store.
#[async_trait]
pub trait Store: Send + Sync {
    async fn table_exists(&self, table: &str) -> Result<bool, StoreError>;

    /// Creates `table` with the column layout of `spec`. When `keyed` is set
    /// the natural key becomes the primary key and the foreign keys are
    /// declared.
    async fn create_table(
        &self,
        table: &str,
        spec: &TableSpec,
        keyed: bool,
    ) -> Result<(), StoreError>;

    /// Appends every row of `dataset` to `table`. Returns the inserted count.
    async fn insert_rows(&self, table: &str, dataset: &Dataset) -> Result<u64, StoreError>;

    /// Merges `staging` into `spec.name`, updating non-key columns of rows
    /// whose natural key already exists. Returns the affected count.
    async fn upsert_from(&self, staging: &str, spec: &TableSpec) -> Result<u64, StoreError>;

    async fn drop_table(&self, table: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PersistOutcome {
    /// Nothing to write; the store was not touched.
    Empty,
    Created { rows: u64 },
    Merged { rows: u64 },
}

pub async fn persist<S>(store: &S, dataset: &Dataset) -> Result<PersistOutcome, PersistError>
where
    S: Store + ?Sized,
{
    let spec = dataset.spec();
    if dataset.is_empty() {
        info!(table = spec.name, "Dataset is empty, skipping");
        return Ok(PersistOutcome::Empty);
    }

    if !store.table_exists(spec.name).await? {
        store.create_table(spec.name, spec, true).await?;
        let rows = store.insert_rows(spec.name, dataset).await?;
        info!(table = spec.name, rows, "Created table");
        return Ok(PersistOutcome::Created { rows });
    }

    let staging = staging_table_name();
    let merged = merge_through(store, &staging, dataset).await;
    let dropped = store.drop_table(&staging).await;

    let rows = match (merged, dropped) {
        (Ok(rows), Ok(())) => rows,
        (Ok(_), Err(err)) => return Err(err.into()),
        (Err(err), Ok(())) => return Err(err.into()),
        (Err(err), Err(drop_err)) => {
            warn!(staging = %staging, error = %drop_err, "Failed to drop staging table");
            return Err(err.into());
        }
    };

    info!(table = spec.name, staging = %staging, rows, "Merged dataset");
    Ok(PersistOutcome::Merged { rows })
}

async fn merge_through<S>(store: &S, staging: &str, dataset: &Dataset) -> Result<u64, StoreError>
where
    S: Store + ?Sized,
{
    let spec = dataset.spec();
    store.create_table(staging, spec, false).await?;
    store.insert_rows(staging, dataset).await?;
    store.upsert_from(staging, spec).await
}

/// `staging_` followed by six random hex digits.
pub fn staging_table_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("staging_{}", &id[..6])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_names_are_short_and_hex() {
        let name = staging_table_name();
        let suffix = name.strip_prefix("staging_").expect("prefix");
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
