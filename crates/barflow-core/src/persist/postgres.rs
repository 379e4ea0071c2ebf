use async_trait::async_trait;
use serde_json::Value;
use sqlx::query_builder::Separated;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use super::{CellValue, ColumnKind, Dataset, Store, StoreError, TableSpec};

/// Postgres caps a single statement at 65535 bind parameters.
const BIND_LIMIT: usize = 65_535;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_list(spec: &TableSpec) -> String {
    spec.columns
        .iter()
        .map(|column| quote_ident(column.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_cell(
    builder: &mut Separated<'_, '_, Postgres, &'static str>,
    kind: ColumnKind,
    cell: &CellValue,
) {
    match (kind, cell) {
        (ColumnKind::TimestampTz, CellValue::Text(text)) => {
            builder.push_bind(text.clone());
            builder.push_unseparated("::timestamptz");
        }
        (ColumnKind::TimestampTz, _) => {
            builder.push_bind(None::<String>);
            builder.push_unseparated("::timestamptz");
        }
        (_, CellValue::Text(text)) => {
            builder.push_bind(text.clone());
        }
        (_, CellValue::Integer(value)) => {
            builder.push_bind(*value);
        }
        (_, CellValue::Float(value)) => {
            builder.push_bind(*value);
        }
        (_, CellValue::Json(value)) => {
            builder.push_bind(Json(value.clone()));
        }
        (ColumnKind::Text, CellValue::Null) => {
            builder.push_bind(None::<String>);
        }
        (ColumnKind::Integer, CellValue::Null) => {
            builder.push_bind(None::<i64>);
        }
        (ColumnKind::Float, CellValue::Null) => {
            builder.push_bind(None::<f64>);
        }
        (ColumnKind::Json, CellValue::Null) => {
            builder.push_bind(None::<Json<Value>>);
        }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM information_schema.tables
                WHERE table_schema = current_schema()
                  AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create_table(
        &self,
        table: &str,
        spec: &TableSpec,
        keyed: bool,
    ) -> Result<(), StoreError> {
        let mut definitions: Vec<String> = spec
            .columns
            .iter()
            .map(|column| format!("{} {}", quote_ident(column.name), column.kind.sql_type()))
            .collect();
        if keyed {
            let keys = spec
                .key_columns
                .iter()
                .map(|key| quote_ident(key))
                .collect::<Vec<_>>()
                .join(", ");
            definitions.push(format!("PRIMARY KEY ({keys})"));
            for fk in spec.foreign_keys {
                definitions.push(format!(
                    "FOREIGN KEY ({}) REFERENCES {} ({})",
                    quote_ident(fk.column),
                    quote_ident(fk.table),
                    quote_ident(fk.target)
                ));
            }
        }

        let sql = format!(
            "CREATE TABLE {} ({})",
            quote_ident(table),
            definitions.join(", ")
        );
        debug!(%sql, "Creating table");
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_rows(&self, table: &str, dataset: &Dataset) -> Result<u64, StoreError> {
        let spec = dataset.spec();
        let chunk_rows = (BIND_LIMIT / spec.columns.len().max(1)).max(1);
        let prefix = format!("INSERT INTO {} ({}) ", quote_ident(table), column_list(spec));

        let mut inserted = 0;
        for chunk in dataset.rows().chunks(chunk_rows) {
            let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(&prefix);
            builder.push_values(chunk, |mut separated, row| {
                for (column, cell) in spec.columns.iter().zip(row) {
                    push_cell(&mut separated, column.kind, cell);
                }
            });
            inserted += builder.build().execute(&self.pool).await?.rows_affected();
        }
        Ok(inserted)
    }

    async fn upsert_from(&self, staging: &str, spec: &TableSpec) -> Result<u64, StoreError> {
        let columns = column_list(spec);
        let keys = spec
            .key_columns
            .iter()
            .map(|key| quote_ident(key))
            .collect::<Vec<_>>()
            .join(", ");
        let updates = spec
            .value_columns()
            .map(|column| {
                let name = quote_ident(column.name);
                format!("{name} = EXCLUDED.{name}")
            })
            .collect::<Vec<_>>();
        let action = if updates.is_empty() {
            "DO NOTHING".to_string()
        } else {
            format!("DO UPDATE SET {}", updates.join(", "))
        };

        let sql = format!(
            "INSERT INTO {target} ({columns}) SELECT {columns} FROM {staging} ON CONFLICT ({keys}) {action}",
            target = quote_ident(spec.name),
            staging = quote_ident(staging),
        );
        debug!(%sql, "Merging staging table");
        let result = sqlx::query(&sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn drop_table(&self, table: &str) -> Result<(), StoreError> {
        let sql = format!("DROP TABLE IF EXISTS {}", quote_ident(table));
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }
}
