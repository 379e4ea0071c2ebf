use std::env;

use anyhow::Result;
use barflow_core::persist::tables::GLASSES;
use barflow_core::persist::{persist, Dataset, PersistError, PersistOutcome, PgStore, Store};
use barflow_core::types::{Drink, GlassType, Location, StockMap, Transaction};
use barflow_core::db;
use sqlx::Row;
use tokio::runtime::Runtime;

fn glasses(rows: &[(&str, i64)]) -> Dataset {
    let records: Vec<GlassType> = rows
        .iter()
        .map(|(name, stock)| GlassType {
            name: name.to_string(),
            stock: *stock,
        })
        .collect();
    Dataset::from_records(&records).expect("dataset")
}

async fn drop_canonical_tables(pool: &db::DbPool) -> Result<()> {
    for table in ["transactions", "drinks", "glasses", "bars"] {
        sqlx::query(&format!("DROP TABLE IF EXISTS {table} CASCADE"))
            .execute(pool)
            .await?;
    }
    Ok(())
}

#[test]
fn postgres_upsert_roundtrip() -> Result<()> {
    let database_url = match env::var("BARFLOW_TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping Postgres integration test because BARFLOW_TEST_DATABASE_URL is not set"
            );
            return Ok(());
        }
    };

    let rt = Runtime::new()?;
    rt.block_on(async move {
        let pool = db::connect(&database_url).await?;
        drop_canonical_tables(&pool).await?;
        let store = PgStore::new(pool.clone());

        let created = persist(&store, &glasses(&[("BEER_GLASS", 42), ("COPPER_MUG", 12)])).await?;
        assert_eq!(created, PersistOutcome::Created { rows: 2 });

        let merged = persist(&store, &glasses(&[("COPPER_MUG", 15), ("SHOT_GLASS", 9)])).await?;
        assert_eq!(merged, PersistOutcome::Merged { rows: 2 });

        let rows = sqlx::query(r#"SELECT "GLASS_NAME", "STOCK" FROM glasses ORDER BY "GLASS_NAME""#)
            .fetch_all(&pool)
            .await?;
        let stored: Vec<(String, i64)> = rows
            .iter()
            .map(|row| -> Result<(String, i64), sqlx::Error> {
                Ok((row.try_get("GLASS_NAME")?, row.try_get("STOCK")?))
            })
            .collect::<Result<_, _>>()?;
        assert_eq!(
            stored,
            vec![
                ("BEER_GLASS".to_string(), 42),
                ("COPPER_MUG".to_string(), 15),
                ("SHOT_GLASS".to_string(), 9),
            ]
        );

        let staging: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = current_schema() AND table_name LIKE 'staging_%'",
        )
        .fetch_one(&pool)
        .await?;
        assert_eq!(staging, 0);

        assert!(store.table_exists(GLASSES.name).await?);

        let bars = Dataset::from_records(&[Location {
            name: "BUDAPEST".to_string(),
            stock: StockMap::try_from_counts([("BEER_GLASS", 5)])?,
        }])?;
        persist(&store, &bars).await?;

        let dangling = Dataset::from_records(&[Drink {
            name: "MOJITO".to_string(),
            glass: "HIGHBALL_GLASS".to_string(),
        }])?;
        let err = persist(&store, &dangling)
            .await
            .expect_err("drinks must reference a stored glass");
        assert!(matches!(err, PersistError::Store(_)));

        let drinks = Dataset::from_records(&[Drink {
            name: "BLUE_MARGARITA".to_string(),
            glass: "BEER_GLASS".to_string(),
        }])?;
        persist(&store, &drinks).await?;

        let transactions = Dataset::from_records(&[Transaction {
            id: 0,
            location: "BUDAPEST".to_string(),
            drink: "BLUE_MARGARITA".to_string(),
            value: 7.5,
            timestamp: "2023-03-05 14:30:00+1:00".to_string(),
        }])?;
        persist(&store, &transactions).await?;
        let same_instant: bool = sqlx::query_scalar(
            r#"SELECT "TRANS_TIME" = '2023-03-05 13:30:00+00'::timestamptz FROM transactions WHERE "TRANS_ID" = 0"#,
        )
        .fetch_one(&pool)
        .await?;
        assert!(same_instant);

        drop_canonical_tables(&pool).await?;
        Ok::<_, anyhow::Error>(())
    })?;

    Ok(())
}
