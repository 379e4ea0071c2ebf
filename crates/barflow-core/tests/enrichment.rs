use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use barflow_core::config::LocationConfig;
use barflow_core::enrichment::{
    distinct_drinks, enrich, transactions_from_frames, DrinkCache, EnrichmentError,
    TransactionEnricher, TIMEZONE,
};
use barflow_core::lookup::{DrinkCandidate, DrinkLookup, LookupError};
use barflow_parser::schema::{BAR_NAME, DRINK_NAME, TRANS_TIME, VALUE};
use barflow_parser::{parse_source_file, SourceFormat};
use polars::prelude::*;

/// Answers from a fixed table and records every query it receives.
#[derive(Default)]
struct FakeLookup {
    glasses: HashMap<String, String>,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl FakeLookup {
    fn with(entries: &[(&str, &str)]) -> Self {
        Self {
            glasses: entries
                .iter()
                .map(|(drink, glass)| (drink.to_string(), glass.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DrinkLookup for FakeLookup {
    async fn search(&self, name: &str) -> Result<Vec<DrinkCandidate>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().expect("queries").push(name.to_string());
        Ok(self
            .glasses
            .get(&name.to_lowercase())
            .map(|glass| {
                vec![DrinkCandidate {
                    name: Some(name.to_string()),
                    glass: Some(glass.clone()),
                }]
            })
            .unwrap_or_default())
    }
}

fn fixture(name: &str) -> Vec<u8> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../barflow-parser/tests/data")
        .join(name);
    std::fs::read(path).expect("read fixture")
}

fn budapest() -> LocationConfig {
    LocationConfig::new("BUDAPEST", "BUDAPEST", "+1:00")
}

#[test]
fn enrich_attaches_location_and_rewrites_timestamps() {
    let frame = parse_source_file(SourceFormat::BarTransactions, &fixture("budapest.csv"))
        .expect("parse");
    let enriched = enrich(&frame, &budapest()).expect("enrich");

    assert_eq!(enriched.height(), 3);
    let times = enriched.column(TRANS_TIME).unwrap().as_materialized_series().str().unwrap();
    assert_eq!(times.get(0), Some("2023-03-05 14:30:00+1:00"));
    assert_eq!(times.get(2), Some("2023-03-06 09:00:00+1:00"));

    let drinks = enriched.column(DRINK_NAME).unwrap().as_materialized_series().str().unwrap();
    assert_eq!(drinks.get(0), Some("BLUE_MARGARITA"));
    assert_eq!(drinks.get(1), Some("MARGARITA"));

    let bars = enriched.column(BAR_NAME).unwrap().as_materialized_series().str().unwrap();
    assert!(bars.into_iter().all(|bar| bar == Some("BUDAPEST")));
    let zones = enriched.column(TIMEZONE).unwrap().as_materialized_series().str().unwrap();
    assert_eq!(zones.get(1), Some("+1:00"));

    let values = enriched.column(VALUE).unwrap().as_materialized_series().f64().unwrap();
    assert_eq!(values.get(0), Some(7.5));
}

#[test]
fn configured_bar_names_are_normalized() {
    let frame = parse_source_file(SourceFormat::BarTransactions, &fixture("budapest.csv"))
        .expect("parse");
    let enriched = enrich(&frame, &LocationConfig::new("PARIS", "Paris Bar", "+2:00"))
        .expect("enrich");

    let bars = enriched.column(BAR_NAME).unwrap().as_materialized_series().str().unwrap();
    assert_eq!(bars.get(0), Some("PARIS_BAR"));
    let times = enriched.column(TRANS_TIME).unwrap().as_materialized_series().str().unwrap();
    assert_eq!(times.get(0), Some("2023-03-05 14:30:00+2:00"));
}

#[test]
fn distinct_drinks_keeps_first_appearance_order() {
    let frame = parse_source_file(SourceFormat::BarTransactions, &fixture("budapest.csv"))
        .expect("parse");
    let enriched = enrich(&frame, &budapest()).expect("enrich");
    assert_eq!(
        distinct_drinks(&enriched).expect("distinct"),
        ["BLUE_MARGARITA", "MARGARITA"]
    );
}

#[tokio::test]
async fn each_distinct_drink_is_looked_up_once() {
    let lookup = FakeLookup::with(&[
        ("blue margarita", "Cocktail glass"),
        ("margarita", "Cocktail glass"),
        ("mojito", "Highball glass"),
    ]);
    let mut enricher = TransactionEnricher::new(&lookup, DrinkCache::new());

    enricher
        .resolve_drinks([
            "BLUE_MARGARITA",
            "MARGARITA",
            "BLUE_MARGARITA",
            "MOJITO",
            "MARGARITA",
        ])
        .await
        .expect("resolve");

    assert_eq!(lookup.calls(), 3);
    assert_eq!(enricher.lookups(), 3);
    assert_eq!(
        *lookup.queries.lock().unwrap(),
        ["BLUE MARGARITA", "MARGARITA", "MOJITO"]
    );

    let cache = enricher.into_cache();
    assert_eq!(cache.get("MOJITO"), Some("HIGHBALL_GLASS"));
    assert_eq!(cache.get("BLUE_MARGARITA"), Some("COCKTAIL_GLASS"));
    let drinks: Vec<String> = cache.drinks().into_iter().map(|d| d.name).collect();
    assert_eq!(drinks, ["BLUE_MARGARITA", "MARGARITA", "MOJITO"]);
}

#[tokio::test]
async fn cached_drinks_skip_the_lookup() {
    let lookup = FakeLookup::with(&[("mojito", "Highball glass")]);
    let mut enricher = TransactionEnricher::new(&lookup, DrinkCache::new());
    enricher.resolve_drink("MOJITO").await.expect("first");

    let mut next = TransactionEnricher::new(&lookup, enricher.into_cache());
    assert_eq!(next.resolve_drink("MOJITO").await.expect("cached"), "HIGHBALL_GLASS");
    assert_eq!(lookup.calls(), 1);
    assert_eq!(next.lookups(), 0);
}

#[tokio::test]
async fn glass_names_pass_through_the_misspelling_table() {
    let lookup = FakeLookup::with(&[("moscow mule", "Coper Mug")]);
    let mut enricher = TransactionEnricher::new(&lookup, DrinkCache::new());
    let glass = enricher.resolve_drink("MOSCOW_MULE").await.expect("resolve");
    assert_eq!(glass, "COPPER_MUG");
}

#[tokio::test]
async fn unknown_drink_is_an_enrichment_miss() {
    let lookup = FakeLookup::default();
    let mut enricher = TransactionEnricher::new(&lookup, DrinkCache::new());
    let err = enricher
        .resolve_drink("NOT_A_DRINK")
        .await
        .expect_err("no candidates");
    assert!(matches!(err, EnrichmentError::NoMatch(ref drink) if drink == "NOT_A_DRINK"));
    assert!(enricher.cache().is_empty());
}

#[test]
fn transaction_ids_run_across_all_frames() {
    let budapest_frame = enrich(
        &parse_source_file(SourceFormat::BarTransactions, &fixture("budapest.csv")).expect("parse"),
        &budapest(),
    )
    .expect("enrich");
    let london_frame = enrich(
        &parse_source_file(
            SourceFormat::LondonTransactions,
            &fixture("london_transactions.tsv"),
        )
        .expect("parse"),
        &LocationConfig::new("LONDON", "LONDON", "+0:00"),
    )
    .expect("enrich");

    let transactions =
        transactions_from_frames(&[budapest_frame, london_frame]).expect("transactions");
    let ids: Vec<i64> = transactions.iter().map(|t| t.id).collect();
    assert_eq!(ids, [0, 1, 2, 3, 4]);

    let last = &transactions[4];
    assert_eq!(last.location, "LONDON");
    assert_eq!(last.drink, "OLD_FASHIONED");
    assert_eq!(last.value, 8.0);
    assert_eq!(last.timestamp, "2023-03-05 10:00:00+0:00");
}
