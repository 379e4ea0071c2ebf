use barflow_core::inventory::{aggregate, concat_frames};
use barflow_parser::schema::{BAR_NAME, GLASS_NAME, STOCK};
use barflow_parser::{parse_source_file, SourceFormat};
use polars::prelude::*;

fn fixture(name: &str) -> Vec<u8> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../barflow-parser/tests/data")
        .join(name);
    std::fs::read(path).expect("read fixture")
}

fn inventory(rows: &[(&str, &str, i64)]) -> DataFrame {
    df!(
        BAR_NAME => rows.iter().map(|r| r.0).collect::<Vec<_>>(),
        GLASS_NAME => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
        STOCK => rows.iter().map(|r| r.2).collect::<Vec<_>>(),
    )
    .expect("frame")
}

#[test]
fn fixture_inventory_sums_per_location_and_globally() {
    let frame = parse_source_file(SourceFormat::BarInventory, &fixture("bar_data.csv"))
        .expect("parse inventory");
    let summary = aggregate(&frame).expect("aggregate");

    let names: Vec<&str> = summary.locations.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, ["BUDAPEST", "LONDON", "NEW_YORK"]);

    let london = &summary.locations[1];
    assert_eq!(london.stock.get("BEER_GLASS"), Some(42));
    assert_eq!(london.stock.get("BALLOON_GLASS"), Some(34));
    assert_eq!(summary.locations[2].stock.get("COPPER_MUG"), Some(12));

    let beer = summary
        .glass_types
        .iter()
        .find(|g| g.name == "BEER_GLASS")
        .expect("beer glass total");
    assert_eq!(beer.stock, 47);
}

#[test]
fn single_location_totals_match_the_location_map() {
    let summary = aggregate(&inventory(&[
        ("LONDON", "BEER_GLASS", 34),
        ("LONDON", "BEER_GLASS", 8),
    ]))
    .expect("aggregate");

    assert_eq!(summary.locations.len(), 1);
    assert_eq!(summary.locations[0].name, "LONDON");
    assert_eq!(summary.locations[0].stock.get("BEER_GLASS"), Some(42));
    assert_eq!(summary.glass_types.len(), 1);
    assert_eq!(summary.glass_types[0].name, "BEER_GLASS");
    assert_eq!(summary.glass_types[0].stock, 42);
}

#[test]
fn aggregation_ignores_row_order() {
    let rows = [
        ("LONDON", "BEER_GLASS", 34),
        ("BUDAPEST", "WINE_GLASS", 3),
        ("LONDON", "BEER_GLASS", 8),
        ("BUDAPEST", "BEER_GLASS", 5),
        ("LONDON", "COPPER_MUG", 1),
    ];
    let mut reversed = rows;
    reversed.reverse();

    let forward = aggregate(&inventory(&rows)).expect("forward");
    let backward = aggregate(&inventory(&reversed)).expect("backward");
    assert_eq!(forward, backward);

    let names: Vec<&str> = forward.glass_types.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, ["BEER_GLASS", "COPPER_MUG", "WINE_GLASS"]);
}

#[test]
fn negative_stock_is_rejected() {
    let err = aggregate(&inventory(&[("LONDON", "BEER_GLASS", -3)])).expect_err("negative");
    assert!(err.to_string().contains("negative stock"));
}

#[test]
fn frames_from_several_files_are_combined() {
    let first = inventory(&[("LONDON", "BEER_GLASS", 34)]);
    let second = inventory(&[("LONDON", "BEER_GLASS", 8)]);
    let combined = concat_frames(vec![first, second]).expect("concat");
    assert_eq!(combined.height(), 2);

    let summary = aggregate(&combined).expect("aggregate");
    assert_eq!(summary.locations[0].stock.get("BEER_GLASS"), Some(42));
}

#[test]
fn empty_inventory_yields_empty_summary() {
    let combined = concat_frames(Vec::new()).expect("concat");
    let summary = aggregate(&combined).expect("aggregate");
    assert!(summary.locations.is_empty());
    assert!(summary.glass_types.is_empty());
}
