//! One run over the queue directory: classify and parse every queued file,
//! build the four canonical datasets, persist them, then clear the queue.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use barflow_parser::{classify_file_name, parse_source_file, SourceFile};
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{LocationRegistry, PipelineConfig};
use crate::enrichment::{
    distinct_drinks, enrich, transactions_from_frames, DrinkCache, TransactionEnricher,
};
use crate::inventory::{aggregate, concat_frames};
use crate::lookup::DrinkLookup;
use crate::persist::{persist, PersistOutcome, Store};
use crate::types::CanonicalDatasets;

#[derive(Debug, Clone)]
pub struct BatchFile {
    pub path: PathBuf,
    pub name: String,
    pub contents: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Parsed into one of the datasets.
    Parsed,
    /// Recognized as transactions for a location nobody configured.
    Skipped,
    /// Not a file name the pipeline consumes; left in the queue.
    Ignored,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    pub format: Option<&'static str>,
    pub status: FileStatus,
    pub rows: usize,
    pub message: Option<String>,
}

impl FileReport {
    /// Consumed files are removed from the queue once the run succeeds.
    pub fn consumed(&self) -> bool {
        matches!(self.status, FileStatus::Parsed | FileStatus::Skipped)
    }
}

#[derive(Debug)]
pub struct BatchOutput {
    pub datasets: CanonicalDatasets,
    pub reports: Vec<FileReport>,
    pub lookups: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub table: &'static str,
    pub outcome: PersistOutcome,
}

#[derive(Debug, Serialize)]
pub struct BatchReceipt {
    pub files: Vec<FileReport>,
    pub lookups: usize,
    pub tables: Vec<TableReport>,
    pub removed: usize,
}

/// Reads every regular file in `dir`, ordered by file name.
pub fn load_queue(dir: &Path) -> Result<Vec<BatchFile>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read queue directory {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            warn!(path = %path.display(), "Skipping queue entry with a non UTF-8 name");
            continue;
        };
        let contents =
            std::fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        files.push(BatchFile {
            path,
            name,
            contents,
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Parses, aggregates and enriches the queued files into the canonical
/// datasets. Drink glass types are looked up once per distinct drink.
pub async fn build_datasets<L>(
    files: &[BatchFile],
    registry: &LocationRegistry,
    lookup: &L,
) -> Result<BatchOutput>
where
    L: DrinkLookup + ?Sized,
{
    let mut reports = Vec::with_capacity(files.len());
    let mut inventory_frames = Vec::new();
    let mut transaction_frames: Vec<DataFrame> = Vec::new();

    for file in files {
        let Some(source) = classify_file_name(&file.name) else {
            info!(file = %file.name, "Ignoring unrecognized queue file");
            reports.push(FileReport {
                file: file.name.clone(),
                format: None,
                status: FileStatus::Ignored,
                rows: 0,
                message: None,
            });
            continue;
        };
        let format = source.format();

        let location = match &source {
            SourceFile::Inventory => None,
            SourceFile::Transactions { city, .. } => match registry.resolve(city) {
                Some(location) => Some(location),
                None => {
                    warn!(file = %file.name, city = %city, "No location configured, skipping file");
                    reports.push(FileReport {
                        file: file.name.clone(),
                        format: Some(format.name()),
                        status: FileStatus::Skipped,
                        rows: 0,
                        message: Some(format!("unknown location {city}")),
                    });
                    continue;
                }
            },
        };

        let frame = parse_source_file(format, &file.contents)
            .with_context(|| format!("failed to parse {}", file.name))?;
        let rows = frame.height();

        match location {
            None => inventory_frames.push(frame),
            Some(location) => {
                let enriched = enrich(&frame, location)
                    .with_context(|| format!("failed to enrich {}", file.name))?;
                transaction_frames.push(enriched);
            }
        }

        info!(file = %file.name, format = format.name(), rows, "Parsed queue file");
        reports.push(FileReport {
            file: file.name.clone(),
            format: Some(format.name()),
            status: FileStatus::Parsed,
            rows,
            message: None,
        });
    }

    let inventory = concat_frames(inventory_frames).context("failed to combine inventory")?;
    let summary = aggregate(&inventory).context("failed to aggregate inventory")?;

    let mut enricher = TransactionEnricher::new(lookup, DrinkCache::new());
    for frame in &transaction_frames {
        let drinks = distinct_drinks(frame)?;
        enricher
            .resolve_drinks(drinks)
            .await
            .context("failed to resolve drink glass types")?;
    }
    let lookups = enricher.lookups();
    let drinks = enricher.into_cache().drinks();
    let transactions = transactions_from_frames(&transaction_frames)?;

    info!(
        locations = summary.locations.len(),
        glass_types = summary.glass_types.len(),
        drinks = drinks.len(),
        transactions = transactions.len(),
        lookups,
        "Built canonical datasets"
    );

    Ok(BatchOutput {
        datasets: CanonicalDatasets {
            locations: summary.locations,
            glass_types: summary.glass_types,
            drinks,
            transactions,
        },
        reports,
        lookups,
    })
}

/// Writes the datasets one table at a time, in dependency order.
pub async fn persist_datasets<S>(store: &S, datasets: &CanonicalDatasets) -> Result<Vec<TableReport>>
where
    S: Store + ?Sized,
{
    let mut tables = Vec::with_capacity(4);
    for dataset in datasets.to_datasets()? {
        let table = dataset.spec().name;
        let outcome = persist(store, &dataset)
            .await
            .with_context(|| format!("failed to persist table {table}"))?;
        tables.push(TableReport { table, outcome });
    }
    Ok(tables)
}

/// Deletes consumed files from the queue. Returns how many were removed.
pub fn remove_consumed(files: &[BatchFile], reports: &[FileReport]) -> Result<usize> {
    let mut removed = 0;
    for (file, report) in files.iter().zip(reports) {
        if !report.consumed() {
            continue;
        }
        std::fs::remove_file(&file.path)
            .with_context(|| format!("failed to remove {}", file.path.display()))?;
        removed += 1;
    }
    Ok(removed)
}

/// Processes the whole queue named by `config` to completion.
pub async fn run_batch<S, L>(config: &PipelineConfig, store: &S, lookup: &L) -> Result<BatchReceipt>
where
    S: Store + ?Sized,
    L: DrinkLookup + ?Sized,
{
    let registry = config.location_registry()?;
    let files = load_queue(&config.queue_dir)?;
    info!(queue = %config.queue_dir.display(), files = files.len(), "Loaded queue");

    let output = build_datasets(&files, &registry, lookup).await?;
    let tables = persist_datasets(store, &output.datasets).await?;

    let removed = if config.keep_files {
        info!("Keeping consumed files in the queue");
        0
    } else {
        remove_consumed(&files, &output.reports)?
    };

    Ok(BatchReceipt {
        files: output.reports,
        lookups: output.lookups,
        tables,
        removed,
    })
}
