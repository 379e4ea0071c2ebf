use std::path::PathBuf;

use anyhow::{Context, Result};
use barflow_core::batch::{run_batch, BatchReceipt};
use barflow_core::config::PipelineConfig;
use barflow_core::db;
use barflow_core::lookup::CocktailDbClient;
use barflow_core::persist::{MemoryStore, PgStore};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Bar inventory and sales ingestion", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process every file in the queue directory and write the results
    Run(RunArgs),
    /// Create the canonical tables if they do not exist
    Migrate,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Path to barflow.toml (built-in defaults when omitted)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write to an in-memory store and leave the queue untouched
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            let receipt = run(args).await?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
            Ok(())
        }
        Command::Migrate => {
            let pool = connect_pool().await?;
            db::run_migrations(&pool).await?;
            info!("Database migrations applied");
            Ok(())
        }
    }
}

async fn run(args: RunArgs) -> Result<BatchReceipt> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let lookup = CocktailDbClient::new(&config.lookup).context("failed to build lookup client")?;

    if args.dry_run {
        info!("Dry run: writing to an in-memory store");
        config.keep_files = true;
        let store = MemoryStore::new();
        return run_batch(&config, &store, &lookup).await;
    }

    let pool = connect_pool().await?;
    let store = PgStore::new(pool);
    run_batch(&config, &store, &lookup).await
}

async fn connect_pool() -> Result<db::DbPool> {
    let database_url = db::database_url_from_env()?;
    db::connect(&database_url).await
}
