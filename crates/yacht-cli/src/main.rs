use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;
use yacht_adapters::{
    export_file_name, load_fixture_doc, map, render_export, score, ExportFormat, FixtureExtractor,
};
use yacht_storage::{DraftStore, PgYachtRepository};
use yacht_sync::{browse_lines, load_listings, AppConfig, MigrationOutcome, MigrationPipeline};

#[derive(Debug, Parser)]
#[command(name = "yacht-cli")]
#[command(about = "De Valk listing migration command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract a listing URL into the draft and print the scores
    Migrate {
        url: String,
        /// Read the extractor document from this file instead of the network
        #[arg(long)]
        fixture: Option<PathBuf>,
        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Map an extractor document file and print the local record
    Map { file: PathBuf },
    /// Export the current draft
    Export {
        #[arg(long, default_value = "json")]
        format: ExportFormat,
        /// Write `devalk-yacht-<model>-<date>.<ext>` into this directory
        /// instead of printing
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Read one JSON filter object per line from stdin and print the
    /// debounced matches
    Browse,
    /// Run the HTTP server
    Serve,
    /// Apply database migrations
    DbMigrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Migrate { url, fixture, json } => {
            let pipeline = match fixture {
                Some(path) => MigrationPipeline::new(
                    Arc::new(FixtureExtractor::new(path)),
                    Arc::new(DraftStore::new(config.drafts_dir.clone())),
                ),
                None => MigrationPipeline::from_config(&config)?,
            };
            let outcome = pipeline.migrate(&url).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_summary(&outcome);
            }
        }
        Commands::Map { file } => {
            let doc = load_fixture_doc(&file)?;
            let mapped = map(&doc);
            let score = score(&mapped.record);
            println!("{}", serde_json::to_string_pretty(&mapped.record)?);
            info!(
                confidence = score.confidence,
                completeness = score.completeness,
                missing = ?mapped.missing_core_fields,
                "mapped {}",
                file.display()
            );
        }
        Commands::Export { format, out_dir } => {
            let drafts = DraftStore::new(config.drafts_dir.clone());
            let record = drafts.load().await.unwrap_or_default();
            let body = render_export(&record, format)?;
            match out_dir {
                Some(dir) => {
                    let path = dir.join(export_file_name(&record, Utc::now().date_naive(), format));
                    tokio::fs::write(&path, body)
                        .await
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("{}", path.display());
                }
                None => println!("{body}"),
            }
        }
        Commands::Browse => {
            let listings = load_listings(&config.listings_path()).await?;
            let stdin = BufReader::new(tokio::io::stdin());
            let evaluations = browse_lines(
                Arc::new(listings),
                config.filter_debounce(),
                stdin,
                |results| {
                    let ids: Vec<&str> = results.listings.iter().map(|l| l.id.as_str()).collect();
                    println!("{}", json!({ "count": ids.len(), "ids": ids }));
                },
            )
            .await?;
            info!(evaluations, "browse input finished");
        }
        Commands::Serve => {
            yacht_web::serve(config).await?;
        }
        Commands::DbMigrate => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set to run migrations")?;
            let repo = PgYachtRepository::connect(url, config.db_max_connections).await?;
            repo.run_migrations().await?;
            info!("database migrations applied");
        }
    }

    Ok(())
}

fn print_summary(outcome: &MigrationOutcome) {
    let meta = &outcome.metadata;
    println!(
        "migrated {}: model={} confidence={} completeness={}%",
        meta.source_url,
        outcome.record.value("model"),
        meta.confidence,
        meta.data_completeness
    );
    if !meta.missing_core_fields.is_empty() {
        println!("missing core fields: {}", meta.missing_core_fields.join(", "));
    }
    for warning in &meta.warnings {
        println!("warning: {warning}");
    }
    for item in outcome.equipment.iter().chain(&outcome.features) {
        println!("  {item}");
    }
}
