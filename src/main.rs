//! ehr-insight - Medical transcription analysis tool
//!
//! Runs the fixed import → query → process sequence: imports a
//! medical-transcription CSV dataset into the SQLite store, prints query
//! summaries over it, and generates clinical insights for selected records
//! through an OpenAI-compatible completion endpoint.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::SqlitePool;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ehr_insight::config::{self, Settings};
use ehr_insight::db::transcriptions::{self, RecordFilter};
use ehr_insight::db;
use ehr_insight::models::ClinicalInsight;
use ehr_insight::services::{csv_importer, insight_analyzer, OpenAiClient};

/// Command-line arguments for ehr-insight
#[derive(Parser, Debug)]
#[command(name = "ehr-insight")]
#[command(about = "Medical transcription import, query, and insight tool")]
#[command(version)]
struct Args {
    /// CSV dataset to import; the import phase is skipped when absent
    #[arg(short, long)]
    csv: Option<PathBuf>,

    /// SQLite database file (overrides environment and config file)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Keyword to search transcriptions for
    #[arg(long)]
    search: Option<String>,

    /// Restrict queries and analysis to one medical specialty
    #[arg(long)]
    specialty: Option<String>,

    /// Maximum number of records to list or analyze
    #[arg(long, default_value = "3")]
    limit: i64,

    /// Record id to analyze; defaults to records matching the filter
    #[arg(long)]
    analyze: Option<i64>,

    /// Skip the insight-generation phase
    #[arg(long)]
    skip_llm: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ehr_insight=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let settings =
        Settings::load(args.database.as_deref()).context("Failed to load configuration")?;

    info!("Starting ehr-insight");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Database: {}", settings.database_path.display());

    let pool = db::init_database_pool(&settings.database_path)
        .await
        .context("Failed to open database")?;

    match &args.csv {
        Some(csv_path) => run_import(&pool, csv_path).await?,
        None => info!("No CSV given, skipping import phase"),
    }

    run_queries(&pool, &args).await?;

    if args.skip_llm {
        info!("Insight generation skipped (--skip-llm)");
    } else {
        run_processor(&pool, &settings, &args).await?;
    }

    Ok(())
}

/// Import phase: analyze the CSV, then load it into the store
async fn run_import(pool: &SqlitePool, csv_path: &Path) -> Result<()> {
    println!("=== DATA IMPORT ===");

    let summary = csv_importer::analyze_csv(csv_path)?;
    println!(
        "{}: {} rows, {} columns",
        csv_path.display(),
        summary.row_count,
        summary.column_count
    );

    let report = csv_importer::import_csv(pool, csv_path).await?;
    println!(
        "Import complete: {} inserted, {} duplicates skipped, {} failed ({:.2}s)",
        report.inserted, report.skipped, report.failed, report.duration_seconds
    );

    Ok(())
}

/// Query phase: specialty summary plus optional keyword search
async fn run_queries(pool: &SqlitePool, args: &Args) -> Result<()> {
    println!("\n=== DATA ACCESS ===");

    let total = transcriptions::count_records(pool).await?;
    println!("{} transcription records", total);

    println!("Records by specialty:");
    for entry in transcriptions::specialty_counts(pool).await? {
        println!("  - {}: {}", entry.specialty, entry.count);
    }

    if let Some(term) = &args.search {
        let filter = RecordFilter {
            specialty: args.specialty.clone(),
            keyword: Some(term.clone()),
            limit: Some(args.limit),
            offset: None,
        };
        let results = transcriptions::list_records(pool, &filter).await?;

        println!("\n{} results for '{}':", results.len(), term);
        for record in &results {
            println!(
                "  - #{} {} ({}): {:.100}",
                record.id,
                record.sample_name.as_deref().unwrap_or("(unnamed)"),
                record.medical_specialty,
                record.description.as_deref().unwrap_or("")
            );
        }
    }

    Ok(())
}

/// Process phase: generate and store clinical insights for selected records
async fn run_processor(pool: &SqlitePool, settings: &Settings, args: &Args) -> Result<()> {
    println!("\n=== PROCESSOR ===");

    if !config::is_valid_key(&settings.llm.api_key) {
        warn!("No API key configured; set OPENAI_API_KEY to enable insight generation");
        return Ok(());
    }

    let client = OpenAiClient::from_settings(&settings.llm)?;

    let ids: Vec<i64> = match args.analyze {
        Some(id) => vec![id],
        None => {
            let filter = RecordFilter {
                specialty: args.specialty.clone(),
                keyword: args.search.clone(),
                limit: Some(args.limit),
                offset: None,
            };
            transcriptions::list_records(pool, &filter)
                .await?
                .into_iter()
                .map(|record| record.id)
                .collect()
        }
    };

    if ids.is_empty() {
        println!("No records to analyze.");
        return Ok(());
    }

    info!("Analyzing {} record(s)", ids.len());
    let report = insight_analyzer::analyze_batch(pool, &client, &ids).await?;

    for (id, insight) in &report.insights {
        print_insight(*id, insight);
    }
    println!(
        "\nAnalysis complete: {} analyzed, {} failed",
        report.analyzed, report.failed
    );

    Ok(())
}

fn print_insight(id: i64, insight: &ClinicalInsight) {
    println!("\nANALYSIS RESULTS (record #{}):", id);
    println!("\nSummary: {}", insight.summary);

    println!("\nKey findings:");
    for finding in &insight.key_findings {
        println!("- {}", finding);
    }

    println!("\nMedical terms:");
    for term in &insight.medical_terms {
        println!("- {}", term);
    }

    println!("\nRecommendations:");
    for recommendation in &insight.recommendations {
        println!("- {}", recommendation);
    }

    println!("\nSpecialty context: {}", insight.specialty_context);
}
