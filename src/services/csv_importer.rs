//! CSV dataset importer
//!
//! Validates the expected columns, parses rows, and inserts each as a
//! transcription record. Malformed rows are logged and counted; a single bad
//! row never aborts the import. Duplicate record ids are skipped, so
//! re-importing a file leaves existing records untouched.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::db::transcriptions::{self, TranscriptionRecord};
use crate::models::{ImportReport, RowError};
use crate::{Error, Result};

/// Columns that must be present in the dataset header
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "description",
    "medical_specialty",
    "sample_name",
    "transcription",
    "keywords",
];

/// Per-column statistics gathered without importing
#[derive(Debug, Clone, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub non_empty: usize,
    pub empty: usize,
    pub unique_values: usize,
}

/// Analysis of a CSV file
#[derive(Debug, Clone, Serialize)]
pub struct CsvSummary {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnSummary>,
}

/// Import a CSV file into the transcriptions table
pub async fn import_csv(pool: &SqlitePool, csv_path: &Path) -> Result<ImportReport> {
    let start = Instant::now();
    info!("Starting import of CSV file: {}", csv_path.display());

    ensure_exists(csv_path)?;
    let source_file = source_file_name(csv_path);

    let mut reader = csv::Reader::from_path(csv_path)?;
    let headers = reader.headers()?.clone();
    let header_index = validate_headers(&headers)?;
    let id_index = headers
        .iter()
        .position(|h| h.trim().is_empty() || h.trim().eq_ignore_ascii_case("id"));
    if id_index.is_none() {
        debug!("No id column in header, numbering records by row position");
    }

    let mut report = ImportReport::new();

    for (index, result) in reader.records().enumerate() {
        let row_number = (index + 1) as u64;
        report.rows_read += 1;

        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!(row = row_number, "Malformed CSV row: {}", e);
                report.failed += 1;
                report
                    .errors
                    .push(RowError::skip(row_number, "PARSE_ERROR", e.to_string()));
                continue;
            }
        };

        let id = match id_index {
            Some(idx) => {
                let raw = record.get(idx).map(str::trim).unwrap_or_default();
                match raw.parse::<i64>() {
                    Ok(id) => id,
                    Err(_) => {
                        warn!(row = row_number, "Row id {:?} is not an integer", raw);
                        report.failed += 1;
                        report.errors.push(RowError::skip(
                            row_number,
                            "INVALID_ID",
                            format!("id {:?} is not an integer", raw),
                        ));
                        continue;
                    }
                }
            }
            None => row_number as i64,
        };

        let field = |name: &str| -> Option<String> {
            header_index
                .get(name)
                .and_then(|&i| record.get(i))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let transcription = field("transcription").unwrap_or_default();
        if transcription.is_empty() {
            report.errors.push(RowError::warning(
                row_number,
                "EMPTY_TRANSCRIPTION",
                format!("record {} has no transcription text", id),
            ));
        }

        let mut row = TranscriptionRecord::new(
            id,
            field("medical_specialty").unwrap_or_default(),
            transcription,
            source_file.clone(),
        );
        row.sample_name = field("sample_name");
        row.description = field("description");
        row.keywords = field("keywords");

        match transcriptions::insert_record(pool, &row).await {
            Ok(true) => report.inserted += 1,
            Ok(false) => {
                debug!(id, "Duplicate record id, skipping");
                report.skipped += 1;
            }
            Err(e) => {
                warn!(row = row_number, "Insert failed: {}", e);
                report.failed += 1;
                report
                    .errors
                    .push(RowError::skip(row_number, "INSERT_ERROR", e.to_string()));
            }
        }
    }

    report.duration_seconds = start.elapsed().as_secs_f64();
    info!(
        inserted = report.inserted,
        skipped = report.skipped,
        failed = report.failed,
        "Import completed in {:.2} seconds",
        report.duration_seconds
    );

    Ok(report)
}

/// Analyze a CSV file without importing it
pub fn analyze_csv(csv_path: &Path) -> Result<CsvSummary> {
    info!("Analyzing CSV file: {}", csv_path.display());
    ensure_exists(csv_path)?;

    let mut reader = csv::Reader::from_path(csv_path)?;
    let headers = reader.headers()?.clone();

    let mut non_empty = vec![0usize; headers.len()];
    let mut unique: Vec<HashSet<String>> = vec![HashSet::new(); headers.len()];
    let mut row_count = 0usize;

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping malformed row during analysis: {}", e);
                continue;
            }
        };
        row_count += 1;
        for (i, counter) in non_empty.iter_mut().enumerate() {
            if let Some(value) = record.get(i) {
                let value = value.trim();
                if !value.is_empty() {
                    *counter += 1;
                    unique[i].insert(value.to_string());
                }
            }
        }
    }

    let columns = headers
        .iter()
        .enumerate()
        .map(|(i, name)| ColumnSummary {
            name: name.to_string(),
            non_empty: non_empty[i],
            empty: row_count - non_empty[i],
            unique_values: unique[i].len(),
        })
        .collect();

    info!("CSV analysis completed: {} rows, {} columns", row_count, headers.len());

    Ok(CsvSummary {
        row_count,
        column_count: headers.len(),
        columns,
    })
}

fn ensure_exists(csv_path: &Path) -> Result<()> {
    if csv_path.exists() {
        Ok(())
    } else {
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("CSV file not found: {}", csv_path.display()),
        )))
    }
}

fn source_file_name(csv_path: &Path) -> String {
    csv_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| csv_path.display().to_string())
}

/// Check the header carries every required column, returning a name → index map
fn validate_headers(headers: &csv::StringRecord) -> Result<HashMap<String, usize>> {
    let header_index: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_string(), i))
        .collect();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !header_index.contains_key(**column))
        .copied()
        .collect();

    if missing.is_empty() {
        Ok(header_index)
    } else {
        Err(Error::Validation(format!(
            "CSV is missing required columns: {}",
            missing.join(", ")
        )))
    }
}
