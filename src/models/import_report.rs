//! Import operation results and errors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RowErrorSeverity {
    /// Row imported, but a field needs attention downstream
    Warning,
    /// Row cannot be imported, import continues
    Skip,
}

/// Import error details for one CSV row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowError {
    /// 1-based data row number in the source file
    pub row_number: u64,

    /// Error code (e.g., "INVALID_ID", "PARSE_ERROR")
    pub error_code: String,

    /// Human-readable error message
    pub error_message: String,

    /// Error severity
    pub severity: RowErrorSeverity,

    /// When the error occurred
    pub occurred_at: DateTime<Utc>,
}

impl RowError {
    /// Create new warning
    pub fn warning(row_number: u64, error_code: &str, error_message: String) -> Self {
        Self {
            row_number,
            error_code: error_code.to_string(),
            error_message,
            severity: RowErrorSeverity::Warning,
            occurred_at: Utc::now(),
        }
    }

    /// Create new skip error
    pub fn skip(row_number: u64, error_code: &str, error_message: String) -> Self {
        Self {
            row_number,
            error_code: error_code.to_string(),
            error_message,
            severity: RowErrorSeverity::Skip,
            occurred_at: Utc::now(),
        }
    }
}

/// Import completion result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    /// Total data rows read from the file
    pub rows_read: usize,

    /// Rows inserted as new records
    pub inserted: usize,

    /// Rows skipped because their id already existed
    pub skipped: usize,

    /// Rows that could not be imported
    pub failed: usize,

    /// Errors encountered (categorized by severity)
    pub errors: Vec<RowError>,

    /// Duration in seconds
    pub duration_seconds: f64,
}

impl ImportReport {
    /// Create new empty report
    pub fn new() -> Self {
        Self {
            rows_read: 0,
            inserted: 0,
            skipped: 0,
            failed: 0,
            errors: Vec::new(),
            duration_seconds: 0.0,
        }
    }

    /// Count errors by severity
    pub fn count_by_severity(&self, severity: RowErrorSeverity) -> usize {
        self.errors.iter().filter(|e| e.severity == severity).count()
    }
}

impl Default for ImportReport {
    fn default() -> Self {
        Self::new()
    }
}
