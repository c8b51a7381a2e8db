//! Data models for ehr-insight

pub mod import_report;
pub mod insight;

pub use import_report::{ImportReport, RowError, RowErrorSeverity};
pub use insight::ClinicalInsight;
