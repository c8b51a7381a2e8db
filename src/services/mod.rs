//! Service modules for the import → query → insight pipeline

pub mod csv_importer;
pub mod insight_analyzer;
pub mod openai_client;
pub mod prompt_builder;

pub use csv_importer::{ColumnSummary, CsvSummary};
pub use insight_analyzer::AnalysisReport;
pub use openai_client::{InsightGenerator, LlmError, OpenAiClient};
pub use prompt_builder::PromptBuilder;
