//! Clinical insight analysis over stored transcription records
//!
//! Fetches records, invokes the configured insight generator, and stores the
//! generated insight back on the record. Batch runs skip and count
//! per-record failures instead of aborting.

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::transcriptions;
use crate::models::ClinicalInsight;
use crate::services::openai_client::InsightGenerator;
use crate::{Error, Result};

/// Outcome of a batch analysis run
#[derive(Debug, Default)]
pub struct AnalysisReport {
    pub analyzed: usize,
    pub failed: usize,
    /// Generated insights, in input order
    pub insights: Vec<(i64, ClinicalInsight)>,
}

/// Analyze one record and store the generated insight on it
pub async fn analyze_record(
    pool: &SqlitePool,
    generator: &dyn InsightGenerator,
    id: i64,
) -> Result<ClinicalInsight> {
    let record = transcriptions::fetch_record(pool, id).await?;

    if record.transcription.trim().is_empty() {
        return Err(Error::Validation(format!(
            "record {} has no transcription text",
            id
        )));
    }

    let insight = generator
        .generate(&record.medical_specialty, &record.transcription)
        .await?;

    let stored = serde_json::to_string(&insight)?;
    transcriptions::attach_insight(pool, id, &stored).await?;
    info!(id, "Clinical insight stored");

    Ok(insight)
}

/// Analyze a batch of records, continuing past per-record failures
pub async fn analyze_batch(
    pool: &SqlitePool,
    generator: &dyn InsightGenerator,
    ids: &[i64],
) -> Result<AnalysisReport> {
    let mut report = AnalysisReport::default();

    for &id in ids {
        match analyze_record(pool, generator, id).await {
            Ok(insight) => {
                report.analyzed += 1;
                report.insights.push((id, insight));
            }
            Err(e) => {
                warn!(id, "Insight generation failed: {}", e);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}
