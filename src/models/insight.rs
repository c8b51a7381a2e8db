//! Structured clinical insight generated for a transcription

use serde::{Deserialize, Serialize};

/// Structured output of the insight generator.
///
/// Fields other than the summary default to empty when the model omits them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalInsight {
    /// Brief summary of the medical transcription
    pub summary: String,

    /// Key medical findings from the transcription
    #[serde(default)]
    pub key_findings: Vec<String>,

    /// Important medical terminology used
    #[serde(default)]
    pub medical_terms: Vec<String>,

    /// Recommendations or follow-up actions mentioned
    #[serde(default)]
    pub recommendations: Vec<String>,

    /// How this fits into the medical specialty context
    #[serde(default)]
    pub specialty_context: String,
}
