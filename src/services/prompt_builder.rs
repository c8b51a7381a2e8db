//! Prompt construction for clinical insight generation
//!
//! Prompts are deterministic: the same specialty and transcription always
//! produce byte-identical system and user messages, so generation behavior
//! differences can only come from the model itself.

/// System instruction, including the JSON shape the model must answer with.
/// The shape mirrors [`crate::models::ClinicalInsight`].
const SYSTEM_INSTRUCTION: &str = "\
You are an AI assistant for healthcare professionals. Analyze the medical \
transcription provided by the user and respond with clinical insights.

Respond with ONLY a JSON object, no prose before or after it, in exactly \
this shape:
{
  \"summary\": \"brief summary of the medical transcription\",
  \"key_findings\": [\"key medical findings from the transcription\"],
  \"medical_terms\": [\"important medical terminology used\"],
  \"recommendations\": [\"recommendations or follow-up actions mentioned\"],
  \"specialty_context\": \"how this fits into the medical specialty context\"
}";

/// Builds chat prompts for the completion endpoint
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build a `(system_msg, user_msg)` pair for a chat-completions request
    pub fn build_chat(&self, specialty: &str, transcription: &str) -> (String, String) {
        let user = format!(
            "MEDICAL SPECIALTY: {}\n\nTRANSCRIPTION:\n{}",
            specialty, transcription
        );
        (SYSTEM_INSTRUCTION.to_string(), user)
    }
}
