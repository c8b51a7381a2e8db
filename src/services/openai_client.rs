//! OpenAI-compatible chat-completions client
//!
//! Calls any endpoint speaking the OpenAI chat-completions wire format.
//! All connection details come from [`LlmSettings`]; nothing is hardcoded.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::LlmSettings;
use crate::models::ClinicalInsight;
use crate::services::prompt_builder::PromptBuilder;

const USER_AGENT: &str = concat!("ehr-insight/", env!("CARGO_PKG_VERSION"));

/// Completion endpoint errors
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP transport or connection error
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout
    #[error("completion request timed out")]
    Timeout,

    /// The endpoint rejected the API key
    #[error("authentication rejected by completion endpoint")]
    Auth,

    /// The endpoint throttled the request
    #[error("rate limit exceeded")]
    RateLimited,

    /// Any other non-success HTTP status
    #[error("completion endpoint returned {0}: {1}")]
    Api(u16, String),

    /// The response body or completion content could not be parsed
    #[error("failed to parse completion response: {0}")]
    Parse(String),

    /// The endpoint returned no usable text content
    #[error("completion endpoint returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Request(e.to_string())
        }
    }
}

impl From<LlmError> for crate::Error {
    fn from(e: LlmError) -> Self {
        crate::Error::ExternalService(e.to_string())
    }
}

/// Async interface for insight generation.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `&dyn InsightGenerator` across the pipeline; the production
/// implementation is [`OpenAiClient`], tests substitute mocks.
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    async fn generate(
        &self,
        specialty: &str,
        transcription: &str,
    ) -> Result<ClinicalInsight, LlmError>;
}

/// Chat-completions API client
pub struct OpenAiClient {
    http_client: reqwest::Client,
    settings: LlmSettings,
    prompt_builder: PromptBuilder,
}

impl OpenAiClient {
    /// Build a client from resolved settings
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, LlmError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| LlmError::Request(e.to_string()))?;

        Ok(Self {
            http_client,
            settings: settings.clone(),
            prompt_builder: PromptBuilder::new(),
        })
    }
}

#[async_trait]
impl InsightGenerator for OpenAiClient {
    /// Request a clinical insight for one transcription.
    ///
    /// The `Authorization: Bearer …` header is attached only when the
    /// configured API key is non-empty, so local providers that require no
    /// authentication keep working.
    async fn generate(
        &self,
        specialty: &str,
        transcription: &str,
    ) -> Result<ClinicalInsight, LlmError> {
        let (system_msg, user_msg) = self.prompt_builder.build_chat(specialty, transcription);

        let url = format!(
            "{}/v1/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );

        let body = serde_json::json!({
            "model": self.settings.model,
            "messages": [
                { "role": "system", "content": system_msg },
                { "role": "user", "content": user_msg }
            ],
            "stream": false,
            "temperature": self.settings.temperature
        });

        debug!(url = %url, model = %self.settings.model, "Requesting clinical insight");

        let mut request = self.http_client.post(&url).json(&body);
        let key = self.settings.api_key.trim();
        if !key.is_empty() {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LlmError::Auth);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(status.as_u16(), text));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(LlmError::EmptyResponse)?
            .trim();

        if content.is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        parse_insight(content)
    }
}

/// Parse completion content into a [`ClinicalInsight`].
///
/// Models frequently wrap JSON answers in Markdown code fences despite
/// instructions; those are stripped before parsing.
pub fn parse_insight(content: &str) -> Result<ClinicalInsight, LlmError> {
    let body = strip_code_fence(content);
    serde_json::from_str(body).map_err(|e| LlmError::Parse(e.to_string()))
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    inner.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_settings(api_key: &str) -> LlmSettings {
        LlmSettings {
            api_key: api_key.to_string(),
            base_url: "http://localhost:11434".to_string(),
            model: "gpt-4".to_string(),
            temperature: 0.0,
            timeout_secs: 10,
        }
    }

    #[test]
    fn from_settings_builds_without_panic() {
        let _client = OpenAiClient::from_settings(&make_settings("")).unwrap();
        let _client = OpenAiClient::from_settings(&make_settings("sk-test-1234")).unwrap();
    }

    /// Verify that `OpenAiClient` is object-safe (usable as `dyn InsightGenerator`).
    #[test]
    fn client_is_object_safe() {
        let client: Box<dyn InsightGenerator> =
            Box::new(OpenAiClient::from_settings(&make_settings("")).unwrap());
        drop(client);
    }

    #[test]
    fn parse_insight_accepts_plain_json() {
        let content = r#"{
            "summary": "Normal echocardiogram",
            "key_findings": ["LVEF 51%"],
            "medical_terms": ["ejection fraction"],
            "recommendations": ["routine follow-up"],
            "specialty_context": "Typical cardiology study"
        }"#;

        let insight = parse_insight(content).unwrap();
        assert_eq!(insight.summary, "Normal echocardiogram");
        assert_eq!(insight.key_findings, vec!["LVEF 51%"]);
    }

    #[test]
    fn parse_insight_strips_code_fences() {
        let content = "```json\n{\"summary\": \"ok\"}\n```";
        let insight = parse_insight(content).unwrap();
        assert_eq!(insight.summary, "ok");

        let bare_fence = "```\n{\"summary\": \"ok\"}\n```";
        assert_eq!(parse_insight(bare_fence).unwrap().summary, "ok");
    }

    #[test]
    fn parse_insight_defaults_missing_lists() {
        let insight = parse_insight(r#"{"summary": "short"}"#).unwrap();
        assert!(insight.key_findings.is_empty());
        assert!(insight.medical_terms.is_empty());
        assert!(insight.recommendations.is_empty());
        assert_eq!(insight.specialty_context, "");
    }

    #[test]
    fn parse_insight_rejects_non_json() {
        let err = parse_insight("The patient is healthy.").unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
    }

    #[test]
    fn llm_error_converts_to_external_service() {
        let err: crate::Error = LlmError::RateLimited.into();
        assert!(matches!(err, crate::Error::ExternalService(_)));
    }
}
