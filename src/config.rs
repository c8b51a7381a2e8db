//! Configuration loading and resolution
//!
//! Settings are resolved per field with the priority:
//! command-line argument → environment variable → TOML config file →
//! compiled default. The resolved [`Settings`] value is constructed once in
//! `main` and passed to each component; nothing reads the environment later.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4";
pub const DEFAULT_LLM_TEMPERATURE: f64 = 0.0;
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;

/// Resolved application settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// SQLite database file location
    pub database_path: PathBuf,
    /// Completion endpoint connection settings
    pub llm: LlmSettings,
}

/// Connection settings for the completion endpoint
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// API key; empty disables the insight-generation phase
    pub api_key: String,
    /// Base URL of any OpenAI-compatible endpoint
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub timeout_secs: u64,
}

/// On-disk TOML configuration (all fields optional)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub llm: TomlLlmConfig,
}

/// `[llm]` table of the TOML configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlLlmConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub timeout_secs: Option<u64>,
}

impl Settings {
    /// Resolve settings from CLI override, environment, TOML file, and defaults.
    pub fn load(cli_database: Option<&Path>) -> Result<Self> {
        let file = read_config_file();

        let llm = LlmSettings {
            api_key: resolve_str("OPENAI_API_KEY", file.llm.api_key.as_deref(), ""),
            base_url: resolve_str(
                "EHR_LLM_BASE_URL",
                file.llm.base_url.as_deref(),
                DEFAULT_LLM_BASE_URL,
            ),
            model: resolve_str("EHR_LLM_MODEL", file.llm.model.as_deref(), DEFAULT_LLM_MODEL),
            temperature: resolve_parsed(
                "EHR_LLM_TEMPERATURE",
                file.llm.temperature,
                DEFAULT_LLM_TEMPERATURE,
            )?,
            timeout_secs: resolve_parsed(
                "EHR_LLM_TIMEOUT_SECS",
                file.llm.timeout_secs,
                DEFAULT_LLM_TIMEOUT_SECS,
            )?,
        };

        Ok(Self {
            database_path: resolve_database_path(cli_database, &file),
            llm,
        })
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

fn resolve_database_path(cli: Option<&Path>, file: &TomlConfig) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var("EHR_DATABASE_PATH") {
        if !path.trim().is_empty() {
            return PathBuf::from(path.trim());
        }
    }

    if let Some(path) = &file.database_path {
        return path.clone();
    }

    default_database_path()
}

/// OS-dependent default location for the SQLite store
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("ehr-insight").join("ehr.db"))
        .unwrap_or_else(|| PathBuf::from("./ehr_data/ehr.db"))
}

fn resolve_str(env_var: &str, file_value: Option<&str>, default: &str) -> String {
    match std::env::var(env_var) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => file_value
            .map(str::to_string)
            .unwrap_or_else(|| default.to_string()),
    }
}

fn resolve_parsed<T>(env_var: &str, file_value: Option<T>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(env_var) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| Error::Config(format!("invalid {}: {}", env_var, e))),
        _ => Ok(file_value.unwrap_or(default)),
    }
}

/// Platform config file path (`…/ehr-insight/config.toml`)
fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ehr-insight").join("config.toml"))
}

fn read_config_file() -> TomlConfig {
    let Some(path) = config_file_path() else {
        return TomlConfig::default();
    };
    if !path.exists() {
        return TomlConfig::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                debug!("Loaded config file: {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring malformed config file {}: {}", path.display(), e);
                TomlConfig::default()
            }
        },
        Err(e) => {
            warn!("Cannot read config file {}: {}", path.display(), e);
            TomlConfig::default()
        }
    }
}
