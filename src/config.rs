//! TOML configuration.
//!
//! Every section is optional; a missing config file yields the defaults
//! (Gemini provider, no retries, server on `127.0.0.1:7341`). The API key is
//! never stored in the file, only the name of the environment variable that
//! holds it.
//!
//! ```toml
//! [classifier]
//! provider = "gemini"
//! model = "gemini-3-pro-preview"
//! api_key_env = "GEMINI_API_KEY"
//! timeout_secs = 120
//! max_retries = 0
//!
//! [reanalysis]
//! max_context_chars = 50000
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```

use anyhow::{Context, Result};
use fpa_estimator_core::prompt::DEFAULT_MAX_CONTEXT_CHARS;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub reanalysis: ReanalysisConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries for 429/5xx and transport errors. `0` disables retrying.
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_batch_temperature")]
    pub batch_temperature: f64,
    #[serde(default = "default_reanalysis_temperature")]
    pub reanalysis_temperature: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_base: default_api_base(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
            batch_temperature: default_batch_temperature(),
            reanalysis_temperature: default_reanalysis_temperature(),
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-3-pro-preview".to_string()
}
fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_batch_temperature() -> f64 {
    0.1
}
fn default_reanalysis_temperature() -> f64 {
    0.2
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReanalysisConfig {
    /// Characters of extracted document text sent with a re-classification.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    /// Largest document accepted for extraction.
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,
}

impl Default for ReanalysisConfig {
    fn default() -> Self {
        Self {
            max_context_chars: default_max_context_chars(),
            max_document_bytes: default_max_document_bytes(),
        }
    }
}

fn default_max_context_chars() -> usize {
    DEFAULT_MAX_CONTEXT_CHARS
}
fn default_max_document_bytes() -> usize {
    20 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl ClassifierConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

/// Parse and validate a TOML config string.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load the config at `path`, or defaults when the file does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        let config = Config::default();
        validate(&config)?;
        return Ok(config);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

fn validate(config: &Config) -> Result<()> {
    match config.classifier.provider.as_str() {
        "gemini" | "disabled" => {}
        other => anyhow::bail!(
            "Unknown classifier provider: '{}'. Must be gemini or disabled.",
            other
        ),
    }

    if config.classifier.is_enabled() {
        if config.classifier.model.trim().is_empty() {
            anyhow::bail!("classifier.model must not be empty");
        }
        if config.classifier.api_key_env.trim().is_empty() {
            anyhow::bail!("classifier.api_key_env must not be empty");
        }
    }

    if config.classifier.timeout_secs == 0 {
        anyhow::bail!("classifier.timeout_secs must be > 0");
    }

    for (name, t) in [
        ("batch_temperature", config.classifier.batch_temperature),
        ("reanalysis_temperature", config.classifier.reanalysis_temperature),
    ] {
        if !(0.0..=2.0).contains(&t) {
            anyhow::bail!("classifier.{} must be in [0.0, 2.0]", name);
        }
    }

    if config.reanalysis.max_context_chars == 0 {
        anyhow::bail!("reanalysis.max_context_chars must be > 0");
    }
    if config.reanalysis.max_document_bytes == 0 {
        anyhow::bail!("reanalysis.max_document_bytes must be > 0");
    }

    Ok(())
}
