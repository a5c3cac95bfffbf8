//! Configuration loading, validation, and management for IKMS.
//!
//! Loads configuration from `~/.ikms/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.ikms/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default chat model used by every pipeline stage
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Vector index and ingestion settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Session memory settings
    #[serde(default)]
    pub sessions: SessionConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.0
}
fn default_max_tokens() -> u32 {
    1024
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("retrieval", &self.retrieval)
            .field("sessions", &self.sessions)
            .field("gateway", &self.gateway)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Number of passages returned per search
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default)]
    pub min_score: f32,

    /// Chunk length in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Texts per embedding request during ingestion
    #[serde(default = "default_embedding_batch_size")]
    pub embedding_batch_size: usize,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_top_k() -> usize {
    4
}
fn default_chunk_size() -> usize {
    500
}
fn default_chunk_overlap() -> usize {
    50
}
fn default_embedding_batch_size() -> usize {
    64
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            embedding_model: default_embedding_model(),
            top_k: default_top_k(),
            min_score: 0.0,
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            embedding_batch_size: default_embedding_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Cap on live sessions; unset keeps every session for the life of the
    /// process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_sessions: Option<usize>,

    /// Prior turns required before the summary is (re)generated
    #[serde(default = "default_compaction_threshold")]
    pub compaction_threshold: usize,

    /// Longest generated title accepted, in characters
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
}

fn default_compaction_threshold() -> usize {
    2
}
fn default_title_max_chars() -> usize {
    50
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: None,
            compaction_threshold: default_compaction_threshold(),
            title_max_chars: default_title_max_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Where uploaded PDFs are stored (wiped at startup)
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Origins allowed by CORS (the browser UI)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_upload_dir() -> String {
    "data/uploads".into()
}
fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}
fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:8501".into()]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            upload_dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
            cors_origins: default_cors_origins(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.ikms/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `IKMS_API_KEY` (highest priority)
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        // Environment variable overrides (highest priority)
        if config.api_key.is_none() {
            config.api_key = std::env::var("IKMS_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("IKMS_PROVIDER") {
            config.default_provider = provider;
        }

        if let Ok(model) = std::env::var("IKMS_MODEL") {
            config.default_model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ikms")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.retrieval.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.chunk_size must be > 0".into(),
            ));
        }

        if self.retrieval.chunk_overlap >= self.retrieval.chunk_size {
            return Err(ConfigError::ValidationError(
                "retrieval.chunk_overlap must be smaller than retrieval.chunk_size".into(),
            ));
        }

        if self.retrieval.top_k == 0 || self.retrieval.embedding_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k and retrieval.embedding_batch_size must be > 0".into(),
            ));
        }

        if self.sessions.compaction_threshold == 0 {
            return Err(ConfigError::ValidationError(
                "sessions.compaction_threshold must be >= 1".into(),
            ));
        }

        if self.sessions.max_sessions == Some(0) {
            return Err(ConfigError::ValidationError(
                "sessions.max_sessions must be > 0 when set".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            retrieval: RetrievalConfig::default(),
            sessions: SessionConfig::default(),
            gateway: GatewayConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
