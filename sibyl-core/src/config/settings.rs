//! Settings configuration loaded from TOML files.
//!
//! This module handles non-sensitive configuration stored in TOML format
//! in the XDG config directory (~/.config/sibyl/config.toml).

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default TOML configuration file content
const DEFAULT_CONFIG_TOML: &str = r#"# sibyl configuration file
# Located at: ~/.config/sibyl/config.toml
#
# This file contains non-sensitive configuration.
# The completion API key is loaded from the environment variable named
# by api_key_env (unset it for local servers that need no key).

[model]
model = "llama-3.3-70b-versatile"
base_url = "https://api.groq.com/openai/v1"
api_key_env = "GROQ_API_KEY"
max_completion_tokens = 1024

[history]
trim_max_tokens = 3000

[retrieval]
k = 3
fetch_k = 10
mmr_lambda = 0.4

[index]
embedding_url = "http://127.0.0.1:11434"
embedding_model = "embeddinggemma:latest"
embedding_dim = 768
chunk_size = 2000
chunk_overlap = 100
# db_path = "/var/lib/sibyl/index.db"

[gateway]
host = "127.0.0.1"
port = 8000

[logging]
level = "info"
file_enabled = false
# file_path = "/var/log/sibyl.log"
"#;

/// Settings loaded from the TOML configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    /// Completion model configuration
    #[serde(default)]
    pub model: ModelSettings,

    /// Conversation history trimming
    #[serde(default)]
    pub history: HistorySettings,

    /// Retrieval parameters
    #[serde(default)]
    pub retrieval: RetrievalSettings,

    /// Document index configuration
    #[serde(default)]
    pub index: IndexSettings,

    /// Gateway server configuration
    #[serde(default)]
    pub gateway: GatewaySettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Completion model configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelSettings {
    /// Model identifier sent to the provider
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_model_base_url")]
    pub base_url: String,

    /// Env var name used to resolve the provider API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,

    /// Maximum completion tokens per request
    #[serde(default = "default_max_completion_tokens")]
    pub max_completion_tokens: u32,
}

/// Conversation history settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistorySettings {
    /// Token budget a transcript must fit before each pipeline run
    #[serde(default = "default_trim_max_tokens")]
    pub trim_max_tokens: u32,
}

/// Retrieval settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalSettings {
    /// Number of chunks returned per query
    #[serde(default = "default_retrieval_k")]
    pub k: usize,

    /// Candidate over-fetch before diversity re-ranking
    #[serde(default = "default_retrieval_fetch_k")]
    pub fetch_k: usize,

    /// MMR relevance/diversity balance (1.0 = pure relevance)
    #[serde(default = "default_mmr_lambda")]
    pub mmr_lambda: f32,
}

/// Document index settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexSettings {
    /// Embedding provider base URL (Ollama-style /api/embed endpoint)
    #[serde(default = "default_embedding_url")]
    pub embedding_url: String,

    /// Embedding model name
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding vector dimension
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,

    /// Chunk size in characters for document splitting
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Chunk overlap in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Optional override for the index database path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
}

/// Gateway server settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewaySettings {
    /// Host to bind to
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

/// Logging settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to log to file
    #[serde(default)]
    pub file_enabled: bool,

    /// Log file path (if file_enabled is true)
    pub file_path: Option<String>,
}

// Default value functions

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_model_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_api_key_env() -> Option<String> {
    Some("GROQ_API_KEY".to_string())
}

fn default_max_completion_tokens() -> u32 {
    1024
}

fn default_trim_max_tokens() -> u32 {
    3000
}

fn default_retrieval_k() -> usize {
    3
}

fn default_retrieval_fetch_k() -> usize {
    10
}

fn default_mmr_lambda() -> f32 {
    0.4
}

fn default_embedding_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_embedding_model() -> String {
    "embeddinggemma:latest".to_string()
}

fn default_embedding_dim() -> usize {
    768
}

fn default_chunk_size() -> usize {
    2000
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_model_base_url(),
            api_key_env: default_api_key_env(),
            max_completion_tokens: default_max_completion_tokens(),
        }
    }
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            trim_max_tokens: default_trim_max_tokens(),
        }
    }
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            k: default_retrieval_k(),
            fetch_k: default_retrieval_fetch_k(),
            mmr_lambda: default_mmr_lambda(),
        }
    }
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            embedding_url: default_embedding_url(),
            embedding_model: default_embedding_model(),
            embedding_dim: default_embedding_dim(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            db_path: None,
        }
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_enabled: false,
            file_path: None,
        }
    }
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    ConfigDirNotFound,
}

impl Settings {
    /// Load settings from the TOML configuration file.
    ///
    /// If the config file doesn't exist, creates it with default values.
    /// The file is located at `~/.config/sibyl/config.toml`.
    pub fn load() -> Result<Self, SettingsError> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::info!("Creating default configuration at {:?}", config_path);
            Self::create_default_config(&config_path)?;
        }

        let content = fs::read_to_string(&config_path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(content)?;
        Ok(settings)
    }

    /// Serialize settings to TOML content.
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the configuration file path.
    ///
    /// Uses XDG config directory: `~/.config/sibyl/config.toml`
    pub fn config_path() -> Result<PathBuf, SettingsError> {
        if let Ok(override_dir) = std::env::var("SIBYL_CONFIG_DIR") {
            let dir = PathBuf::from(override_dir);
            return Ok(dir.join("config.toml"));
        }

        let config_dir = dirs::config_dir()
            .ok_or(SettingsError::ConfigDirNotFound)?
            .join("sibyl");

        Ok(config_dir.join("config.toml"))
    }

    /// Create the default configuration file.
    fn create_default_config(path: &PathBuf) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, DEFAULT_CONFIG_TOML)?;

        Ok(())
    }

    /// Save settings to a specific file path.
    pub fn save_to_path(&self, path: &PathBuf) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = self.to_toml()?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the HTTP bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.gateway.host, self.gateway.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();

        assert_eq!(settings.model.model, "llama-3.3-70b-versatile");
        assert_eq!(settings.model.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(settings.model.api_key_env.as_deref(), Some("GROQ_API_KEY"));
        assert_eq!(settings.model.max_completion_tokens, 1024);

        assert_eq!(settings.history.trim_max_tokens, 3000);

        assert_eq!(settings.retrieval.k, 3);
        assert_eq!(settings.retrieval.fetch_k, 10);
        assert!((settings.retrieval.mmr_lambda - 0.4).abs() < f32::EPSILON);

        assert_eq!(settings.index.embedding_dim, 768);
        assert_eq!(settings.index.chunk_size, 2000);
        assert_eq!(settings.index.chunk_overlap, 100);
        assert!(settings.index.db_path.is_none());

        assert_eq!(settings.gateway.host, "127.0.0.1");
        assert_eq!(settings.gateway.port, 8000);

        assert_eq!(settings.logging.level, "info");
        assert!(!settings.logging.file_enabled);
    }

    #[test]
    fn test_bind_addr() {
        let settings = Settings::default();
        assert_eq!(settings.bind_addr(), "127.0.0.1:8000");
    }

    #[test]
    fn test_default_config_toml_parses() {
        let settings = Settings::from_toml(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(settings.model.model, "llama-3.3-70b-versatile");
        assert_eq!(settings.retrieval.fetch_k, 10);
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
[model]
model = "mixtral-8x7b-32768"
base_url = "http://127.0.0.1:8080/v1"
api_key_env = "LOCAL_LLM_KEY"

[history]
trim_max_tokens = 512

[retrieval]
k = 5
fetch_k = 25
mmr_lambda = 0.7

[index]
embedding_model = "nomic-embed-text"
embedding_dim = 384
db_path = "/tmp/sibyl-index.db"

[gateway]
host = "0.0.0.0"
port = 9000

[logging]
level = "debug"
file_enabled = true
file_path = "/tmp/sibyl.log"
"#;

        let settings = Settings::from_toml(toml).unwrap();

        assert_eq!(settings.model.model, "mixtral-8x7b-32768");
        assert_eq!(settings.model.base_url, "http://127.0.0.1:8080/v1");
        assert_eq!(settings.model.api_key_env.as_deref(), Some("LOCAL_LLM_KEY"));
        assert_eq!(settings.history.trim_max_tokens, 512);
        assert_eq!(settings.retrieval.k, 5);
        assert_eq!(settings.retrieval.fetch_k, 25);
        assert_eq!(settings.index.embedding_model, "nomic-embed-text");
        assert_eq!(settings.index.embedding_dim, 384);
        assert_eq!(settings.index.db_path.as_deref(), Some("/tmp/sibyl-index.db"));
        assert_eq!(settings.gateway.host, "0.0.0.0");
        assert_eq!(settings.gateway.port, 9000);
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.logging.file_enabled);
    }

    #[test]
    fn test_from_toml_partial() {
        // Partial config fills in defaults
        let toml = r#"
[gateway]
host = "0.0.0.0"
"#;

        let settings = Settings::from_toml(toml).unwrap();

        assert_eq!(settings.gateway.host, "0.0.0.0");
        assert_eq!(settings.gateway.port, 8000);
        assert_eq!(settings.model.model, "llama-3.3-70b-versatile");
        assert_eq!(settings.retrieval.k, 3);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.model.model = "qwen2.5-32b".to_string();
        settings.gateway.port = 4000;

        settings.save_to_path(&path).expect("save failed");

        let content = fs::read_to_string(&path).expect("read failed");
        let loaded = Settings::from_toml(&content).expect("parse failed");

        assert_eq!(loaded.model.model, "qwen2.5-32b");
        assert_eq!(loaded.gateway.port, 4000);
    }

    #[test]
    fn test_config_path_uses_env_override() {
        let dir = tempfile::tempdir().unwrap();
        let value = dir.path().to_string_lossy().to_string();

        // SAFETY: test-scoped env mutation.
        unsafe { std::env::set_var("SIBYL_CONFIG_DIR", &value) };
        let path = Settings::config_path().unwrap();
        // SAFETY: test-scoped env mutation cleanup.
        unsafe { std::env::remove_var("SIBYL_CONFIG_DIR") };

        assert_eq!(path, dir.path().join("config.toml"));
    }
}
