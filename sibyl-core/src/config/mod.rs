//! Configuration management for sibyl.
//!
//! Secrets (API keys) come from environment variables; settings come from a
//! TOML file in the XDG config directory. The combined [`Config`] is validated
//! once at startup — a service with an unusable model or embedding
//! configuration refuses to start rather than failing per-request.
//!
//! # Settings (TOML file)
//! Located at `~/.config/sibyl/config.toml`:
//! ```toml
//! [model]
//! model = "llama-3.3-70b-versatile"
//! base_url = "https://api.groq.com/openai/v1"
//! api_key_env = "GROQ_API_KEY"
//!
//! [gateway]
//! host = "127.0.0.1"
//! port = 8000
//! ```

mod secrets;
mod settings;

pub use secrets::{Secrets, SecretsError};
pub use settings::{
    GatewaySettings, HistorySettings, IndexSettings, LoggingSettings, ModelSettings,
    RetrievalSettings, Settings, SettingsError,
};

/// Combined configuration containing both secrets and settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Secrets loaded from environment variables
    pub secrets: Secrets,
    /// Settings loaded from TOML configuration file
    pub settings: Settings,
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Secrets error: {0}")]
    Secrets(#[from] SecretsError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("No completion model configured (set [model] model in config.toml)")]
    ModelNotSet,

    #[error("No embedding model configured (set [index] embedding_model in config.toml)")]
    EmbeddingModelNotSet,
}

impl Config {
    /// Load configuration from all sources and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file cannot be read or parsed, if the
    /// completion or embedding model is unset, or if `api_key_env` names an
    /// environment variable that is not set.
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Settings::load()?;
        Self::from_settings(settings)
    }

    /// Validate settings and resolve the secrets they reference.
    pub fn from_settings(settings: Settings) -> Result<Self, ConfigError> {
        if settings.model.model.trim().is_empty() {
            return Err(ConfigError::ModelNotSet);
        }
        if settings.index.embedding_model.trim().is_empty() {
            return Err(ConfigError::EmbeddingModelNotSet);
        }

        let secrets = Secrets::from_env(settings.model.api_key_env.as_deref())?;

        Ok(Self { secrets, settings })
    }

    /// Get the completion model identifier.
    pub fn model_id(&self) -> &str {
        &self.settings.model.model
    }

    /// Get the completion API key, when one is configured.
    pub fn api_key(&self) -> Option<&str> {
        self.secrets.api_key.as_deref()
    }

    /// Get the HTTP bind address.
    pub fn bind_addr(&self) -> String {
        self.settings.bind_addr()
    }
}
