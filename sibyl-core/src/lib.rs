//! Shared configuration for the sibyl RAG service.

pub mod config;

pub use config::{
    Config, ConfigError, GatewaySettings, HistorySettings, IndexSettings, LoggingSettings,
    ModelSettings, RetrievalSettings, Secrets, SecretsError, Settings, SettingsError,
};
