//! Secrets configuration loaded from environment variables only.
//!
//! API keys are never stored in the TOML settings file. The settings name an
//! environment variable (`api_key_env`) and the value is resolved here.

use std::env;

/// Secrets loaded exclusively from environment variables.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    /// Completion provider API key, resolved from the configured env var.
    pub api_key: Option<String>,
}

/// Errors that can occur when loading secrets
#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
    #[error("Missing required secret: environment variable {0} is not set")]
    MissingSecret(String),
}

impl Secrets {
    /// Load secrets from environment variables.
    ///
    /// Also loads a `.env` file if present (development convenience);
    /// production should rely on actual environment variables.
    ///
    /// When `api_key_env` is `None` the provider is assumed to need no
    /// authentication (e.g. a local OpenAI-compatible server).
    pub fn from_env(api_key_env: Option<&str>) -> Result<Self, SecretsError> {
        let _ = dotenvy::dotenv();

        Self::from_env_inner(api_key_env)
    }

    pub(crate) fn from_env_inner(api_key_env: Option<&str>) -> Result<Self, SecretsError> {
        let api_key = match api_key_env {
            Some(var) => Some(
                env::var(var).map_err(|_| SecretsError::MissingSecret(var.to_string()))?,
            ),
            None => None,
        };

        Ok(Self { api_key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests that mutate the environment must not run concurrently.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_resolves_configured_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { env::set_var("SIBYL_TEST_API_KEY", "sk-test") };

        let secrets = Secrets::from_env_inner(Some("SIBYL_TEST_API_KEY")).unwrap();
        assert_eq!(secrets.api_key, Some("sk-test".to_string()));

        unsafe { env::remove_var("SIBYL_TEST_API_KEY") };
    }

    #[test]
    fn test_missing_env_var_is_an_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { env::remove_var("SIBYL_TEST_ABSENT_KEY") };

        let result = Secrets::from_env_inner(Some("SIBYL_TEST_ABSENT_KEY"));
        assert!(matches!(result, Err(SecretsError::MissingSecret(_))));
    }

    #[test]
    fn test_no_env_var_configured() {
        let secrets = Secrets::from_env_inner(None).unwrap();
        assert!(secrets.api_key.is_none());
    }
}
