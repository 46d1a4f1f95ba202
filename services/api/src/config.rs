//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

pub const DEFAULT_LLM_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_PRIMARY_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_FAST_MODEL: &str = "llama-3.1-8b-instant";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub llm_api_key: String,
    pub llm_api_base: String,
    pub primary_model: String,
    pub fast_model: String,
    /// Where uploaded images end up, served under `media_base_url`.
    pub media_root: PathBuf,
    pub media_base_url: String,
    /// Staging directory for multipart uploads before they reach the image store.
    pub upload_dir: PathBuf,
    pub cors_origin: String,
    pub mail_from: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an explicit set of variables.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            var(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
        };
        let or_default = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        // --- Server and Database ---
        let bind_address_str = or_default("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = required("DATABASE_URL")?;

        let log_level_str = or_default("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Completion API ---
        let llm_api_key = required("LLM_API_KEY")?;
        let llm_api_base = or_default("LLM_API_BASE", DEFAULT_LLM_API_BASE);
        let primary_model = or_default("LLM_PRIMARY_MODEL", DEFAULT_PRIMARY_MODEL);
        let fast_model = or_default("LLM_FAST_MODEL", DEFAULT_FAST_MODEL);

        // --- Media and Mail ---
        let media_root = PathBuf::from(or_default("MEDIA_ROOT", "./media"));
        let media_base_url = or_default("MEDIA_BASE_URL", "/media")
            .trim_end_matches('/')
            .to_string();
        let upload_dir = PathBuf::from(or_default("UPLOAD_DIR", "./uploads"));
        let cors_origin = or_default("CORS_ORIGIN", "http://localhost:3000");
        let mail_from = var("MAIL_FROM").filter(|v| !v.trim().is_empty());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            llm_api_key,
            llm_api_base,
            primary_model,
            fast_model,
            media_root,
            media_base_url,
            upload_dir,
            cors_origin,
            mail_from,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_fill_everything_but_secrets() {
        let config = Config::from_vars(&vars(&[
            ("DATABASE_URL", "postgres://localhost/bookstore"),
            ("LLM_API_KEY", "gsk_test"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.llm_api_base, DEFAULT_LLM_API_BASE);
        assert_eq!(config.primary_model, DEFAULT_PRIMARY_MODEL);
        assert_eq!(config.fast_model, DEFAULT_FAST_MODEL);
        assert_eq!(config.media_base_url, "/media");
        assert!(config.mail_from.is_none());
    }

    #[test]
    fn missing_api_key_is_reported_by_name() {
        let err = Config::from_vars(&vars(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(name) if name == "LLM_API_KEY"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let base = [
            ("DATABASE_URL", "postgres://x"),
            ("LLM_API_KEY", "k"),
        ];
        let mut bad_addr = vars(&base);
        bad_addr.insert("BIND_ADDRESS".into(), "nowhere".into());
        assert!(matches!(
            Config::from_vars(&bad_addr),
            Err(ConfigError::InvalidValue(name, _)) if name == "BIND_ADDRESS"
        ));

        let mut bad_level = vars(&base);
        bad_level.insert("RUST_LOG".into(), "loud".into());
        assert!(Config::from_vars(&bad_level).is_err());
    }

    #[test]
    fn trailing_slash_is_dropped_from_media_url() {
        let mut env = vars(&[("DATABASE_URL", "postgres://x"), ("LLM_API_KEY", "k")]);
        env.insert("MEDIA_BASE_URL".into(), "https://cdn.example.com/media/".into());
        let config = Config::from_vars(&env).unwrap();
        assert_eq!(config.media_base_url, "https://cdn.example.com/media");
    }
}
