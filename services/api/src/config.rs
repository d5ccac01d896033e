use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

use crate::store::DEFAULT_SESSION_TTL;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

pub use goftogu_core::llm_client::Provider;

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub chat_model: String,
    pub log_level: Level,
    pub prompts_path: Option<PathBuf>,
    pub vocabulary_path: Option<PathBuf>,
    pub generation_timeout: Duration,
    /// How long a session may sit untouched before it is evicted.
    pub session_ttl: Duration,
}

/// Reads `var` as a whole number of seconds greater than zero.
fn positive_secs(var: &str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(ConfigError::InvalidValue(
                var.to_string(),
                format!("'{}' is not a positive number of seconds", raw),
            )),
        },
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let provider = std::env::var("LLM_PROVIDER")
            .ok()
            .and_then(|raw| raw.parse::<Provider>().ok())
            .unwrap_or(Provider::OpenAI);

        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok();

        let chat_model = std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH").ok().map(PathBuf::from);
        let vocabulary_path = std::env::var("VOCABULARY_PATH").ok().map(PathBuf::from);

        let generation_timeout = positive_secs(
            "GENERATION_TIMEOUT_SECS",
            goftogu_core::orchestrator::DEFAULT_GENERATION_TIMEOUT,
        )?;
        let session_ttl = positive_secs("SESSION_TTL_SECS", DEFAULT_SESSION_TTL)?;

        match provider {
            Provider::OpenAI => {
                if openai_api_key.is_none() {
                    return Err(ConfigError::MissingVar(
                        "OPENAI_API_KEY must be set for 'openai' provider".to_string(),
                    ));
                }
            }
            Provider::Gemini => {
                if gemini_api_key.is_none() {
                    return Err(ConfigError::MissingVar(
                        "GEMINI_API_KEY must be set for 'gemini' provider".to_string(),
                    ));
                }
            }
        }

        Ok(Self {
            bind_address,
            provider,
            openai_api_key,
            gemini_api_key,
            chat_model,
            log_level,
            prompts_path,
            vocabulary_path,
            generation_timeout,
            session_ttl,
        })
    }

    /// The API key for the configured provider.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        let key = match self.provider {
            Provider::OpenAI => &self.openai_api_key,
            Provider::Gemini => &self.gemini_api_key,
        };
        key.as_deref()
            .ok_or_else(|| ConfigError::MissingVar(self.provider.api_key_var().to_string()))
    }
}
