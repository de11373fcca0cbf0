//! Environment configuration

use std::time::Duration;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub openai_api_key: Option<String>,
    /// OpenAI-compatible API root
    pub openai_base_url: String,
    pub model: String,
    pub port: u16,
    /// Upper bound on one completion call
    pub llm_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("STORE_ASSISTANT_PORT") {
            Some(v) => parse(&v, "STORE_ASSISTANT_PORT")?,
            None => DEFAULT_PORT,
        };

        let timeout_secs = match get("STORE_ASSISTANT_LLM_TIMEOUT_SECS") {
            Some(v) => parse(&v, "STORE_ASSISTANT_LLM_TIMEOUT_SECS")?,
            None => DEFAULT_LLM_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "STORE_ASSISTANT_LLM_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: get("STORE_ASSISTANT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            port,
            llm_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse<T: std::str::FromStr>(value: &str, key: &'static str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}
