use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::estimation::market_data::MarketDataPolicy;
use crate::llm_client::DEFAULT_API_BASE;
use crate::pipeline::runner::PipelineOptions;

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_api_base: String,
    pub port: u16,
    pub rust_log: String,
    pub public_origin: String,
    pub market_data_timeout_secs: u64,
    pub estimation_timeout_secs: u64,
    pub chat_timeout_secs: u64,
    /// Per uploaded file.
    pub max_upload_bytes: usize,
    /// All attachments of one session together, counted before base64 encoding.
    pub max_session_attachment_bytes: usize,
    pub session_ttl_minutes: u64,
    pub market_data_policy: MarketDataPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_api_base: std::env::var("GEMINI_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            public_origin: std::env::var("PUBLIC_ORIGIN")
                .unwrap_or_else(|_| "https://devcost.ai".to_string()),
            market_data_timeout_secs: env_or("MARKET_DATA_TIMEOUT_SECS", 60)?,
            estimation_timeout_secs: env_or("ESTIMATION_TIMEOUT_SECS", 300)?,
            chat_timeout_secs: env_or("CHAT_TIMEOUT_SECS", 120)?,
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", 14 * 1024 * 1024)?,
            max_session_attachment_bytes: env_or("MAX_SESSION_ATTACHMENT_BYTES", 14 * 1024 * 1024)?,
            session_ttl_minutes: env_or("SESSION_TTL_MINUTES", 120)?,
            market_data_policy: env_or("MARKET_DATA_ON_FAILURE", MarketDataPolicy::Fallback)?,
        })
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            market_data_policy: self.market_data_policy,
            market_data_timeout: Duration::from_secs(self.market_data_timeout_secs),
            estimation_timeout: Duration::from_secs(self.estimation_timeout_secs),
        }
    }

    pub fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.chat_timeout_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_minutes * 60)
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            gemini_api_key: "test-key".to_string(),
            gemini_api_base: DEFAULT_API_BASE.to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            public_origin: "https://devcost.ai".to_string(),
            market_data_timeout_secs: 60,
            estimation_timeout_secs: 300,
            chat_timeout_secs: 120,
            max_upload_bytes: 1024,
            max_session_attachment_bytes: 2048,
            session_ttl_minutes: 120,
            market_data_policy: MarketDataPolicy::Fallback,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{key} is invalid ('{raw}'): {e}")),
        Err(_) => Ok(default),
    }
}
