//! Process configuration.
//!
//! Everything comes out of the environment once, at startup, into explicit
//! structs that get injected at construction. Business logic never reads
//! ambient state.

use crate::transcribe::WhisperApiConfig;
use anyhow::Context as _;

#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen port.
    pub port: u16,
    /// Corpus connection string.
    pub database_url: String,
    /// Translation code used for lookups when none is specified.
    pub translation: String,
    pub whisper: WhisperApiConfig,
}

impl Config {
    /// Recognized variables: `OPENAI_API_KEY` (required), `WHISPER_ENDPOINT`,
    /// `WHISPER_MODEL`, `WHISPER_TIMEOUT_SECS`, `PORT`, `DATABASE_URL`,
    /// `DEFAULT_TRANSLATION`.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("Set OPENAI_API_KEY environment variable")?;

        let mut whisper = WhisperApiConfig {
            api_key,
            ..WhisperApiConfig::default()
        };
        if let Ok(endpoint) = std::env::var("WHISPER_ENDPOINT") {
            whisper.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("WHISPER_MODEL") {
            whisper.model = model;
        }
        if let Ok(timeout) = std::env::var("WHISPER_TIMEOUT_SECS") {
            whisper.timeout_secs = timeout
                .parse()
                .context("Invalid WHISPER_TIMEOUT_SECS value")?;
        }

        let port = match std::env::var("PORT") {
            Ok(port) => port.parse().context("Invalid PORT value")?,
            Err(_) => 3000,
        };

        Ok(Self {
            port,
            database_url: env_or("DATABASE_URL", "sqlite:data/verses.db?mode=rwc"),
            translation: env_or("DEFAULT_TRANSLATION", "KJV"),
            whisper,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
