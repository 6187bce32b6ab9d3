//! Speech-to-text through an external provider.
//!
//! The endpoint only ever sees the [`Transcribe`] trait; the production
//! implementation talks to an OpenAI-compatible transcription API.

mod whisper;

pub use whisper::{SCRIPTURE_PROMPT, WhisperApiClient, WhisperApiConfig};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("transcription provider API key is not set")]
    MissingApiKey,
    #[error("transcription request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("transcription provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("transcription response had no transcript text")]
    MissingTranscript,
}

#[async_trait]
pub trait Transcribe: Send + Sync {
    /// Transcribe one audio chunk (single-channel WAV bytes, a few seconds
    /// at most). Failures propagate to the caller; there is no retry here.
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String, TranscribeError>;
}
