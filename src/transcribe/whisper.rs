//! OpenAI-compatible transcription client.

use super::{Transcribe, TranscribeError};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";
pub const DEFAULT_MODEL: &str = "whisper-1";

/// Context hint sent with every chunk so the provider's language model
/// biases toward scripture citations and translation abbreviations.
pub const SCRIPTURE_PROMPT: &str = "This audio is from a Bible study session. \
    Identify and return Bible verses mentioned, such as 'John 3:16,' \
    'Romans 8:28,' or 'Psalm 23:1.' If a Bible version is mentioned \
    (e.g., 'NIV,' 'KJV,' 'ESV'), include it in the transcription. Ensure the \
    verse and version are accurately transcribed, ignoring unrelated speech.";

#[derive(Debug, Clone)]
pub struct WhisperApiConfig {
    /// Full URL of the provider's transcription endpoint.
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    /// Language code passed through to the provider (e.g. "en").
    pub language: String,
    pub prompt: String,
    /// Bound on each outbound request, so a stuck provider call cannot hold
    /// a request task forever.
    pub timeout_secs: u64,
}

impl Default for WhisperApiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            language: "en".to_string(),
            prompt: SCRIPTURE_PROMPT.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug)]
pub struct WhisperApiClient {
    http: reqwest::Client,
    config: WhisperApiConfig,
}

impl WhisperApiClient {
    pub fn new(config: WhisperApiConfig) -> Result<Self, TranscribeError> {
        if config.api_key.trim().is_empty() {
            return Err(TranscribeError::MissingApiKey);
        }

        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", config.api_key.trim());
        let mut auth = HeaderValue::from_str(&bearer).map_err(|_| TranscribeError::MissingApiKey)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &WhisperApiConfig {
        &self.config
    }
}

#[async_trait]
impl Transcribe for WhisperApiClient {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String, TranscribeError> {
        debug!(
            "Sending {} byte chunk to {} (model: {})",
            audio.len(),
            self.config.endpoint,
            self.config.model
        );

        let audio_part = Part::bytes(audio)
            .file_name("audio.wav")
            .mime_str("audio/wav")?;

        let form = Form::new()
            .part("file", audio_part)
            .text("model", self.config.model.clone())
            .text("language", self.config.language.clone())
            .text("prompt", self.config.prompt.clone())
            .text("response_format", "json")
            .text("temperature", "0");

        let response = self
            .http
            .post(&self.config.endpoint)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscribeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: serde_json::Value = response.json().await?;
        let text = payload
            .get("text")
            .and_then(|t| t.as_str())
            .ok_or(TranscribeError::MissingTranscript)?;

        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::json;

    /// Serve `router` on an ephemeral local port, returning its base URL.
    fn spawn_stub(router: Router) -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        listener.set_nonblocking(true).unwrap();

        tokio::spawn(async move {
            axum::Server::from_tcp(listener)
                .unwrap()
                .serve(router.into_make_service())
                .await
                .unwrap();
        });

        format!("http://{}/v1/audio/transcriptions", addr)
    }

    fn client_for(endpoint: String) -> WhisperApiClient {
        WhisperApiClient::new(WhisperApiConfig {
            endpoint,
            api_key: "test-key".to_string(),
            ..WhisperApiConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn returns_trimmed_transcript() {
        let router = Router::new().route(
            "/v1/audio/transcriptions",
            post(|| async { Json(json!({ "text": "  John 3:16 says...  " })) }),
        );
        let client = client_for(spawn_stub(router));

        let text = client.transcribe(vec![0u8; 64]).await.unwrap();
        assert_eq!(text, "John 3:16 says...");
    }

    #[tokio::test]
    async fn surfaces_provider_errors_with_body() {
        let router = Router::new().route(
            "/v1/audio/transcriptions",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream unavailable") }),
        );
        let client = client_for(spawn_stub(router));

        let err = client.transcribe(vec![0u8; 64]).await.unwrap_err();
        match err {
            TranscribeError::Status { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "upstream unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_transcript_field_is_an_error() {
        let router = Router::new().route(
            "/v1/audio/transcriptions",
            post(|| async { Json(json!({ "task": "transcribe" })) }),
        );
        let client = client_for(spawn_stub(router));

        let err = client.transcribe(vec![0u8; 64]).await.unwrap_err();
        assert!(matches!(err, TranscribeError::MissingTranscript));
    }

    #[test]
    fn refuses_to_build_without_an_api_key() {
        let err = WhisperApiClient::new(WhisperApiConfig::default()).unwrap_err();
        assert!(matches!(err, TranscribeError::MissingApiKey));
    }
}
