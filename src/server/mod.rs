//! Chunk ingestion endpoint.
//!
//! `POST /upload-chunk` drives one audio chunk through transcription,
//! verse detection, and corpus lookup, and returns the combined result.
//! The endpoint keeps no state of its own; concurrent chunks only share the
//! read-only corpus pool.

use crate::detect::DetectVerses;
use crate::reference::parse_reference;
use crate::store::{self, DbPool, StoreError};
use crate::transcribe::{Transcribe, TranscribeError};
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, warn};

/// Generous bound for a few seconds of WAV audio.
const MAX_CHUNK_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub transcriber: Arc<dyn Transcribe>,
    pub detector: Arc<dyn DetectVerses>,
    /// Translation code used for corpus lookups, e.g. "KJV".
    pub translation: String,
}

/// Result for one uploaded chunk. Never persisted; returned directly to the
/// caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkResponse {
    pub transcript: String,
    pub verses: Vec<VerseEntry>,
}

/// One detected reference with its resolved text, or `null` when the
/// reference could not be parsed or was not in the corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerseEntry {
    pub reference: String,
    pub text: Option<String>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("No file uploaded.")]
    NoFile,
    #[error("invalid upload: {0}")]
    BadUpload(#[from] MultipartError),
    #[error("transcription failed: {0}")]
    Transcription(#[from] TranscribeError),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NoFile | AppError::BadUpload(_) => StatusCode::BAD_REQUEST,
            AppError::Transcription(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message put in the response body. Server-side failures keep their
    /// detail in the log, not on the wire.
    fn public_message(&self) -> String {
        match self {
            AppError::Transcription(_) => "Failed to process audio".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Error processing audio chunk: {}", self);
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/upload-chunk", post(upload_chunk))
        .layer(DefaultBodyLimit::max(MAX_CHUNK_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn upload_chunk(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ChunkResponse>, AppError> {
    let mut audio = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("audio") {
            audio = Some(field.bytes().await?);
            break;
        }
    }
    let audio = audio.ok_or(AppError::NoFile)?;
    debug!("Received audio chunk ({} bytes)", audio.len());

    let transcript = state.transcriber.transcribe(audio.to_vec()).await?;

    // Detection cannot fail the request; an empty list just means no verses.
    let detected = state.detector.detect(&transcript).await;

    let mut verses = Vec::with_capacity(detected.len());
    for reference in detected {
        let text = resolve_reference(&state, &reference).await;
        verses.push(VerseEntry { reference, text });
    }

    Ok(Json(ChunkResponse { transcript, verses }))
}

/// Parse and look up one detected reference. Any failure is scoped to this
/// entry; the rest of the batch is unaffected.
async fn resolve_reference(state: &AppState, reference: &str) -> Option<String> {
    let parsed = match parse_reference(reference) {
        Ok(parsed) => parsed,
        Err(err) => {
            debug!("Skipping unparseable reference: {}", err);
            return None;
        }
    };

    match store::lookup_passage(&state.db, &parsed, &state.translation).await {
        Ok(text) => Some(text),
        Err(StoreError::VerseNotFound { .. }) => {
            debug!("No corpus entry for '{}'", reference);
            None
        }
        Err(err) => {
            warn!("Verse lookup failed for '{}': {}", reference, err);
            None
        }
    }
}
