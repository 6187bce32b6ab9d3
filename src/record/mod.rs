//! Recording client.
//!
//! A two-state machine (Idle, Listening). While listening, a fixed-interval
//! timer drains the capture buffer, encodes each chunk as mono WAV, and
//! uploads it to the ingestion endpoint. Uploads are fire-and-forget with
//! respect to each other: no queue, no backpressure, no completion ordering.
//! Each chunk carries a send-time sequence number, and any response arriving
//! after a higher-numbered one has been applied is discarded instead of
//! overwriting fresher results.

mod capture;

pub use capture::{
    ActiveCapture, CaptureError, CaptureGuard, CaptureSource, ChunkBuffer, MicSource,
};

use crate::server::ChunkResponse;
use reqwest::multipart::{Form, Part};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Ingestion endpoint URL.
    pub endpoint: String,
    /// Wall-clock period between chunk emissions. Observed workflows use
    /// one to five seconds.
    pub chunk_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:3000/upload-chunk".to_string(),
            chunk_interval: Duration::from_secs(3),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
pub enum RecorderEvent {
    /// A fresh annotated result; replaces whatever was displayed before.
    Verses { seq: u64, result: ChunkResponse },
    /// One chunk's upload failed; other chunks are unaffected.
    UploadFailed { seq: u64, error: String },
}

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("recorder is already listening")]
    AlreadyListening,
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("failed to build upload client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
enum UploadError {
    #[error("upload failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
}

pub struct Recorder<S: CaptureSource> {
    source: S,
    config: RecorderConfig,
    http: reqwest::Client,
    session: Option<Session>,
}

struct Session {
    /// Dropping this releases the microphone.
    _capture: ActiveCapture,
    ticker: tokio::task::JoinHandle<()>,
}

impl<S: CaptureSource> Recorder<S> {
    pub fn new(source: S, config: RecorderConfig) -> Result<Self, RecorderError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            source,
            config,
            http,
            session: None,
        })
    }

    pub fn is_listening(&self) -> bool {
        self.session.is_some()
    }

    /// Idle → Listening. Acquires the capture handle and starts the chunk
    /// timer. If acquisition fails the recorder stays Idle and the error
    /// surfaces to the caller.
    pub fn start(&mut self) -> Result<mpsc::UnboundedReceiver<RecorderEvent>, RecorderError> {
        if self.session.is_some() {
            return Err(RecorderError::AlreadyListening);
        }

        let capture = self.source.acquire()?;
        let buffer = capture.buffer();
        let (tx, rx) = mpsc::unbounded_channel();

        let ticker = tokio::spawn(chunk_loop(
            buffer,
            self.http.clone(),
            self.config.clone(),
            tx,
        ));

        self.session = Some(Session {
            _capture: capture,
            ticker,
        });
        info!(
            "Listening (chunk interval {:?})",
            self.config.chunk_interval
        );

        Ok(rx)
    }

    /// Listening → Idle. Stops the chunk timer and releases the capture
    /// handle. Already in-flight uploads run to completion; there is no
    /// cancellation for them.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            session.ticker.abort();
            info!("Stopped listening");
        }
    }
}

impl<S: CaptureSource> Drop for Recorder<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn chunk_loop(
    buffer: ChunkBuffer,
    http: reqwest::Client,
    config: RecorderConfig,
    tx: mpsc::UnboundedSender<RecorderEvent>,
) {
    let last_applied = Arc::new(AtomicU64::new(0));
    let mut seq = 0u64;

    let mut interval = tokio::time::interval(config.chunk_interval);
    // The first tick fires immediately; nothing is buffered yet.
    interval.tick().await;

    loop {
        interval.tick().await;

        let samples = buffer.drain();
        if samples.is_empty() {
            continue;
        }

        seq += 1;
        let wav = match encode_wav(&samples, buffer.sample_rate()) {
            Ok(wav) => wav,
            Err(err) => {
                warn!("Failed to encode chunk {}: {}", seq, err);
                continue;
            }
        };

        debug!(
            "Uploading chunk {} ({} samples, {} bytes)",
            seq,
            samples.len(),
            wav.len()
        );

        // Fire and forget: the next tick does not wait for this upload.
        tokio::spawn(upload_chunk(
            http.clone(),
            config.endpoint.clone(),
            wav,
            seq,
            last_applied.clone(),
            tx.clone(),
        ));
    }
}

async fn upload_chunk(
    http: reqwest::Client,
    endpoint: String,
    wav: Vec<u8>,
    seq: u64,
    last_applied: Arc<AtomicU64>,
    tx: mpsc::UnboundedSender<RecorderEvent>,
) {
    match send_chunk(&http, &endpoint, wav).await {
        Ok(result) => {
            if apply_if_fresh(&last_applied, seq) {
                let _ = tx.send(RecorderEvent::Verses { seq, result });
            } else {
                debug!("Discarding stale response for chunk {}", seq);
            }
        }
        Err(err) => {
            warn!("Chunk {} upload failed: {}", seq, err);
            let _ = tx.send(RecorderEvent::UploadFailed {
                seq,
                error: err.to_string(),
            });
        }
    }
}

async fn send_chunk(
    http: &reqwest::Client,
    endpoint: &str,
    wav: Vec<u8>,
) -> Result<ChunkResponse, UploadError> {
    let part = Part::bytes(wav).file_name("chunk.wav").mime_str("audio/wav")?;
    let form = Form::new().part("audio", part);

    let response = http.post(endpoint).multipart(form).send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(UploadError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(response.json::<ChunkResponse>().await?)
}

/// Record `seq` as applied if it is newer than everything applied so far.
/// Returns false for a response that lost the race to a fresher chunk.
fn apply_if_fresh(last_applied: &AtomicU64, seq: u64) -> bool {
    last_applied.fetch_max(seq, Ordering::SeqCst) < seq
}

/// Encode mono samples as 16-bit PCM WAV.
fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            let clamped = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer.write_sample(clamped)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{DetectVerses, FixedDetector};
    use crate::server::{AppState, router};
    use crate::store::test_util::{insert, scratch_pool};
    use crate::transcribe::{Transcribe, TranscribeError};
    use async_trait::async_trait;

    struct ScriptedSource {
        buffer: ChunkBuffer,
    }

    struct NoopGuard;

    impl CaptureGuard for NoopGuard {}

    impl CaptureSource for ScriptedSource {
        fn acquire(&self) -> Result<ActiveCapture, CaptureError> {
            Ok(ActiveCapture::new(self.buffer.clone(), Box::new(NoopGuard)))
        }
    }

    struct UnavailableSource;

    impl CaptureSource for UnavailableSource {
        fn acquire(&self) -> Result<ActiveCapture, CaptureError> {
            Err(CaptureError::NoDevice)
        }
    }

    struct FixedTranscriber(String);

    #[async_trait]
    impl Transcribe for FixedTranscriber {
        async fn transcribe(&self, _audio: Vec<u8>) -> Result<String, TranscribeError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn stale_responses_are_discarded() {
        let last_applied = AtomicU64::new(0);
        assert!(apply_if_fresh(&last_applied, 1));
        assert!(apply_if_fresh(&last_applied, 3));
        // Chunk 2 finished after chunk 3 was applied: stale.
        assert!(!apply_if_fresh(&last_applied, 2));
        assert!(apply_if_fresh(&last_applied, 4));
    }

    #[test]
    fn encode_wav_produces_mono_pcm() {
        let wav = encode_wav(&[0.0, 0.5, -0.5], 16_000).unwrap();
        let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16_000);
        assert_eq!(reader.len(), 3);
    }

    #[tokio::test]
    async fn failed_acquisition_leaves_the_recorder_idle() {
        let mut recorder = Recorder::new(UnavailableSource, RecorderConfig::default()).unwrap();
        let err = recorder.start().unwrap_err();
        assert!(matches!(err, RecorderError::Capture(CaptureError::NoDevice)));
        assert!(!recorder.is_listening());
    }

    #[tokio::test]
    async fn start_while_listening_is_rejected() {
        let source = ScriptedSource {
            buffer: ChunkBuffer::new(16_000),
        };
        let mut recorder = Recorder::new(source, RecorderConfig::default()).unwrap();

        let _events = recorder.start().unwrap();
        assert!(recorder.is_listening());

        let err = recorder.start().unwrap_err();
        assert!(matches!(err, RecorderError::AlreadyListening));

        recorder.stop();
        assert!(!recorder.is_listening());
    }

    #[tokio::test]
    async fn uploads_chunks_and_renders_fresh_results() {
        // A real ingestion endpoint with a canned transcriber, so the whole
        // capture → upload → annotate loop runs end to end.
        let dir = tempfile::tempdir().unwrap();
        let pool = scratch_pool(&dir).await;
        insert(&pool, "John", 3, 16, "For God so loved the world...", "KJV").await;

        let detector: Arc<dyn DetectVerses> = Arc::new(FixedDetector::new(["John 3:16"]));
        let state = AppState {
            db: pool,
            transcriber: Arc::new(FixedTranscriber("as John 3:16 says".to_string())),
            detector,
            translation: "KJV".to_string(),
        };

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        listener.set_nonblocking(true).unwrap();
        tokio::spawn(async move {
            axum::Server::from_tcp(listener)
                .unwrap()
                .serve(router(state).into_make_service())
                .await
                .unwrap();
        });

        let buffer = ChunkBuffer::new(16_000);
        let source = ScriptedSource {
            buffer: buffer.clone(),
        };
        let mut recorder = Recorder::new(
            source,
            RecorderConfig {
                endpoint: format!("http://{}/upload-chunk", addr),
                chunk_interval: Duration::from_millis(50),
                request_timeout: Duration::from_secs(5),
            },
        )
        .unwrap();

        let mut events = recorder.start().unwrap();
        buffer.push(&vec![0.1f32; 1600]);

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for a chunk result")
            .expect("event channel closed early");

        match event {
            RecorderEvent::Verses { seq, result } => {
                assert_eq!(seq, 1);
                assert_eq!(result.transcript, "as John 3:16 says");
                assert_eq!(result.verses.len(), 1);
                assert_eq!(
                    result.verses[0].text.as_deref(),
                    Some("For God so loved the world...")
                );
            }
            other => panic!("unexpected event: {other:?}"),
        }

        recorder.stop();
    }

    #[tokio::test]
    async fn upload_failures_are_reported_per_chunk() {
        // No server on this port; every upload fails, the loop keeps going.
        let buffer = ChunkBuffer::new(16_000);
        let source = ScriptedSource {
            buffer: buffer.clone(),
        };
        let mut recorder = Recorder::new(
            source,
            RecorderConfig {
                endpoint: "http://127.0.0.1:9/upload-chunk".to_string(),
                chunk_interval: Duration::from_millis(50),
                request_timeout: Duration::from_secs(1),
            },
        )
        .unwrap();

        let mut events = recorder.start().unwrap();
        buffer.push(&vec![0.1f32; 160]);

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for an upload failure")
            .expect("event channel closed early");

        assert!(matches!(event, RecorderEvent::UploadFailed { seq: 1, .. }));

        recorder.stop();
    }
}
