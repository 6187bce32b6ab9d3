//! Microphone capture.
//!
//! The capture callback runs on the audio backend's thread and appends into
//! a shared [`ChunkBuffer`]; the chunk timer drains it at its own pace.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device available")]
    NoDevice,
    #[error("failed to read input config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),
    #[error("failed to build input stream: {0}")]
    Build(#[from] cpal::BuildStreamError),
    #[error("failed to start input stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
    #[error("unsupported sample format '{0}'")]
    UnsupportedFormat(String),
}

/// Samples accumulated since the last drain, already downmixed to mono f32.
#[derive(Clone)]
pub struct ChunkBuffer {
    samples: Arc<Mutex<Vec<f32>>>,
    sample_rate: u32,
}

impl ChunkBuffer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            samples: Arc::new(Mutex::new(Vec::new())),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn push(&self, samples: &[f32]) {
        if let Ok(mut guard) = self.samples.lock() {
            guard.extend_from_slice(samples);
        }
    }

    /// Take everything buffered so far, leaving the buffer empty.
    pub fn drain(&self) -> Vec<f32> {
        match self.samples.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(_) => Vec::new(),
        }
    }
}

/// Dropping the guard releases the capture device and stops delivery.
pub trait CaptureGuard {}

/// An acquired microphone: the live buffer plus the guard keeping the
/// device open.
pub struct ActiveCapture {
    buffer: ChunkBuffer,
    _guard: Box<dyn CaptureGuard>,
}

impl ActiveCapture {
    pub fn new(buffer: ChunkBuffer, guard: Box<dyn CaptureGuard>) -> Self {
        Self {
            buffer,
            _guard: guard,
        }
    }

    pub fn buffer(&self) -> ChunkBuffer {
        self.buffer.clone()
    }
}

/// Seam between the recorder and the capture hardware, so tests can feed
/// scripted samples instead of opening a real device.
pub trait CaptureSource {
    fn acquire(&self) -> Result<ActiveCapture, CaptureError>;
}

/// Default input device via cpal.
#[derive(Debug, Clone, Default)]
pub struct MicSource;

struct StreamGuard {
    _stream: cpal::Stream,
}

impl CaptureGuard for StreamGuard {}

impl CaptureSource for MicSource {
    fn acquire(&self) -> Result<ActiveCapture, CaptureError> {
        let host = cpal::default_host();

        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;
        info!(
            "Input device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config = device.default_input_config()?;
        info!(
            "Capture config: {} channel(s) @ {} Hz",
            config.channels(),
            config.sample_rate().0
        );

        let channels = config.channels() as usize;
        let buffer = ChunkBuffer::new(config.sample_rate().0);
        let sink = buffer.clone();

        let err_fn = |err| error!("an error occurred on the input stream: {}", err);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_input_stream(
                &config.into(),
                move |data: &[f32], _: &_| push_interleaved(&sink, channels, data),
                err_fn,
                None,
            )?,
            cpal::SampleFormat::I16 => device.build_input_stream(
                &config.into(),
                move |data: &[i16], _: &_| write_i16(data, channels, &sink),
                err_fn,
                None,
            )?,
            cpal::SampleFormat::U16 => device.build_input_stream(
                &config.into(),
                move |data: &[u16], _: &_| write_u16(data, channels, &sink),
                err_fn,
                None,
            )?,
            sample_format => {
                return Err(CaptureError::UnsupportedFormat(format!("{:?}", sample_format)));
            }
        };

        stream.play()?;

        Ok(ActiveCapture::new(buffer, Box::new(StreamGuard { _stream: stream })))
    }
}

/// Downmix interleaved frames to mono and append them.
fn push_interleaved(sink: &ChunkBuffer, channels: usize, samples: &[f32]) {
    if channels <= 1 {
        sink.push(samples);
        return;
    }

    let mono: Vec<f32> = samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();
    sink.push(&mono);
}

fn write_i16(input: &[i16], channels: usize, sink: &ChunkBuffer) {
    let converted: Vec<f32> = input.iter().map(|&s| s as f32 / 32768.0).collect();
    push_interleaved(sink, channels, &converted);
}

fn write_u16(input: &[u16], channels: usize, sink: &ChunkBuffer) {
    let converted: Vec<f32> = input
        .iter()
        .map(|&s| (s as f32 - 32768.0) / 32768.0)
        .collect();
    push_interleaved(sink, channels, &converted);
}
