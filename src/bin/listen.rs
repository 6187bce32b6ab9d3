//! Live listening client. Captures the microphone in fixed-interval chunks,
//! uploads each chunk to the ingestion endpoint, and prints the most recent
//! annotated transcript. Ctrl-C stops listening.

use anyhow::Context as _;
use dotenvy::dotenv;
use std::time::Duration;
use tracing::warn;

use versecatch::record::{MicSource, Recorder, RecorderConfig, RecorderEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let endpoint = std::env::var("UPLOAD_ENDPOINT")
        .unwrap_or_else(|_| "http://127.0.0.1:3000/upload-chunk".to_string());
    let interval_secs: u64 = std::env::var("CHUNK_INTERVAL_SECS")
        .unwrap_or_else(|_| "3".to_string())
        .parse()
        .context("Invalid CHUNK_INTERVAL_SECS value")?;

    let config = RecorderConfig {
        endpoint,
        chunk_interval: Duration::from_secs(interval_secs),
        ..RecorderConfig::default()
    };

    let mut recorder =
        Recorder::new(MicSource, config).context("Failed to build upload client")?;
    let mut events = recorder.start().context("Failed to start listening")?;

    println!("Transcribing and detecting Bible quotations in real time.");
    println!("Press Ctrl-C to stop.");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some(RecorderEvent::Verses { result, .. }) => {
                    println!();
                    println!("{}", result.transcript);
                    for verse in &result.verses {
                        match &verse.text {
                            Some(text) => println!("  [{}] {}", verse.reference, text),
                            None => println!("  [{}] (not found)", verse.reference),
                        }
                    }
                }
                Some(RecorderEvent::UploadFailed { seq, error }) => {
                    warn!("Chunk {} failed: {}", seq, error);
                }
                None => break,
            },
        }
    }

    recorder.stop();
    println!("Stopped.");

    Ok(())
}
