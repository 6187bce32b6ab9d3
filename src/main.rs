use anyhow::Context as _;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use versecatch::config::Config;
use versecatch::detect::BookScanDetector;
use versecatch::server::{self, AppState};
use versecatch::store;
use versecatch::transcribe::WhisperApiClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    let db = store::init_db(&config.database_url)
        .await
        .context("Failed to initialize verse corpus database")?;
    info!("Verse corpus ready at {}", config.database_url);

    let transcriber = WhisperApiClient::new(config.whisper.clone())
        .context("Failed to build transcription client")?;
    info!(
        "Transcription provider: {} (model: {})",
        config.whisper.endpoint, config.whisper.model
    );

    let state = AppState {
        db,
        transcriber: Arc::new(transcriber),
        detector: Arc::new(BookScanDetector::new()),
        translation: config.translation.clone(),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on http://{}", addr);

    axum::Server::bind(&addr)
        .serve(server::router(state).into_make_service())
        .await?;

    Ok(())
}
