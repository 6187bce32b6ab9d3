//! Corpus seeder. Usage: `seed <translation.json> [version]`.
//!
//! Runs once per translation, outside the request path. The JSON file is
//! shaped `{ book: { chapter: { verse: text } } }`.

use anyhow::Context as _;
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing::info;

use versecatch::store::{self, seed::seed_from_json};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let path: PathBuf = args
        .next()
        .context("Usage: seed <translation.json> [version]")?
        .into();
    let version = args.next().unwrap_or_else(|| "KJV".to_string());

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:data/verses.db?mode=rwc".to_string());

    let pool = store::init_db(&database_url)
        .await
        .context("Failed to initialize verse corpus database")?;

    let report = seed_from_json(&pool, &path, &version)
        .await
        .context("Seeding failed")?;

    info!(
        "Done: {} verses inserted, {} skipped ({})",
        report.inserted, report.skipped, version
    );

    Ok(())
}
