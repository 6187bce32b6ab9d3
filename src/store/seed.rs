//! Corpus bulk loading.
//!
//! Runs outside the request path, once per translation. The input is a
//! translation JSON file shaped `{ book: { chapter: { verse: text } } }`.

use super::DbPool;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

type TranslationFile = BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read translation file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse translation file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("non-numeric {what} key '{key}' under {book}")]
    InvalidNumber {
        what: &'static str,
        key: String,
        book: String,
    },
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: u64,
    pub skipped: u64,
}

/// Load one translation into the corpus.
///
/// Texts are trimmed; empty verses are skipped with a warning and counted in
/// the report. All rows go in inside a single transaction, so a failure
/// (including re-seeding rows that already exist) leaves the corpus
/// untouched.
pub async fn seed_from_json(
    pool: &DbPool,
    path: &Path,
    version: &str,
) -> Result<SeedReport, SeedError> {
    info!("Loading {} data from {:?}", version, path);

    let raw = std::fs::read_to_string(path)?;
    let data: TranslationFile = serde_json::from_str(&raw)?;

    let total: u64 = data
        .values()
        .map(|chapters| chapters.values().map(|verses| verses.len() as u64).sum::<u64>())
        .sum();

    info!("Inserting up to {} verses into the corpus...", total);

    let pb = indicatif::ProgressBar::new(total);
    pb.set_style(
        indicatif::ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} verses ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut inserted = 0u64;
    let mut skipped = 0u64;
    let mut tx = pool.begin().await?;

    for (book, chapters) in &data {
        for (chapter_key, verses) in chapters {
            let chapter: i64 =
                chapter_key
                    .parse()
                    .map_err(|_| SeedError::InvalidNumber {
                        what: "chapter",
                        key: chapter_key.clone(),
                        book: book.clone(),
                    })?;

            for (verse_key, text) in verses {
                let verse: i64 = verse_key.parse().map_err(|_| SeedError::InvalidNumber {
                    what: "verse",
                    key: verse_key.clone(),
                    book: book.clone(),
                })?;

                let text = text.trim();
                if text.is_empty() {
                    warn!("Skipping empty verse: {} {}:{}", book, chapter, verse);
                    skipped += 1;
                    pb.inc(1);
                    continue;
                }

                sqlx::query(
                    "INSERT INTO verses (book, chapter, verse, text, version) VALUES (?, ?, ?, ?, ?)",
                )
                .bind(book)
                .bind(chapter)
                .bind(verse)
                .bind(text)
                .bind(version)
                .execute(&mut *tx)
                .await?;

                inserted += 1;
                pb.inc(1);
            }
        }
    }

    tx.commit().await?;
    pb.finish_with_message("Corpus seeded");

    info!("Seeded {} verses ({} skipped)", inserted, skipped);

    Ok(SeedReport { inserted, skipped })
}
