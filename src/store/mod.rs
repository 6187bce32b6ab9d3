//! Verse corpus storage.
//!
//! SQLite-backed, seeded once by the bulk loader and read-only on the
//! request path. Lookups are safe to run concurrently; the corpus never
//! changes underneath them.

pub mod seed;

use crate::reference::VerseReference;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use thiserror::Error;

pub type DbPool = SqlitePool;

/// One verse of one translation. Unique on (book, chapter, verse, version);
/// enforced by the table's primary key.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VerseRecord {
    pub book: String,
    pub chapter: i64,
    pub verse: i64,
    pub text: String,
    pub version: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no verses found for {book} {chapter}:{start}-{end} ({version})")]
    VerseNotFound {
        book: String,
        chapter: u32,
        start: u32,
        end: u32,
        version: String,
    },
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

pub async fn init_db(database_url: &str) -> Result<DbPool, sqlx::Error> {
    if let Some(path) = database_url.strip_prefix("sqlite:") {
        let path = path.split('?').next().unwrap_or(path);
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Look up the text for a reference in the given translation.
///
/// Returns the matching verse texts in ascending verse order, joined with a
/// single space. An empty result set is [`StoreError::VerseNotFound`] rather
/// than partial text.
pub async fn lookup_passage(
    pool: &DbPool,
    reference: &VerseReference,
    version: &str,
) -> Result<String, StoreError> {
    let records = sqlx::query_as::<_, VerseRecord>(
        r#"
        SELECT book, chapter, verse, text, version
        FROM verses
        WHERE book = ? COLLATE NOCASE
          AND chapter = ?
          AND verse BETWEEN ? AND ?
          AND version = ?
        ORDER BY verse ASC
        "#,
    )
    .bind(&reference.book)
    .bind(reference.chapter as i64)
    .bind(reference.start_verse as i64)
    .bind(reference.last_verse() as i64)
    .bind(version)
    .fetch_all(pool)
    .await?;

    if records.is_empty() {
        return Err(StoreError::VerseNotFound {
            book: reference.book.clone(),
            chapter: reference.chapter,
            start: reference.start_verse,
            end: reference.last_verse(),
            version: version.to_string(),
        });
    }

    let text = records
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    Ok(text)
}

pub async fn insert_verse(pool: &DbPool, record: &VerseRecord) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO verses (book, chapter, verse, text, version) VALUES (?, ?, ?, ?, ?)")
        .bind(&record.book)
        .bind(record.chapter)
        .bind(record.verse)
        .bind(&record.text)
        .bind(&record.version)
        .execute(pool)
        .await?;

    Ok(())
}
