//! Verse reference parsing.
//!
//! Turns a human-readable citation such as "John 3:16" or "Psalm 23:1-6"
//! into its structured parts. Pure string work, no I/O.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Grammar: `<book-name> <chapter>:<verse>[-<endVerse>]`.
/// The book name is a non-greedy run of characters up to the last
/// whitespace before the chapter number.
static REFERENCE_GRAMMAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(.+?)\s+(\d+):(\d+)(?:\s*-\s*(\d+))?\s*$").unwrap());

/// A parsed scripture reference. Transient, derived per request from a
/// detector output string; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerseReference {
    pub book: String,
    pub chapter: u32,
    pub start_verse: u32,
    /// Absent means a single verse.
    pub end_verse: Option<u32>,
}

impl VerseReference {
    /// Last verse of the referenced range (the start verse when no range
    /// was given).
    pub fn last_verse(&self) -> u32 {
        self.end_verse.unwrap_or(self.start_verse)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid verse reference: '{0}'")]
pub struct InvalidReference(pub String);

/// Parse a free-form reference string into a [`VerseReference`].
///
/// Fails when the input does not match the reference grammar: no digits,
/// missing colon, trailing garbage, or a number too large to be a
/// chapter/verse index.
pub fn parse_reference(input: &str) -> Result<VerseReference, InvalidReference> {
    let captures = REFERENCE_GRAMMAR
        .captures(input)
        .ok_or_else(|| InvalidReference(input.to_string()))?;

    let number = |idx: usize| -> Result<u32, InvalidReference> {
        captures[idx]
            .parse::<u32>()
            .map_err(|_| InvalidReference(input.to_string()))
    };

    let end_verse = match captures.get(4) {
        Some(_) => Some(number(4)?),
        None => None,
    };

    Ok(VerseReference {
        book: captures[1].to_string(),
        chapter: number(2)?,
        start_verse: number(3)?,
        end_verse,
    })
}
