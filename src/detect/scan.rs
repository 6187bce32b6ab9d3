//! Deterministic book-name scan detector.

use super::DetectVerses;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

/// Canonical book names plus the aliases that show up in transcripts.
/// Numbered books and longer aliases come before their bare suffixes so the
/// alternation prefers "1 John" over "John" and "Psalms" over "Psalm".
const BOOK_NAMES: &[&str] = &[
    "Genesis",
    "Exodus",
    "Leviticus",
    "Numbers",
    "Deuteronomy",
    "Joshua",
    "Judges",
    "Ruth",
    "1 Samuel",
    "2 Samuel",
    "1 Kings",
    "2 Kings",
    "1 Chronicles",
    "2 Chronicles",
    "Ezra",
    "Nehemiah",
    "Esther",
    "Job",
    "Psalms",
    "Psalm",
    "Proverbs",
    "Ecclesiastes",
    "Song of Solomon",
    "Song of Songs",
    "Isaiah",
    "Jeremiah",
    "Lamentations",
    "Ezekiel",
    "Daniel",
    "Hosea",
    "Joel",
    "Amos",
    "Obadiah",
    "Jonah",
    "Micah",
    "Nahum",
    "Habakkuk",
    "Zephaniah",
    "Haggai",
    "Zechariah",
    "Malachi",
    "Matthew",
    "Mark",
    "Luke",
    "1 John",
    "2 John",
    "3 John",
    "John",
    "Acts",
    "Romans",
    "1 Corinthians",
    "2 Corinthians",
    "Galatians",
    "Ephesians",
    "Philippians",
    "Colossians",
    "1 Thessalonians",
    "2 Thessalonians",
    "1 Timothy",
    "2 Timothy",
    "Titus",
    "Philemon",
    "Hebrews",
    "James",
    "1 Peter",
    "2 Peter",
    "Jude",
    "Revelation",
];

static CITATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let books = BOOK_NAMES.join("|");
    Regex::new(&format!(
        r"(?i)\b(?:{books})\s+\d+:\d+(?:\s*-\s*\d+)?"
    ))
    .unwrap()
});

/// Scans transcripts for `<book> <chapter>:<verse>[-<endVerse>]` citations
/// over the known book names. Case-insensitive; the matched text is returned
/// verbatim so downstream parsing sees what was actually transcribed.
#[derive(Debug, Clone, Default)]
pub struct BookScanDetector;

impl BookScanDetector {
    pub fn new() -> Self {
        Self
    }

    fn scan(&self, transcript: &str) -> Vec<String> {
        CITATION_PATTERN
            .find_iter(transcript)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

#[async_trait]
impl DetectVerses for BookScanDetector {
    async fn detect(&self, transcript: &str) -> Vec<String> {
        self.scan(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finds_citations_in_mention_order() {
        let detector = BookScanDetector::new();
        let transcript =
            "Turn with me to John 3:16, and later we will read Romans 8:28 together.";
        assert_eq!(
            detector.detect(transcript).await,
            vec!["John 3:16".to_string(), "Romans 8:28".to_string()]
        );
    }

    #[tokio::test]
    async fn keeps_repeated_citations() {
        let detector = BookScanDetector::new();
        let transcript = "John 3:16. Let me say that again: John 3:16.";
        assert_eq!(
            detector.detect(transcript).await,
            vec!["John 3:16".to_string(), "John 3:16".to_string()]
        );
    }

    #[tokio::test]
    async fn matches_ranges_and_numbered_books() {
        let detector = BookScanDetector::new();
        let transcript = "1 Corinthians 13:4-7 describes love; so does 1 John 4:19.";
        assert_eq!(
            detector.detect(transcript).await,
            vec!["1 Corinthians 13:4-7".to_string(), "1 John 4:19".to_string()]
        );
    }

    #[tokio::test]
    async fn is_case_insensitive_and_verbatim() {
        let detector = BookScanDetector::new();
        assert_eq!(
            detector.detect("as psalm 23:1 says").await,
            vec!["psalm 23:1".to_string()]
        );
    }

    #[tokio::test]
    async fn returns_empty_on_plain_speech() {
        let detector = BookScanDetector::new();
        assert!(detector.detect("Good morning everyone.").await.is_empty());
        assert!(detector.detect("").await.is_empty());
        // A book name without a chapter:verse citation is not a reference.
        assert!(detector.detect("the book of John is next").await.is_empty());
    }
}
