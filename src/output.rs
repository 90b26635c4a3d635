//! Data model produced by the pipelines.
//!
//! Every value here is handed to the caller by value once a pipeline call
//! returns; nothing aliases back into pipeline internals. Fields are private
//! where an invariant has to hold (non-empty flashcard sides, 1-based page
//! numbers) and exposed through accessors instead.

use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ── Pages ────────────────────────────────────────────────────────────────

/// Text extracted from one page.
///
/// A page whose rendering or OCR failed still gets a `PageContent`: its text
/// is empty and [`PageContent::error`] records why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    page_number: usize,
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<PageError>,
}

impl PageContent {
    /// A successfully transcribed page.
    pub fn new(page_number: usize, text: impl Into<String>) -> Self {
        debug_assert!(page_number >= 1, "page numbers are 1-based");
        Self {
            page_number,
            text: text.into(),
            error: None,
        }
    }

    /// A page that failed; it keeps its slot with empty text.
    pub fn failed(error: PageError) -> Self {
        Self {
            page_number: error.page(),
            text: String::new(),
            error: Some(error),
        }
    }

    pub fn page_number(&self) -> usize {
        self.page_number
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn error(&self) -> Option<&PageError> {
        self.error.as_ref()
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Ordered per-page text for one document, one entry per attempted page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Number of pages in the source document (may exceed `pages.len()`
    /// when a page limit was applied).
    pub document_pages: usize,
    /// Attempted pages in page order, numbered `1..=pages.len()`.
    pub pages: Vec<PageContent>,
}

impl ExtractionResult {
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PageContent> {
        self.pages.iter()
    }

    pub fn failed_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.is_failed()).count()
    }

    /// Concatenate the non-empty page texts in page order.
    ///
    /// `separator` receives the page number of the page that follows it and
    /// is inserted between consecutive non-empty pages.
    pub fn joined_text(&self, separator: impl Fn(usize) -> String) -> String {
        join_pages(self.pages.iter(), separator)
    }
}

impl IntoIterator for ExtractionResult {
    type Item = PageContent;
    type IntoIter = std::vec::IntoIter<PageContent>;

    fn into_iter(self) -> Self::IntoIter {
        self.pages.into_iter()
    }
}

/// Join page texts, skipping empty (whitespace-only) pages.
pub(crate) fn join_pages<'a>(
    pages: impl Iterator<Item = &'a PageContent>,
    separator: impl Fn(usize) -> String,
) -> String {
    let mut out = String::new();
    for page in pages.filter(|p| !p.text().trim().is_empty()) {
        if !out.is_empty() {
            out.push_str(&separator(page.page_number()));
        }
        out.push_str(page.text().trim());
    }
    out
}

// ── Flashcards ───────────────────────────────────────────────────────────

/// A question/answer pair. Both sides are non-empty and trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawFlashcard")]
pub struct Flashcard {
    front: String,
    back: String,
}

impl Flashcard {
    /// Trim both sides; `None` if either side ends up empty.
    pub fn new(front: impl AsRef<str>, back: impl AsRef<str>) -> Option<Self> {
        let front = front.as_ref().trim();
        let back = back.as_ref().trim();
        if front.is_empty() || back.is_empty() {
            return None;
        }
        Some(Self {
            front: front.to_string(),
            back: back.to_string(),
        })
    }

    pub fn front(&self) -> &str {
        &self.front
    }

    pub fn back(&self) -> &str {
        &self.back
    }
}

#[derive(Deserialize)]
struct RawFlashcard {
    front: String,
    back: String,
}

impl TryFrom<RawFlashcard> for Flashcard {
    type Error = String;

    fn try_from(raw: RawFlashcard) -> Result<Self, Self::Error> {
        Flashcard::new(&raw.front, &raw.back)
            .ok_or_else(|| "flashcard front and back must be non-empty".to_string())
    }
}

/// Ordered, duplicate-free flashcards.
///
/// Serialises as a plain array; deserialising goes through
/// [`FlashcardSet::from_cards`] so duplicates are dropped there too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Flashcard>", into = "Vec<Flashcard>")]
pub struct FlashcardSet {
    cards: Vec<Flashcard>,
}

impl From<Vec<Flashcard>> for FlashcardSet {
    fn from(cards: Vec<Flashcard>) -> Self {
        Self::from_cards(cards)
    }
}

impl From<FlashcardSet> for Vec<Flashcard> {
    fn from(set: FlashcardSet) -> Self {
        set.cards
    }
}

impl FlashcardSet {
    /// Build a set, dropping exact `(front, back)` duplicates and keeping the
    /// first occurrence of each.
    pub fn from_cards(cards: impl IntoIterator<Item = Flashcard>) -> Self {
        Self::from_cards_counting(cards).0
    }

    /// Like [`FlashcardSet::from_cards`], also returning how many duplicates
    /// were dropped.
    pub(crate) fn from_cards_counting(cards: impl IntoIterator<Item = Flashcard>) -> (Self, usize) {
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        let mut duplicates = 0;
        for card in cards {
            if seen.insert(card.clone()) {
                kept.push(card);
            } else {
                duplicates += 1;
            }
        }
        (Self { cards: kept }, duplicates)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Flashcard> {
        self.cards.iter()
    }

    pub fn as_slice(&self) -> &[Flashcard] {
        &self.cards
    }

    pub fn into_vec(self) -> Vec<Flashcard> {
        self.cards
    }
}

impl IntoIterator for FlashcardSet {
    type Item = Flashcard;
    type IntoIter = std::vec::IntoIter<Flashcard>;

    fn into_iter(self) -> Self::IntoIter {
        self.cards.into_iter()
    }
}

impl<'a> IntoIterator for &'a FlashcardSet {
    type Item = &'a Flashcard;
    type IntoIter = std::slice::Iter<'a, Flashcard>;

    fn into_iter(self) -> Self::IntoIter {
        self.cards.iter()
    }
}

// ── Reports ──────────────────────────────────────────────────────────────

/// What happened to the records in one synthesis response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseReport {
    /// Candidate records found by the splitter.
    pub candidates: usize,
    /// Candidates skipped because no question/answer pair could be extracted.
    pub malformed: usize,
    /// Candidates dropped because a side was empty after trimming.
    pub empty: usize,
    /// Exact duplicates removed.
    pub duplicates: usize,
    /// Cards in the final set.
    pub accepted: usize,
}

/// Everything produced by one full generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub extraction: ExtractionResult,
    pub cards: FlashcardSet,
    pub report: ParseReport,
}
