//! Prompts for page transcription and flashcard synthesis.
//!
//! The flashcard prompt and the parser in [`crate::pipeline::parse`] agree on
//! one record format:
//!
//! ```text
//! Q: <question>
//! A: <answer>
//! ```
//!
//! Change one and you must change the other.

/// Default prompt sent with every page image.
///
/// Used when `FlashcardConfig::ocr_prompt` is `None`.
pub const OCR_PROMPT: &str = "Extract all text from this image. Preserve the structure and \
formatting as much as possible. If the page contains diagrams, charts or figures, describe \
what they show in one or two sentences. Output only the page content, without commentary.";

/// Record marker for the question side.
pub const QUESTION_MARKER: &str = "Q:";

/// Record marker for the answer side.
pub const ANSWER_MARKER: &str = "A:";

/// Build the synthesis prompt for `text`, which holds `pages` pages of source
/// material separated by page markers.
pub fn flashcard_prompt(text: &str, pages: usize, cards_per_page: usize) -> String {
    let target = pages.max(1) * cards_per_page.max(1);
    format!(
        "From the following text, create about {target} Anki flashcards covering the most \
important facts and concepts.

Format each flashcard on its own lines as:
{QUESTION_MARKER} [question]
{ANSWER_MARKER} [answer]

Separate flashcards with a blank line. Do not number them and do not add any other text.
Keep questions short (under 80 characters) and answers concise (under 200 characters).
Every question must be answerable from the text alone.

Text:
{text}

Flashcards:"
    )
}

/// Page-boundary marker inserted between pages of source text.
pub fn page_separator(page_num: usize) -> String {
    format!("\n\n--- Page {page_num} ---\n\n")
}
