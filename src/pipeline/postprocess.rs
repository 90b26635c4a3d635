//! Post-processing: deterministic cleanup of OCR output, and deciding which
//! pages are worth turning into flashcards.
//!
//! Small vision models are chatty. Asked to transcribe a page they will
//! wrap the answer in code fences, open with "Here is the extracted text:",
//! or describe a blank page at length ("The image appears to be completely
//! blank…"). [`clean_ocr_text`] strips the wrapping; [`page_usability`]
//! recognises pages whose text is a description of nothing so they are not
//! fed to synthesis, where they would produce cards about the scanner.
//!
//! ## Rule Order
//!
//! Fences are stripped before line endings are normalised so that the fence
//! regex sees the model's raw output; the generic header is dropped after
//! trimming so a trailing space does not hide it.

use once_cell::sync::Lazy;
use regex::Regex;

/// Phrases vision models use when a page has no readable content.
pub const BLANK_PHRASES: &[&str] = &[
    "completely blank",
    "no discernible text",
    "appears to be blank",
    "does not contain any",
    "no text to extract",
    "appears to contain no",
];

/// Lead-in lines that carry no page content.
pub const GENERIC_OCR_HEADERS: &[&str] = &[
    "here is the extracted text",
    "here's the extracted text",
];

/// Apply all cleanup rules to raw OCR output.
///
/// 1. Strip outer code fences
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line
/// 4. Drop a leading generic "here is the extracted text" line
/// 5. Collapse 3+ consecutive blank lines down to 2
/// 6. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 7. Trim the whole text
pub fn clean_ocr_text(input: &str) -> String {
    let s = strip_code_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = drop_generic_header(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

// ── Rule 1: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\r?\n(.*)\r?\n```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Drop a generic lead-in line ──────────────────────────────────────

fn is_generic_header(line: &str) -> bool {
    let bare = line
        .trim()
        .trim_matches(|c: char| c == '*' || c == '#' || c == '-' || c == ' ' || c == ':')
        .to_lowercase();
    GENERIC_OCR_HEADERS.iter().any(|h| bare == *h)
}

fn drop_generic_header(input: &str) -> String {
    let mut lines = input.lines().skip_while(|l| l.trim().is_empty()).peekable();
    match lines.peek() {
        Some(first) if is_generic_header(first) => {
            lines.next();
            lines.collect::<Vec<_>>().join("\n")
        }
        _ => input.to_string(),
    }
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Rule 6: Remove invisible Unicode characters ──────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Page usability ───────────────────────────────────────────────────────────

/// Whether a page's text should be fed to flashcard synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageUsability {
    Usable,
    /// No text at all after trimming.
    Empty,
    /// Fewer than the configured minimum number of characters.
    TooShort(usize),
    /// The model described a blank page.
    Blank,
    /// Nothing but a generic OCR lead-in.
    GenericHeader,
}

impl PageUsability {
    pub fn is_usable(&self) -> bool {
        matches!(self, PageUsability::Usable)
    }
}

/// Which pages are left out of synthesis.
///
/// The default keeps every page with non-empty text. [`PageFilter::strict`]
/// also drops short pages and pages the model described as blank; the
/// phrase match is a plain substring test, so it can drop real content that
/// happens to say "does not contain any".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageFilter {
    /// Pages with fewer characters are skipped. `0` disables the check.
    pub min_chars: usize,
    /// Skip pages matching [`BLANK_PHRASES`] or holding only a generic header.
    pub skip_blank: bool,
}

impl PageFilter {
    /// 100-character minimum plus blank-page detection.
    pub const fn strict() -> Self {
        Self {
            min_chars: 100,
            skip_blank: true,
        }
    }

    /// Classify one page's cleaned text.
    pub fn classify(&self, text: &str) -> PageUsability {
        let lower = text.trim().to_lowercase();
        let chars = lower.chars().count();

        if chars == 0 {
            return PageUsability::Empty;
        }
        if chars < self.min_chars {
            return PageUsability::TooShort(chars);
        }
        if !self.skip_blank {
            return PageUsability::Usable;
        }
        if BLANK_PHRASES.iter().any(|p| lower.contains(p)) {
            return PageUsability::Blank;
        }
        if lower.lines().next().is_some_and(is_generic_header)
            && lower.lines().skip(1).all(|l| l.trim().is_empty())
        {
            return PageUsability::GenericHeader;
        }
        PageUsability::Usable
    }
}

/// Classify `text` with blank-page detection and a `min_chars` minimum.
pub fn page_usability(text: &str, min_chars: usize) -> PageUsability {
    PageFilter {
        min_chars,
        skip_blank: true,
    }
    .classify(text)
}
