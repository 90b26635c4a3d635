//! Flashcard response parsing: semi-structured model text → validated cards.
//!
//! The synthesis prompt asks for `Q: …` / `A: …` records, but small models
//! drift: they number the records, bold the markers, put the answer on the
//! same line as the question, wrap everything in a code fence or open with a
//! friendly preamble. The parser accepts all of that and reports what it
//! could not use instead of failing the whole response.
//!
//! Each candidate record gets exactly one [`CandidateOutcome`]: a card, a
//! malformed record (no answer marker), or an empty one (a side was blank
//! after trimming). Accepted cards are deduplicated in first-seen order.

use crate::output::{Flashcard, FlashcardSet, ParseReport};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// A line that opens a new record: `Q:`, `Question:`, `**Q:**`, `1. Q:`, `- Question:`.
static RE_QUESTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:[-*+]\s+|\d+[.)]\s*)?(?:\*\*)?(?:q|question)(?:\*\*)?\s*:(?:\*\*)?\s*")
        .unwrap()
});

/// An answer marker opening a line: `A:`, `Answer:`, `**A:**`, `- a:`.
static RE_ANSWER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*(?:[-*+]\s+)?(?:\*\*)?(?:a|answer)(?:\*\*)?\s*:(?:\*\*)?\s*").unwrap()
});

/// An answer marker after whitespace on the question's own line.
static RE_ANSWER_INLINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|\s)(?:\*\*)?(?:a|answer)(?:\*\*)?\s*:(?:\*\*)?\s*").unwrap()
});

/// Code fence lines (```` ``` ```` with or without a language tag).
static RE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*```[\w-]*\s*$").unwrap());

/// Horizontal rules and echoed page markers such as `--- Page 3 ---`.
static RE_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*-{3,}(?:\s*page\s+\d+\s*-{3,})?\s*$").unwrap());

/// What one candidate record turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOutcome {
    Card(Flashcard),
    /// No answer marker could be found.
    Malformed,
    /// Question or answer was empty after trimming.
    Empty,
}

/// Parse one record's text (everything after its question marker).
///
/// An answer marker at the start of a line wins over one inside the
/// question, so `vitamin A:` in a question does not split it. The inline
/// form (`Q: capital of France? A: Paris`) is used only when no line opens
/// with a marker.
pub fn parse_candidate(record: &str) -> CandidateOutcome {
    let Some(marker) = RE_ANSWER_LINE
        .find(record)
        .or_else(|| RE_ANSWER_INLINE.find(record))
    else {
        return CandidateOutcome::Malformed;
    };
    let front = squash_whitespace(&record[..marker.start()]);
    let back = squash_whitespace(&record[marker.end()..]);
    match Flashcard::new(front, back) {
        Some(card) => CandidateOutcome::Card(card),
        None => CandidateOutcome::Empty,
    }
}

/// Parse a full synthesis response.
///
/// Never fails: an unusable response yields an empty set and a report that
/// says why. The caller decides whether zero cards is an error.
pub fn parse_flashcards(response: &str) -> (FlashcardSet, ParseReport) {
    let normalised = response.replace("\r\n", "\n").replace('\r', "\n");
    let lines = normalised
        .lines()
        .filter(|l| !RE_FENCE.is_match(l) && !RE_SEPARATOR.is_match(l));

    let mut preamble = Vec::new();
    let mut records: Vec<Vec<&str>> = Vec::new();
    for line in lines {
        if let Some(m) = RE_QUESTION.find(line) {
            records.push(vec![&line[m.end()..]]);
        } else if let Some(current) = records.last_mut() {
            current.push(line);
        } else {
            preamble.push(line);
        }
    }

    let mut report = ParseReport::default();
    if RE_ANSWER_LINE.is_match(&preamble.join("\n")) {
        warn!("Answer found before any question; skipping it");
        report.candidates += 1;
        report.malformed += 1;
    }

    let mut cards = Vec::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        report.candidates += 1;
        let text = record.join("\n");
        match parse_candidate(&text) {
            CandidateOutcome::Card(card) => cards.push(card),
            CandidateOutcome::Malformed => {
                report.malformed += 1;
                warn!(
                    "Record {} has no answer marker; skipping: {:?}",
                    idx + 1,
                    preview(&text)
                );
            }
            CandidateOutcome::Empty => {
                report.empty += 1;
                debug!("Record {} has an empty side; dropping it", idx + 1);
            }
        }
    }

    let (set, duplicates) = FlashcardSet::from_cards_counting(cards);
    report.duplicates = duplicates;
    report.accepted = set.len();
    debug!(
        "Parsed {} records: {} accepted, {} malformed, {} empty, {} duplicates",
        report.candidates, report.accepted, report.malformed, report.empty, report.duplicates
    );
    (set, report)
}

fn squash_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn preview(s: &str) -> String {
    let flat = squash_whitespace(s);
    match flat.char_indices().nth(60) {
        Some((i, _)) => format!("{}…", &flat[..i]),
        None => flat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(set: &FlashcardSet) -> Vec<(&str, &str)> {
        set.iter().map(|c| (c.front(), c.back())).collect()
    }

    #[test]
    fn inline_answer() {
        let (set, report) = parse_flashcards("Q: What is the capital of France? A: Paris");
        assert_eq!(pairs(&set), vec![("What is the capital of France?", "Paris")]);
        assert_eq!(report.accepted, 1);
    }

    #[test]
    fn answer_on_following_lines_is_joined() {
        let (set, _) = parse_flashcards(
            "Q: What does ATP stand for?\nA: Adenosine\ntriphosphate\n\nQ: Where is it made?\nA: Mitochondria",
        );
        assert_eq!(
            pairs(&set),
            vec![
                ("What does ATP stand for?", "Adenosine triphosphate"),
                ("Where is it made?", "Mitochondria"),
            ]
        );
    }

    #[test]
    fn decorated_markers_are_recognised() {
        let response = "1. **Q:** Largest planet?\n**A:** Jupiter\n\n\
                        2. Question: Smallest planet?\nAnswer: Mercury\n\n\
                        - q: Closest star?\n  a: The Sun";
        let (set, report) = parse_flashcards(response);
        assert_eq!(
            pairs(&set),
            vec![
                ("Largest planet?", "Jupiter"),
                ("Smallest planet?", "Mercury"),
                ("Closest star?", "The Sun"),
            ]
        );
        assert_eq!(report.malformed, 0);
    }

    #[test]
    fn malformed_records_are_skipped_not_fatal() {
        let response = "Q: One?\nA: 1\n\nQ: this one never got an answer\n\nQ: Two?\nA: 2\n\nQ: Three?\nA: 3";
        let (set, report) = parse_flashcards(response);
        assert_eq!(set.len(), 3);
        assert_eq!(report.candidates, 4);
        assert_eq!(report.malformed, 1);
    }

    #[test]
    fn preamble_is_ignored_unless_it_holds_an_orphan_answer() {
        let (set, report) = parse_flashcards("Here are your flashcards:\n\nQ: x?\nA: y");
        assert_eq!(set.len(), 1);
        assert_eq!(report.malformed, 0);

        let (set, report) = parse_flashcards("A: stray answer\nQ: x?\nA: y");
        assert_eq!(set.len(), 1);
        assert_eq!(report.malformed, 1);
        assert_eq!(report.candidates, 2);
    }

    #[test]
    fn empty_sides_are_dropped() {
        let (set, report) = parse_flashcards("Q:\nA: orphaned\n\nQ: Real?\nA:   ");
        assert!(set.is_empty());
        assert_eq!(report.empty, 2);
        assert_eq!(report.malformed, 0);
    }

    #[test]
    fn fences_and_separators_do_not_leak_into_answers() {
        let response = "```text\nQ: x?\nA: y\n---\nQ: z?\nA: w\n--- Page 2 ---\n```";
        let (set, _) = parse_flashcards(response);
        assert_eq!(pairs(&set), vec![("x?", "y"), ("z?", "w")]);
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let (set, report) =
            parse_flashcards("Q: a?\nA: 1\n\nQ: b?\nA: 2\n\nQ: a?\nA: 1\n\nQ: a?\r\nA:  1 ");
        assert_eq!(pairs(&set), vec![("a?", "1"), ("b?", "2")]);
        assert_eq!(report.duplicates, 2);
        assert_eq!(report.accepted, 2);
    }

    #[test]
    fn answer_marker_inside_question_does_not_split_it() {
        let (set, report) =
            parse_flashcards("Q: What does vitamin A: retinol do?\nA: Supports vision");
        assert_eq!(
            pairs(&set),
            vec![("What does vitamin A: retinol do?", "Supports vision")]
        );
        assert_eq!(report.malformed, 0);

        let (set, _) = parse_flashcards("Q: Why have a Plan A: at all?\n**Answer:** Focus");
        assert_eq!(pairs(&set), vec![("Why have a Plan A: at all?", "Focus")]);
    }

    #[test]
    fn inline_marker_is_the_fallback() {
        assert_eq!(
            parse_candidate("capital of France? A: Paris"),
            CandidateOutcome::Card(Flashcard::new("capital of France?", "Paris").unwrap())
        );
        assert_eq!(
            parse_candidate("ratio of a to b?\nanswer: a:b"),
            CandidateOutcome::Card(Flashcard::new("ratio of a to b?", "a:b").unwrap())
        );
    }

    #[test]
    fn words_ending_in_a_are_not_answer_markers() {
        assert_eq!(
            parse_candidate("What is stored in a database schema: tables or rows?"),
            CandidateOutcome::Malformed
        );
    }
}
