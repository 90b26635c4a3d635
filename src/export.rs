//! Tab-separated flashcard export, importable by Anki's "Import File" dialog.
//!
//! One header row (`front`, `back`) then one card per row. Fields holding a
//! tab, a quote or a newline are quoted by the `csv` crate, so [`read_tsv`]
//! gives back exactly the set that was written.

use crate::error::FlashcardError;
use crate::output::{Flashcard, FlashcardSet};
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

fn writer<W: Write>(w: W) -> csv::Writer<W> {
    csv::WriterBuilder::new().delimiter(b'\t').from_writer(w)
}

fn reader<R: Read>(r: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new().delimiter(b'\t').from_reader(r)
}

/// Write `cards` as TSV to any writer.
pub fn to_writer<W: Write>(w: W, cards: &FlashcardSet) -> Result<(), csv::Error> {
    let mut wtr = writer(w);
    if cards.is_empty() {
        wtr.write_record(["front", "back"])?;
    }
    for card in cards {
        wtr.serialize(card)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Parse TSV written by [`to_writer`]. Rows are validated and deduplicated
/// like any other card source.
pub fn from_reader<R: Read>(r: R) -> Result<FlashcardSet, csv::Error> {
    let cards = reader(r)
        .deserialize::<Flashcard>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FlashcardSet::from_cards(cards))
}

/// Write `cards` to `path`.
///
/// The file is written to a temporary file next to its destination and
/// renamed into place, so an interrupted export never leaves a truncated file
/// behind. On failure the temporary file is removed.
pub fn write_tsv(path: impl AsRef<Path>, cards: &FlashcardSet) -> Result<(), FlashcardError> {
    let path = path.as_ref();
    let export_err = |source: csv::Error| FlashcardError::Export {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".pdf2anki-")
        .suffix(".tsv.tmp")
        .tempfile_in(dir)
        .map_err(|e| export_err(e.into()))?;
    to_writer(tmp.as_file_mut(), cards).map_err(export_err)?;
    tmp.persist(path).map_err(|e| export_err(e.error.into()))?;

    info!("Exported {} flashcards to {}", cards.len(), path.display());
    Ok(())
}

/// Read a TSV export back into a [`FlashcardSet`].
pub fn read_tsv(path: impl AsRef<Path>) -> Result<FlashcardSet, FlashcardError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| FlashcardError::Export {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    from_reader(file).map_err(|source| FlashcardError::Export {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FlashcardSet {
        FlashcardSet::from_cards(vec![
            Flashcard::new("What is 2 + 2?", "4").unwrap(),
            Flashcard::new("Tab\tinside", "A \"quoted\"\nmulti-line answer").unwrap(),
        ])
    }

    #[test]
    fn header_and_rows_are_tab_separated() {
        let mut buf = Vec::new();
        to_writer(&mut buf, &sample()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("front\tback\nWhat is 2 + 2?\t4\n"), "got: {text}");
    }

    #[test]
    fn empty_set_still_gets_a_header() {
        let mut buf = Vec::new();
        to_writer(&mut buf, &FlashcardSet::default()).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "front\tback\n");
        assert!(from_reader("front\tback\n".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn file_round_trip_preserves_awkward_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cards.tsv");
        write_tsv(&path, &sample()).unwrap();
        assert_eq!(read_tsv(&path).unwrap(), sample());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn failed_export_leaves_no_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("cards.tsv");
        std::fs::create_dir(&target).unwrap();

        let err = write_tsv(&target, &sample()).unwrap_err();
        assert!(matches!(err, FlashcardError::Export { .. }));
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("cards.tsv")]);
    }

    #[test]
    fn blank_side_is_rejected_on_import() {
        assert!(from_reader("front\tback\nQuestion\t   \n".as_bytes()).is_err());
    }

    #[test]
    fn missing_file_is_an_export_error() {
        let err = read_tsv("/no/such/dir/cards.tsv").unwrap_err();
        assert!(matches!(err, FlashcardError::Export { .. }));
    }
}
