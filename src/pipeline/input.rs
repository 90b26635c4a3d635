//! Input validation: make sure a path names a readable PDF before pdfium sees it.
//!
//! pdfium reports a missing file and a garbage file with the same opaque
//! error, so we check existence, permissions and the `%PDF` magic bytes
//! ourselves and turn each into its own [`FlashcardError`] variant.

use crate::error::FlashcardError;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate that `path` exists, is readable, and starts with `%PDF`.
pub fn validate_pdf_path(path: &Path) -> Result<PathBuf, FlashcardError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(FlashcardError::NotFound { path });
    }
    if path.is_dir() {
        return Err(FlashcardError::CorruptDocument {
            path,
            detail: "path is a directory".into(),
        });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            match f.read_exact(&mut magic) {
                Ok(()) if &magic == b"%PDF" => {}
                Ok(()) => {
                    return Err(FlashcardError::CorruptDocument {
                        path,
                        detail: format!("not a PDF (first bytes: {magic:?})"),
                    });
                }
                Err(_) => {
                    return Err(FlashcardError::CorruptDocument {
                        path,
                        detail: "file is shorter than a PDF header".into(),
                    });
                }
            }
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            return Err(FlashcardError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(FlashcardError::NotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}
