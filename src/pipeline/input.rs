//! Input validation: confirm the source document is a readable PDF before
//! handing it to pdfium.
//!
//! pdfium reports every unreadable file as a generic load failure. Checking
//! existence, permissions and the `%PDF` magic bytes up front turns those
//! into specific errors the user can act on.

use crate::error::Pdf2ZhError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate a local PDF path: it exists, is readable, and starts with `%PDF`.
pub fn resolve_local(path: &Path) -> Result<PathBuf, Pdf2ZhError> {
    let path = path.to_path_buf();

    if !path.is_file() {
        return Err(Pdf2ZhError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_err() || &magic != b"%PDF" {
                return Err(Pdf2ZhError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2ZhError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Pdf2ZhError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}
