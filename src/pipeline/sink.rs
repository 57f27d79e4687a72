//! Output sink: write the translated lines to a UTF-8 text file.
//!
//! The file is written to a sibling temp path and renamed into place, so a
//! reader never sees a half-written result and a crashed run leaves any
//! previous output intact.

use crate::error::Pdf2ZhError;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default output location, relative to the working directory.
pub const DEFAULT_OUTPUT_PATH: &str = "./result/a.txt";

/// Write `lines` joined by `\n` to `path`, creating parent directories and
/// overwriting any existing file.
pub async fn write_output(path: &Path, lines: &[String]) -> Result<(), Pdf2ZhError> {
    let write_err = |source| Pdf2ZhError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = temp_path(path);
    tokio::fs::write(&tmp_path, lines.join("\n")).await.map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }

    info!("Wrote {} lines to {}", lines.len(), path.display());
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
