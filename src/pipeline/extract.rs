//! Page text extraction via pdfium.
//!
//! pdfium is a blocking C library, so every call here runs inside
//! `tokio::task::spawn_blocking`. The library is bound per call from
//! `PDFIUM_LIB_PATH` (a file or the directory holding it) or, failing that,
//! from the system library search path.

use super::input::resolve_local;
use crate::config::PageSelection;
use crate::error::Pdf2ZhError;
use crate::output::DocumentInfo;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Text of the selected pages, in page order.
#[derive(Debug, Clone, Default)]
pub struct ExtractedPages {
    /// Pages in the document.
    pub total_pages: usize,
    /// `(page_index_0based, text)` for each selected page.
    pub pages: Vec<(usize, String)>,
}

impl ExtractedPages {
    /// Page texts without their indices.
    pub fn texts(&self) -> Vec<String> {
        self.pages.iter().map(|(_, t)| t.clone()).collect()
    }
}

/// Bind to pdfium using `PDFIUM_LIB_PATH` when set, else the system library.
pub fn bind_pdfium() -> Result<Pdfium, Pdf2ZhError> {
    let bindings = match std::env::var_os("PDFIUM_LIB_PATH") {
        Some(raw) if !raw.is_empty() => {
            let mut path = PathBuf::from(raw);
            if path.is_dir() {
                path = Pdfium::pdfium_platform_library_name_at_path(&path);
            }
            debug!("Binding pdfium from {}", path.display());
            Pdfium::bind_to_library(&path)
                .map_err(|e| Pdf2ZhError::PdfiumBindingFailed(format!("{}: {e}", path.display())))?
        }
        _ => Pdfium::bind_to_system_library()
            .map_err(|e| Pdf2ZhError::PdfiumBindingFailed(e.to_string()))?,
    };
    Ok(Pdfium::new(bindings))
}

/// Extract the text of the selected pages.
pub async fn extract_pages(
    pdf_path: &Path,
    selection: &PageSelection,
    password: Option<&str>,
) -> Result<ExtractedPages, Pdf2ZhError> {
    let path = resolve_local(pdf_path)?;
    let selection = selection.clone();
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || {
        extract_pages_blocking(&path, &selection, password.as_deref())
    })
    .await
    .map_err(|e| Pdf2ZhError::Internal(format!("Extraction task panicked: {e}")))?
}

fn extract_pages_blocking(
    pdf_path: &Path,
    selection: &PageSelection,
    password: Option<&str>,
) -> Result<ExtractedPages, Pdf2ZhError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, password)?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let indices = selection.to_indices(total_pages);
    if indices.is_empty() {
        return Err(Pdf2ZhError::PageOutOfRange {
            page: first_requested_page(selection),
            total: total_pages,
        });
    }

    let mut out = Vec::with_capacity(indices.len());
    for idx in indices {
        let page = pages.get(idx as PdfPageIndex).map_err(|e| Pdf2ZhError::ExtractionFailed {
            page: idx + 1,
            detail: format!("{e:?}"),
        })?;
        let text = page
            .text()
            .map_err(|e| Pdf2ZhError::ExtractionFailed {
                page: idx + 1,
                detail: format!("{e:?}"),
            })?
            .all();
        debug!("Extracted page {} ({} chars)", idx + 1, text.chars().count());
        out.push((idx, text));
    }

    Ok(ExtractedPages {
        total_pages,
        pages: out,
    })
}

/// Read page count and basic metadata without extracting any text.
pub async fn extract_info(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentInfo, Pdf2ZhError> {
    let path = resolve_local(pdf_path)?;
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium()?;
        let document = open_document(&pdfium, &path, password.as_deref())?;
        let metadata = document.metadata();
        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata
                .get(tag)
                .map(|t| t.value().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(DocumentInfo {
            page_count: document.pages().len() as usize,
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            pdf_version: format!("{:?}", document.version()),
        })
    })
    .await
    .map_err(|e| Pdf2ZhError::Internal(format!("Metadata task panicked: {e}")))?
}

fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, Pdf2ZhError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let detail = format!("{e:?}");
        if detail.to_lowercase().contains("password") {
            if password.is_some() {
                Pdf2ZhError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                Pdf2ZhError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            Pdf2ZhError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail,
            }
        }
    })
}

/// The 1-indexed page reported when a selection resolves to nothing.
fn first_requested_page(selection: &PageSelection) -> usize {
    match selection {
        PageSelection::All => 1,
        PageSelection::Single(p) => *p,
        PageSelection::Range(start, _) => *start,
        PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(1),
    }
}
