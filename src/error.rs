//! Error types for the pdf2zh library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`Pdf2ZhError`] (fatal): the run cannot proceed at all (document
//!   path missing, file not found, pdfium unavailable, output unwritable).
//!   Returned as `Err(Pdf2ZhError)` from the top-level `translate*` functions.
//!
//! * [`ClientError`] (transient): one remote call failed. The retrying
//!   translator absorbs these with backoff; they never reach the caller on
//!   their own.
//!
//! * [`TranslationFailed`] (non-fatal): one paragraph exhausted its retry
//!   budget. Stored inside [`crate::output::ParagraphResult`] so the rest of
//!   the batch still lands in the output file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2zh library.
///
/// Paragraph-level failures use [`TranslationFailed`] and are stored in
/// [`crate::output::ParagraphResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Pdf2ZhError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// No source document was configured (`PDF_PATH` unset and no argument).
    #[error("No PDF document configured.\nSet PDF_PATH or pass the path as an argument.")]
    MissingDocumentPath,

    /// The configured document path is unusable (wrong extension, absent).
    #[error("PDF_PATH is not a pdf file: '{path}' ({reason})")]
    InvalidDocument { path: PathBuf, reason: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The translation backend could not be constructed.
    #[error("Translation client '{provider}' is not configured.\n{hint}")]
    ClientNotConfigured { provider: String, hint: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// Input file was not found at extraction time.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page selection resolves to no pages of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium returned an error while reading the text of a page.
    #[error("Text extraction failed for page {page}: {detail}")]
    ExtractionFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium system-wide, or set PDFIUM_LIB_PATH=/path/to/libpdfium.\n\
Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    PdfiumBindingFailed(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// Some paragraphs failed; returned only by
    /// [`crate::output::TranslationOutput::into_result`].
    #[error("{failed}/{total} paragraphs failed to translate")]
    PartialFailure {
        translated: usize,
        failed: usize,
        total: usize,
    },

    /// Could not create or write the output text file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2ZhError {
    /// True for errors raised by startup configuration checks, before any
    /// extraction or remote call happens.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Pdf2ZhError::MissingDocumentPath
                | Pdf2ZhError::InvalidDocument { .. }
                | Pdf2ZhError::InvalidConfig(_)
                | Pdf2ZhError::ClientNotConfigured { .. }
        )
    }
}

/// A single failed call to the translation backend.
///
/// Cloneable and serialisable so the last cause can travel inside
/// [`TranslationFailed`] into the JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ClientError {
    /// Transport failure: DNS, connection refused, TLS, proxy.
    #[error("network error: {0}")]
    Network(String),

    /// Non-success HTTP status other than auth / rate-limit.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// HTTP 429.
    #[error("rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// HTTP 401 / 403.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// The call did not return within the configured timeout.
    #[error("call timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The backend answered without any content.
    #[error("response contained no translation")]
    EmptyResponse,

    /// Error surfaced by an edgequake-llm provider.
    #[error("provider error: {0}")]
    Provider(String),

    /// The worker running the call panicked or was cancelled.
    #[error("worker aborted: {0}")]
    Aborted(String),
}

/// One paragraph exhausted its retry budget.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("paragraph {position} failed after {attempts} attempts: {source}")]
pub struct TranslationFailed {
    /// Index of the paragraph in the batch.
    pub position: usize,
    /// The source text that could not be translated.
    pub text: String,
    /// Remote invocations made before giving up.
    pub attempts: u32,
    /// The last error returned by the client.
    #[source]
    pub source: ClientError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_display() {
        let e = Pdf2ZhError::PartialFailure {
            translated: 9,
            failed: 1,
            total: 10,
        };
        let msg = e.to_string();
        assert!(msg.contains("1/10"), "got: {msg}");
    }

    #[test]
    fn config_errors_are_classified() {
        assert!(Pdf2ZhError::MissingDocumentPath.is_config_error());
        assert!(Pdf2ZhError::InvalidDocument {
            path: "a.txt".into(),
            reason: "extension is not .pdf".into(),
        }
        .is_config_error());
        assert!(!Pdf2ZhError::FileNotFound { path: "a.pdf".into() }.is_config_error());
    }

    #[test]
    fn translation_failed_carries_text_and_cause() {
        let e = TranslationFailed {
            position: 3,
            text: "Hello".into(),
            attempts: 6,
            source: ClientError::Timeout { ms: 60_000 },
        };
        let msg = e.to_string();
        assert!(msg.contains("paragraph 3"));
        assert!(msg.contains("6 attempts"));
        assert!(msg.contains("60000ms"));
        assert_eq!(
            std::error::Error::source(&e).map(|s| s.to_string()),
            Some("call timed out after 60000ms".to_string())
        );
    }

    #[test]
    fn client_error_display() {
        let e = ClientError::Api {
            status: 500,
            message: "overloaded".into(),
        };
        assert_eq!(e.to_string(), "API error (status 500): overloaded");
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Pdf2ZhError>();
        assert_send_sync::<ClientError>();
        assert_send_sync::<TranslationFailed>();
    }
}
