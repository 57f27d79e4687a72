//! Pipeline stages for PDF-to-Chinese translation.
//!
//! Each submodule implements one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ paragraphs ──▶ dispatch ──▶ sink
//! (path)    (pdfium)    (cleanup)      (retry+LLM)  (text file)
//! ```
//!
//! 1. [`input`]      validate the local path and the `%PDF` header
//! 2. [`extract`]    read the text of the selected pages; runs in
//!    `spawn_blocking` because pdfium is a blocking C library
//! 3. [`paragraphs`] strip page numbers, rejoin soft-wrapped lines, split
//! 4. [`dispatch`]   fan paragraphs out to W workers; each one drives a
//!    [`retry::RetryingTranslator`] over a [`client::TranslationClient`]
//! 5. [`sink`]       write the ordered lines with an atomic rename

pub mod client;
pub mod dispatch;
pub mod extract;
pub mod input;
pub mod paragraphs;
pub mod retry;
pub mod sink;
