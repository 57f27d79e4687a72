//! # pdf2zh
//!
//! Translate the text of PDF documents into Chinese, paragraph by paragraph,
//! with a chat-completion LLM.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input       validate the local path and %PDF header
//!  ├─ 2. Extract     page text via pdfium (blocking, spawn_blocking)
//!  ├─ 3. Paragraphs  strip page numbers, rejoin wrapped lines, split
//!  ├─ 4. Dispatch    W concurrent jobs, each retrying with random
//!  │                 exponential backoff (6 attempts, 1s..60s)
//!  └─ 5. Sink        ordered lines → ./result/a.txt (atomic write)
//! ```
//!
//! Output order always matches source order, whatever order the jobs
//! finish in. A paragraph that exhausts its retries is recorded as a typed
//! [`TranslationFailed`] in its slot and never stops the batch.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2zh::{translate_to_file, TranslationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // OPENAI_API_KEY, THREAD_NUM and PROXY are read from the environment.
//!     let config = TranslationConfig::from_env()?;
//!     let stats = translate_to_file("paper.pdf", "./result/a.txt", &config).await?;
//!     eprintln!("{}/{} paragraphs failed", stats.failed, stats.paragraphs);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2zh` binary (clap + anyhow + tracing-subscriber + indicatif + dotenv) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2zh = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod translate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    resolve_document_path, FailedParagraph, PageSelection, TranslationConfig,
    TranslationConfigBuilder,
};
pub use error::{ClientError, Pdf2ZhError, TranslationFailed};
pub use output::{DocumentInfo, ParagraphResult, TranslationOutput, TranslationStats};
pub use pipeline::client::{OpenAiClient, ProviderClient, TranslationClient};
pub use pipeline::dispatch::Dispatcher;
pub use pipeline::retry::{RetryPolicy, RetryingTranslator};
pub use pipeline::sink::{write_output, DEFAULT_OUTPUT_PATH};
pub use progress::{NoopProgressCallback, ProgressCallback, TranslationProgressCallback};
pub use translate::{
    inspect, translate_document, translate_paragraphs, translate_sync, translate_to_file,
};
