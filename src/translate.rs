//! Top-level translation entry points.
//!
//! [`translate_document`] runs the whole pipeline: extract page text, turn
//! it into paragraphs, translate them concurrently, and return the ordered
//! result. [`translate_to_file`] adds the output write. Paragraph failures
//! never make these return `Err`; check `output.stats.failed` or call
//! [`TranslationOutput::into_result`].

use crate::config::TranslationConfig;
use crate::error::Pdf2ZhError;
use crate::output::{DocumentInfo, TranslationOutput, TranslationStats};
use crate::pipeline::client::{OpenAiClient, ProviderClient, TranslationClient};
use crate::pipeline::dispatch::Dispatcher;
use crate::pipeline::retry::RetryingTranslator;
use crate::pipeline::{extract, paragraphs, sink};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Translate the selected pages of a PDF.
///
/// # Errors
/// Returns `Err(Pdf2ZhError)` only for fatal errors:
/// - the translation client cannot be built (no API key, bad proxy)
/// - file not found / permission denied / not a PDF
/// - the page selection matches no page
pub async fn translate_document(
    pdf_path: impl AsRef<Path>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, Pdf2ZhError> {
    let total_start = Instant::now();
    let pdf_path = pdf_path.as_ref();
    info!("Starting translation: {}", pdf_path.display());

    // ── Step 1: Build the client before touching the document ────────────
    let dispatcher = build_dispatcher(config)?;

    // ── Step 2: Extract page text ────────────────────────────────────────
    let extract_start = Instant::now();
    let extracted =
        extract::extract_pages(pdf_path, &config.pages, config.password.as_deref()).await?;
    let paragraphs = paragraphs::paragraphs_from_pages(&extracted.texts());
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    debug!(
        "Extracted {} paragraphs from {} pages in {}ms",
        paragraphs.len(),
        extracted.pages.len(),
        extract_duration_ms
    );

    // ── Step 3: Translate ────────────────────────────────────────────────
    let translate_start = Instant::now();
    let results = dispatcher.dispatch(paragraphs).await;
    let translate_duration_ms = translate_start.elapsed().as_millis() as u64;

    let stats = TranslationStats {
        total_pages: extracted.total_pages,
        selected_pages: extracted.pages.len(),
        extract_duration_ms,
        translate_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        ..TranslationStats::from_paragraphs(&results)
    };

    info!(
        "Translation complete: {}/{} paragraphs failed, {}ms total",
        stats.failed, stats.paragraphs, stats.total_duration_ms
    );

    Ok(TranslationOutput::assemble(results, &config.on_failure, stats))
}

/// Translate paragraphs that were already extracted.
///
/// The result has one entry per input, in input order.
pub async fn translate_paragraphs(
    paragraphs: Vec<String>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, Pdf2ZhError> {
    let dispatcher = build_dispatcher(config)?;
    let start = Instant::now();
    let results = dispatcher.dispatch(paragraphs).await;
    let elapsed = start.elapsed().as_millis() as u64;

    let stats = TranslationStats {
        translate_duration_ms: elapsed,
        total_duration_ms: elapsed,
        ..TranslationStats::from_paragraphs(&results)
    };
    Ok(TranslationOutput::assemble(results, &config.on_failure, stats))
}

/// Translate a PDF and write the result lines to `output_path`.
///
/// The file is written even when some paragraphs failed.
pub async fn translate_to_file(
    pdf_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &TranslationConfig,
) -> Result<TranslationStats, Pdf2ZhError> {
    let output = translate_document(pdf_path, config).await?;
    sink::write_output(output_path.as_ref(), &output.lines).await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`translate_document`].
///
/// Creates a temporary multi-threaded tokio runtime internally.
pub fn translate_sync(
    pdf_path: impl AsRef<Path>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, Pdf2ZhError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2ZhError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(translate_document(pdf_path, config))
}

/// Read page count and metadata without translating anything.
///
/// Does not require an API key.
pub async fn inspect(pdf_path: impl AsRef<Path>) -> Result<DocumentInfo, Pdf2ZhError> {
    extract::extract_info(pdf_path.as_ref(), None).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve the translation client, from most-specific to least-specific:
///
/// 1. a pre-built client in `config.client`
/// 2. a named edgequake-llm provider in `config.provider_name`
/// 3. the built-in OpenAI-compatible client (needs `config.api_key`)
pub fn resolve_client(
    config: &TranslationConfig,
) -> Result<Arc<dyn TranslationClient>, Pdf2ZhError> {
    if let Some(ref client) = config.client {
        return Ok(Arc::clone(client));
    }
    if let Some(ref name) = config.provider_name {
        return Ok(Arc::new(ProviderClient::from_config(name, config)?));
    }
    Ok(Arc::new(OpenAiClient::from_config(config)?))
}

fn build_dispatcher(config: &TranslationConfig) -> Result<Dispatcher, Pdf2ZhError> {
    let client = resolve_client(config)?;
    debug!("Using translation client '{}'", client.name());
    let timeout =
        (config.api_timeout_secs > 0).then(|| Duration::from_secs(config.api_timeout_secs));
    let translator = RetryingTranslator::new(client, config.retry).with_timeout(timeout);
    Ok(Dispatcher::new(translator, config.concurrency)
        .with_progress(config.progress_callback.clone()))
}
