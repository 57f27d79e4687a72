//! Concurrent dispatcher: fan paragraphs out to a bounded worker pool and
//! collect the outcomes back in source order.
//!
//! Each paragraph becomes one job. Jobs are `tokio::spawn`ed onto the
//! multi-threaded runtime so they run in parallel, and `buffer_unordered(W)`
//! keeps at most W of them in flight. Jobs settle in any order; each one
//! writes into the pre-sized result buffer at its own index, so the returned
//! vector always lines up with the input. A failed or panicked job only
//! marks its own slot.

use super::retry::RetryingTranslator;
use crate::error::{ClientError, TranslationFailed};
use crate::output::ParagraphResult;
use crate::progress::ProgressCallback;
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tracing::{error, info};

/// Translates a batch of paragraphs with at most `concurrency` in flight.
#[derive(Clone)]
pub struct Dispatcher {
    translator: RetryingTranslator,
    concurrency: usize,
    progress: Option<ProgressCallback>,
}

impl Dispatcher {
    /// `concurrency` below 1 is treated as 1.
    pub fn new(translator: RetryingTranslator, concurrency: usize) -> Self {
        Self {
            translator,
            concurrency: concurrency.max(1),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Translate every paragraph and return one result per input, in input
    /// order. Returns only after every job has settled.
    pub async fn dispatch(&self, paragraphs: Vec<String>) -> Vec<ParagraphResult> {
        let total = paragraphs.len();
        info!("Paragraphs length: {}", total);
        if let Some(ref cb) = self.progress {
            cb.on_batch_start(total);
        }

        let mut buffer: Vec<Option<ParagraphResult>> = (0..total).map(|_| None).collect();

        let jobs = paragraphs.into_iter().enumerate().map(|(position, text)| {
            let translator = self.translator.clone();
            let progress = self.progress.clone();
            let job_text = text.clone();
            async move {
                let handle =
                    tokio::spawn(run_job(translator, progress, position, job_text, total));
                (position, text, handle.await)
            }
        });

        let mut settled = stream::iter(jobs).buffer_unordered(self.concurrency);
        while let Some((position, text, joined)) = settled.next().await {
            let result = joined.unwrap_or_else(|e| {
                error!(position, "worker aborted: {e}");
                let failed = TranslationFailed {
                    position,
                    text: text.clone(),
                    attempts: 0,
                    source: ClientError::Aborted(e.to_string()),
                };
                if let Some(ref cb) = self.progress {
                    cb.on_paragraph_error(position, total, &failed.to_string());
                }
                ParagraphResult::failed(position, text, failed, 0)
            });
            buffer[position] = Some(result);
        }

        debug_assert!(buffer.iter().all(Option::is_some));
        let results: Vec<ParagraphResult> = buffer.into_iter().flatten().collect();

        if let Some(ref cb) = self.progress {
            cb.on_batch_complete(total, results.iter().filter(|r| r.is_ok()).count());
        }
        results
    }
}

/// One job: Pending → Running → {Succeeded, Failed}.
async fn run_job(
    translator: RetryingTranslator,
    progress: Option<ProgressCallback>,
    position: usize,
    text: String,
    total: usize,
) -> ParagraphResult {
    if let Some(ref cb) = progress {
        cb.on_paragraph_start(position, total);
    }
    let start = Instant::now();
    let outcome = translator.translate(position, &text).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(t) => {
            if let Some(ref cb) = progress {
                cb.on_paragraph_complete(position, total, t.text.len());
            }
            ParagraphResult::translated(position, text, t.text, t.attempts, duration_ms)
        }
        Err(failed) => {
            error!(
                position,
                attempts = failed.attempts,
                paragraph = %failed.text,
                "paragraph generated an exception: {}",
                failed.source
            );
            if let Some(ref cb) = progress {
                cb.on_paragraph_error(position, total, &failed.to_string());
            }
            ParagraphResult::failed(position, text, failed, duration_ms)
        }
    }
}
