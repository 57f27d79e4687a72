//! Result types returned by the translation entry points.

use crate::config::FailedParagraph;
use crate::error::{Pdf2ZhError, TranslationFailed};
use serde::{Deserialize, Serialize};

/// Outcome of one paragraph, stored at its original position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParagraphResult {
    /// 0-indexed position in the extracted paragraph sequence.
    pub position: usize,
    /// Source text as extracted.
    pub source: String,
    /// Translated text; empty for blank input and for failures.
    pub translation: String,
    /// Remote invocations made for this paragraph.
    pub attempts: u32,
    /// Wall-clock time from job start to settlement.
    pub duration_ms: u64,
    /// Set when the paragraph exhausted its retries.
    pub error: Option<TranslationFailed>,
}

impl ParagraphResult {
    pub fn translated(
        position: usize,
        source: String,
        translation: String,
        attempts: u32,
        duration_ms: u64,
    ) -> Self {
        Self {
            position,
            source,
            translation,
            attempts,
            duration_ms,
            error: None,
        }
    }

    pub fn failed(
        position: usize,
        source: String,
        error: TranslationFailed,
        duration_ms: u64,
    ) -> Self {
        Self {
            position,
            source,
            translation: String::new(),
            attempts: error.attempts,
            duration_ms,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// True when the source was blank and no call was made.
    pub fn is_blank(&self) -> bool {
        self.is_ok() && self.attempts == 0
    }

    /// The line written to the output file for this paragraph.
    pub fn line(&self, on_failure: &FailedParagraph) -> String {
        match self.error {
            None => self.translation.clone(),
            Some(_) => on_failure.render(&self.source),
        }
    }
}

/// Basic facts about a PDF, available without translating it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub title: Option<String>,
    pub author: Option<String>,
    pub pdf_version: String,
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationStats {
    /// Pages in the document (0 when paragraphs were supplied directly).
    pub total_pages: usize,
    /// Pages covered by the selection.
    pub selected_pages: usize,
    /// Paragraphs dispatched.
    pub paragraphs: usize,
    /// Non-blank paragraphs translated successfully.
    pub translated: usize,
    /// Blank paragraphs passed through without a call.
    pub skipped_blank: usize,
    /// Paragraphs that exhausted their retries.
    pub failed: usize,
    /// Remote invocations across the whole batch.
    pub total_attempts: u64,
    pub extract_duration_ms: u64,
    pub translate_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl TranslationStats {
    /// Tally paragraph outcomes; timings and page counts are left at zero.
    pub fn from_paragraphs(paragraphs: &[ParagraphResult]) -> Self {
        Self {
            paragraphs: paragraphs.len(),
            translated: paragraphs.iter().filter(|p| p.is_ok() && !p.is_blank()).count(),
            skipped_blank: paragraphs.iter().filter(|p| p.is_blank()).count(),
            failed: paragraphs.iter().filter(|p| !p.is_ok()).count(),
            total_attempts: paragraphs.iter().map(|p| p.attempts as u64).sum(),
            ..Default::default()
        }
    }
}

/// The complete result of a translation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationOutput {
    /// Per-paragraph outcomes, in source order.
    pub paragraphs: Vec<ParagraphResult>,
    /// The output lines (one per paragraph), failures rendered by policy.
    pub lines: Vec<String>,
    pub stats: TranslationStats,
}

impl TranslationOutput {
    /// Assemble the output in source order.
    pub fn assemble(
        paragraphs: Vec<ParagraphResult>,
        on_failure: &FailedParagraph,
        stats: TranslationStats,
    ) -> Self {
        let lines = paragraphs.iter().map(|p| p.line(on_failure)).collect();
        Self {
            paragraphs,
            lines,
            stats,
        }
    }

    /// The text written to disk: lines joined by `\n`.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn failures(&self) -> impl Iterator<Item = &TranslationFailed> {
        self.paragraphs.iter().filter_map(|p| p.error.as_ref())
    }

    /// Treat any failed paragraph as an error.
    pub fn into_result(self) -> Result<Self, Pdf2ZhError> {
        if self.stats.failed == 0 {
            return Ok(self);
        }
        Err(Pdf2ZhError::PartialFailure {
            translated: self.stats.paragraphs - self.stats.failed,
            failed: self.stats.failed,
            total: self.stats.paragraphs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    fn failure(position: usize, text: &str) -> TranslationFailed {
        TranslationFailed {
            position,
            text: text.into(),
            attempts: 6,
            source: ClientError::EmptyResponse,
        }
    }

    fn sample() -> Vec<ParagraphResult> {
        vec![
            ParagraphResult::translated(0, "A".into(), "甲".into(), 1, 5),
            ParagraphResult::failed(1, "B".into(), failure(1, "B"), 9),
            ParagraphResult::translated(2, "".into(), "".into(), 0, 0),
            ParagraphResult::translated(3, "C".into(), "丙".into(), 3, 7),
        ]
    }

    #[test]
    fn stats_tally_outcomes() {
        let stats = TranslationStats::from_paragraphs(&sample());
        assert_eq!(stats.paragraphs, 4);
        assert_eq!(stats.translated, 2);
        assert_eq!(stats.skipped_blank, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total_attempts, 10);
    }

    #[test]
    fn assemble_renders_failures_by_policy() {
        let stats = TranslationStats::from_paragraphs(&sample());
        let out = TranslationOutput::assemble(sample(), &FailedParagraph::Empty, stats.clone());
        assert_eq!(out.text(), "甲\n\n\n丙");

        let out = TranslationOutput::assemble(sample(), &FailedParagraph::Source, stats);
        assert_eq!(out.lines, vec!["甲", "B", "", "丙"]);
        assert_eq!(out.failures().count(), 1);
    }

    #[test]
    fn into_result_reports_partial_failure() {
        let stats = TranslationStats::from_paragraphs(&sample());
        let out = TranslationOutput::assemble(sample(), &FailedParagraph::Empty, stats);
        match out.into_result() {
            Err(Pdf2ZhError::PartialFailure { translated, failed, total }) => {
                assert_eq!((translated, failed, total), (3, 1, 4));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn output_serialises_to_json() {
        let stats = TranslationStats::from_paragraphs(&sample());
        let out = TranslationOutput::assemble(sample(), &FailedParagraph::Empty, stats);
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["paragraphs"][1]["error"]["attempts"], 6);
        assert_eq!(json["stats"]["failed"], 1);
    }
}
