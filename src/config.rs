//! Configuration types for PDF translation.
//!
//! All translation behaviour is controlled through [`TranslationConfig`],
//! built via its [`TranslationConfigBuilder`] or loaded from the environment
//! with [`TranslationConfig::from_env`]. The value is constructed once at
//! startup and handed to the client and dispatcher; nothing reads ambient
//! process state after that.

use crate::error::Pdf2ZhError;
use crate::pipeline::client::TranslationClient;
use crate::pipeline::retry::RetryPolicy;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Default worker-pool size.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Default chat model for the built-in OpenAI client.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Default target language named in the user prompt.
pub const DEFAULT_TARGET_LANGUAGE: &str = "Chinese";

/// Configuration for a PDF translation run.
///
/// # Example
/// ```rust
/// use pdf2zh::TranslationConfig;
///
/// let config = TranslationConfig::builder()
///     .concurrency(4)
///     .model("gpt-4o-mini")
///     .domain("logistics and distribution")
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 4);
/// ```
#[derive(Clone)]
pub struct TranslationConfig {
    /// Number of paragraphs translated concurrently. Default: 10.
    ///
    /// This is the only throttle on outbound calls. Lower it when the API
    /// answers with `429`.
    pub concurrency: usize,

    /// Retry budget and backoff envelope for each paragraph.
    pub retry: RetryPolicy,

    /// Per-call timeout in seconds. `0` disables the timeout. Default: 60.
    pub api_timeout_secs: u64,

    /// API key for the built-in OpenAI-compatible client.
    pub api_key: Option<String>,

    /// Proxy URL for outbound API traffic (`http://`, `https://`, `socks5://`).
    pub proxy: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint. Default: api.openai.com.
    pub base_url: Option<String>,

    /// Chat model identifier. If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// Route calls through an edgequake-llm provider ("anthropic", "gemini",
    /// "ollama", …) instead of the built-in OpenAI client.
    pub provider_name: Option<String>,

    /// Pre-constructed client. Takes precedence over everything above.
    pub client: Option<Arc<dyn TranslationClient>>,

    /// Sampling temperature. If None, the backend default applies.
    pub temperature: Option<f32>,

    /// Language the text is translated into. Default: "Chinese".
    pub target_language: String,

    /// Optional subject area the translation should follow, e.g.
    /// "logistics and distribution".
    pub domain: Option<String>,

    /// Custom system prompt. If None, uses the built-in translator persona.
    pub system_prompt: Option<String>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// What the output file shows for a paragraph that failed. Default: empty line.
    pub on_failure: FailedParagraph,

    /// Optional per-paragraph progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
            api_timeout_secs: 60,
            api_key: None,
            proxy: None,
            base_url: None,
            model: None,
            provider_name: None,
            client: None,
            temperature: None,
            target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
            domain: None,
            system_prompt: None,
            password: None,
            pages: PageSelection::default(),
            on_failure: FailedParagraph::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for TranslationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationConfig")
            .field("concurrency", &self.concurrency)
            .field("retry", &self.retry)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("proxy", &self.proxy)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("client", &self.client.as_ref().map(|c| c.name().to_string()))
            .field("temperature", &self.temperature)
            .field("target_language", &self.target_language)
            .field("domain", &self.domain)
            .field("pages", &self.pages)
            .field("on_failure", &self.on_failure)
            .finish()
    }
}

impl TranslationConfig {
    /// Create a new builder for `TranslationConfig`.
    pub fn builder() -> TranslationConfigBuilder {
        TranslationConfigBuilder {
            config: Self::default(),
        }
    }

    /// Load configuration from process environment variables.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `OPENAI_API_KEY`  | `api_key` |
    /// | `THREAD_NUM`      | `concurrency` (default 10) |
    /// | `PROXY`           | `proxy` |
    /// | `OPENAI_BASE_URL` | `base_url` |
    /// | `OPENAI_MODEL`    | `model` |
    ///
    /// Call `dotenv::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self, Pdf2ZhError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`TranslationConfig::from_env`] with an injectable lookup.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Pdf2ZhError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut builder = Self::builder();
        if let Some(raw) = get("THREAD_NUM") {
            let n: usize = raw.parse().map_err(|_| {
                Pdf2ZhError::InvalidConfig(format!(
                    "THREAD_NUM must be a positive integer, got '{raw}'"
                ))
            })?;
            if n == 0 {
                return Err(Pdf2ZhError::InvalidConfig("THREAD_NUM must be ≥ 1".into()));
            }
            builder = builder.concurrency(n);
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            builder = builder.api_key(key);
        }
        if let Some(proxy) = get("PROXY") {
            builder = builder.proxy(proxy);
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            builder = builder.base_url(url);
        }
        if let Some(model) = get("OPENAI_MODEL") {
            builder = builder.model(model);
        }
        builder.build()
    }
}

/// Builder for [`TranslationConfig`].
pub struct TranslationConfigBuilder {
    config: TranslationConfig,
}

impl fmt::Debug for TranslationConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TranslationConfigBuilder")
            .field(&self.config)
            .finish()
    }
}

impl TranslationConfigBuilder {
    /// Worker count. Zero is rejected by [`build`](Self::build).
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.retry.max_attempts = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn client(mut self, client: Arc<dyn TranslationClient>) -> Self {
        self.config.client = Some(client);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn target_language(mut self, lang: impl Into<String>) -> Self {
        self.config.target_language = lang.into();
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.config.domain = Some(domain.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn on_failure(mut self, policy: FailedParagraph) -> Self {
        self.config.on_failure = policy;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TranslationConfig, Pdf2ZhError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(Pdf2ZhError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.retry.max_attempts == 0 {
            return Err(Pdf2ZhError::InvalidConfig("Max attempts must be ≥ 1".into()));
        }
        if c.retry.min_delay > c.retry.max_delay {
            return Err(Pdf2ZhError::InvalidConfig(format!(
                "Minimum backoff {:?} exceeds maximum {:?}",
                c.retry.min_delay, c.retry.max_delay
            )));
        }
        if c.target_language.trim().is_empty() {
            return Err(Pdf2ZhError::InvalidConfig("Target language must not be empty".into()));
        }
        Ok(self.config)
    }
}

/// Validate the configured source document before any work starts.
///
/// The path must be present, end in `.pdf` (case-insensitive), and exist.
pub fn resolve_document_path(raw: Option<&str>) -> Result<PathBuf, Pdf2ZhError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(Pdf2ZhError::MissingDocumentPath)?;
    let path = PathBuf::from(raw);

    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(Pdf2ZhError::InvalidDocument {
            path,
            reason: "extension is not .pdf".into(),
        });
    }
    if !path.exists() {
        return Err(Pdf2ZhError::InvalidDocument {
            path,
            reason: "file does not exist".into(),
        });
    }
    Ok(path)
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the PDF to translate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Translate all pages (default).
    #[default]
    All,
    /// Translate a single page (1-indexed).
    Single(usize),
    /// Translate a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Translate specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

/// Parses `all`, `5`, `3-15`, or `1,3,5,7`.
impl FromStr for PageSelection {
    type Err = Pdf2ZhError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let page = |p: &str| -> Result<usize, Pdf2ZhError> {
            let n: usize = p.trim().parse().map_err(|_| {
                Pdf2ZhError::InvalidConfig(format!("Invalid page number: '{}'", p.trim()))
            })?;
            if n < 1 {
                return Err(Pdf2ZhError::InvalidConfig(format!(
                    "Pages are 1-indexed, minimum is 1 (got {n})"
                )));
            }
            Ok(n)
        };

        if s == "all" {
            return Ok(PageSelection::All);
        }
        if let Some((start, end)) = s.split_once('-') {
            let (start, end) = (page(start)?, page(end)?);
            if start > end {
                return Err(Pdf2ZhError::InvalidConfig(format!(
                    "Invalid page range '{start}-{end}': start must be <= end"
                )));
            }
            return Ok(PageSelection::Range(start, end));
        }
        if s.contains(',') {
            let pages = s.split(',').map(page).collect::<Result<Vec<_>, _>>()?;
            return Ok(PageSelection::Set(pages));
        }
        Ok(PageSelection::Single(page(&s)?))
    }
}

/// What the output file shows for a paragraph that exhausted its retries.
///
/// The failure itself is always kept, typed, in
/// [`crate::output::ParagraphResult::error`]; this only picks the line text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailedParagraph {
    /// An empty line (default).
    #[default]
    Empty,
    /// The untranslated source paragraph.
    Source,
    /// A fixed placeholder string.
    Marker(String),
}

impl FailedParagraph {
    /// The line written for a failed paragraph whose source text is `source`.
    pub fn render(&self, source: &str) -> String {
        match self {
            FailedParagraph::Empty => String::new(),
            FailedParagraph::Source => source.to_string(),
            FailedParagraph::Marker(m) => m.clone(),
        }
    }
}

/// Parses `empty`, `source`, or any other string as a marker.
impl FromStr for FailedParagraph {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "empty" | "" => FailedParagraph::Empty,
            "source" | "original" => FailedParagraph::Source,
            _ => FailedParagraph::Marker(s.to_string()),
        })
    }
}
