//! CLI binary for pdf2zh.
//!
//! A thin shim over the library crate that maps CLI flags and environment
//! variables to `TranslationConfig`, runs the pipeline, and writes the
//! result file.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2zh::{
    inspect, resolve_document_path, translate_document, write_output, FailedParagraph,
    PageSelection, ProgressCallback, RetryPolicy, TranslationConfig, TranslationProgressCallback,
    DEFAULT_OUTPUT_PATH,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Terminal progress bar. Paragraphs settle out of order, so the bar only
/// counts; failures are printed above it as they happen.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Extracting text…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl TranslationProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>4}/{len} paragraphs  \
                 ⏱ {elapsed_precise}  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_length(total as u64);
        self.bar.set_prefix("Translating");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Translating {total} paragraphs…"))
        ));
    }

    fn on_paragraph_complete(&self, _position: usize, _total: usize, _len: usize) {
        self.bar.inc(1);
    }

    fn on_paragraph_error(&self, position: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Paragraph {:>4}/{:<4}  {}",
            red("✗"),
            position + 1,
            total,
            red(&msg)
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, succeeded: usize) {
        self.bar.finish_and_clear();
        let failed = total.saturating_sub(succeeded);
        if failed == 0 {
            eprintln!("{} {} paragraphs translated", green("✔"), bold(&succeeded.to_string()));
        } else {
            eprintln!(
                "{} {}/{} paragraphs translated  ({} failed)",
                cyan("⚠"),
                bold(&succeeded.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Translate the whole document into ./result/a.txt
  OPENAI_API_KEY=sk-... pdf2zh paper.pdf

  # First two pages, 4 workers, through a proxy
  pdf2zh --pages 1-2 --threads 4 --proxy http://127.0.0.1:7890 paper.pdf

  # Domain-specific wording, keep the source text for failed paragraphs
  pdf2zh --domain "logistics and distribution" --on-failure source paper.pdf

  # Use another edgequake-llm provider
  pdf2zh --provider anthropic --model claude-3-5-haiku-latest paper.pdf

  # Inspect PDF metadata (no API key needed)
  pdf2zh --inspect-only paper.pdf

ENVIRONMENT VARIABLES:
  PDF_PATH          Source PDF (used when no path argument is given)
  OPENAI_API_KEY    API key for the built-in OpenAI client
  OPENAI_BASE_URL   OpenAI-compatible endpoint (default https://api.openai.com/v1)
  OPENAI_MODEL      Chat model (default gpt-3.5-turbo)
  THREAD_NUM        Concurrent translation workers (default 10)
  PROXY             Proxy URL for API traffic
  PDFIUM_LIB_PATH   Path to libpdfium (file or directory); else the system library
  RUST_LOG          Log filter, e.g. pdf2zh=debug

  Variables may also be set in a .env file in the working directory.
"#;

/// Translate the text of a PDF into Chinese with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2zh",
    version,
    about = "Translate PDF text into Chinese, paragraph by paragraph, with an LLM",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source PDF path.
    #[arg(env = "PDF_PATH")]
    input: Option<String>,

    /// Output text file.
    #[arg(short, long, env = "PDF2ZH_OUTPUT", default_value = DEFAULT_OUTPUT_PATH)]
    output: PathBuf,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF2ZH_PAGES", default_value = "all")]
    pages: PageSelection,

    /// Number of concurrent translation workers.
    #[arg(short = 'j', long = "threads", env = "THREAD_NUM", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..))]
    threads: u64,

    /// API key for the built-in OpenAI client.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Proxy URL for API traffic.
    #[arg(long, env = "PROXY")]
    proxy: Option<String>,

    /// OpenAI-compatible base URL.
    #[arg(long, env = "OPENAI_BASE_URL")]
    base_url: Option<String>,

    /// Chat model ID.
    #[arg(long, env = "OPENAI_MODEL")]
    model: Option<String>,

    /// Use an edgequake-llm provider (anthropic, gemini, ollama, …)
    /// instead of the built-in OpenAI client.
    #[arg(long, env = "PDF2ZH_PROVIDER")]
    provider: Option<String>,

    /// Target language.
    #[arg(long = "lang", env = "PDF2ZH_LANG", default_value = "Chinese")]
    target_language: String,

    /// Subject area the translation should follow.
    #[arg(long, env = "PDF2ZH_DOMAIN")]
    domain: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PDF2ZH_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF2ZH_TEMPERATURE")]
    temperature: Option<f32>,

    /// Attempts per paragraph before giving up.
    #[arg(long, env = "PDF2ZH_MAX_ATTEMPTS", default_value_t = 6)]
    max_attempts: u32,

    /// Upper bound for the backoff between attempts, in seconds.
    #[arg(long, env = "PDF2ZH_MAX_BACKOFF", default_value_t = 60)]
    max_backoff: u64,

    /// Per-call timeout in seconds (0 disables it).
    #[arg(long, env = "PDF2ZH_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// What to write for failed paragraphs: empty, source, or a marker string.
    #[arg(long, env = "PDF2ZH_ON_FAILURE", default_value = "empty")]
    on_failure: FailedParagraph,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2ZH_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Exit with an error when any paragraph failed (the file is still written).
    #[arg(long)]
    strict: bool,

    /// Also print the structured result (TranslationOutput) as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Print PDF metadata only, no translation.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2ZH_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Only errors while the progress bar is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.verbose;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let pdf_path = resolve_document_path(cli.input.as_deref()).context("Invalid configuration")?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&pdf_path).await.context("Failed to inspect PDF")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", pdf_path.display());
            if let Some(ref t) = info.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = info.author {
                println!("Author:       {}", a);
            }
            println!("Pages:        {}", info.page_count);
            println!("PDF Version:  {}", info.pdf_version);
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as ProgressCallback)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    // ── Run translation ──────────────────────────────────────────────────
    let output = translate_document(&pdf_path, &config)
        .await
        .context("Translation failed")?;
    write_output(&cli.output, &output.lines)
        .await
        .context("Failed to write result")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    let stats = &output.stats;
    if !cli.quiet {
        eprintln!(
            "{}  {}/{} paragraphs  {}ms  →  {}",
            if stats.failed == 0 { green("✔") } else { cyan("⚠") },
            stats.paragraphs - stats.failed,
            stats.paragraphs,
            stats.total_duration_ms,
            bold(&cli.output.display().to_string()),
        );
        eprintln!(
            "   {} pages  /  {} blank  /  {} API calls",
            dim(&stats.selected_pages.to_string()),
            dim(&stats.skipped_blank.to_string()),
            dim(&stats.total_attempts.to_string()),
        );
    }

    if cli.strict {
        output.into_result()?;
    }
    Ok(())
}

/// Map CLI args to `TranslationConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<TranslationConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let retry = RetryPolicy::new(
        cli.max_attempts,
        Duration::from_secs(1),
        Duration::from_secs(cli.max_backoff.max(1)),
    );

    let mut builder = TranslationConfig::builder()
        .concurrency(cli.threads as usize)
        .retry(retry)
        .api_timeout_secs(cli.api_timeout)
        .target_language(cli.target_language.clone())
        .pages(cli.pages.clone())
        .on_failure(cli.on_failure.clone());

    let non_blank = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    if let Some(key) = non_blank(&cli.api_key) {
        builder = builder.api_key(key);
    }
    if let Some(proxy) = non_blank(&cli.proxy) {
        builder = builder.proxy(proxy);
    }
    if let Some(url) = non_blank(&cli.base_url) {
        builder = builder.base_url(url);
    }
    if let Some(model) = non_blank(&cli.model) {
        builder = builder.model(model);
    }
    if let Some(provider) = non_blank(&cli.provider) {
        builder = builder.provider_name(provider);
    }
    if let Some(domain) = non_blank(&cli.domain) {
        builder = builder.domain(domain);
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
