//! `markpdfdown` command-line tool.
//!
//! Reads a PDF or image (from a path or stdin), converts each page with the
//! configured LLM provider and prints the Markdown.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use markpdfdown::{
    convert_bytes, convert_file, write_markdown, ConversionConfig, ConversionOutput,
    ConversionProgressCallback, ConvertError, LlmClient, LlmSettings, PageRange, ProgressCallback,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

fn paint(code: u8, s: &str) -> String {
    format!("\x1b[{code}m{s}\x1b[0m")
}

// ── Progress bar ─────────────────────────────────────────────────────────

struct CliProgressCallback {
    bar: ProgressBar,
    page_started: Mutex<Option<Instant>>,
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
        bar.set_message("Rendering pages…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
        })
    }

    fn page_seconds(&self) -> f64 {
        self.page_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.bar.set_length(total_pages as u64);
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:40.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_prefix("Converting");
    }

    fn on_page_start(&self, page_num: usize, _total_pages: usize) {
        if let Ok(mut t) = self.page_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize, markdown_len: usize) {
        let secs = self.page_seconds();
        self.bar.println(format!(
            "  {} Page {page_num:>3}/{total_pages:<3}  {}",
            paint(32, "✓"),
            paint(2, &format!("{markdown_len:>6} bytes  {secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let secs = self.page_seconds();
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {page_num:>3}/{total_pages:<3}  {}  {}",
            paint(31, "✗"),
            paint(31, &msg),
            paint(2, &format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = total_pages.saturating_sub(success_count);
        let mark = match failed {
            0 => paint(32, "✔"),
            f if f == total_pages => paint(31, "✘"),
            _ => paint(33, "⚠"),
        };
        eprintln!("{mark} {success_count}/{total_pages} pages converted");
    }
}

// ── Arguments ────────────────────────────────────────────────────────────

const AFTER_HELP: &str = r#"EXAMPLES:
  markpdfdown report.pdf -o report.md
  markpdfdown --start 2 --end 5 --provider gemini paper.pdf
  markpdfdown scan.png --json > scan.json

  # Legacy form: page bounds as positionals, document on stdin
  markpdfdown 1 10 < report.pdf     pages 1-10
  markpdfdown 3 < report.pdf        pages 1-3

ENVIRONMENT VARIABLES (also read from .env):
  LLM_PROVIDER          openai (default), deepseek or gemini
  OPENAI_API_KEY        OpenAI key; fallback key for deepseek
  DEEPSEEK_API_KEY      DeepSeek key
  GEMINI_API_KEY        Gemini key (GOOGLE_API_KEY also accepted)
  OPENAI_API_BASE       Endpoint for openai/deepseek
  OPENAI_DEFAULT_MODEL  Model for openai/deepseek; fallback model for gemini
  GEMINI_MODEL          Model for gemini (default gemini-2.5-flash)
  GEMINI_API_BASE       Endpoint for gemini
  LLM_REQUEST_TIMEOUT   Per-request HTTP timeout in seconds
  PDFIUM_LIB_PATH       Path to libpdfium; otherwise the system library is used
"#;

/// Convert PDF documents and images to Markdown with a vision LLM.
#[derive(Parser, Debug)]
#[command(name = "markpdfdown", version, about, after_long_help = AFTER_HELP)]
struct Cli {
    /// Input file (PDF or image). Bare numbers are page bounds in the legacy
    /// `[start] [end] < file` form. Without a file, the document is read
    /// from stdin.
    #[arg(value_name = "INPUT", num_args = 0..=3)]
    positionals: Vec<String>,

    /// First page to convert (1-based).
    #[arg(long)]
    start: Option<usize>,

    /// Last page to convert; 0 means the last page of the document.
    #[arg(long)]
    end: Option<usize>,

    /// LLM provider: openai, deepseek or gemini. Overrides LLM_PROVIDER.
    #[arg(long)]
    provider: Option<String>,

    /// Write Markdown to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the full conversion result as JSON.
    #[arg(long)]
    json: bool,

    /// Attempts per page before it is skipped.
    #[arg(long, env = "MARKPDFDOWN_RETRY_TIMES", default_value_t = 3)]
    retry_times: u32,

    /// Longest edge of a rendered PDF page, in pixels.
    #[arg(long, env = "MARKPDFDOWN_MAX_PIXELS", default_value_t = 2000)]
    max_pixels: u32,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Debug-level logs.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Errors only.
    #[arg(short, long)]
    quiet: bool,
}

/// Where the document comes from and which pages to convert.
#[derive(Debug, PartialEq)]
struct Invocation {
    input: Option<PathBuf>,
    range: PageRange,
}

impl Cli {
    fn invocation(&self) -> Result<Invocation> {
        let mut input = None;
        let mut bounds = Vec::new();
        for token in &self.positionals {
            match token.parse::<usize>() {
                Ok(n) => bounds.push(n),
                Err(_) if input.is_none() => input = Some(PathBuf::from(token)),
                Err(_) => anyhow::bail!("More than one input given: '{}'", token),
            }
        }
        let (legacy_start, legacy_end) = match bounds.as_slice() {
            [] => (None, None),
            [end] => (Some(1), Some(*end)),
            [start, end] => (Some(*start), Some(*end)),
            _ => anyhow::bail!("At most two page numbers may be given positionally"),
        };

        let start = self.start.or(legacy_start).unwrap_or(1);
        let end = self.end.or(legacy_end);
        Ok(Invocation {
            input,
            range: PageRange::new(start, end),
        })
    }
}

// ── Entry point ──────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    // Before parsing, so `env = ...` arguments see .env values too.
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let invocation = cli.invocation()?;

    let settings = LlmSettings::from_env();
    let client = match cli.provider.as_deref() {
        Some(name) => LlmClient::from_identity(&settings, name),
        None => LlmClient::from_settings(&settings),
    };
    let client = match client {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            return Err(e).context("Could not initialise the LLM client");
        }
    };
    info!(
        "Using provider '{}' with model '{}'",
        client.provider().identity(),
        client.provider().model()
    );

    let mut builder = ConversionConfig::builder()
        .pages(invocation.range)
        .retry_times(cli.retry_times)
        .max_rendered_pixels(cli.max_pixels);
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new();
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    let output = match invocation.input {
        Some(ref path) => convert_file(path, &client, &config).await,
        None => {
            let mut bytes = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut bytes)
                .await
                .context("Failed to read stdin")?;
            convert_bytes(&bytes, None, &client, &config).await
        }
    };
    let output = match output {
        Ok(o) => o,
        Err(e) => {
            if matches!(e, ConvertError::EmptyInput) {
                error!("No input data received");
            }
            return Err(e).context("Conversion failed");
        }
    };

    emit(&cli, &output).await
}

async fn emit(cli: &Cli, output: &ConversionOutput) -> Result<()> {
    if output.stats.processed_pages == 0 {
        warn!(
            "None of the {} page(s) produced Markdown",
            output.stats.total_pages
        );
    }

    if cli.json {
        let json = serde_json::to_string_pretty(output).context("Failed to serialise output")?;
        match cli.output {
            Some(ref path) => write_markdown(path, &json).await?,
            None => println!("{json}"),
        }
        return Ok(());
    }

    match cli.output {
        Some(ref path) => {
            write_markdown(path, &output.markdown)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !cli.quiet {
                eprintln!(
                    "{}/{} pages  {}ms  →  {}",
                    output.stats.processed_pages,
                    output.stats.total_pages,
                    output.stats.total_duration_ms,
                    path.display()
                );
            }
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(output.markdown.as_bytes())
                .context("Failed to write to stdout")?;
            stdout.flush().context("Failed to write to stdout")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Invocation {
        let argv = std::iter::once("markpdfdown").chain(args.iter().copied());
        Cli::try_parse_from(argv).unwrap().invocation().unwrap()
    }

    #[test]
    fn plain_input() {
        let inv = parse(&["doc.pdf"]);
        assert_eq!(inv.input, Some(PathBuf::from("doc.pdf")));
        assert_eq!(inv.range, PageRange::all());
    }

    #[test]
    fn legacy_positional_bounds() {
        assert_eq!(parse(&["2", "5"]).range, PageRange::new(2, Some(5)));
        assert_eq!(parse(&["3"]).range, PageRange::new(1, Some(3)));
        assert_eq!(parse(&["1", "0"]).range, PageRange::all());
        assert_eq!(parse(&["2", "5"]).input, None);
    }

    #[test]
    fn flags_win_over_positionals() {
        let inv = parse(&["doc.pdf", "2", "5", "--start", "4"]);
        assert_eq!(inv.range, PageRange::new(4, Some(5)));
    }

    #[test]
    fn two_inputs_rejected() {
        let cli = Cli::try_parse_from(["markpdfdown", "a.pdf", "b.pdf"]).unwrap();
        assert!(cli.invocation().is_err());
    }
}
