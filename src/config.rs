//! Configuration types.
//!
//! Two structs cover everything:
//!
//! * [`LlmSettings`]: a snapshot of the environment variables that select
//!   and configure an LLM provider. Taken once (at process start, or from an
//!   explicit list of pairs in tests) and handed to
//!   [`crate::llm::ProviderFactory`], so no provider reads the process
//!   environment on its own.
//!
//! * [`ConversionConfig`]: knobs of the document driver, built via
//!   [`ConversionConfigBuilder`].

use crate::llm::retry::RetryPolicy;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Names of the environment variables understood by [`LlmSettings`].
pub mod env {
    /// Provider identity: `openai`, `deepseek` or `gemini` (case-insensitive).
    pub const LLM_PROVIDER: &str = "LLM_PROVIDER";
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const DEEPSEEK_API_KEY: &str = "DEEPSEEK_API_KEY";
    pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
    pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
    /// Endpoint override for the OpenAI-compatible providers.
    pub const OPENAI_API_BASE: &str = "OPENAI_API_BASE";
    /// Model override for the OpenAI-compatible providers; also the second
    /// choice for Gemini.
    pub const OPENAI_DEFAULT_MODEL: &str = "OPENAI_DEFAULT_MODEL";
    pub const GEMINI_MODEL: &str = "GEMINI_MODEL";
    pub const GEMINI_API_BASE: &str = "GEMINI_API_BASE";
    /// Per-request HTTP timeout in seconds. Unset means no client-side timeout.
    pub const LLM_REQUEST_TIMEOUT: &str = "LLM_REQUEST_TIMEOUT";

    pub(crate) const ALL: [&str; 10] = [
        LLM_PROVIDER,
        OPENAI_API_KEY,
        DEEPSEEK_API_KEY,
        GEMINI_API_KEY,
        GOOGLE_API_KEY,
        OPENAI_API_BASE,
        OPENAI_DEFAULT_MODEL,
        GEMINI_MODEL,
        GEMINI_API_BASE,
        LLM_REQUEST_TIMEOUT,
    ];

    pub(crate) const SECRETS: [&str; 4] =
        [OPENAI_API_KEY, DEEPSEEK_API_KEY, GEMINI_API_KEY, GOOGLE_API_KEY];
}

// ── LLM settings ─────────────────────────────────────────────────────────

/// Provider settings captured from the environment or supplied explicitly.
///
/// Empty values are treated exactly like unset ones, so `OPENAI_API_BASE=`
/// in a `.env` file does not clobber the provider default.
///
/// # Example
/// ```rust
/// use markpdfdown::LlmSettings;
///
/// let settings = LlmSettings::from_pairs([
///     ("LLM_PROVIDER", "deepseek"),
///     ("OPENAI_API_KEY", "sk-test"),
/// ]);
/// assert_eq!(settings.get("LLM_PROVIDER"), Some("deepseek"));
/// assert_eq!(settings.get("DEEPSEEK_API_KEY"), None);
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct LlmSettings {
    vars: HashMap<String, String>,
}

impl LlmSettings {
    /// Snapshot every recognised variable from the process environment.
    pub fn from_env() -> Self {
        Self::from_pairs(
            env::ALL
                .iter()
                .filter_map(|name| std::env::var(name).ok().map(|v| (*name, v))),
        )
    }

    /// Build settings from explicit `(name, value)` pairs.
    ///
    /// Unrecognised names are kept as well; lookups simply never ask for them.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let vars = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();
        Self { vars }
    }

    /// Set (or with an empty value, clear) a single variable.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        if value.trim().is_empty() {
            self.vars.remove(&name);
        } else {
            self.vars.insert(name, value);
        }
        self
    }

    /// Value of `name`, or `None` when unset or empty.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// First set variable among `names`, in order, with the name that matched.
    pub fn first_of(&self, names: &[&'static str]) -> Option<(&'static str, &str)> {
        names
            .iter()
            .find_map(|name| self.get(name).map(|value| (*name, value)))
    }

    /// Transport timeout from [`env::LLM_REQUEST_TIMEOUT`].
    pub fn request_timeout(&self) -> Result<Option<Duration>, crate::error::ConfigError> {
        let Some(raw) = self.get(env::LLM_REQUEST_TIMEOUT) else {
            return Ok(None);
        };
        match raw.trim().parse::<u64>() {
            Ok(0) => Ok(None),
            Ok(secs) => Ok(Some(Duration::from_secs(secs))),
            Err(e) => Err(crate::error::ConfigError::InvalidSetting {
                var: env::LLM_REQUEST_TIMEOUT,
                value: raw.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.vars.keys().collect();
        names.sort();
        let mut map = f.debug_map();
        for name in names {
            if env::SECRETS.contains(&name.as_str()) {
                map.entry(name, &"<redacted>");
            } else {
                map.entry(name, &self.vars[name]);
            }
        }
        map.finish()
    }
}

// ── Conversion config ────────────────────────────────────────────────────

/// Configuration for a document-to-Markdown conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use markpdfdown::{ConversionConfig, PageRange};
///
/// let config = ConversionConfig::builder()
///     .pages(PageRange::new(2, Some(5)))
///     .temperature(0.2)
///     .retry_times(5)
///     .build()
///     .unwrap();
/// assert_eq!(config.retry.retry_times, 5);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Pages to convert. Default: all.
    pub pages: PageRange,

    /// Longest edge, in pixels, of a rasterised PDF page. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Sampling temperature sent with every page. Default: 0.3.
    pub temperature: f32,

    /// Maximum output tokens per page. Default: 8192.
    pub max_tokens: u32,

    /// Attempts and backoff per page. Default: 3 attempts, 0.5 s step.
    pub retry: RetryPolicy,

    /// Custom system prompt. If None, uses the built-in one.
    pub system_prompt: Option<String>,

    /// Custom user prompt. If None, uses the built-in one.
    pub user_prompt: Option<String>,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            pages: PageRange::default(),
            max_rendered_pixels: 2000,
            temperature: 0.3,
            max_tokens: 8192,
            retry: RetryPolicy::default(),
            system_prompt: None,
            user_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("pages", &self.pages)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("retry", &self.retry)
            .field("system_prompt", &self.system_prompt.as_ref().map(|_| "<custom>"))
            .field("user_prompt", &self.user_prompt.as_ref().map(|_| "<custom>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn pages(mut self, range: PageRange) -> Self {
        self.config.pages = range;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t;
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn retry_times(mut self, n: u32) -> Self {
        self.config.retry.retry_times = n;
        self
    }

    pub fn retry_backoff(mut self, step: Duration) -> Self {
        self.config.retry.backoff_step = step;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn user_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.user_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// A page range starting at 0 is read as starting at page 1.
    pub fn build(mut self) -> Result<ConversionConfig, crate::error::ConvertError> {
        self.config.pages.start = self.config.pages.start.max(1);
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(crate::error::ConvertError::Internal(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if let Some(end) = c.pages.end {
            if end < c.pages.start {
                return Err(crate::error::ConvertError::PageOutOfRange {
                    start: c.pages.start,
                    end,
                    total: 0,
                });
            }
        }
        Ok(self.config)
    }
}

// ── Page range ───────────────────────────────────────────────────────────

/// Inclusive, 1-indexed page range. `end = None` means "through the last page".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl Default for PageRange {
    fn default() -> Self {
        Self::all()
    }
}

impl PageRange {
    /// Every page of the document.
    pub fn all() -> Self {
        Self {
            start: 1,
            end: None,
        }
    }

    /// `start..=end`; a start of 0 is read as 1 and an end of `Some(0)` as
    /// "last page", matching the CLI's `0` sentinel.
    pub fn new(start: usize, end: Option<usize>) -> Self {
        Self {
            start: start.max(1),
            end: end.filter(|&e| e > 0),
        }
    }

    /// Expand into sorted 0-indexed page numbers, clipped to `total_pages`.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let first = self.start.max(1);
        let last = self.end.unwrap_or(total_pages).min(total_pages);
        if first > last {
            return Vec::new();
        }
        (first - 1..last).collect()
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}-{}", self.start, end),
            None => write!(f, "{}-end", self.start),
        }
    }
}
