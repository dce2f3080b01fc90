//! Error types for the markpdfdown library.
//!
//! The LLM layer has a two-tier taxonomy:
//!
//! * [`ConfigError`]: raised while **constructing** a provider or client
//!   (unknown provider name, missing API key, backend support not compiled
//!   in). Never retried; the caller should abort.
//!
//! * [`BackendError`]: raised by a single **call** to a backend (network
//!   failure, HTTP error status, unreadable response, unreadable image).
//!   Retry-eligible; see [`crate::llm::retry`].
//!
//! The document driver adds two more:
//!
//! * [`ConvertError`]: **fatal**, the conversion cannot proceed at all
//!   (empty or unrecognised input, corrupt PDF, pdfium missing).
//!
//! * [`PageError`]: **non-fatal**, one page produced no Markdown. Stored
//!   inside [`crate::output::PageResult`]; the run carries on.

use std::path::PathBuf;
use thiserror::Error;

// ── LLM layer ────────────────────────────────────────────────────────────

/// Failure while building a provider. Surfaces at construction time only.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The requested provider identity is not in the known set.
    #[error("Unknown provider: '{name}'. Supported providers: {supported}")]
    UnknownProvider { name: String, supported: String },

    /// None of the environment variables that may hold the credential is set.
    #[error("API key not found for provider '{provider}'. Set {}.", .tried.join(" or "))]
    MissingCredential {
        provider: String,
        tried: Vec<&'static str>,
    },

    /// The backend for this provider was not compiled into the binary.
    #[error(
        "Provider '{provider}' is not available in this build.\n\
Rebuild with: cargo build --features {feature}"
    )]
    MissingDependency {
        provider: String,
        feature: &'static str,
    },

    /// A setting is present but cannot be used.
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    InvalidSetting {
        var: &'static str,
        value: String,
        reason: String,
    },

    /// The HTTP client for the provider could not be built.
    #[error("Failed to initialise HTTP client for provider '{provider}': {detail}")]
    HttpClient { provider: String, detail: String },
}

/// Failure of one backend call. Retry-eligible.
#[derive(Debug, Error)]
pub enum BackendError {
    /// An image attached to the request could not be read.
    #[error("Failed to read image '{path}': {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The request never produced an HTTP response.
    #[error("Request to provider '{provider}' failed: {source}")]
    Transport {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-success status.
    #[error("Provider '{provider}' returned HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    /// The backend answered 2xx but the body is not what we expect.
    #[error("Unexpected response from provider '{provider}': {detail}")]
    MalformedResponse { provider: String, detail: String },
}

impl BackendError {
    /// True when the backend rejected the credential (HTTP 401/403).
    pub fn is_auth_error(&self) -> bool {
        matches!(self, BackendError::Status { status: 401 | 403, .. })
    }
}

/// Every attempt made by [`crate::llm::retry::try_with_retry`] failed.
#[derive(Debug, Error)]
#[error("LLM call failed after {attempts} attempt(s){}", last_error_suffix(.last_error))]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last_error: Option<BackendError>,
}

fn last_error_suffix(last_error: &Option<BackendError>) -> String {
    last_error
        .as_ref()
        .map(|e| format!(": {e}"))
        .unwrap_or_default()
}

// ── Document driver ──────────────────────────────────────────────────────

/// All fatal errors returned by the conversion entry points.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::PageResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The LLM client could not be constructed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// No bytes were supplied.
    #[error("No input data received.\nUsage: markpdfdown [start_page] [end_page] < path_to_input.pdf")]
    EmptyInput,

    /// The input is neither a PDF nor a supported image format.
    #[error("Unsupported file type (first bytes: {magic:02x?})")]
    UnsupportedInput { magic: Vec<u8> },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// The selected range contains no page of the document.
    #[error("Page range {start}-{end} selects no pages (document has {total} pages)")]
    PageOutOfRange {
        start: usize,
        end: usize,
        total: usize,
    },

    /// pdfium returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Install libpdfium or set PDFIUM_LIB_PATH=/path/to/libpdfium."
    )]
    PdfiumUnavailable(String),

    /// Scratch-directory or output I/O failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// LLM call failed on every attempt.
    #[error("Page {page}: LLM call failed after {attempts} attempt(s): {detail}")]
    LlmFailed {
        page: usize,
        attempts: u32,
        detail: String,
    },

    /// The model answered, but with nothing usable.
    #[error("Page {page}: model returned empty output")]
    EmptyOutput { page: usize },
}
