//! # markpdfdown
//!
//! Convert PDF documents and images to Markdown with a vision-capable LLM,
//! through one client that speaks to several backends.
//!
//! ## Layout
//!
//! ```text
//! bytes / file
//!  │
//!  ├─ pipeline::input    detect PDF / JPEG / PNG / BMP / GIF / WebP, stage to scratch dir
//!  ├─ pipeline::render   pdfium → page_0001.png … (spawn_blocking), or the image itself
//!  ├─ pipeline::llm      page image → CompletionRequest → llm::try_with_retry
//!  │                        └─ LlmClient → dyn Provider (openai | deepseek | gemini)
//!  ├─ pipeline::postprocess  strip ```markdown fences, normalise whitespace
//!  └─ convert            sequential page loop, "page\n\n" concatenation
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use markpdfdown::{convert_file, ConversionConfig, LlmClient, LlmSettings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // LLM_PROVIDER=openai|deepseek|gemini plus the matching API key
//!     let client = LlmClient::from_settings(&LlmSettings::from_env())?;
//!     let output = convert_file("document.pdf", &client, &ConversionConfig::default()).await?;
//!     print!("{}", output.markdown);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | The `markpdfdown` binary (clap, anyhow, tracing-subscriber, indicatif, dotenvy) |
//! | `gemini` | on      | Google Gemini backend; without it `gemini` fails with a missing-dependency error |

pub mod config;
pub mod convert;
pub mod error;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

pub use config::{ConversionConfig, ConversionConfigBuilder, LlmSettings, PageRange};
pub use convert::{convert_bytes, convert_file, convert_to_file, write_markdown};
pub use error::{BackendError, ConfigError, ConvertError, PageError, RetryExhausted};
pub use llm::{
    call_with_retry, try_with_retry, CompletionRequest, LlmClient, Provider, ProviderFactory,
    ProviderKind, RetryPolicy,
};
pub use output::{ConversionOutput, ConversionStats, PageResult};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
