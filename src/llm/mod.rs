//! Uniform text/image-to-text calls across LLM backends.
//!
//! ## Layers
//!
//! ```text
//! retry::call_with_retry ──▶ LlmClient::completion ──▶ dyn Provider::complete ──▶ backend
//!   (backoff, degrade)         (stable facade)          (openai / deepseek / gemini)
//! ```
//!
//! * [`Provider`]: one backend's auth, default model, request shape and
//!   response extraction. Two variants: [`OpenAiProvider`] (shared by the
//!   `openai` and `deepseek` identities) and `GeminiProvider`.
//! * [`ProviderFactory`]: resolves an identity (explicit, or from
//!   `LLM_PROVIDER`) to a provider, applying defaults and checking credentials.
//! * [`LlmClient`]: wraps exactly one provider.
//! * [`retry`]: sequential retry with linear backoff; returns an empty
//!   string once attempts run out so a batch can move on.
//!
//! Data flows strictly downward; providers know nothing about retries or
//! documents.

pub mod client;
pub mod factory;
#[cfg(feature = "gemini")]
pub mod gemini;
pub mod identity;
pub mod image;
pub mod mock;
pub mod openai;
pub mod provider;
pub mod retry;

pub use client::LlmClient;
pub use factory::ProviderFactory;
#[cfg(feature = "gemini")]
pub use gemini::GeminiProvider;
pub use identity::ProviderKind;
pub use mock::MockProvider;
pub use openai::{OpenAiFlavor, OpenAiProvider};
pub use provider::{CompletionRequest, Provider};
pub use retry::{call_with_retry, try_with_retry, RetryPolicy};

/// Build the shared `reqwest` client for a provider, honouring
/// `LLM_REQUEST_TIMEOUT`.
pub(crate) fn build_http_client(
    provider: &str,
    settings: &crate::config::LlmSettings,
) -> Result<reqwest::Client, crate::error::ConfigError> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = settings.request_timeout()? {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| crate::error::ConfigError::HttpClient {
            provider: provider.to_string(),
            detail: e.to_string(),
        })
}

/// Read a non-success response into a [`crate::error::BackendError::Status`].
pub(crate) async fn status_error(
    provider: &str,
    response: reqwest::Response,
) -> crate::error::BackendError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    crate::error::BackendError::Status {
        provider: provider.to_string(),
        status,
        body: truncate(&body, 500),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max_chars).collect();
        out.push('…');
        out
    }
}
