//! The provider contract.

use crate::error::BackendError;
use async_trait::async_trait;
use std::path::PathBuf;

/// Default sampling temperature for [`CompletionRequest::new`].
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default output-token cap for [`CompletionRequest::new`].
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// One whole-response completion call: a user message, an optional system
/// prompt and any number of images (input only).
///
/// `temperature` is passed through verbatim; no range is enforced here.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub user_message: String,
    pub system_prompt: Option<String>,
    pub image_paths: Vec<PathBuf>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            system_prompt: None,
            image_paths: Vec::new(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_paths.push(path.into());
        self
    }

    pub fn with_images<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.image_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// The system prompt, treating an empty string as absent.
    pub fn effective_system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref().filter(|s| !s.is_empty())
    }
}

/// A single LLM backend.
///
/// Implementations are immutable after construction and safe to share
/// between tasks; several providers with different identities may live in
/// one process.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Canonical identity, e.g. `"openai"`.
    fn identity(&self) -> &str;

    /// Model name sent to the backend.
    fn model(&self) -> &str;

    /// Perform exactly one backend call and return the generated text.
    ///
    /// Every failure (I/O, transport, HTTP status, unexpected body) is a
    /// [`BackendError`]; there is no sentinel return value.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError>;
}
