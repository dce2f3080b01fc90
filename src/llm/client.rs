//! The unified client: a thin facade over one [`Provider`].

use crate::config::LlmSettings;
use crate::error::{BackendError, ConfigError};
use crate::llm::factory::ProviderFactory;
use crate::llm::provider::{CompletionRequest, Provider};
use std::fmt;
use std::sync::Arc;

/// Stable entry point for LLM calls.
///
/// Cheap to clone; clones share the provider (and its connection pool).
#[derive(Clone)]
pub struct LlmClient {
    provider: Arc<dyn Provider>,
}

impl fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmClient")
            .field("provider", &self.provider.identity())
            .field("model", &self.provider.model())
            .finish()
    }
}

impl LlmClient {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Client for an explicit provider identity.
    pub fn from_identity(settings: &LlmSettings, identity: &str) -> Result<Self, ConfigError> {
        ProviderFactory::create(settings, Some(identity)).map(Self::new)
    }

    /// Client for the identity named by `LLM_PROVIDER` (default `openai`).
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, ConfigError> {
        ProviderFactory::create(settings, None).map(Self::new)
    }

    /// Shorthand for `from_settings(&LlmSettings::from_env())`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_settings(&LlmSettings::from_env())
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// One backend call, no retry. Errors come back unchanged.
    pub async fn completion(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        self.provider.complete(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockProvider;

    #[tokio::test]
    async fn forwards_request_and_result() {
        let mock = Arc::new(MockProvider::new().with_response("hello"));
        let client = LlmClient::new(mock.clone());
        let req = CompletionRequest::new("hi").with_system_prompt("sys");
        assert_eq!(client.completion(&req).await.unwrap(), "hello");
        assert_eq!(mock.requests(), vec![req]);
    }

    #[tokio::test]
    async fn forwards_errors_unchanged() {
        let mock = Arc::new(MockProvider::new().with_failure(503, "busy"));
        let client = LlmClient::new(mock);
        let err = client.completion(&CompletionRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 503, .. }));
    }

    #[test]
    fn from_identity_uses_factory() {
        let settings = LlmSettings::from_pairs([("DEEPSEEK_API_KEY", "k")]);
        let client = LlmClient::from_identity(&settings, "deepseek").unwrap();
        assert_eq!(client.provider().identity(), "deepseek");
        assert!(format!("{client:?}").contains("deepseek-chat"));
    }

    #[test]
    fn from_settings_reports_config_errors() {
        let settings = LlmSettings::from_pairs([("LLM_PROVIDER", "nope")]);
        assert!(matches!(
            LlmClient::from_settings(&settings),
            Err(ConfigError::UnknownProvider { .. })
        ));
    }
}
