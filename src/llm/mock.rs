//! Scripted in-process provider for tests and offline runs.
//!
//! ```
//! use markpdfdown::llm::{CompletionRequest, LlmClient, MockProvider};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let mock = Arc::new(MockProvider::new().with_failure(500, "boom").with_response("ok"));
//! let client = LlmClient::new(mock.clone());
//! assert!(client.completion(&CompletionRequest::new("a")).await.is_err());
//! assert_eq!(client.completion(&CompletionRequest::new("b")).await.unwrap(), "ok");
//! assert_eq!(mock.call_count(), 2);
//! # });
//! ```

use crate::error::BackendError;
use crate::llm::provider::{CompletionRequest, Provider};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

pub const DEFAULT_MOCK_RESPONSE: &str = "Mock response";

#[derive(Debug, Clone)]
enum Scripted {
    Text(String),
    Status { status: u16, body: String },
    Malformed(String),
}

impl Scripted {
    fn into_result(self, provider: &str) -> Result<String, BackendError> {
        match self {
            Scripted::Text(text) => Ok(text),
            Scripted::Status { status, body } => Err(BackendError::Status {
                provider: provider.to_string(),
                status,
                body,
            }),
            Scripted::Malformed(detail) => Err(BackendError::MalformedResponse {
                provider: provider.to_string(),
                detail,
            }),
        }
    }
}

/// Returns queued results in order, then `default_response` forever.
/// Every request is recorded.
#[derive(Debug)]
pub struct MockProvider {
    identity: String,
    model: String,
    default_response: String,
    queue: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            identity: "mock".to_string(),
            model: "mock-model".to_string(),
            default_response: DEFAULT_MOCK_RESPONSE.to_string(),
            queue: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    pub fn with_default_response(mut self, text: impl Into<String>) -> Self {
        self.default_response = text.into();
        self
    }

    /// Queue a successful reply.
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.push(Scripted::Text(text.into()));
        self
    }

    /// Queue an HTTP-status failure.
    pub fn with_failure(self, status: u16, body: impl Into<String>) -> Self {
        self.push(Scripted::Status {
            status,
            body: body.into(),
        });
        self
    }

    /// Queue an unusable-response failure.
    pub fn with_malformed(self, detail: impl Into<String>) -> Self {
        self.push(Scripted::Malformed(detail.into()));
        self
    }

    fn push(&self, item: Scripted) {
        if let Ok(mut q) = self.queue.lock() {
            q.push_back(item);
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }
        let next = self.queue.lock().ok().and_then(|mut q| q.pop_front());
        match next {
            Some(item) => item.into_result(&self.identity),
            None => Ok(self.default_response.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queue_then_default() {
        let mock = MockProvider::new()
            .with_response("first")
            .with_malformed("empty")
            .with_default_response("later");
        let req = CompletionRequest::new("x");
        assert_eq!(mock.complete(&req).await.unwrap(), "first");
        assert!(matches!(
            mock.complete(&req).await,
            Err(BackendError::MalformedResponse { .. })
        ));
        assert_eq!(mock.complete(&req).await.unwrap(), "later");
        assert_eq!(mock.complete(&req).await.unwrap(), "later");
        assert_eq!(mock.call_count(), 4);
    }

    #[test]
    fn identity_is_configurable() {
        let mock = MockProvider::new().with_identity("openai");
        assert_eq!(mock.identity(), "openai");
        assert_eq!(mock.model(), "mock-model");
    }
}
