//! OpenAI-compatible chat-completions provider.
//!
//! One implementation serves every backend that speaks the
//! `/chat/completions` dialect; the [`OpenAiFlavor`] only decides the
//! default endpoint, model and which API-key variable is consulted first.
//!
//! ## Request layout
//!
//! ```text
//! messages: [ {role: system, content: "<system prompt>"},      (optional)
//!             {role: user,   content: [ {type: text, …},
//!                                       {type: image_url, …}, … ]} ]
//! ```
//!
//! Text comes first and every image follows as a `data:` URI.

use crate::config::{env, LlmSettings};
use crate::error::{BackendError, ConfigError};
use crate::llm::image::{data_uri, encode_image_as_base64, infer_mime_type};
use crate::llm::provider::{CompletionRequest, Provider};
use crate::llm::ProviderKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, info};

const ATTRIBUTION_TITLE: &str = "MarkPDFdown";
const ATTRIBUTION_REFERER: &str = "https://github.com/MarkPDFdown/markpdfdown.git";

/// Which OpenAI-compatible backend a provider targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiFlavor {
    OpenAi,
    DeepSeek,
}

/// Hardcoded per-flavor defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlavorDefaults {
    pub base_url: &'static str,
    pub model: &'static str,
    pub credential_env: &'static str,
}

impl OpenAiFlavor {
    pub fn defaults(self) -> FlavorDefaults {
        match self {
            OpenAiFlavor::OpenAi => FlavorDefaults {
                base_url: "https://api.openai.com/v1/",
                model: "gpt-4o",
                credential_env: env::OPENAI_API_KEY,
            },
            OpenAiFlavor::DeepSeek => FlavorDefaults {
                base_url: "https://api.deepseek.com/v1",
                model: "deepseek-chat",
                credential_env: env::DEEPSEEK_API_KEY,
            },
        }
    }

    pub fn kind(self) -> ProviderKind {
        match self {
            OpenAiFlavor::OpenAi => ProviderKind::OpenAi,
            OpenAiFlavor::DeepSeek => ProviderKind::DeepSeek,
        }
    }

    /// The flavor for a provider kind, if that kind speaks this dialect.
    pub fn from_kind(kind: ProviderKind) -> Option<Self> {
        match kind {
            ProviderKind::OpenAi => Some(OpenAiFlavor::OpenAi),
            ProviderKind::DeepSeek => Some(OpenAiFlavor::DeepSeek),
            ProviderKind::Gemini => None,
        }
    }
}

/// Provider for OpenAI and OpenAI-compatible endpoints (DeepSeek, proxies).
pub struct OpenAiProvider {
    flavor: OpenAiFlavor,
    api_key: String,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("flavor", &self.flavor)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl OpenAiProvider {
    /// Build a provider for `flavor`.
    ///
    /// Resolution:
    /// * key: flavor variable (e.g. `DEEPSEEK_API_KEY`), then `OPENAI_API_KEY`
    /// * endpoint: `OPENAI_API_BASE`, then the flavor default
    /// * model: `OPENAI_DEFAULT_MODEL`, then the flavor default
    pub fn new(flavor: OpenAiFlavor, settings: &LlmSettings) -> Result<Self, ConfigError> {
        let defaults = flavor.defaults();
        let identity = flavor.kind().as_str();

        let mut tried = vec![defaults.credential_env];
        if defaults.credential_env != env::OPENAI_API_KEY {
            tried.push(env::OPENAI_API_KEY);
        }
        let (_, api_key) =
            settings
                .first_of(&tried)
                .ok_or_else(|| ConfigError::MissingCredential {
                    provider: identity.to_string(),
                    tried: tried.clone(),
                })?;

        let base_url = settings
            .get(env::OPENAI_API_BASE)
            .unwrap_or(defaults.base_url)
            .to_string();
        let model = settings
            .get(env::OPENAI_DEFAULT_MODEL)
            .unwrap_or(defaults.model)
            .to_string();

        let http = crate::llm::build_http_client(identity, settings)?;

        info!("Initialized {} provider with model: {}", identity, model);

        Ok(Self {
            flavor,
            api_key: api_key.to_string(),
            base_url,
            model,
            http,
        })
    }

    /// Build a provider whose flavor comes from `LLM_PROVIDER`.
    ///
    /// Unlike [`crate::llm::ProviderFactory::create`], an absent or
    /// unrecognised value (including `gemini`) silently selects the `openai`
    /// flavor.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, ConfigError> {
        let flavor = settings
            .get(env::LLM_PROVIDER)
            .and_then(|name| name.parse::<ProviderKind>().ok())
            .and_then(OpenAiFlavor::from_kind)
            .unwrap_or(OpenAiFlavor::OpenAi);
        Self::new(flavor, settings)
    }

    pub fn flavor(&self) -> OpenAiFlavor {
        self.flavor
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Assemble the JSON body for `request`, reading and encoding images.
    pub(crate) async fn build_body(
        &self,
        request: &CompletionRequest,
    ) -> Result<ChatRequest, BackendError> {
        let mut content = Vec::with_capacity(1 + request.image_paths.len());
        content.push(ContentPart::Text {
            text: request.user_message.clone(),
        });
        for path in &request.image_paths {
            let b64 = encode_image_as_base64(path).await?;
            content.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: data_uri(infer_mime_type(path), &b64),
                },
            });
        }

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.effective_system_prompt() {
            messages.push(ChatMessage::System {
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage::User { content });

        Ok(ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        })
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn identity(&self) -> &str {
        self.flavor.kind().as_str()
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        let identity = self.identity();
        let body = self.build_body(request).await?;
        debug!(
            "POST {} (model={}, images={})",
            self.endpoint(),
            self.model,
            request.image_paths.len()
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .header("X-Title", ATTRIBUTION_TITLE)
            .header("HTTP-Referer", ATTRIBUTION_REFERER)
            .json(&body)
            .send()
            .await
            .map_err(|source| BackendError::Transport {
                provider: identity.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            let err = crate::llm::status_error(identity, response).await;
            error!("API request failed: {}", err);
            return Err(err);
        }

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| BackendError::MalformedResponse {
                    provider: identity.to_string(),
                    detail: e.to_string(),
                })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| BackendError::MalformedResponse {
                provider: identity.to_string(),
                detail: "response has no choices[0].message.content".into(),
            })
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
enum ChatMessage {
    System { content: String },
    User { content: Vec<ContentPart> },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
