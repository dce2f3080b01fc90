//! Google Gemini `generateContent` provider.
//!
//! Images travel as raw bytes inside [`Part::InlineData`]; base64 is applied
//! only when the body is serialised. Parts are ordered images first, then
//! the user text. The system prompt is sent as `systemInstruction`.

use crate::config::{env, LlmSettings};
use crate::error::{BackendError, ConfigError};
use crate::llm::image::{infer_mime_type, read_image_bytes};
use crate::llm::provider::{CompletionRequest, Provider};
use crate::llm::ProviderKind;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use tracing::{debug, error, info};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const CREDENTIAL_VARS: [&str; 2] = [env::GEMINI_API_KEY, env::GOOGLE_API_KEY];

pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl GeminiProvider {
    /// Key from `GEMINI_API_KEY` or `GOOGLE_API_KEY`; model from
    /// `GEMINI_MODEL`, then `OPENAI_DEFAULT_MODEL`, then [`DEFAULT_MODEL`].
    pub fn new(settings: &LlmSettings) -> Result<Self, ConfigError> {
        let identity = ProviderKind::Gemini.as_str();
        let (_, api_key) =
            settings
                .first_of(&CREDENTIAL_VARS)
                .ok_or_else(|| ConfigError::MissingCredential {
                    provider: identity.to_string(),
                    tried: CREDENTIAL_VARS.to_vec(),
                })?;

        let model = settings
            .first_of(&[env::GEMINI_MODEL, env::OPENAI_DEFAULT_MODEL])
            .map(|(_, m)| m)
            .unwrap_or(DEFAULT_MODEL)
            .to_string();
        let base_url = settings
            .get(env::GEMINI_API_BASE)
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        let http = crate::llm::build_http_client(identity, settings)?;
        info!("Initialized gemini provider with model: {}", model);

        Ok(Self {
            api_key: api_key.to_string(),
            base_url,
            model,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    pub(crate) async fn build_body(
        &self,
        request: &CompletionRequest,
    ) -> Result<GenerateContentRequest, BackendError> {
        let mut parts = Vec::with_capacity(request.image_paths.len() + 1);
        for path in &request.image_paths {
            parts.push(Part::InlineData {
                inline_data: Blob {
                    mime_type: infer_mime_type(path).to_string(),
                    data: read_image_bytes(path).await?,
                },
            });
        }
        parts.push(Part::Text {
            text: request.user_message.clone(),
        });

        Ok(GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts,
            }],
            system_instruction: request.effective_system_prompt().map(|s| SystemInstruction {
                parts: vec![Part::Text {
                    text: s.to_string(),
                }],
            }),
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        })
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn identity(&self) -> &str {
        ProviderKind::Gemini.as_str()
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        let identity = self.identity();
        let body = self.build_body(request).await?;
        debug!(
            "POST {} (images={})",
            self.endpoint(),
            request.image_paths.len()
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
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

        let parsed: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|e| BackendError::MalformedResponse {
                    provider: identity.to_string(),
                    detail: e.to_string(),
                })?;

        parsed
            .first_text()
            .ok_or_else(|| BackendError::MalformedResponse {
                provider: identity.to_string(),
                detail: "response has no candidate text".into(),
            })
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: Blob },
}

#[derive(Debug, Serialize)]
struct Blob {
    mime_type: String,
    #[serde(serialize_with = "as_base64")]
    data: Vec<u8>,
}

fn as_base64<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(self) -> Option<String> {
        let parts = self.candidates.into_iter().next()?.content?.parts;
        let texts: Vec<String> = parts.into_iter().filter_map(|p| p.text).collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }
}
