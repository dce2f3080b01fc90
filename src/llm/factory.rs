//! Identity → provider resolution.

use crate::config::{env, LlmSettings};
use crate::error::ConfigError;
use crate::llm::openai::{OpenAiFlavor, OpenAiProvider};
use crate::llm::provider::Provider;
use crate::llm::ProviderKind;
use std::sync::Arc;
use tracing::debug;

/// Builds providers from an identity string and a settings snapshot.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create the provider for `identity`, or for `LLM_PROVIDER` when
    /// `identity` is `None` (defaulting to `openai`).
    ///
    /// Unknown names fail before any HTTP client is constructed.
    pub fn create(
        settings: &LlmSettings,
        identity: Option<&str>,
    ) -> Result<Arc<dyn Provider>, ConfigError> {
        let requested = identity
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| settings.get(env::LLM_PROVIDER))
            .unwrap_or(ProviderKind::DEFAULT.as_str());
        let kind: ProviderKind = requested.parse()?;
        debug!("Creating provider '{}'", kind);
        Self::create_kind(settings, kind)
    }

    /// Create the provider for an already-parsed identity.
    pub fn create_kind(
        settings: &LlmSettings,
        kind: ProviderKind,
    ) -> Result<Arc<dyn Provider>, ConfigError> {
        if let Some(flavor) = OpenAiFlavor::from_kind(kind) {
            return Ok(Arc::new(OpenAiProvider::new(flavor, settings)?));
        }
        Self::create_gemini(settings)
    }

    #[cfg(feature = "gemini")]
    fn create_gemini(settings: &LlmSettings) -> Result<Arc<dyn Provider>, ConfigError> {
        Ok(Arc::new(crate::llm::gemini::GeminiProvider::new(settings)?))
    }

    #[cfg(not(feature = "gemini"))]
    fn create_gemini(_settings: &LlmSettings) -> Result<Arc<dyn Provider>, ConfigError> {
        Err(ConfigError::MissingDependency {
            provider: ProviderKind::Gemini.as_str().to_string(),
            feature: "gemini",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_keys() -> LlmSettings {
        LlmSettings::from_pairs([
            ("OPENAI_API_KEY", "oa"),
            ("DEEPSEEK_API_KEY", "ds"),
            ("GEMINI_API_KEY", "g"),
        ])
    }

    #[test]
    fn explicit_identity_is_honoured() {
        let settings = all_keys().with("LLM_PROVIDER", "openai");
        let p = ProviderFactory::create(&settings, Some("DeepSeek")).unwrap();
        assert_eq!(p.identity(), "deepseek");
        assert_eq!(p.model(), "deepseek-chat");
    }

    #[test]
    fn identity_from_settings() {
        let settings = all_keys().with("LLM_PROVIDER", " deepseek ");
        let p = ProviderFactory::create(&settings, None).unwrap();
        assert_eq!(p.identity(), "deepseek");
    }

    #[test]
    fn defaults_to_openai() {
        let p = ProviderFactory::create(&all_keys(), None).unwrap();
        assert_eq!(p.identity(), "openai");
        assert_eq!(p.model(), "gpt-4o");
    }

    #[test]
    fn unknown_identity_fails_hard() {
        let err = ProviderFactory::create(&all_keys(), Some("claude")).err().expect("expected error");
        assert!(matches!(err, ConfigError::UnknownProvider { ref name, .. } if name == "claude"));

        let settings = all_keys().with("LLM_PROVIDER", "mystery");
        assert!(matches!(
            ProviderFactory::create(&settings, None),
            Err(ConfigError::UnknownProvider { .. })
        ));
    }

    #[test]
    fn credential_errors_propagate() {
        let err = ProviderFactory::create(&LlmSettings::default(), Some("openai")).err().expect("expected error");
        assert!(matches!(err, ConfigError::MissingCredential { .. }));
    }

    #[cfg(feature = "gemini")]
    #[test]
    fn gemini_variant() {
        let p = ProviderFactory::create(&all_keys(), Some("GEMINI")).unwrap();
        assert_eq!(p.identity(), "gemini");
        assert_eq!(p.model(), "gemini-2.5-flash");
    }

    #[cfg(not(feature = "gemini"))]
    #[test]
    fn gemini_without_feature() {
        let err = ProviderFactory::create(&all_keys(), Some("gemini")).err().expect("expected error");
        assert!(matches!(err, ConfigError::MissingDependency { feature: "gemini", .. }));
    }
}
