//! Provider identities.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed set of backends this crate can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    DeepSeek,
    Gemini,
}

impl ProviderKind {
    /// Every supported identity, in the order shown to users.
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::OpenAi,
        ProviderKind::DeepSeek,
        ProviderKind::Gemini,
    ];

    /// Identity used when nothing is configured.
    pub const DEFAULT: ProviderKind = ProviderKind::OpenAi;

    /// Canonical lowercase tag.
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::Gemini => "gemini",
        }
    }

    /// Comma-separated list of canonical tags, for error messages.
    pub fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let normalised = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == normalised)
            .ok_or_else(|| ConfigError::UnknownProvider {
                name: normalised,
                supported: Self::supported_list(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        for (raw, want) in [
            ("openai", ProviderKind::OpenAi),
            ("OpenAI", ProviderKind::OpenAi),
            ("DEEPSEEK", ProviderKind::DeepSeek),
            (" Gemini ", ProviderKind::Gemini),
        ] {
            assert_eq!(raw.parse::<ProviderKind>().unwrap(), want, "input {raw:?}");
        }
    }

    #[test]
    fn unknown_name_lists_supported() {
        let err = "Claude".parse::<ProviderKind>().unwrap_err();
        match err {
            ConfigError::UnknownProvider { name, supported } => {
                assert_eq!(name, "claude");
                assert_eq!(supported, "openai, deepseek, gemini");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!(ProviderKind::DeepSeek.to_string(), "deepseek");
    }
}
