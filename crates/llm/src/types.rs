//! Provider selection types.

use serde::{Deserialize, Serialize};

/// Environment variable holding the Gemini key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable holding the OpenAI key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Supported generation providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    OpenAI,
    Gemini,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Some(Self::OpenAI),
            "gemini" | "google" => Some(Self::Gemini),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Gemini => "gemini",
        }
    }

    /// Model used when nothing else is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAI => "gpt-4.1-mini",
            Self::Gemini => "gemini-2.0-flash",
        }
    }

    /// Sampling temperature applied to every request, if any.
    pub fn default_temperature(&self) -> Option<f32> {
        match self {
            Self::OpenAI => Some(0.0),
            Self::Gemini => None,
        }
    }
}

/// A resolved provider choice with its credential.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSelection {
    pub provider: ProviderType,
    pub model: String,
    pub api_key: String,
    pub temperature: Option<f32>,
}

impl LlmSelection {
    pub fn new(provider: ProviderType, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            model: provider.default_model().to_string(),
            api_key: api_key.into(),
            temperature: provider.default_temperature(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_parsing() {
        assert_eq!(ProviderType::parse("openai"), Some(ProviderType::OpenAI));
        assert_eq!(ProviderType::parse("Gemini"), Some(ProviderType::Gemini));
        assert_eq!(ProviderType::parse("google"), Some(ProviderType::Gemini));
        assert_eq!(ProviderType::parse("ollama"), None);
    }

    #[test]
    fn test_selection_defaults() {
        let openai = LlmSelection::new(ProviderType::OpenAI, "k");
        assert_eq!(openai.model, "gpt-4.1-mini");
        assert_eq!(openai.temperature, Some(0.0));

        let gemini = LlmSelection::new(ProviderType::Gemini, "k");
        assert_eq!(gemini.model, "gemini-2.0-flash");
        assert_eq!(gemini.temperature, None);
    }
}
