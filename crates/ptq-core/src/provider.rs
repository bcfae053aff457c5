//! The provider abstraction - a text-in/text-out completion capability.
//!
//! Concrete transports (OpenAI, Anthropic) live outside the core and own
//! all HTTP, auth, retry and timeout concerns. The engine only ever sees
//! raw response text; a provider error is a hard failure of generation.

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors surfaced by a provider. The engine never retries; the message is
/// propagated verbatim to the caller.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("provider response error: {0}")]
    Response(String),
}

/// An LLM completion capability.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send a system prompt and user prompt, get raw response text back.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
    ) -> Result<String, ProviderError>;
}

/// The recognized provider backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    /// Default model when the host supplies none.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4o",
            ProviderKind::Anthropic => "claude-3-5-sonnet-20241022",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::OpenAi => f.write_str("openai"),
            ProviderKind::Anthropic => f.write_str("anthropic"),
        }
    }
}

/// Error for an unrecognized provider identifier.
#[derive(Debug, Error)]
#[error("unknown provider '{0}' (expected 'openai' or 'anthropic')")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_kind() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(
            "Anthropic".parse::<ProviderKind>().unwrap(),
            ProviderKind::Anthropic
        );
        assert!("gemini".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_default_models() {
        assert!(ProviderKind::OpenAi.default_model().starts_with("gpt"));
        assert!(ProviderKind::Anthropic.default_model().starts_with("claude"));
    }
}
