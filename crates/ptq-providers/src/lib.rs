//! Concrete LLM provider transports.
//!
//! Each client owns its HTTP concerns (auth headers, timeouts) and satisfies
//! the core's [`Provider`] trait. Retry and backoff deliberately live here or
//! in the calling application, never in the engine.

mod anthropic;
mod openai;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;

use std::sync::Arc;

use ptq_core::{Provider, ProviderError, ProviderKind};

/// Build the provider transport for a recognized backend.
pub fn provider_for(
    kind: ProviderKind,
    api_key: &str,
) -> Result<Arc<dyn Provider>, ProviderError> {
    match kind {
        ProviderKind::OpenAi => Ok(Arc::new(OpenAiClient::new(api_key)?)),
        ProviderKind::Anthropic => Ok(Arc::new(AnthropicClient::new(api_key)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_builds_both_backends() {
        assert!(provider_for(ProviderKind::OpenAi, "sk-test").is_ok());
        assert!(provider_for(ProviderKind::Anthropic, "sk-ant-test").is_ok());
    }
}
