//! Provider registry and factory.
//!
//! Maps provider names to concrete [`LlmProvider`] implementations.

use std::sync::Arc;

use tracing::debug;

use crate::agent::config::ChatConfig;
use crate::agent::provider::LlmProvider;
use crate::agent::providers::{HttpProvider, OpenAiProvider};
use crate::error::AgentError;

/// Creates an [`LlmProvider`] based on the configured provider name.
///
/// Returns `Ok(None)` when no provider or API key is configured; callers
/// then run every LLM stage in fallback mode.
///
/// # Supported Providers
///
/// - `"openai"`: OpenAI-compatible APIs via `async-openai`
/// - `"http"`: raw OpenAI-compatible wire protocol (needs a base URL)
///
/// # Errors
///
/// Returns [`AgentError::UnsupportedProvider`] for unknown provider names
/// and [`AgentError::InvalidConfig`] when a provider cannot be built.
pub fn create_provider(config: &ChatConfig) -> Result<Option<Arc<dyn LlmProvider>>, AgentError> {
    if !config.has_provider() {
        debug!("no provider configured, using fallback mode");
        return Ok(None);
    }
    let name = config.provider.as_deref().unwrap_or_default();
    let provider: Arc<dyn LlmProvider> = match name.trim().to_ascii_lowercase().as_str() {
        "openai" => Arc::new(OpenAiProvider::new(config)?),
        "http" => Arc::new(HttpProvider::new(config)?),
        other => {
            return Err(AgentError::UnsupportedProvider {
                name: other.to_string(),
            });
        }
    };
    debug!(provider = provider.name(), model = %config.model, "provider created");
    Ok(Some(provider))
}
