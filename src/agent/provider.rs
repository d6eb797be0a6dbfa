//! Pluggable LLM provider trait.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt, stream};

use super::message::{ChatRequest, ModelResponse};
use crate::error::AgentError;

/// Boxed stream of content deltas.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, AgentError>> + Send>>;

/// Ends `inner` with an [`AgentError::Stream`] once no item arrives for
/// `idle`.
#[must_use]
pub fn with_idle_timeout(inner: TextStream, idle: Duration) -> TextStream {
    Box::pin(stream::unfold(Some(inner), move |state| async move {
        let mut inner = state?;
        match tokio::time::timeout(idle, inner.next()).await {
            Ok(Some(item)) => Some((item, Some(inner))),
            Ok(None) => None,
            Err(_) => Some((
                Err(AgentError::Stream {
                    message: format!("no data received for {}s", idle.as_secs_f32()),
                }),
                None,
            )),
        }
    }))
}

/// Trait for LLM provider backends.
///
/// Implementations own the transport (SDK client or raw HTTP, retries)
/// and present a uniform interface to the parser, the answer generator
/// and the agentic loop.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (`"openai"`, `"http"`).
    fn name(&self) -> &'static str;

    /// Executes a chat completion request.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures, timeouts, or parse errors.
    async fn chat(&self, request: &ChatRequest) -> Result<ModelResponse, AgentError>;

    /// Executes a streaming chat completion request, yielding content
    /// deltas as they arrive.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the stream cannot be opened; errors after
    /// that arrive as stream items.
    async fn chat_stream(&self, request: &ChatRequest) -> Result<TextStream, AgentError>;
}
