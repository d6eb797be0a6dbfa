//! Answer generation over the formatted context.

use std::sync::Arc;

use tracing::{debug, warn};

use super::message::{ChatRequest, system_message, user_message};
use super::prompt::build_answer_prompt;
use super::provider::{LlmProvider, TextStream};
use super::schema::ParsedQuery;
use crate::error::AgentError;

/// Model name reported when the template answer was used.
pub const FALLBACK_MODEL: &str = "fallback";

const NO_DATA_ANSWER: &str = "I could not find any records matching your question.";

/// Deterministic answer built only from the context block.
#[must_use]
pub fn fallback_answer(context: &str) -> String {
    if context.trim().is_empty() {
        return NO_DATA_ANSWER.to_string();
    }
    format!("Here is what I found in the data:\n\n{context}")
}

/// Writes the final answer with the answer model.
#[derive(Clone)]
pub struct AnswerGenerator {
    provider: Option<Arc<dyn LlmProvider>>,
    model: String,
    system_prompt: String,
    temperature: f32,
    max_tokens: u32,
}

impl std::fmt::Debug for AnswerGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerGenerator")
            .field("provider", &self.provider.as_ref().map(|p| p.name()))
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl AnswerGenerator {
    /// Creates a generator. `system_prompt` is the filled answer template.
    #[must_use]
    pub fn new(
        provider: Option<Arc<dyn LlmProvider>>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            system_prompt: system_prompt.into(),
            temperature,
            max_tokens,
        }
    }

    fn request(&self, question: &str, parsed: &ParsedQuery, context: &str) -> ChatRequest {
        ChatRequest::new(
            self.model.clone(),
            vec![
                system_message(&self.system_prompt),
                user_message(&build_answer_prompt(question, parsed, context)),
            ],
        )
        .temperature(self.temperature)
        .max_tokens(self.max_tokens)
    }

    fn provider(&self) -> Result<&Arc<dyn LlmProvider>, AgentError> {
        self.provider.as_ref().ok_or_else(|| AgentError::InvalidConfig {
            message: "no LLM provider configured".to_string(),
        })
    }

    /// Generates with the model only.
    ///
    /// # Errors
    ///
    /// Returns the provider error, or [`AgentError::ResponseParse`] for an
    /// empty completion.
    pub async fn try_generate(
        &self,
        question: &str,
        parsed: &ParsedQuery,
        context: &str,
    ) -> Result<String, AgentError> {
        let response = self
            .provider()?
            .chat(&self.request(question, parsed, context))
            .await?;
        let content = response.content.trim();
        if content.is_empty() {
            return Err(AgentError::ResponseParse {
                message: "empty answer".to_string(),
                content: String::new(),
            });
        }
        debug!(tokens = response.usage.total_tokens, "answer generated");
        Ok(content.to_string())
    }

    /// Generates the answer; on any failure returns [`fallback_answer`]
    /// together with the reason.
    pub async fn generate(
        &self,
        question: &str,
        parsed: &ParsedQuery,
        context: &str,
    ) -> (String, Option<String>) {
        if self.provider.is_none() {
            return (fallback_answer(context), None);
        }
        match self.try_generate(question, parsed, context).await {
            Ok(answer) => (answer, None),
            Err(e) => {
                warn!(error = %e, "answer generation failed, using template");
                (fallback_answer(context), Some(e.to_string()))
            }
        }
    }

    /// Opens a token stream for the answer.
    ///
    /// # Errors
    ///
    /// Returns an error without a provider or when the stream cannot be
    /// opened.
    pub async fn stream(
        &self,
        question: &str,
        parsed: &ParsedQuery,
        context: &str,
    ) -> Result<TextStream, AgentError> {
        self.provider()?
            .chat_stream(&self.request(question, parsed, context))
            .await
    }

    /// Model name to report for an answer written by this generator.
    #[must_use]
    pub fn model_label(&self) -> &str {
        if self.provider.is_some() {
            &self.model
        } else {
            FALLBACK_MODEL
        }
    }

    /// Whether a provider is attached.
    #[must_use]
    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }
}
