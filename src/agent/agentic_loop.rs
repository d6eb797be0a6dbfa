//! Agentic tool-calling loop.
//!
//! Drives the LLM ↔ tool execution round-trip: sends a request to the model,
//! executes any tool calls in the response, appends results, and repeats
//! until the model produces a final text response. After the iteration cap
//! one last call is made without tools so the model has to answer.

use tracing::{debug, info};

use super::executor::{ExecutedCall, ToolExecutor};
use super::message::{ChatRequest, assistant_tool_calls_message, tool_message};
use super::provider::LlmProvider;
use super::tool::ToolChoice;
use crate::error::AgentError;

/// Hard cap on tool-calling round-trips.
pub const MAX_ITERATIONS: u32 = 3;

/// Result of a finished loop.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    /// Final answer text.
    pub content: String,
    /// Round-trips in which the model requested tools.
    pub iterations: u32,
    /// Every executed call, in execution order.
    pub calls: Vec<ExecutedCall>,
    /// Whether the cap was hit and the answer was forced.
    pub forced: bool,
}

/// Runs an agentic loop: model → tool calls → tool results → model → …
///
/// Tool calls run sequentially in model order; each result is appended to
/// the transcript before the next model call. Hitting `max_iterations` is
/// not an error: the tools are withdrawn and the model is asked once more.
///
/// # Arguments
///
/// * `provider` - LLM provider to call.
/// * `request` - Initial chat request (mutated in-place with tool messages).
/// * `executor` - Dispatches tool calls to the registry.
/// * `max_iterations` - Tool round-trips allowed before forced synthesis.
///
/// # Errors
///
/// Propagates provider errors.
pub async fn agentic_loop(
    provider: &dyn LlmProvider,
    request: &mut ChatRequest,
    executor: &ToolExecutor<'_>,
    max_iterations: u32,
) -> Result<LoopOutcome, AgentError> {
    let mut calls = Vec::new();

    for iteration in 0..max_iterations {
        let response = provider.chat(request).await?;

        // No tool calls: final answer
        if response.tool_calls.is_empty() {
            debug!(iteration, "agentic loop completed with final text response");
            return Ok(LoopOutcome {
                content: response.content,
                iterations: iteration,
                calls,
                forced: false,
            });
        }

        debug!(
            iteration,
            tool_count = response.tool_calls.len(),
            "executing tool calls"
        );

        request
            .messages
            .push(assistant_tool_calls_message(response.tool_calls.clone()));

        for call in &response.tool_calls {
            let executed = executor.execute(call).await;
            request.messages.push(tool_message(
                &executed.message.tool_call_id,
                &executed.message.content,
            ));
            calls.push(executed);
        }
    }

    info!(max_iterations, "iteration cap reached, forcing synthesis");
    request.tools.clear();
    request.tool_choice = ToolChoice::None;
    let response = provider.chat(request).await?;

    Ok(LoopOutcome {
        content: response.content,
        iterations: max_iterations,
        calls,
        forced: true,
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::agent::message::{Role, system_message, user_message};
    use crate::test_support::{MockProvider, Step, TODAY, fixture_source};
    use crate::tools::ToolRegistry;

    fn registry() -> ToolRegistry {
        ToolRegistry::new(Arc::new(fixture_source()), TODAY)
    }

    fn request(registry: &ToolRegistry) -> ChatRequest {
        ChatRequest::new(
            "test",
            vec![system_message("You are a test agent."), user_message("query")],
        )
        .tools(registry.definitions(), ToolChoice::Auto)
    }

    #[tokio::test]
    async fn test_single_tool_round() {
        let registry = registry();
        let provider = MockProvider::new(vec![
            Step::tool_calls(&[("get_count", json!({"entityType": "tasks"}))]),
            Step::text("There are 6 tasks."),
        ]);
        let mut request = request(&registry);

        let outcome = agentic_loop(&provider, &mut request, &ToolExecutor::new(&registry), 3)
            .await
            .unwrap_or_else(|e| panic!("agentic_loop failed: {e}"));

        assert_eq!(outcome.content, "There are 6 tasks.");
        assert_eq!(outcome.iterations, 1);
        assert!(!outcome.forced);
        // system + user + assistant(tool_calls) + tool(result)
        assert_eq!(request.messages.len(), 4);
        assert_eq!(request.messages[3].role, Role::Tool);
    }

    #[tokio::test]
    async fn test_calls_run_in_model_order() {
        let registry = registry();
        let provider = MockProvider::new(vec![
            Step::tool_calls(&[
                ("search_leads", json!({})),
                ("unknown_tool", json!({})),
                ("get_count", json!({"entityType": "leads"})),
            ]),
            Step::text("done"),
        ]);
        let mut request = request(&registry);

        let outcome = agentic_loop(&provider, &mut request, &ToolExecutor::new(&registry), 3)
            .await
            .unwrap_or_else(|e| panic!("agentic_loop failed: {e}"));

        let ids: Vec<&str> = request.messages[3..]
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        assert_eq!(ids, vec!["call_0", "call_1", "call_2"]);
        assert!(outcome.calls[1].message.is_error);
        assert!(outcome.calls[2].result.is_success());
    }

    #[tokio::test]
    async fn test_cap_forces_synthesis() {
        let registry = registry();
        let provider = MockProvider::new(vec![
            Step::tool_calls(&[("search_events", json!({}))]),
            Step::tool_calls(&[("search_events", json!({}))]),
            Step::tool_calls(&[("search_events", json!({}))]),
            Step::text("Forced answer."),
        ]);
        let requests = provider.requests();
        let mut request = request(&registry);

        let outcome = agentic_loop(&provider, &mut request, &ToolExecutor::new(&registry), 3)
            .await
            .unwrap_or_else(|e| panic!("agentic_loop failed: {e}"));

        assert_eq!(outcome.content, "Forced answer.");
        assert_eq!(outcome.iterations, 3);
        assert!(outcome.forced);
        assert_eq!(outcome.calls.len(), 3);

        let sent = requests.lock().unwrap_or_else(|e| panic!("poisoned: {e}"));
        assert_eq!(sent.len(), 4);
        assert!(!sent[2].tools.is_empty());
        assert!(sent[3].tools.is_empty());
    }

    #[tokio::test]
    async fn test_no_tools_needed() {
        let registry = registry();
        let provider = MockProvider::text("Hello.");
        let mut request = request(&registry);

        let outcome = agentic_loop(&provider, &mut request, &ToolExecutor::new(&registry), 3)
            .await
            .unwrap_or_else(|e| panic!("agentic_loop failed: {e}"));

        assert_eq!(outcome.iterations, 0);
        assert!(outcome.calls.is_empty());
        assert_eq!(request.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let registry = registry();
        let provider = MockProvider::failing();
        let mut request = request(&registry);
        let result = agentic_loop(&provider, &mut request, &ToolExecutor::new(&registry), 3).await;
        assert!(matches!(result, Err(AgentError::ApiRequest { .. })));
    }
}
