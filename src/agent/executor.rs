//! Tool executor for model-requested calls.
//!
//! Bridges provider [`ToolCall`]s onto the [`ToolRegistry`]: decodes the
//! JSON argument string, runs the tool, and renders the result envelope
//! back into a tool message. Failures never escape; they become error
//! results the model can read.

use serde_json::Value;
use tracing::debug;

use super::tool::{ToolCall, ToolCallResult};
use crate::tools::{ToolName, ToolRegistry, ToolResult};

/// Maximum raw byte length of tool argument JSON from the LLM.
const MAX_TOOL_ARGS_LEN: usize = 100_000;
/// Maximum characters of one tool result sent back to the model.
const MAX_TOOL_RESULT_CHARS: usize = 12_000;

/// One executed call: what goes back to the model, and the typed result.
#[derive(Debug, Clone)]
pub struct ExecutedCall {
    /// Parsed tool name; `None` for names outside the registry.
    pub tool: Option<ToolName>,
    /// Result envelope.
    pub result: ToolResult,
    /// Message content for the transcript.
    pub message: ToolCallResult,
}

/// Executes tool calls against a registry.
#[derive(Debug, Clone, Copy)]
pub struct ToolExecutor<'a> {
    registry: &'a ToolRegistry,
}

fn decode_arguments(raw: &str) -> Result<Value, String> {
    if raw.len() > MAX_TOOL_ARGS_LEN {
        return Err(format!(
            "tool arguments too large ({} bytes, max {MAX_TOOL_ARGS_LEN})",
            raw.len()
        ));
    }
    if raw.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(raw).map_err(|e| format!("invalid arguments: {e}"))
}

fn render(result: &ToolResult) -> String {
    let json = serde_json::to_string(result)
        .unwrap_or_else(|e| format!(r#"{{"success":false,"error":"encoding failed: {e}"}}"#));
    if json.chars().count() <= MAX_TOOL_RESULT_CHARS {
        json
    } else {
        let cut: String = json.chars().take(MAX_TOOL_RESULT_CHARS).collect();
        format!("{cut}... [truncated]")
    }
}

impl<'a> ToolExecutor<'a> {
    /// Creates an executor over `registry`.
    #[must_use]
    pub const fn new(registry: &'a ToolRegistry) -> Self {
        Self { registry }
    }

    /// Runs one call. Unknown names and bad arguments yield error results.
    pub async fn execute(&self, call: &ToolCall) -> ExecutedCall {
        let tool = call.name.parse::<ToolName>().ok();
        let result = match decode_arguments(&call.arguments) {
            Ok(args) => self.registry.execute(&call.name, args).await,
            Err(message) => ToolResult::failure(message),
        };
        debug!(
            tool = %call.name,
            call_id = %call.id,
            success = result.is_success(),
            "tool call executed"
        );

        ExecutedCall {
            tool,
            message: ToolCallResult {
                tool_call_id: call.id.clone(),
                content: render(&result),
                is_error: !result.is_success(),
            },
            result,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test_support::{TODAY, fixture_source};

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new(Arc::new(fixture_source()), TODAY)
    }

    #[tokio::test]
    async fn test_execute_success() {
        let registry = registry();
        let executed = ToolExecutor::new(&registry)
            .execute(&call("get_count", r#"{"entityType":"leads"}"#))
            .await;
        assert_eq!(executed.tool, Some(ToolName::GetCount));
        assert!(!executed.message.is_error);
        assert_eq!(executed.message.tool_call_id, "call_1");
        let body: Value = serde_json::from_str(&executed.message.content).unwrap_or_default();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["items"]["count"], 4);
    }

    #[tokio::test]
    async fn test_empty_arguments_are_an_empty_object() {
        let registry = registry();
        let executed = ToolExecutor::new(&registry)
            .execute(&call("get_dashboard_summary", ""))
            .await;
        assert!(executed.result.is_success());
    }

    #[tokio::test]
    async fn test_invalid_json_is_error_result() {
        let registry = registry();
        let executed = ToolExecutor::new(&registry)
            .execute(&call("search_events", "{not json"))
            .await;
        assert!(executed.message.is_error);
        assert!(executed.message.content.contains("invalid arguments"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_result() {
        let registry = registry();
        let executed = ToolExecutor::new(&registry)
            .execute(&call("delete_everything", "{}"))
            .await;
        assert!(executed.tool.is_none());
        assert!(executed.message.is_error);
    }

    #[test]
    fn test_oversized_arguments_rejected() {
        let raw = format!("\"{}\"", "a".repeat(MAX_TOOL_ARGS_LEN));
        let err = decode_arguments(&raw).err().unwrap_or_default();
        assert!(err.contains("too large"));
    }
}
