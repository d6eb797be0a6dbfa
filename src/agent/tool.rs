//! Function-calling types shared by providers and the agentic loop.
//!
//! These are provider-agnostic: each provider maps them onto its own wire
//! format. The tool catalogue itself lives in [`crate::tools`].

use serde::{Deserialize, Serialize};

/// A tool definition that can be sent to an LLM for function-calling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must match a [`ToolName`](crate::tools::ToolName)).
    pub name: String,
    /// What the tool does, written for the model.
    pub description: String,
    /// JSON Schema object describing the tool's parameters.
    pub parameters: serde_json::Value,
}

/// A tool call requested by the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call identifier assigned by the provider.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON-encoded arguments.
    pub arguments: String,
}

/// The outcome of one tool call, ready to be sent back as a tool message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// ID of the tool call this result answers.
    pub tool_call_id: String,
    /// Result content (JSON on success, error text on failure).
    pub content: String,
    /// Whether this result represents an error.
    pub is_error: bool,
}

/// How the model may use the offered tools.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ToolChoice {
    /// Model decides.
    #[default]
    Auto,
    /// Tools are offered but must not be called.
    None,
    /// The named function must be called.
    Function(String),
}
