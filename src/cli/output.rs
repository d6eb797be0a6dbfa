//! Output formatting for CLI commands.

use std::fmt::Write as _;

use serde::Serialize;

use crate::agent::{ChatResponse, StreamingChunk};
use crate::tools::{ToolName, ToolResult};

/// Output format selected with `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
    /// One compact JSON document per line.
    Ndjson,
}

impl OutputFormat {
    /// Parses a format name; unknown names fall back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "ndjson" | "jsonl" => Self::Ndjson,
            _ => Self::Text,
        }
    }

    /// Serializes `value` for this format.
    #[must_use]
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> String {
        let result = match self {
            Self::Ndjson => serde_json::to_string(value),
            Self::Text | Self::Json => serde_json::to_string_pretty(value),
        };
        result.unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {e}"}}"#))
    }
}

/// Renders a chat response as text: answer, sources, then a footer.
#[must_use]
pub fn format_chat_response(response: &ChatResponse) -> String {
    let mut out = response.message.trim_end().to_string();

    if !response.sources.is_empty() {
        out.push_str("\n\nSources:");
        for source in &response.sources {
            let _ = write!(
                out,
                "\n  - [{}] {} ({})",
                source.entity_type.singular(),
                source.title,
                source.id
            );
        }
    }

    let meta = &response.metadata;
    let tools = if meta.tools_used.is_empty() {
        "none".to_string()
    } else {
        meta.tools_used.join(", ")
    };
    let _ = write!(out, "\n\n---\nModel: {} | Tools: {tools}", meta.model);
    if let Some(intent) = meta.intent {
        let _ = write!(out, " | Intent: {intent}");
    }
    if meta.iterations > 0 {
        let _ = write!(out, " | Iterations: {}", meta.iterations);
    }
    let _ = write!(out, " | Time: {}ms", meta.processing_time_ms);
    if let Some(error) = &meta.error {
        let _ = write!(out, "\nWarning: {error}");
    }
    out.push('\n');
    out
}

/// Renders collected stream chunks as text.
///
/// Status lines are prefixed with `>`, content is concatenated, and the
/// terminal chunk becomes the footer.
#[must_use]
pub fn format_stream(chunks: &[StreamingChunk]) -> String {
    let mut out = String::new();
    let mut in_content = false;
    for chunk in chunks {
        match chunk {
            StreamingChunk::Status { content } => {
                let _ = writeln!(out, "> {content}");
            }
            StreamingChunk::Sources { sources } => {
                let _ = writeln!(out, "> {} source(s)", sources.len());
            }
            StreamingChunk::Content { content } => {
                if !in_content {
                    out.push('\n');
                    in_content = true;
                }
                out.push_str(content);
            }
            StreamingChunk::Done { metadata } => {
                let _ = write!(
                    out,
                    "\n\n---\nModel: {} | Time: {}ms",
                    metadata.model, metadata.processing_time_ms
                );
                if let Some(error) = &metadata.error {
                    let _ = write!(out, "\nWarning: {error}");
                }
                out.push('\n');
            }
            StreamingChunk::Error { content } => {
                let _ = writeln!(out, "\n\nError: {content}");
            }
        }
    }
    out
}

/// Renders one tool result as text.
#[must_use]
pub fn format_tool_result(tool: ToolName, result: &ToolResult) -> String {
    let mut out = format!("{tool}: {}\n", result.summary().unwrap_or("ok"));
    if let Some(data) = result.data() {
        for row in data.rows() {
            let _ = writeln!(out, "  {row}");
        }
    }
    out
}

/// Renders the tool catalog as text.
#[must_use]
pub fn format_tool_list() -> String {
    let width = ToolName::ALL
        .iter()
        .map(|t| t.as_str().len())
        .max()
        .unwrap_or_default();
    let mut out = String::new();
    for tool in ToolName::ALL {
        let _ = writeln!(out, "{:<width$}  {}", tool.as_str(), tool.description());
    }
    out
}
