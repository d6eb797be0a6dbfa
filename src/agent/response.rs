//! Caller-facing answer types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{EntityType, Intent};

/// Maximum number of sources attached to one answer.
pub const MAX_SOURCES: usize = 10;

/// A record the answer draws on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// Record ID.
    pub id: String,
    /// Entity family.
    pub entity_type: EntityType,
    /// Display title.
    pub title: String,
    /// Rank-based relevance in `0.1..=1.0`.
    pub relevance_score: f64,
    /// Short description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Extra attributes (the tool that produced the record).
    #[serde(default)]
    pub metadata: Value,
}

/// How an answer was produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    /// Model that wrote the answer, or `"fallback"`.
    pub model: String,
    /// Wall-clock time for the whole request.
    pub processing_time_ms: u64,
    /// Interpreted intent (pipeline mode only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    /// Tool names that ran, in execution order.
    pub tools_used: Vec<String>,
    /// Model round-trips that requested tools (agentic mode).
    pub iterations: u32,
    /// Recovered failure, if a fallback path was taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A complete answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    /// Answer text.
    pub message: String,
    /// Records the answer is grounded on, at most [`MAX_SOURCES`].
    pub sources: Vec<Source>,
    /// Processing details.
    pub metadata: ResponseMetadata,
}
