//! Question answering over the tool registry.
//!
//! Two modes share one [`Orchestrator`]:
//!
//! ```text
//! Pipeline:  question → QueryParser → select → ToolRegistry (fan-out)
//!                     → format_context → AnswerGenerator → ChatResponse
//!
//! Agentic:   question → model ⇄ ToolExecutor (≤ 3 rounds) → ChatResponse
//! ```
//!
//! Streaming runs the pipeline and emits [`StreamingChunk`]s. Every LLM
//! stage has a deterministic fallback, so the whole module works without
//! an API key.

pub mod agentic_loop;
pub mod answer;
pub mod client;
pub mod config;
pub mod dates;
pub mod executor;
pub mod format;
pub mod message;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod response;
pub mod schema;
pub mod selector;
pub mod sse;
pub mod stream;
pub mod tool;

pub use answer::{AnswerGenerator, fallback_answer};
pub use client::create_provider;
pub use config::{ChatConfig, ChatConfigBuilder};
pub use message::{ChatMessage, ChatRequest, ModelResponse, Role, TokenUsage};
pub use orchestrator::Orchestrator;
pub use parser::{QueryParser, fallback_parse};
pub use prompt::PromptSet;
pub use provider::{LlmProvider, TextStream};
pub use response::{ChatResponse, ResponseMetadata, Source};
pub use schema::{ParsedQuery, QueryFilters};
pub use selector::select;
pub use stream::StreamingChunk;
pub use tool::{ToolCall, ToolCallResult, ToolChoice, ToolDefinition};
