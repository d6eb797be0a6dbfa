//! # insight-desk
//!
//! Natural-language questions over an events business: events, tasks,
//! contacts, partnerships and leads.
//!
//! A question is parsed into a structured query (by an LLM, or by a
//! keyword scan when none is available), mapped onto typed data tools,
//! and answered from the tool results. An agentic mode lets the model pick
//! tools itself for up to three rounds, and a streaming mode emits status,
//! sources and answer tokens as [`agent::StreamingChunk`]s.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use insight_desk::agent::{ChatConfig, Orchestrator};
//! use insight_desk::data::MemoryDataSource;
//! use insight_desk::tools::ToolRegistry;
//!
//! # async fn run() -> insight_desk::Result<()> {
//! let config = ChatConfig::from_env()?;
//! let source = MemoryDataSource::from_path("data.json".as_ref())?;
//! let registry = ToolRegistry::new(Arc::new(source), config.today());
//! let orchestrator = Orchestrator::from_config(registry, config)?;
//!
//! let response = orchestrator.chat("How many partnerships are pending?").await;
//! println!("{}", response.message);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod data;
pub mod error;
pub mod tools;

#[cfg(test)]
pub(crate) mod test_support;

pub use agent::{ChatConfig, ChatResponse, Orchestrator, StreamingChunk};
pub use data::{DataSource, MemoryDataSource, Snapshot};
pub use error::{Error, Result};
pub use tools::{ToolName, ToolRegistry, ToolResult};
