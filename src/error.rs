//! Error types for insight-desk.
//!
//! Each layer owns an error enum: [`AgentError`] for LLM and orchestration
//! failures, [`DataError`] for the data-access boundary, [`ToolError`] for
//! a single tool run, and [`CommandError`] for the CLI. [`Error`] unifies
//! them for callers that only need to propagate.

use thiserror::Error;

/// Result alias using the crate-wide [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Agent / provider / orchestration failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Data-access failure.
    #[error(transparent)]
    Data(#[from] DataError),

    /// Tool invocation failure.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Errors raised while talking to an LLM provider or running the
/// orchestration stages.
///
/// None of these escape [`Orchestrator`](crate::agent::Orchestrator) public
/// calls: every stage has a fallback, so they surface only as log lines and
/// as `metadata.error` on the response.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The provider rejected or failed the request.
    #[error("API request failed{}: {message}", status.map_or_else(String::new, |s| format!(" (HTTP {s})")))]
    ApiRequest {
        /// Error description.
        message: String,
        /// HTTP status, when one was received.
        status: Option<u16>,
    },

    /// A streaming response broke mid-flight.
    #[error("stream error: {message}")]
    Stream {
        /// Error description.
        message: String,
    },

    /// A tool could not run or its arguments were invalid.
    #[error("tool '{name}' failed: {message}")]
    ToolExecution {
        /// Tool name as requested.
        name: String,
        /// Error description.
        message: String,
    },

    /// The configured provider name is not known.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Provider name from configuration.
        name: String,
    },

    /// The model output could not be parsed into the expected shape.
    #[error("failed to parse model response: {message}")]
    ResponseParse {
        /// Error description.
        message: String,
        /// Raw content that failed to parse.
        content: String,
    },

    /// Orchestration-level failure (task join, channel closed, ...).
    #[error("orchestration error: {message}")]
    Orchestration {
        /// Error description.
        message: String,
    },

    /// Configuration is inconsistent (e.g. `http` provider without base URL).
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error description.
        message: String,
    },
}

/// Errors raised by a [`DataSource`](crate::data::DataSource).
#[derive(Debug, Error)]
pub enum DataError {
    /// Underlying I/O failure (snapshot file, socket, ...).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be decoded.
    #[error("failed to decode data: {0}")]
    Parse(#[from] serde_json::Error),

    /// The backing store is not reachable.
    #[error("data source unavailable: {message}")]
    Unavailable {
        /// Error description.
        message: String,
    },
}

/// Errors raised inside a single tool invocation.
///
/// The registry turns these into failed
/// [`ToolResult`](crate::tools::ToolResult)s; they never cross it.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The data layer failed.
    #[error(transparent)]
    Data(#[from] DataError),

    /// Arguments did not match the tool's parameter schema.
    #[error("invalid parameters: {0}")]
    InvalidParams(#[from] serde_json::Error),

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Arguments decoded but are not usable for this tool.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The tool name is not in the registry.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The tool task panicked or was cancelled.
    #[error("tool task failed: {0}")]
    Join(String),
}

/// Errors raised by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Command failed during execution.
    #[error("command failed: {0}")]
    ExecutionFailed(String),

    /// Command received an invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Output could not be rendered.
    #[error("output formatting failed: {0}")]
    OutputFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_request_display_with_status() {
        let err = AgentError::ApiRequest {
            message: "rate limited".to_string(),
            status: Some(429),
        };
        assert_eq!(err.to_string(), "API request failed (HTTP 429): rate limited");
    }

    #[test]
    fn test_api_request_display_without_status() {
        let err = AgentError::ApiRequest {
            message: "connection refused".to_string(),
            status: None,
        };
        assert_eq!(err.to_string(), "API request failed: connection refused");
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = DataError::Unavailable {
            message: "offline".to_string(),
        }
        .into();
        assert!(matches!(err, Error::Data(_)));
        assert!(err.to_string().contains("offline"));
    }
}
