//! Streaming protocol chunks.
//!
//! A stream is: one or more `status`, exactly one `sources`, one or more
//! `content`, then exactly one terminal `done` or `error`.

use serde::{Deserialize, Serialize};

use super::response::{ResponseMetadata, Source};

/// One frame of a streamed answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamingChunk {
    /// Progress notice.
    Status {
        /// Human-readable stage description.
        content: String,
    },
    /// Citations, sent once the tools have run.
    Sources {
        /// The sources.
        #[serde(rename = "metadata")]
        sources: Vec<Source>,
    },
    /// A piece of the answer text.
    Content {
        /// Text delta.
        content: String,
    },
    /// Successful end of stream.
    Done {
        /// Processing details.
        metadata: ResponseMetadata,
    },
    /// Failed end of stream.
    Error {
        /// Error description.
        content: String,
    },
}

impl StreamingChunk {
    /// Status chunk.
    #[must_use]
    pub fn status(content: impl Into<String>) -> Self {
        Self::Status {
            content: content.into(),
        }
    }

    /// Content chunk.
    #[must_use]
    pub fn content(content: impl Into<String>) -> Self {
        Self::Content {
            content: content.into(),
        }
    }

    /// Whether this chunk ends the stream.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    /// Encodes the chunk as one SSE `data:` frame.
    #[must_use]
    pub fn to_sse(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","content":"encoding failed: {e}"}}"#)
        });
        format!("data: {json}\n\n")
    }
}
