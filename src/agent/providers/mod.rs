//! Concrete [`LlmProvider`](super::provider::LlmProvider) backends.

pub mod http;
pub mod openai;

pub use http::HttpProvider;
pub use openai::OpenAiProvider;
