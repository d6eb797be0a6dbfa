//! CLI layer for insight-desk.
//!
//! Provides the command-line interface using clap: ask questions in
//! pipeline, agentic or streaming mode, inspect parsing, and run tools
//! directly against a JSON snapshot.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
