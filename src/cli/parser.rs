//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// insight-desk: ask questions about events, tasks, contacts,
/// partnerships and leads.
///
/// Loads a JSON data snapshot and answers through the query pipeline or
/// the agentic loop. Without an API key every LLM stage takes its
/// deterministic fallback.
#[derive(Parser, Debug)]
#[command(name = "insight-desk")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the JSON data snapshot.
    #[arg(short, long, env = "INSIGHT_DATA", global = true)]
    pub data: Option<PathBuf>,

    /// Reference date (YYYY-MM-DD) for relative windows. Defaults to today.
    #[arg(long, env = "INSIGHT_TODAY", global = true)]
    pub today: Option<NaiveDate>,

    /// Directory containing prompt template files.
    #[arg(long, env = "INSIGHT_PROMPT_DIR", global = true)]
    pub prompt_dir: Option<PathBuf>,

    /// Ignore any configured provider and use the fallback paths only.
    #[arg(long, global = true)]
    pub offline: bool,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json, ndjson).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question with the single-pass pipeline.
    #[command(after_help = r#"Examples:
  insight-desk -d data.json chat "How many partnerships are pending?"
  insight-desk -d data.json --format json chat "Events next week" | jq '.sources'
"#)]
    Chat {
        /// The question.
        question: String,
    },

    /// Answer a question by letting the model call tools.
    ///
    /// Falls back to the pipeline without a provider.
    Agent {
        /// The question.
        question: String,
    },

    /// Stream the pipeline answer chunk by chunk.
    #[command(after_help = r#"Examples:
  insight-desk -d data.json stream "Which tasks are overdue?"
  insight-desk -d data.json stream --sse "Upcoming deadlines"
"#)]
    Stream {
        /// The question.
        question: String,

        /// Print raw server-sent-event frames.
        #[arg(long)]
        sse: bool,
    },

    /// Show how a question is parsed (no tools run).
    Parse {
        /// The question.
        question: String,
    },

    /// Run one tool directly.
    #[command(after_help = r#"Examples:
  insight-desk -d data.json tool get_count '{"entityType":"leads"}'
  insight-desk -d data.json tool get_dashboard_summary
"#)]
    Tool {
        /// Tool name (see `tools`).
        name: String,

        /// Arguments as a JSON object.
        #[arg(default_value = "{}")]
        args: String,
    },

    /// List the available tools.
    Tools,

    /// Write the default prompt templates for editing.
    InitPrompts {
        /// Target directory (defaults to ~/.config/insight-desk/prompts).
        dir: Option<PathBuf>,
    },
}
