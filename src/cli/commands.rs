//! CLI command implementations.
//!
//! Each command builds what it needs (config, snapshot, orchestrator),
//! bridges into async with a Tokio runtime, and renders its output as a
//! string for `main` to print.

#![allow(clippy::format_push_string)]

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::{Value, json};
use tracing::debug;

use crate::agent::client::create_provider;
use crate::agent::{
    ChatConfig, Orchestrator, PromptSet, QueryParser, StreamingChunk, select,
};
use crate::cli::output::{
    OutputFormat, format_chat_response, format_stream, format_tool_list, format_tool_result,
};
use crate::cli::parser::{Cli, Commands};
use crate::data::MemoryDataSource;
use crate::error::{CommandError, Result};
use crate::tools::{ToolName, ToolRegistry};

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Chat { question } => cmd_chat(cli, question, false, format),
        Commands::Agent { question } => cmd_chat(cli, question, true, format),
        Commands::Stream { question, sse } => cmd_stream(cli, question, *sse, format),
        Commands::Parse { question } => cmd_parse(cli, question, format),
        Commands::Tool { name, args } => cmd_tool(cli, name, args, format),
        Commands::Tools => Ok(cmd_tools(format)),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

/// Resolves configuration: CLI flags, then environment, then defaults.
fn build_config(cli: &Cli) -> Result<ChatConfig> {
    let mut builder = ChatConfig::builder();
    if let Some(today) = cli.today {
        builder = builder.reference_date(today);
    }
    if let Some(dir) = &cli.prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    let mut config = builder.from_env().build().map_err(|e| {
        CommandError::InvalidArgument(format!("configuration error: {e}"))
    })?;
    if cli.offline {
        config.provider = None;
        config.api_key = None;
    }
    debug!(
        provider = config.provider.as_deref().unwrap_or("none"),
        model = %config.model,
        today = %config.today(),
        "configuration resolved"
    );
    Ok(config)
}

fn open_registry(cli: &Cli, config: &ChatConfig) -> Result<ToolRegistry> {
    let path = cli.data.as_deref().ok_or_else(|| {
        CommandError::InvalidArgument(
            "no data snapshot: pass --data <file> or set INSIGHT_DATA".to_string(),
        )
    })?;
    let source = MemoryDataSource::from_path(path)?;
    Ok(ToolRegistry::new(Arc::new(source), config.today()))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

fn open_orchestrator(cli: &Cli) -> Result<Orchestrator> {
    let config = build_config(cli)?;
    let registry = open_registry(cli, &config)?;
    Ok(Orchestrator::from_config(registry, config)?)
}

fn cmd_chat(cli: &Cli, question: &str, agentic: bool, format: OutputFormat) -> Result<String> {
    let orchestrator = open_orchestrator(cli)?;
    let rt = runtime()?;
    let response = rt.block_on(async {
        if agentic {
            orchestrator.agentic_chat(question).await
        } else {
            orchestrator.chat(question).await
        }
    });

    match format {
        OutputFormat::Text => Ok(format_chat_response(&response)),
        OutputFormat::Json | OutputFormat::Ndjson => Ok(format.to_json(&response)),
    }
}

fn cmd_stream(cli: &Cli, question: &str, sse: bool, format: OutputFormat) -> Result<String> {
    let orchestrator = open_orchestrator(cli)?;
    let rt = runtime()?;
    let chunks: Vec<StreamingChunk> =
        rt.block_on(async { orchestrator.stream_chat_response(question).collect().await });

    if sse {
        return Ok(chunks.iter().map(StreamingChunk::to_sse).collect());
    }
    match format {
        OutputFormat::Text => Ok(format_stream(&chunks)),
        OutputFormat::Json => Ok(format.to_json(&chunks)),
        OutputFormat::Ndjson => {
            let mut out = String::new();
            for chunk in &chunks {
                out.push_str(&format.to_json(chunk));
                out.push('\n');
            }
            Ok(out)
        }
    }
}

fn cmd_parse(cli: &Cli, question: &str, format: OutputFormat) -> Result<String> {
    let config = build_config(cli)?;
    let provider = create_provider(&config)?;
    let prompts = PromptSet::load(config.prompt_dir.as_deref());
    let parser = QueryParser::new(provider, config.query_parsing_model.clone(), prompts.parser);

    let rt = runtime()?;
    let (parsed, fallback) = rt.block_on(parser.parse_with_reason(question, config.today()));
    let tools: Vec<Value> = select(&parsed)
        .into_iter()
        .map(|(tool, args)| json!({"tool": tool.as_str(), "arguments": args}))
        .collect();

    match format {
        OutputFormat::Text => {
            let mut output = format!("{}\n", OutputFormat::Json.to_json(&parsed));
            output.push_str("\nTools:\n");
            for call in &tools {
                let name = call["tool"].as_str().unwrap_or_default();
                output.push_str(&format!("  {name} {}\n", call["arguments"]));
            }
            if let Some(reason) = fallback {
                let _ = write!(output, "\nKeyword fallback used: {reason}\n");
            }
            Ok(output)
        }
        OutputFormat::Json | OutputFormat::Ndjson => Ok(format.to_json(&json!({
            "parsed": parsed,
            "tools": tools,
            "fallbackReason": fallback,
        }))),
    }
}

fn cmd_tool(cli: &Cli, name: &str, args: &str, format: OutputFormat) -> Result<String> {
    let tool: ToolName = name.parse()?;
    let args: Value = serde_json::from_str(args)
        .map_err(|e| CommandError::InvalidArgument(format!("arguments are not valid JSON: {e}")))?;
    let config = build_config(cli)?;
    let registry = open_registry(cli, &config)?;

    let rt = runtime()?;
    let result = rt.block_on(registry.invoke(tool, args));
    if let Some(error) = result.error() {
        return Err(CommandError::ExecutionFailed(format!("{tool} failed: {error}")).into());
    }

    match format {
        OutputFormat::Text => Ok(format_tool_result(tool, &result)),
        OutputFormat::Json | OutputFormat::Ndjson => Ok(format.to_json(&result)),
    }
}

fn cmd_tools(format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_tool_list(),
        OutputFormat::Json | OutputFormat::Ndjson => {
            let definitions: Vec<_> = ToolName::ALL.iter().map(|t| t.definition()).collect();
            format.to_json(&definitions)
        }
    }
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(Path::to_path_buf)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                output.push_str(&format!(
                    "  {}\n",
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown")
                ));
            }
            output.push_str("\nEdit these files to customize the parser, answer and agent prompts.\n");
            Ok(output)
        }
        OutputFormat::Json | OutputFormat::Ndjson => Ok(format.to_json(&json!({
            "directory": target_dir.to_string_lossy(),
            "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
            "count": written.len()
        }))),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use tempfile::TempDir;

    use super::*;
    use crate::error::Error;

    const DATASET: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/dataset.json");

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["insight-desk", "--offline", "--today", "2025-01-01"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap_or_else(|e| unreachable!("{e}"))
    }

    #[test]
    fn test_chat_requires_data() {
        let result = execute(&cli(&["chat", "anything"]));
        assert!(matches!(
            result,
            Err(Error::Command(CommandError::InvalidArgument(_)))
        ));
    }

    #[test]
    fn test_chat_offline() {
        let out = execute(&cli(&["--data", DATASET, "chat", "How many leads are there?"]))
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert!(out.contains("## get_count"));
        assert!(out.contains("Model: fallback"));
    }

    #[test]
    fn test_chat_json() {
        let out = execute(&cli(&[
            "--data", DATASET, "--format", "json", "chat", "list all leads",
        ]))
        .unwrap_or_else(|e| unreachable!("{e}"));
        let body: Value = serde_json::from_str(&out).unwrap_or_default();
        assert_eq!(body["metadata"]["intent"], "list");
        assert_eq!(body["metadata"]["toolsUsed"][0], "search_leads");
        assert!(body["sources"].is_array());
    }

    #[test]
    fn test_stream_sse_frames() {
        let out = execute(&cli(&["--data", DATASET, "stream", "--sse", "show tasks"]))
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert!(out.starts_with("data: {\"type\":\"status\""));
        assert!(out.trim_end().ends_with('}'));
        assert!(out.contains("\"type\":\"done\""));
    }

    #[test]
    fn test_parse_shows_fallback_tools() {
        let out = execute(&cli(&["--format", "json", "parse", "how many tasks"]))
            .unwrap_or_else(|e| unreachable!("{e}"));
        let body: Value = serde_json::from_str(&out).unwrap_or_default();
        assert_eq!(body["parsed"]["intent"], "count");
        assert_eq!(body["tools"][1]["tool"], "get_count");
        assert!(body["fallbackReason"].is_null());
    }

    #[test]
    fn test_tool_command() {
        let out = execute(&cli(&[
            "--data",
            DATASET,
            "tool",
            "get_count",
            r#"{"entityType":"partnerships","status":["pending"]}"#,
        ]))
        .unwrap_or_else(|e| unreachable!("{e}"));
        assert!(out.starts_with("get_count:"));
    }

    #[test]
    fn test_unknown_tool_rejected() {
        let result = execute(&cli(&["--data", DATASET, "tool", "drop_tables"]));
        assert!(matches!(result, Err(Error::Tool(_))));
    }

    #[test]
    fn test_bad_tool_arguments() {
        let result = execute(&cli(&["--data", DATASET, "tool", "get_count", "{oops"]));
        assert!(matches!(
            result,
            Err(Error::Command(CommandError::InvalidArgument(_)))
        ));
    }

    #[test]
    fn test_tools_json_lists_definitions() {
        let out = cmd_tools(OutputFormat::Json);
        let body: Value = serde_json::from_str(&out).unwrap_or_default();
        assert_eq!(body.as_array().map(Vec::len), Some(ToolName::ALL.len()));
        assert_eq!(body[0]["name"], "search_events");
    }

    #[test]
    fn test_init_prompts_writes_once() {
        let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
        let first = cmd_init_prompts(Some(dir.path()), OutputFormat::Text)
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert!(first.contains("Wrote 3 prompt template(s)"));
        let second = cmd_init_prompts(Some(dir.path()), OutputFormat::Text)
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert!(second.contains("already exist"));
    }
}
