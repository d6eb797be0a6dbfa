//! Context formatting and source extraction.
//!
//! Turns tool results into the bounded, human-readable block the answer
//! model reads, and into the [`Source`] citations returned to the caller.

use std::collections::HashSet;
use std::fmt::Write;

use serde_json::{Map, Value, json};

use super::response::{MAX_SOURCES, Source};
use crate::tools::{ToolName, ToolResult};

/// Rows rendered per tool section.
pub const MAX_ROWS_PER_SECTION: usize = 10;

/// Upper bound on the whole context block, in characters.
pub const MAX_CONTEXT_CHARS: usize = 12_000;

/// Separator between tool sections.
pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

const TRUNCATION_MARKER: &str = "\n[context truncated]";

/// Fields rendered first, in this order; the rest follow alphabetically.
const PRIORITY_FIELDS: [&str; 11] = [
    "title",
    "name",
    "id",
    "status",
    "startDate",
    "endDate",
    "dueDate",
    "lastContacted",
    "lastActivity",
    "lastContact",
    "priority",
];

const MAX_VALUE_CHARS: usize = 200;

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    }
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(truncate_chars(s, MAX_VALUE_CHARS)),
        Value::Array(a) if a.is_empty() => None,
        Value::Object(o) if o.is_empty() => None,
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Array(_) | Value::Object(_) => Some(truncate_chars(&value.to_string(), MAX_VALUE_CHARS)),
    }
}

/// Renders one object as `key: value` pairs, priority fields first.
fn render_row(row: &Map<String, Value>) -> String {
    let mut keys: Vec<&str> = PRIORITY_FIELDS
        .iter()
        .copied()
        .filter(|k| row.contains_key(*k))
        .collect();
    let mut rest: Vec<&str> = row
        .keys()
        .map(String::as_str)
        .filter(|k| !PRIORITY_FIELDS.contains(k))
        .collect();
    rest.sort_unstable();
    keys.extend(rest);

    keys.iter()
        .filter_map(|k| row.get(*k).and_then(render_value).map(|v| format!("{k}: {v}")))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn render_section(tool: ToolName, result: &ToolResult) -> String {
    let mut out = String::new();
    if !result.is_success() {
        let _ = writeln!(out, "## {tool} (Error)");
        out.push_str(result.error().unwrap_or("unknown error"));
        return out;
    }

    let rows = result.data().map(|d| d.rows()).unwrap_or_default();
    let _ = writeln!(out, "## {tool} ({} results)", result.len());
    if let Some(summary) = result.summary() {
        let _ = writeln!(out, "{summary}");
    }
    for row in rows.iter().take(MAX_ROWS_PER_SECTION) {
        match row {
            Value::Object(map) => {
                let _ = writeln!(out, "- {}", render_row(map));
            }
            other => {
                if let Some(v) = render_value(other) {
                    let _ = writeln!(out, "- {v}");
                }
            }
        }
    }
    if rows.len() > MAX_ROWS_PER_SECTION {
        let _ = writeln!(out, "... and {} more", rows.len() - MAX_ROWS_PER_SECTION);
    }
    out.trim_end().to_string()
}

/// Formats tool results into the answer context.
///
/// Sections keep the order of `results`; the block is cut at
/// [`MAX_CONTEXT_CHARS`] with a visible marker.
#[must_use]
pub fn format_context(results: &[(ToolName, ToolResult)]) -> String {
    let context = results
        .iter()
        .map(|(tool, result)| render_section(*tool, result))
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR);

    if context.chars().count() <= MAX_CONTEXT_CHARS {
        return context;
    }
    let budget = MAX_CONTEXT_CHARS - TRUNCATION_MARKER.len();
    let mut cut: String = context.chars().take(budget).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}

fn relevance(rank: usize) -> f64 {
    let rank = u32::try_from(rank).unwrap_or(u32::MAX);
    0.05f64.mul_add(-f64::from(rank), 1.0).max(0.1)
}

/// Extracts citations from successful results.
///
/// Records are taken in result order, deduplicated by entity type and ID,
/// scored by rank, and capped at [`MAX_SOURCES`].
#[must_use]
pub fn collect_sources(results: &[(ToolName, ToolResult)]) -> Vec<Source> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    let citations = results
        .iter()
        .filter_map(|(tool, result)| result.data().map(|d| (*tool, d.citations())))
        .flat_map(|(tool, cites)| cites.into_iter().map(move |c| (tool, c)));

    for (tool, citation) in citations {
        if !seen.insert((citation.entity_type, citation.id.clone())) {
            continue;
        }
        sources.push(Source {
            id: citation.id,
            entity_type: citation.entity_type,
            title: citation.title,
            relevance_score: relevance(sources.len()),
            snippet: citation.snippet,
            metadata: json!({ "tool": tool.as_str() }),
        });
        if sources.len() == MAX_SOURCES {
            break;
        }
    }
    sources
}
