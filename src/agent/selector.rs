//! Pipeline tool selection: [`ParsedQuery`] → tool calls.

use serde_json::{Map, Value, json};

use super::schema::ParsedQuery;
use crate::core::{EntityType, Intent};
use crate::tools::ToolName;

const fn search_tool(entity_type: EntityType) -> ToolName {
    match entity_type {
        EntityType::Events => ToolName::SearchEvents,
        EntityType::Tasks => ToolName::SearchTasks,
        EntityType::Contacts => ToolName::SearchContacts,
        EntityType::Partnerships => ToolName::SearchPartnerships,
        EntityType::Leads => ToolName::SearchLeads,
        EntityType::ArchivedEvents => ToolName::SearchArchivedEvents,
    }
}

fn insert_list(args: &mut Map<String, Value>, key: &str, values: &[String]) {
    if !values.is_empty() {
        args.insert(key.to_string(), json!(values));
    }
}

fn insert_text(args: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
        args.insert(key.to_string(), json!(v));
    }
}

/// Projects the parsed query onto one search tool's parameters.
fn search_params(entity_type: EntityType, parsed: &ParsedQuery) -> Value {
    let tool = search_tool(entity_type);
    let mut args = Map::new();
    insert_text(&mut args, "query", Some(parsed.search_text.as_str()));
    args.insert("limit".to_string(), json!(parsed.limit));
    if let Some(sort) = &parsed.sort_by {
        args.insert("sortBy".to_string(), json!(sort));
    }

    let filters = parsed.filters.clone().unwrap_or_default();
    let takes_dates = !matches!(tool, ToolName::SearchContacts | ToolName::SearchLeads);
    if takes_dates && let Some(range) = parsed.date_range {
        let range = range.for_entity(entity_type);
        args.insert("dateRange".to_string(), json!(range));
    }
    if tool != ToolName::SearchContacts {
        insert_list(&mut args, "status", &filters.status);
    }
    if matches!(tool, ToolName::SearchTasks | ToolName::SearchLeads) {
        insert_list(&mut args, "priority", &filters.priority);
    }
    if tool == ToolName::SearchTasks {
        insert_text(&mut args, "department", filters.department.as_deref());
    }
    if matches!(
        tool,
        ToolName::SearchEvents | ToolName::SearchArchivedEvents | ToolName::SearchContacts
    ) {
        insert_text(&mut args, "category", filters.category.as_deref());
    }
    Value::Object(args)
}

fn count_params(entity_type: EntityType, parsed: &ParsedQuery) -> Value {
    let mut args = Map::new();
    args.insert("entityType".to_string(), json!(entity_type));
    if let Some(filters) = &parsed.filters {
        insert_list(&mut args, "status", &filters.status);
    }
    if let Some(range) = parsed.date_range {
        args.insert("dateRange".to_string(), json!(range.for_entity(entity_type)));
    }
    Value::Object(args)
}

fn push_unique(calls: &mut Vec<(ToolName, Value)>, tool: ToolName, args: Value) {
    if !calls.iter().any(|(t, a)| *t == tool && *a == args) {
        calls.push((tool, args));
    }
}

/// Maps a parsed query to the tools the pipeline runs.
///
/// One search per entity type; `count` adds a `get_count` per entity type;
/// `summarize` over the default scope adds the dashboard. The result is
/// deduplicated, in registry order, and never empty.
#[must_use]
pub fn select(parsed: &ParsedQuery) -> Vec<(ToolName, Value)> {
    let mut calls: Vec<(ToolName, Value)> = Vec::new();

    for &entity_type in &parsed.entity_types {
        push_unique(
            &mut calls,
            search_tool(entity_type),
            search_params(entity_type, parsed),
        );
    }
    if parsed.intent == Intent::Count {
        for &entity_type in &parsed.entity_types {
            push_unique(&mut calls, ToolName::GetCount, count_params(entity_type, parsed));
        }
    }
    if parsed.intent == Intent::Summarize && parsed.scope_defaulted {
        push_unique(&mut calls, ToolName::GetDashboardSummary, json!({}));
    }
    if calls.is_empty() {
        let fallback = ParsedQuery::new(parsed.search_text.clone(), Vec::new(), parsed.intent);
        for &entity_type in &fallback.entity_types {
            push_unique(
                &mut calls,
                search_tool(entity_type),
                search_params(entity_type, &fallback),
            );
        }
    }

    calls.sort_by_key(|(tool, _)| *tool);
    calls
}
