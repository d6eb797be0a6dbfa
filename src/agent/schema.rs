//! Structured query contract.
//!
//! [`QueryArguments`] is the lenient shape the model fills in through the
//! `parse_query` function; [`ParsedQuery`] is the validated, normalized
//! result every later stage consumes.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::dates::parse_bound;
use super::tool::ToolDefinition;
use crate::core::{DateField, DateRange, EntityType, Intent, SortBy};
use crate::tools::params::{DEFAULT_LIMIT, MAX_LIMIT, schema_for};

/// Name of the forced parsing function.
pub const PARSE_FUNCTION: &str = "parse_query";

/// Entity types used when the question names none.
pub const DEFAULT_ENTITY_TYPES: [EntityType; 2] = [EntityType::Events, EntityType::Tasks];

/// Attribute filters extracted from the question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilters {
    /// Allowed statuses.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<String>,
    /// Allowed priorities.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub priority: Vec<String>,
    /// Department name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    /// Category name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl QueryFilters {
    fn cleaned(self) -> Option<Self> {
        let list = |v: Vec<String>| -> Vec<String> {
            v.into_iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        };
        let text = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let out = Self {
            status: list(self.status),
            priority: list(self.priority),
            department: text(self.department),
            category: text(self.category),
        };
        (out != Self::default()).then_some(out)
    }
}

/// Date range as the model writes it: ISO dates or relative phrases.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawDateRange {
    /// Start date, `YYYY-MM-DD`.
    pub start: String,
    /// End date, `YYYY-MM-DD` (inclusive).
    #[serde(default)]
    pub end: Option<String>,
    /// Which date attribute the range applies to.
    #[serde(default)]
    pub field: Option<DateField>,
}

/// Arguments of the `parse_query` function.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryArguments {
    /// Keywords to match against names, titles and descriptions. Omit
    /// words that only express dates, intent or entity type.
    #[serde(default)]
    pub search_text: Option<String>,
    /// Entity types the question is about.
    #[serde(default)]
    #[schemars(with = "Vec<EntityType>")]
    pub entity_types: Vec<String>,
    /// Absolute date range, when the question mentions dates.
    #[serde(default)]
    pub date_range: Option<RawDateRange>,
    /// Attribute filters.
    #[serde(default)]
    pub filters: Option<QueryFilters>,
    /// What the user wants done.
    #[serde(default)]
    #[schemars(with = "Option<Intent>")]
    pub intent: Option<String>,
    /// Requested ordering.
    #[serde(default)]
    pub sort_by: Option<SortBy>,
    /// Maximum results (1-50).
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Definition of the forced `parse_query` function.
#[must_use]
pub fn parse_function() -> ToolDefinition {
    ToolDefinition {
        name: PARSE_FUNCTION.to_string(),
        description: "Extract the structured search request from the user's question.".to_string(),
        parameters: schema_for::<QueryArguments>(),
    }
}

/// Validated, normalized interpretation of one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedQuery {
    /// Free text used for keyword matching.
    pub search_text: String,
    /// Entity types to search; never empty.
    pub entity_types: Vec<EntityType>,
    /// `true` when `entity_types` was filled with the default scope
    /// because the question named none.
    #[serde(default)]
    pub scope_defaulted: bool,
    /// Absolute date range.
    pub date_range: Option<DateRange>,
    /// Attribute filters.
    pub filters: Option<QueryFilters>,
    /// Intent.
    pub intent: Intent,
    /// Requested ordering.
    pub sort_by: Option<SortBy>,
    /// Result limit, `1..=50`.
    pub limit: u32,
}

impl ParsedQuery {
    /// Builds a query with the given scope and defaults for everything else.
    #[must_use]
    pub fn new(search_text: impl Into<String>, entity_types: Vec<EntityType>, intent: Intent) -> Self {
        let (entity_types, scope_defaulted) = scope(entity_types);
        Self {
            search_text: search_text.into(),
            entity_types,
            scope_defaulted,
            date_range: None,
            filters: None,
            intent,
            sort_by: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

fn scope(entity_types: Vec<EntityType>) -> (Vec<EntityType>, bool) {
    let mut unique: Vec<EntityType> = Vec::with_capacity(entity_types.len());
    for t in entity_types {
        if !unique.contains(&t) {
            unique.push(t);
        }
    }
    if unique.is_empty() {
        (DEFAULT_ENTITY_TYPES.to_vec(), true)
    } else {
        (unique, false)
    }
}

/// Clamps a model-supplied limit into `1..=50`, defaulting to 10.
#[must_use]
pub fn clamp_limit(limit: Option<i64>) -> u32 {
    limit.map_or(DEFAULT_LIMIT, |n| {
        u32::try_from(n.clamp(1, i64::from(MAX_LIMIT))).unwrap_or(DEFAULT_LIMIT)
    })
}

fn normalize_range(raw: RawDateRange, today: NaiveDate) -> Option<DateRange> {
    let start = parse_bound(&raw.start, today, false);
    let end = raw
        .end
        .as_deref()
        .and_then(|e| parse_bound(e, today, true))
        .or_else(|| parse_bound(&raw.start, today, true));
    let field = raw.field.unwrap_or_default();
    match (start, end) {
        (Some(s), Some(e)) => Some(DateRange::new(s, e, field)),
        (Some(s), None) => Some(DateRange::new(s, s, field)),
        (None, Some(e)) => Some(DateRange::new(e, e, field)),
        (None, None) => None,
    }
}

impl QueryArguments {
    /// Validates and normalizes model output into a [`ParsedQuery`].
    ///
    /// Unknown entity types and intents are dropped, relative dates are
    /// resolved against `today`, and unusable values fall back to defaults.
    /// An omitted `searchText` means no keyword filter.
    #[must_use]
    pub fn normalize(self, today: NaiveDate) -> ParsedQuery {
        let search_text = self
            .search_text
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        let entity_types = self
            .entity_types
            .iter()
            .filter_map(|t| t.parse::<EntityType>().ok())
            .collect();
        let (entity_types, scope_defaulted) = scope(entity_types);

        ParsedQuery {
            search_text,
            entity_types,
            scope_defaulted,
            date_range: self.date_range.and_then(|r| normalize_range(r, today)),
            filters: self.filters.and_then(QueryFilters::cleaned),
            intent: self
                .intent
                .and_then(|i| i.parse().ok())
                .unwrap_or_default(),
            sort_by: self.sort_by.filter(|s| !s.field.trim().is_empty()),
            limit: clamp_limit(self.limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_case::test_case;

    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_default()
    }

    fn args(value: serde_json::Value) -> QueryArguments {
        serde_json::from_value(value).unwrap_or_default()
    }

    #[test]
    fn test_defaults_for_empty_arguments() {
        let parsed = args(json!({})).normalize(d("2025-01-01"));
        assert_eq!(parsed.entity_types, DEFAULT_ENTITY_TYPES.to_vec());
        assert!(parsed.scope_defaulted);
        assert_eq!(parsed.intent, Intent::Search);
        assert_eq!(parsed.limit, 10);
        assert!(parsed.search_text.is_empty());
    }

    #[test]
    fn test_unknown_values_are_dropped() {
        let parsed = args(json!({
            "entityTypes": ["events", "spaceships", "events"],
            "intent": "teleport"
        }))
        .normalize(d("2025-01-01"));
        assert_eq!(parsed.entity_types, vec![EntityType::Events]);
        assert!(!parsed.scope_defaulted);
        assert_eq!(parsed.intent, Intent::Search);
    }

    #[test]
    fn test_relative_dates_resolved() {
        let parsed = args(json!({
            "entityTypes": ["events"],
            "dateRange": {"start": "next week", "end": "next week"}
        }))
        .normalize(d("2025-01-01"));
        let range = parsed.date_range.unwrap_or_else(|| unreachable!());
        assert_eq!(range.start, d("2025-01-06"));
        assert_eq!(range.end, d("2025-01-12"));
    }

    #[test]
    fn test_unparseable_range_dropped() {
        let parsed = args(json!({"dateRange": {"start": "soonish"}}))
            .normalize(d("2025-01-01"));
        assert!(parsed.date_range.is_none());
    }

    #[test]
    fn test_blank_filters_become_none() {
        let parsed = args(json!({"filters": {"status": ["  "], "department": ""}}))
            .normalize(d("2025-01-01"));
        assert!(parsed.filters.is_none());

        let parsed = args(json!({"filters": {"status": ["Pending"]}}))
            .normalize(d("2025-01-01"));
        assert_eq!(
            parsed.filters.map(|f| f.status),
            Some(vec!["pending".to_string()])
        );
    }

    #[test_case(None => 10)]
    #[test_case(Some(0) => 1)]
    #[test_case(Some(-4) => 1)]
    #[test_case(Some(25) => 25)]
    #[test_case(Some(500) => 50)]
    fn test_clamp_limit(limit: Option<i64>) -> u32 {
        clamp_limit(limit)
    }

    #[test]
    fn test_parse_function_schema() {
        let def = parse_function();
        assert_eq!(def.name, PARSE_FUNCTION);
        let props = &def.parameters["properties"];
        assert!(props.get("entityTypes").is_some());
        assert!(props.get("dateRange").is_some());
    }
}
