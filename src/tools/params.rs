//! Typed tool parameters.
//!
//! Each tool decodes its JSON arguments into one of these structs. The
//! same derive generates the JSON Schema sent to the model, so the schema
//! and the decoder cannot drift apart.

use chrono::{Days, NaiveDate};
use schemars::JsonSchema;
use schemars::generate::SchemaSettings;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::core::{DateRange, EntityType, SortBy};
use crate::error::ToolError;

/// Default result limit.
pub const DEFAULT_LIMIT: u32 = 10;
/// Hard ceiling on result limits.
pub const MAX_LIMIT: u32 = 50;

/// Clamps an optional limit into `1..=50`, defaulting to 10.
#[must_use]
pub fn effective_limit(limit: Option<u32>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT) as usize
}

/// Longest day window a tool accepts (about ten years).
pub const MAX_WINDOW_DAYS: u32 = 3650;

/// Caps an optional day window at [`MAX_WINDOW_DAYS`].
#[must_use]
pub fn effective_days(days: Option<u32>, default: u32) -> u32 {
    days.unwrap_or(default).min(MAX_WINDOW_DAYS)
}

/// The date `days` after `today`.
///
/// # Errors
///
/// Returns [`ToolError::InvalidArgument`] when the result falls outside the
/// representable calendar.
pub fn window_end(today: NaiveDate, days: u32) -> Result<NaiveDate, ToolError> {
    today
        .checked_add_days(Days::new(u64::from(days)))
        .ok_or_else(|| ToolError::InvalidArgument(format!("{days} days after {today} is out of range")))
}

/// Accepts either a single string or an array of strings.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    })
}

/// Generates an inline JSON Schema object for a parameter struct.
#[must_use]
pub fn schema_for<T: JsonSchema>() -> Value {
    let schema = SchemaSettings::draft2020_12()
        .with(|s| s.inline_subschemas = true)
        .into_generator()
        .into_root_schema_for::<T>();
    let mut value = serde_json::to_value(&schema)
        .unwrap_or_else(|_| serde_json::json!({ "type": "object", "properties": {} }));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        obj.remove("description");
    }
    value
}

/// Parameters for `search_events` and `search_archived_events`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventSearchParams {
    /// Free-text search over title, description, category, location and organizer.
    #[serde(default)]
    pub query: Option<String>,
    /// Only events whose span overlaps this range.
    #[serde(default)]
    pub date_range: Option<DateRange>,
    /// Allowed statuses (planning, confirmed, ongoing, completed, cancelled).
    #[serde(default, deserialize_with = "one_or_many")]
    #[schemars(with = "Vec<String>")]
    pub status: Vec<String>,
    /// Event category (exhibition, conference, ...).
    #[serde(default)]
    pub category: Option<String>,
    /// Explicit sort order; defaults to start date.
    #[serde(default)]
    pub sort_by: Option<SortBy>,
    /// Maximum results (1-50, default 10).
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Parameters for `search_tasks`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskSearchParams {
    /// Free-text search over title, description, assignee, department and event.
    #[serde(default)]
    pub query: Option<String>,
    /// Only tasks due within this range.
    #[serde(default)]
    pub date_range: Option<DateRange>,
    /// Allowed statuses (todo, in_progress, review, blocked, done).
    #[serde(default, deserialize_with = "one_or_many")]
    #[schemars(with = "Vec<String>")]
    pub status: Vec<String>,
    /// Allowed priorities (low, medium, high, urgent).
    #[serde(default, deserialize_with = "one_or_many")]
    #[schemars(with = "Vec<String>")]
    pub priority: Vec<String>,
    /// Owning department.
    #[serde(default)]
    pub department: Option<String>,
    /// Explicit sort order; defaults to due date.
    #[serde(default)]
    pub sort_by: Option<SortBy>,
    /// Maximum results (1-50, default 10).
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Parameters for `search_contacts`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactSearchParams {
    /// Free-text search over name, email, organization, job title and notes.
    #[serde(default)]
    pub query: Option<String>,
    /// Contact category (vendor, sponsor, government, media, ...).
    #[serde(default)]
    pub category: Option<String>,
    /// Explicit sort order; defaults to name.
    #[serde(default)]
    pub sort_by: Option<SortBy>,
    /// Maximum results (1-50, default 10).
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Parameters for `search_partnerships`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartnershipSearchParams {
    /// Free-text search over name, organization, type, contact and notes.
    #[serde(default)]
    pub query: Option<String>,
    /// Only agreements whose term overlaps this range.
    #[serde(default)]
    pub date_range: Option<DateRange>,
    /// Allowed statuses (pending, negotiation, active, expired, terminated).
    #[serde(default, deserialize_with = "one_or_many")]
    #[schemars(with = "Vec<String>")]
    pub status: Vec<String>,
    /// Explicit sort order; defaults to name.
    #[serde(default)]
    pub sort_by: Option<SortBy>,
    /// Maximum results (1-50, default 10).
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Parameters for `search_leads`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadSearchParams {
    /// Free-text search over name, organization, email, source and notes.
    #[serde(default)]
    pub query: Option<String>,
    /// Allowed statuses (new, contacted, qualified, proposal, won, lost).
    #[serde(default, deserialize_with = "one_or_many")]
    #[schemars(with = "Vec<String>")]
    pub status: Vec<String>,
    /// Allowed priorities (low, medium, high).
    #[serde(default, deserialize_with = "one_or_many")]
    #[schemars(with = "Vec<String>")]
    pub priority: Vec<String>,
    /// Explicit sort order; defaults to name.
    #[serde(default)]
    pub sort_by: Option<SortBy>,
    /// Maximum results (1-50, default 10).
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Parameters for `get_count`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountParams {
    /// Entity family to count.
    pub entity_type: EntityType,
    /// Only count records with one of these statuses.
    #[serde(default, deserialize_with = "one_or_many")]
    #[schemars(with = "Vec<String>")]
    pub status: Vec<String>,
    /// Only count records whose date falls in (or overlaps) this range.
    #[serde(default)]
    pub date_range: Option<DateRange>,
}

/// Parameters for `get_dashboard_summary` (none).
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct DashboardParams {}

/// Parameters for `get_event_details`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventDetailParams {
    /// Event ID (preferred when known).
    #[serde(default)]
    pub event_id: Option<String>,
    /// Event title or part of it.
    #[serde(default)]
    pub title: Option<String>,
}

/// Parameters for `get_upcoming_deadlines`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeadlineParams {
    /// Look-ahead window in days (default 7).
    #[serde(default)]
    pub days: Option<u32>,
    /// Include tasks already past due (default true).
    #[serde(default)]
    pub include_overdue: Option<bool>,
    /// Maximum results (1-50, default 10).
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Parameters for `assess_event_risk`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RiskParams {
    /// Assess a single event.
    #[serde(default)]
    pub event_id: Option<String>,
    /// Otherwise assess events starting within this many days (default 30).
    #[serde(default)]
    pub days: Option<u32>,
    /// Maximum results (1-50, default 10).
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Parameters for `analyze_workload`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadParams {
    /// Restrict to one department.
    #[serde(default)]
    pub department: Option<String>,
    /// Restrict to one assignee.
    #[serde(default)]
    pub assignee: Option<String>,
}

/// Parameters for `find_stale_items`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StaleParams {
    /// contacts, partnerships or leads; all three when omitted.
    #[serde(default)]
    pub entity_type: Option<EntityType>,
    /// Minimum days without activity (default 30).
    #[serde(default)]
    pub days: Option<u32>,
    /// Maximum results (1-50, default 10).
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Parameters for `analyze_engagement`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EngagementParams {
    /// contacts, partnerships or leads; all three when omitted.
    #[serde(default)]
    pub entity_type: Option<EntityType>,
    /// Maximum results (1-50, default 10).
    #[serde(default)]
    pub limit: Option<u32>,
}
