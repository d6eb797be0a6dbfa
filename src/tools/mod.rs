//! Typed, read-only data tools and the registry that dispatches them.
//!
//! Tool names are parsed into [`ToolName`] at the edge; dispatch is an
//! exhaustive match onto strongly-typed functions. Every invocation returns
//! a [`ToolResult`] envelope: errors from decoding or from the data layer
//! are captured there and never propagate.

pub mod aggregate;
pub mod analytics;
pub mod filter;
pub mod params;
pub mod result;
pub mod search;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::agent::tool::ToolDefinition;
use crate::data::DataSource;
use crate::error::ToolError;

pub use params::{
    ContactSearchParams, CountParams, DashboardParams, DeadlineParams, EngagementParams,
    EventDetailParams, EventSearchParams, LeadSearchParams, PartnershipSearchParams, RiskParams,
    StaleParams, TaskSearchParams, WorkloadParams,
};
pub use result::{Citation, ToolData, ToolResult};

/// Successful tool output before it is wrapped in a [`ToolResult`].
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Typed payload.
    pub data: ToolData,
    /// One-line human summary.
    pub summary: String,
}

impl ToolOutput {
    /// Creates a tool output.
    #[must_use]
    pub fn new(data: ToolData, summary: impl Into<String>) -> Self {
        Self {
            data,
            summary: summary.into(),
        }
    }
}

/// Closed set of tools, in registry order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolName {
    /// `search_events`
    SearchEvents,
    /// `search_tasks`
    SearchTasks,
    /// `search_contacts`
    SearchContacts,
    /// `search_partnerships`
    SearchPartnerships,
    /// `search_leads`
    SearchLeads,
    /// `search_archived_events`
    SearchArchivedEvents,
    /// `get_count`
    GetCount,
    /// `get_dashboard_summary`
    GetDashboardSummary,
    /// `get_event_details`
    GetEventDetails,
    /// `get_upcoming_deadlines`
    GetUpcomingDeadlines,
    /// `assess_event_risk`
    AssessEventRisk,
    /// `analyze_workload`
    AnalyzeWorkload,
    /// `find_stale_items`
    FindStaleItems,
    /// `analyze_engagement`
    AnalyzeEngagement,
}

impl ToolName {
    /// Every tool, in registry order.
    pub const ALL: [Self; 14] = [
        Self::SearchEvents,
        Self::SearchTasks,
        Self::SearchContacts,
        Self::SearchPartnerships,
        Self::SearchLeads,
        Self::SearchArchivedEvents,
        Self::GetCount,
        Self::GetDashboardSummary,
        Self::GetEventDetails,
        Self::GetUpcomingDeadlines,
        Self::AssessEventRisk,
        Self::AnalyzeWorkload,
        Self::FindStaleItems,
        Self::AnalyzeEngagement,
    ];

    /// Stable wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SearchEvents => "search_events",
            Self::SearchTasks => "search_tasks",
            Self::SearchContacts => "search_contacts",
            Self::SearchPartnerships => "search_partnerships",
            Self::SearchLeads => "search_leads",
            Self::SearchArchivedEvents => "search_archived_events",
            Self::GetCount => "get_count",
            Self::GetDashboardSummary => "get_dashboard_summary",
            Self::GetEventDetails => "get_event_details",
            Self::GetUpcomingDeadlines => "get_upcoming_deadlines",
            Self::AssessEventRisk => "assess_event_risk",
            Self::AnalyzeWorkload => "analyze_workload",
            Self::FindStaleItems => "find_stale_items",
            Self::AnalyzeEngagement => "analyze_engagement",
        }
    }

    /// Description sent to the model.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::SearchEvents => {
                "Search upcoming and current events (exhibitions, conferences, trade shows) by \
                 text, date range, status or category."
            }
            Self::SearchTasks => {
                "Search tasks by text, due-date range, status, priority or department."
            }
            Self::SearchContacts => {
                "Search contacts by name, organization, job title, email or category."
            }
            Self::SearchPartnerships => {
                "Search partnerships and sponsorship agreements by text, status or term."
            }
            Self::SearchLeads => "Search sales leads by text, status or priority.",
            Self::SearchArchivedEvents => {
                "Search past, archived events. Use for questions about previous editions."
            }
            Self::GetCount => {
                "Count records of one entity type, optionally by status and date range. \
                 Returns a per-status breakdown."
            }
            Self::GetDashboardSummary => {
                "Overview of the whole dataset: upcoming events, overdue tasks, active \
                 partnerships, open leads and pipeline value."
            }
            Self::GetEventDetails => {
                "Full details of one event, looked up by id or title, with its linked tasks \
                 and completion progress."
            }
            Self::GetUpcomingDeadlines => {
                "Open tasks due within the next N days, optionally including overdue ones."
            }
            Self::AssessEventRisk => {
                "Score delivery risk (low/medium/high) for one event or all events starting \
                 soon, from overdue and blocked tasks and missing logistics."
            }
            Self::AnalyzeWorkload => {
                "Open-task load per assignee, weighted by priority and overdue work."
            }
            Self::FindStaleItems => {
                "Contacts, partnerships and leads with no recorded activity for N days, \
                 banded aging (N+), stale (2N+) and critical (3N+ or never)."
            }
            Self::AnalyzeEngagement => {
                "Relationship engagement scores for contacts, partnerships and leads."
            }
        }
    }

    /// JSON Schema of the tool's parameters.
    #[must_use]
    pub fn schema(self) -> Value {
        use params::schema_for;
        match self {
            Self::SearchEvents | Self::SearchArchivedEvents => schema_for::<EventSearchParams>(),
            Self::SearchTasks => schema_for::<TaskSearchParams>(),
            Self::SearchContacts => schema_for::<ContactSearchParams>(),
            Self::SearchPartnerships => schema_for::<PartnershipSearchParams>(),
            Self::SearchLeads => schema_for::<LeadSearchParams>(),
            Self::GetCount => schema_for::<CountParams>(),
            Self::GetDashboardSummary => schema_for::<DashboardParams>(),
            Self::GetEventDetails => schema_for::<EventDetailParams>(),
            Self::GetUpcomingDeadlines => schema_for::<DeadlineParams>(),
            Self::AssessEventRisk => schema_for::<RiskParams>(),
            Self::AnalyzeWorkload => schema_for::<WorkloadParams>(),
            Self::FindStaleItems => schema_for::<StaleParams>(),
            Self::AnalyzeEngagement => schema_for::<EngagementParams>(),
        }
    }

    /// Provider-facing definition.
    #[must_use]
    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.as_str().to_string(),
            description: self.description().to_string(),
            parameters: self.schema(),
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

fn decode<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    let args = if args.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        args
    };
    Ok(serde_json::from_value(args)?)
}

/// Immutable tool registry over one data source.
///
/// Cheap to clone; clones share the source.
#[derive(Clone)]
pub struct ToolRegistry {
    source: Arc<dyn DataSource>,
    today: NaiveDate,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("today", &self.today)
            .finish_non_exhaustive()
    }
}

impl ToolRegistry {
    /// Creates a registry. `today` anchors every relative window
    /// (deadlines, overdue, staleness).
    #[must_use]
    pub fn new(source: Arc<dyn DataSource>, today: NaiveDate) -> Self {
        Self { source, today }
    }

    /// Reference date.
    #[must_use]
    pub const fn today(&self) -> NaiveDate {
        self.today
    }

    /// Definitions of every tool, in registry order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        ToolName::ALL.into_iter().map(ToolName::definition).collect()
    }

    async fn run(&self, tool: ToolName, args: Value) -> Result<ToolOutput, ToolError> {
        let source = self.source.as_ref();
        let today = self.today;
        match tool {
            ToolName::SearchEvents => Ok(search::events(source, &decode(args)?).await?),
            ToolName::SearchTasks => Ok(search::tasks(source, &decode(args)?).await?),
            ToolName::SearchContacts => Ok(search::contacts(source, &decode(args)?).await?),
            ToolName::SearchPartnerships => {
                Ok(search::partnerships(source, &decode(args)?).await?)
            }
            ToolName::SearchLeads => Ok(search::leads(source, &decode(args)?).await?),
            ToolName::SearchArchivedEvents => {
                Ok(search::archived_events(source, &decode(args)?).await?)
            }
            ToolName::GetCount => aggregate::count(source, &decode(args)?).await,
            ToolName::GetDashboardSummary => {
                let _: DashboardParams = decode(args)?;
                aggregate::dashboard(source, today).await
            }
            ToolName::GetEventDetails => {
                aggregate::event_details(source, &decode(args)?, today).await
            }
            ToolName::GetUpcomingDeadlines => {
                aggregate::upcoming_deadlines(source, &decode(args)?, today).await
            }
            ToolName::AssessEventRisk => {
                analytics::event_risk(source, &decode(args)?, today).await
            }
            ToolName::AnalyzeWorkload => analytics::workload(source, &decode(args)?, today).await,
            ToolName::FindStaleItems => analytics::stale_items(source, &decode(args)?, today).await,
            ToolName::AnalyzeEngagement => {
                analytics::engagement_scores(source, &decode(args)?, today).await
            }
        }
    }

    /// Runs one tool. Never fails: errors become a failed [`ToolResult`].
    pub async fn invoke(&self, tool: ToolName, args: Value) -> ToolResult {
        match self.run(tool, args).await {
            Ok(output) => {
                debug!(tool = %tool, results = output.data.len(), "tool completed");
                ToolResult::ok(output.data, output.summary)
            }
            Err(e) => {
                warn!(tool = %tool, error = %e, "tool failed");
                ToolResult::failure(e.to_string())
            }
        }
    }

    /// Runs a tool by wire name; unknown names yield a failed result.
    pub async fn execute(&self, name: &str, args: Value) -> ToolResult {
        match name.parse::<ToolName>() {
            Ok(tool) => self.invoke(tool, args).await,
            Err(e) => {
                warn!(tool = name, "unknown tool requested");
                ToolResult::failure(e.to_string())
            }
        }
    }

    /// Runs several tools concurrently.
    ///
    /// Results come back in input order regardless of completion order, and
    /// one failure never affects the others.
    pub async fn execute_all(&self, calls: Vec<(ToolName, Value)>) -> Vec<(ToolName, ToolResult)> {
        debug!(count = calls.len(), "fanning out tool calls");
        let handles: Vec<_> = calls
            .into_iter()
            .map(|(tool, args)| {
                let registry = self.clone();
                (
                    tool,
                    tokio::spawn(async move { registry.invoke(tool, args).await }),
                )
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (tool, handle) in handles {
            let result = handle.await.unwrap_or_else(|e| {
                let err = ToolError::Join(e.to_string());
                warn!(tool = %tool, error = %err, "tool task failed");
                ToolResult::failure(err.to_string())
            });
            results.push((tool, result));
        }
        results
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::json;
    use test_case::test_case;

    use super::*;
    use crate::test_support::{TODAY, fixture_source};

    fn registry() -> ToolRegistry {
        ToolRegistry::new(Arc::new(fixture_source()), TODAY)
    }

    #[test]
    fn test_definitions_follow_registry_order() {
        let defs = registry().definitions();
        assert_eq!(defs.len(), 14);
        assert_eq!(defs[0].name, "search_events");
        assert_eq!(defs[6].name, "get_count");
        assert_eq!(defs[13].name, "analyze_engagement");
        for def in &defs {
            assert_eq!(def.parameters["type"], "object", "{}", def.name);
            assert!(def.parameters.get("$schema").is_none());
        }
    }

    #[test]
    fn test_name_round_trip() {
        for tool in ToolName::ALL {
            assert_eq!(tool.as_str().parse::<ToolName>().ok(), Some(tool));
        }
    }

    #[test]
    fn test_count_schema_requires_entity_type() {
        let schema = ToolName::GetCount.schema();
        let required = schema["required"].as_array().cloned().unwrap_or_default();
        assert!(required.contains(&json!("entityType")));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_failure() {
        let result = registry().execute("drop_tables", json!({})).await;
        assert!(!result.is_success());
        assert!(result.error().is_some_and(|e| e.contains("drop_tables")));
    }

    #[tokio::test]
    async fn test_count_pending_partnerships() {
        let result = registry()
            .execute(
                "get_count",
                json!({"entityType": "partnerships", "status": ["pending"]}),
            )
            .await;
        let Some(ToolData::Count(counted)) = result.data() else {
            panic!("expected count, got {result:?}");
        };
        assert_eq!(counted.count, 5);
    }

    #[test_case(json!({"entityType": "spaceships"}) ; "bad enum")]
    #[test_case(json!({"limit": "many"}) ; "bad type")]
    #[tokio::test]
    async fn test_invalid_params_are_failures(args: Value) {
        let tool = if args.get("entityType").is_some() {
            ToolName::GetCount
        } else {
            ToolName::SearchEvents
        };
        let result = registry().invoke(tool, args).await;
        assert!(!result.is_success());
        assert!(result.data().is_none());
    }

    #[test_case(ToolName::AssessEventRisk ; "risk")]
    #[test_case(ToolName::GetUpcomingDeadlines ; "deadlines")]
    #[test_case(ToolName::FindStaleItems ; "stale")]
    #[tokio::test]
    async fn test_huge_day_windows_succeed(tool: ToolName) {
        let result = registry()
            .invoke(tool, json!({"days": 4_000_000_000_u32}))
            .await;
        assert!(result.is_success(), "{result:?}");
    }

    #[tokio::test]
    async fn test_dashboard_accepts_null_args() {
        let result = registry()
            .invoke(ToolName::GetDashboardSummary, Value::Null)
            .await;
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_execute_all_keeps_input_order() {
        let calls = vec![
            (ToolName::SearchTasks, json!({})),
            (ToolName::GetEventDetails, json!({"eventId": "missing"})),
            (ToolName::SearchEvents, json!({})),
        ];
        let results = registry().execute_all(calls).await;
        let order: Vec<ToolName> = results.iter().map(|(t, _)| *t).collect();
        assert_eq!(
            order,
            vec![
                ToolName::SearchTasks,
                ToolName::GetEventDetails,
                ToolName::SearchEvents
            ]
        );
        assert!(results[0].1.is_success());
        assert!(!results[1].1.is_success());
        assert!(results[2].1.is_success());
    }
}
