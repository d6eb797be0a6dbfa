//! Uniform tool result envelope and typed payloads.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::core::{Contact, EntityType, Event, Lead, Partnership, Record, Task};

/// Outcome of one tool invocation.
///
/// Either `success` with optional data, or failure with a non-empty
/// `error` and no data. The constructors are the only way to build one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<ToolData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ToolResult {
    /// Successful result.
    #[must_use]
    pub fn ok(data: ToolData, summary: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            summary: Some(summary.into()),
            error: None,
        }
    }

    /// Failed result.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            data: None,
            summary: None,
            error: Some(if error.is_empty() {
                "unknown error".to_string()
            } else {
                error
            }),
        }
    }

    /// Whether the tool ran successfully.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// Payload, present only on success.
    #[must_use]
    pub const fn data(&self) -> Option<&ToolData> {
        self.data.as_ref()
    }

    /// One-line human summary.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Error message, present only on failure.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Number of result rows (0 on failure).
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, ToolData::len)
    }

    /// Returns `true` when there are no result rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tool payload, keyed by result category.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum ToolData {
    /// Active events.
    Events(Vec<Event>),
    /// Tasks.
    Tasks(Vec<Task>),
    /// Contacts.
    Contacts(Vec<Contact>),
    /// Partnerships.
    Partnerships(Vec<Partnership>),
    /// Leads.
    Leads(Vec<Lead>),
    /// Archived events.
    ArchivedEvents(Vec<Event>),
    /// Record count.
    Count(CountResult),
    /// Dashboard overview.
    Summary(Box<DashboardSummary>),
    /// One event with its linked tasks.
    EventDetail(Box<EventDetail>),
    /// Event risk assessments.
    Risk(Vec<RiskAssessment>),
    /// Per-assignee workload.
    Workload(Vec<WorkloadEntry>),
    /// Records without recent activity.
    Staleness(Vec<StaleItem>),
    /// Relationship engagement scores.
    Engagement(Vec<EngagementScore>),
}

/// A record reference extracted from tool data for citations.
#[derive(Debug, Clone, PartialEq)]
pub struct Citation {
    /// Entity family.
    pub entity_type: EntityType,
    /// Record ID.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Short description.
    pub snippet: Option<String>,
}

fn cite<R: Record>(entity_type: EntityType, records: &[R]) -> Vec<Citation> {
    records
        .iter()
        .map(|r| Citation {
            entity_type,
            id: r.id().to_string(),
            title: r.title().to_string(),
            snippet: r.snippet(),
        })
        .collect()
}

fn to_rows<T: Serialize>(items: &[T]) -> Vec<Value> {
    items
        .iter()
        .filter_map(|item| serde_json::to_value(item).ok())
        .collect()
}

impl ToolData {
    /// Number of rows (single-object payloads count as one).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Events(v) | Self::ArchivedEvents(v) => v.len(),
            Self::Tasks(v) => v.len(),
            Self::Contacts(v) => v.len(),
            Self::Partnerships(v) => v.len(),
            Self::Leads(v) => v.len(),
            Self::Risk(v) => v.len(),
            Self::Workload(v) => v.len(),
            Self::Staleness(v) => v.len(),
            Self::Engagement(v) => v.len(),
            Self::Count(_) | Self::Summary(_) | Self::EventDetail(_) => 1,
        }
    }

    /// Returns `true` for an empty list payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows as JSON objects, for context rendering.
    #[must_use]
    pub fn rows(&self) -> Vec<Value> {
        match self {
            Self::Events(v) | Self::ArchivedEvents(v) => to_rows(v),
            Self::Tasks(v) => to_rows(v),
            Self::Contacts(v) => to_rows(v),
            Self::Partnerships(v) => to_rows(v),
            Self::Leads(v) => to_rows(v),
            Self::Risk(v) => to_rows(v),
            Self::Workload(v) => to_rows(v),
            Self::Staleness(v) => to_rows(v),
            Self::Engagement(v) => to_rows(v),
            Self::Count(c) => to_rows(std::slice::from_ref(c)),
            Self::Summary(s) => to_rows(std::slice::from_ref(s.as_ref())),
            Self::EventDetail(d) => to_rows(std::slice::from_ref(d.as_ref())),
        }
    }

    /// Records this payload refers to, in payload order.
    #[must_use]
    pub fn citations(&self) -> Vec<Citation> {
        match self {
            Self::Events(v) => cite(EntityType::Events, v),
            Self::ArchivedEvents(v) => cite(EntityType::ArchivedEvents, v),
            Self::Tasks(v) => cite(EntityType::Tasks, v),
            Self::Contacts(v) => cite(EntityType::Contacts, v),
            Self::Partnerships(v) => cite(EntityType::Partnerships, v),
            Self::Leads(v) => cite(EntityType::Leads, v),
            Self::EventDetail(d) => {
                let mut out = cite(EntityType::Events, std::slice::from_ref(&d.event));
                out.extend(cite(EntityType::Tasks, &d.tasks));
                out
            }
            Self::Risk(v) => v
                .iter()
                .map(|r| Citation {
                    entity_type: EntityType::Events,
                    id: r.event_id.clone(),
                    title: r.title.clone(),
                    snippet: Some(format!("{} risk ({})", r.level, r.score)),
                })
                .collect(),
            Self::Staleness(v) => v
                .iter()
                .map(|s| Citation {
                    entity_type: s.entity_type,
                    id: s.id.clone(),
                    title: s.name.clone(),
                    snippet: Some(s.status.to_string()),
                })
                .collect(),
            Self::Engagement(v) => v
                .iter()
                .map(|e| Citation {
                    entity_type: e.entity_type,
                    id: e.id.clone(),
                    title: e.name.clone(),
                    snippet: Some(format!("{} engagement ({})", e.level, e.score)),
                })
                .collect(),
            Self::Count(_) | Self::Summary(_) | Self::Workload(_) => Vec::new(),
        }
    }
}

/// `get_count` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResult {
    /// Entity family counted.
    pub entity_type: EntityType,
    /// Matching records.
    pub count: usize,
    /// Matching records per status.
    pub by_status: BTreeMap<String, usize>,
}

/// `get_dashboard_summary` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    /// Active events.
    pub total_events: usize,
    /// Events starting within 7 days.
    pub events_next_7_days: usize,
    /// Events starting within 30 days.
    pub events_next_30_days: usize,
    /// All tasks.
    pub total_tasks: usize,
    /// Open tasks past due.
    pub overdue_tasks: usize,
    /// Open tasks due within 7 days.
    pub tasks_due_soon: usize,
    /// Tasks per status.
    pub tasks_by_status: BTreeMap<String, usize>,
    /// All contacts.
    pub total_contacts: usize,
    /// All partnerships.
    pub total_partnerships: usize,
    /// Partnerships with status `active`.
    pub active_partnerships: usize,
    /// All leads.
    pub total_leads: usize,
    /// Leads not yet won or lost.
    pub open_leads: usize,
    /// Summed estimated value of open leads.
    pub pipeline_value: f64,
}

/// Task completion figures for one event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskProgress {
    /// Linked tasks.
    pub total: usize,
    /// Tasks done.
    pub completed: usize,
    /// Open tasks past due.
    pub overdue: usize,
    /// Tasks marked blocked.
    pub blocked: usize,
    /// Share of tasks done, 0-100.
    pub percent_complete: u8,
}

/// `get_event_details` payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetail {
    /// The event.
    pub event: Event,
    /// Tasks linked to it, by due date.
    pub tasks: Vec<Task>,
    /// Completion figures.
    pub progress: TaskProgress,
    /// Days until the event starts (negative once started).
    pub days_until_start: i64,
}

/// Three-level bucket used by the scoring tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Below the lower threshold.
    Low,
    /// Between thresholds.
    Medium,
    /// At or above the upper threshold.
    High,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// `assess_event_risk` row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    /// Event ID.
    pub event_id: String,
    /// Event title.
    pub title: String,
    /// Event start.
    pub start_date: NaiveDate,
    /// Risk score, 0-100.
    pub score: u8,
    /// Bucket.
    pub level: Level,
    /// Signals that contributed to the score.
    pub factors: Vec<String>,
}

/// Workload bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadStatus {
    /// Score below 8.
    Available,
    /// Score 8-14.
    Busy,
    /// Score 15 or more.
    Overloaded,
}

/// `analyze_workload` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadEntry {
    /// Assignee name (`Unassigned` for tasks without one).
    pub assignee: String,
    /// Open tasks.
    pub open_tasks: usize,
    /// Open high/urgent tasks.
    pub high_priority: usize,
    /// Open tasks past due.
    pub overdue: usize,
    /// Weighted load score.
    pub score: u32,
    /// Bucket.
    pub status: WorkloadStatus,
}

/// Staleness bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Staleness {
    /// At least the threshold, under twice it (30-59 days by default).
    Aging,
    /// Two to three times the threshold (60-89 days by default).
    Stale,
    /// Three times the threshold or more, or never active.
    Critical,
}

impl std::fmt::Display for Staleness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Aging => "aging",
            Self::Stale => "stale",
            Self::Critical => "critical",
        })
    }
}

/// `find_stale_items` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleItem {
    /// Entity family.
    pub entity_type: EntityType,
    /// Record ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Last activity, if any was ever recorded.
    pub last_activity: Option<NaiveDate>,
    /// Days since last activity (`None` = never).
    pub days_inactive: Option<i64>,
    /// Bucket.
    pub status: Staleness,
}

/// `analyze_engagement` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementScore {
    /// Entity family.
    pub entity_type: EntityType,
    /// Record ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Score, 0-100.
    pub score: u8,
    /// Bucket.
    pub level: Level,
}
