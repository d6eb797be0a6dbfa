//! Entity and intent vocabularies shared by the parser, selector, and tools.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Business entity families the dataset exposes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Scheduled events (exhibitions, conferences, meetings).
    Events,
    /// Work items, optionally linked to an event and a department.
    Tasks,
    /// People in the address book.
    Contacts,
    /// Partner / sponsor agreements.
    Partnerships,
    /// Sales leads.
    Leads,
    /// Past events moved to the archive.
    #[serde(alias = "archived-events")]
    ArchivedEvents,
}

impl EntityType {
    /// All entity types in registry order.
    pub const ALL: [Self; 6] = [
        Self::Events,
        Self::Tasks,
        Self::Contacts,
        Self::Partnerships,
        Self::Leads,
        Self::ArchivedEvents,
    ];

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::Tasks => "tasks",
            Self::Contacts => "contacts",
            Self::Partnerships => "partnerships",
            Self::Leads => "leads",
            Self::ArchivedEvents => "archived_events",
        }
    }

    /// Singular label used in citations ("event", "task", ...).
    #[must_use]
    pub const fn singular(self) -> &'static str {
        match self {
            Self::Events => "event",
            Self::Tasks => "task",
            Self::Contacts => "contact",
            Self::Partnerships => "partnership",
            Self::Leads => "lead",
            Self::ArchivedEvents => "archived_event",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "events" | "event" => Ok(Self::Events),
            "tasks" | "task" => Ok(Self::Tasks),
            "contacts" | "contact" => Ok(Self::Contacts),
            "partnerships" | "partnership" => Ok(Self::Partnerships),
            "leads" | "lead" => Ok(Self::Leads),
            "archived_events" | "archived_event" | "archive" => Ok(Self::ArchivedEvents),
            other => Err(format!("unknown entity type: {other}")),
        }
    }
}

/// What the user wants done with the matching records.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Find records matching the question.
    #[default]
    Search,
    /// Count matching records.
    Count,
    /// Summarize a dataset or a slice of it.
    Summarize,
    /// Compare groups or periods.
    Compare,
    /// Analyze risk, workload, trends.
    Analyze,
    /// Enumerate records.
    List,
    /// Show one record in depth.
    Detail,
}

impl Intent {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Count => "count",
            Self::Summarize => "summarize",
            Self::Compare => "compare",
            Self::Analyze => "analyze",
            Self::List => "list",
            Self::Detail => "detail",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "search" | "find" => Ok(Self::Search),
            "count" => Ok(Self::Count),
            "summarize" | "summarise" | "summary" => Ok(Self::Summarize),
            "compare" => Ok(Self::Compare),
            "analyze" | "analyse" => Ok(Self::Analyze),
            "list" => Ok(Self::List),
            "detail" | "details" => Ok(Self::Detail),
            other => Err(format!("unknown intent: {other}")),
        }
    }
}

/// Which date attribute a [`DateRange`] filters on.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub enum DateField {
    /// Event / partnership start (span entities use overlap semantics).
    #[default]
    StartDate,
    /// Event / partnership end.
    EndDate,
    /// Task due date.
    DueDate,
    /// Record creation date.
    CreatedAt,
    /// Record last-update date.
    UpdatedAt,
    /// Last contact / activity date.
    LastActivity,
}

impl DateField {
    /// The field to filter `entity` on.
    ///
    /// Fields the entity carries are kept; anything else maps to the
    /// entity's closest date, so one range can span several entity types.
    #[must_use]
    pub const fn for_entity(self, entity: EntityType) -> Self {
        match (entity, self) {
            (EntityType::Events | EntityType::ArchivedEvents, Self::EndDate) => Self::EndDate,
            (EntityType::Events | EntityType::ArchivedEvents, _) => Self::StartDate,
            (EntityType::Tasks, Self::CreatedAt) => Self::CreatedAt,
            (EntityType::Tasks, Self::UpdatedAt | Self::LastActivity) => Self::UpdatedAt,
            (EntityType::Tasks, _) => Self::DueDate,
            (EntityType::Contacts, _) => Self::LastActivity,
            (EntityType::Partnerships, Self::EndDate | Self::DueDate) => Self::EndDate,
            (EntityType::Partnerships, Self::UpdatedAt | Self::LastActivity) => {
                Self::LastActivity
            }
            (EntityType::Partnerships, _) => Self::StartDate,
            (EntityType::Leads, Self::UpdatedAt | Self::LastActivity | Self::CreatedAt) => {
                Self::LastActivity
            }
            (EntityType::Leads, _) => Self::DueDate,
        }
    }
}

/// Inclusive absolute date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// First day of the range (inclusive).
    pub start: NaiveDate,
    /// Last day of the range (inclusive).
    pub end: NaiveDate,
    /// Date attribute the range applies to.
    #[serde(default)]
    pub field: DateField,
}

impl DateRange {
    /// This range with its field mapped onto `entity`.
    #[must_use]
    pub const fn for_entity(self, entity: EntityType) -> Self {
        Self {
            field: self.field.for_entity(entity),
            ..self
        }
    }

    /// Creates a range, swapping the bounds if they arrive reversed.
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate, field: DateField) -> Self {
        if start <= end {
            Self { start, end, field }
        } else {
            Self {
                start: end,
                end: start,
                field,
            }
        }
    }

    /// Interval-overlap test: `span_start <= end && span_end >= start`.
    #[must_use]
    pub fn overlaps(&self, span_start: NaiveDate, span_end: NaiveDate) -> bool {
        span_start <= self.end && span_end >= self.start
    }

    /// Point containment test.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

/// Explicit sort order requested by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SortBy {
    /// Field name (`startDate`, `dueDate`, `priority`, `name`, `value`, ...).
    pub field: String,
    /// Direction.
    #[serde(default)]
    pub direction: SortDirection,
}
