//! Business records returned by the data layer.
//!
//! Records are plain in-memory values. The [`Record`] trait gives the
//! generic search pipeline in [`crate::tools::filter`] uniform access to
//! the fields it filters, sorts, and cites on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::entity::{DateField, EntityType};

/// Sortable projection of a record field.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    /// Calendar date.
    Date(NaiveDate),
    /// Case-folded text.
    Text(String),
    /// Numeric amount.
    Number(f64),
    /// Ordinal rank (priority levels).
    Rank(u8),
    /// Field absent; always sorts last.
    Missing,
}

/// Uniform view over a business record for filtering, sorting, and citing.
pub trait Record: Clone + Serialize + Send + Sync + 'static {
    /// Entity type the record belongs to (archived events report `Events`).
    const ENTITY: EntityType;

    /// Stable identifier.
    fn id(&self) -> &str;

    /// Headline used for citations and title matching.
    fn title(&self) -> &str;

    /// Lifecycle status, if the entity has one.
    fn status(&self) -> Option<&str> {
        None
    }

    /// Priority level, if the entity has one.
    fn priority(&self) -> Option<&str> {
        None
    }

    /// Owning department, if any.
    fn department(&self) -> Option<&str> {
        None
    }

    /// Category or type label, if any.
    fn category(&self) -> Option<&str> {
        None
    }

    /// Every text field free-text search looks at.
    fn search_fields(&self) -> Vec<&str>;

    /// High-priority fields (name/title): one keyword hit here is a match.
    fn title_fields(&self) -> Vec<&str> {
        vec![self.title()]
    }

    /// Date span for `field`, as `(start, end)`. Point dates return
    /// `(d, d)`.
    fn date_span(&self, field: DateField) -> Option<(NaiveDate, NaiveDate)>;

    /// Sort key for a named field.
    fn sort_key(&self, field: &str) -> SortKey;

    /// Short description for citations.
    fn snippet(&self) -> Option<String>;
}

/// Ordinal rank for a priority label (higher is more urgent).
#[must_use]
pub fn priority_rank(priority: &str) -> u8 {
    match priority.to_lowercase().as_str() {
        "urgent" | "critical" => 4,
        "high" => 3,
        "medium" | "normal" => 2,
        "low" => 1,
        _ => 0,
    }
}

fn text_key(value: Option<&str>) -> SortKey {
    value.map_or(SortKey::Missing, |v| SortKey::Text(v.to_lowercase()))
}

fn date_key(value: Option<NaiveDate>) -> SortKey {
    value.map_or(SortKey::Missing, SortKey::Date)
}

fn number_key(value: Option<f64>) -> SortKey {
    value.map_or(SortKey::Missing, SortKey::Number)
}

fn truncate_snippet(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    }
}

const SNIPPET_CHARS: usize = 160;

/// A scheduled event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Identifier.
    pub id: String,
    /// Event title.
    pub title: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Category (exhibition, conference, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Lifecycle status (planning, confirmed, ongoing, completed, cancelled).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Venue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Organizer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,
    /// First day.
    pub start_date: NaiveDate,
    /// Last day; single-day events leave it empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Expected head-count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_attendees: Option<u32>,
    /// Allocated budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
}

impl Event {
    /// Last day of the event, falling back to the start for one-day events.
    #[must_use]
    pub fn last_day(&self) -> NaiveDate {
        self.end_date.unwrap_or(self.start_date)
    }
}

impl Record for Event {
    const ENTITY: EntityType = EntityType::Events;

    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    fn search_fields(&self) -> Vec<&str> {
        [
            Some(self.title.as_str()),
            self.description.as_deref(),
            self.category.as_deref(),
            self.location.as_deref(),
            self.organizer.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn date_span(&self, field: DateField) -> Option<(NaiveDate, NaiveDate)> {
        match field {
            DateField::StartDate => Some((self.start_date, self.last_day())),
            DateField::EndDate => Some((self.last_day(), self.last_day())),
            _ => None,
        }
    }

    fn sort_key(&self, field: &str) -> SortKey {
        match field {
            "endDate" => SortKey::Date(self.last_day()),
            "title" | "name" => text_key(Some(&self.title)),
            "status" => text_key(self.status.as_deref()),
            "category" => text_key(self.category.as_deref()),
            "budget" | "value" => number_key(self.budget),
            "expectedAttendees" | "attendees" => {
                number_key(self.expected_attendees.map(f64::from))
            }
            _ => SortKey::Date(self.start_date),
        }
    }

    fn snippet(&self) -> Option<String> {
        self.description
            .as_deref()
            .map(|d| truncate_snippet(d, SNIPPET_CHARS))
            .or_else(|| self.location.clone())
    }
}

/// A work item with joined department/event context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Identifier.
    pub id: String,
    /// Task title.
    pub title: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Status (todo, in_progress, review, blocked, done).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Priority (low, medium, high, urgent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Due date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// Assignee display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// Joined department name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    /// Linked event ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Joined event title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_title: Option<String>,
    /// Creation date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDate>,
    /// Last update date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDate>,
}

impl Task {
    /// Returns `true` once the task is finished or dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(
            self.status.as_deref().map(str::to_lowercase).as_deref(),
            Some("done" | "completed" | "cancelled")
        )
    }

    /// Returns `true` if the task is open and past its due date.
    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_closed() && self.due_date.is_some_and(|due| due < today)
    }

    /// Returns `true` if the task is marked blocked.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("blocked"))
    }

    /// Returns `true` for high or urgent priority.
    #[must_use]
    pub fn is_high_priority(&self) -> bool {
        self.priority.as_deref().is_some_and(|p| priority_rank(p) >= 3)
    }
}

impl Record for Task {
    const ENTITY: EntityType = EntityType::Tasks;

    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn priority(&self) -> Option<&str> {
        self.priority.as_deref()
    }

    fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }

    fn search_fields(&self) -> Vec<&str> {
        [
            Some(self.title.as_str()),
            self.description.as_deref(),
            self.assignee.as_deref(),
            self.department.as_deref(),
            self.event_title.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn date_span(&self, field: DateField) -> Option<(NaiveDate, NaiveDate)> {
        let date = match field {
            DateField::CreatedAt => self.created_at,
            DateField::UpdatedAt | DateField::LastActivity => self.updated_at,
            _ => self.due_date,
        }?;
        Some((date, date))
    }

    fn sort_key(&self, field: &str) -> SortKey {
        match field {
            "title" | "name" => text_key(Some(&self.title)),
            "priority" => self
                .priority
                .as_deref()
                .map_or(SortKey::Missing, |p| SortKey::Rank(priority_rank(p))),
            "status" => text_key(self.status.as_deref()),
            "assignee" => text_key(self.assignee.as_deref()),
            "createdAt" => date_key(self.created_at),
            "updatedAt" => date_key(self.updated_at),
            _ => date_key(self.due_date),
        }
    }

    fn snippet(&self) -> Option<String> {
        self.description
            .as_deref()
            .map(|d| truncate_snippet(d, SNIPPET_CHARS))
            .or_else(|| self.event_title.clone())
    }
}

/// An address-book contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Identifier.
    pub id: String,
    /// Full name.
    pub name: String,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Employer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Role at the organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    /// Category (vendor, sponsor, government, media, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Last time anyone reached out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_contacted: Option<NaiveDate>,
    /// Notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Record for Contact {
    const ENTITY: EntityType = EntityType::Contacts;

    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    fn search_fields(&self) -> Vec<&str> {
        [
            Some(self.name.as_str()),
            self.email.as_deref(),
            self.organization.as_deref(),
            self.job_title.as_deref(),
            self.category.as_deref(),
            self.notes.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn title_fields(&self) -> Vec<&str> {
        [Some(self.name.as_str()), self.organization.as_deref()]
            .into_iter()
            .flatten()
            .collect()
    }

    fn date_span(&self, field: DateField) -> Option<(NaiveDate, NaiveDate)> {
        match field {
            DateField::LastActivity | DateField::UpdatedAt => {
                self.last_contacted.map(|d| (d, d))
            }
            _ => None,
        }
    }

    fn sort_key(&self, field: &str) -> SortKey {
        match field {
            "organization" => text_key(self.organization.as_deref()),
            "lastContacted" | "lastActivity" => date_key(self.last_contacted),
            "category" => text_key(self.category.as_deref()),
            _ => text_key(Some(&self.name)),
        }
    }

    fn snippet(&self) -> Option<String> {
        match (self.job_title.as_deref(), self.organization.as_deref()) {
            (Some(role), Some(org)) => Some(format!("{role} at {org}")),
            (Some(role), None) => Some(role.to_string()),
            (None, Some(org)) => Some(org.to_string()),
            (None, None) => self.email.clone(),
        }
    }
}

/// A partner or sponsor agreement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partnership {
    /// Identifier.
    pub id: String,
    /// Partnership name.
    pub name: String,
    /// Partner organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Type (sponsor, media, venue, strategic, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partnership_type: Option<String>,
    /// Status (pending, negotiation, active, expired, terminated).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Contract value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Agreement start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Agreement end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Primary contact name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    /// Last recorded activity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<NaiveDate>,
    /// Notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Record for Partnership {
    const ENTITY: EntityType = EntityType::Partnerships;

    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn category(&self) -> Option<&str> {
        self.partnership_type.as_deref()
    }

    fn search_fields(&self) -> Vec<&str> {
        [
            Some(self.name.as_str()),
            self.organization.as_deref(),
            self.partnership_type.as_deref(),
            self.contact_name.as_deref(),
            self.notes.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn title_fields(&self) -> Vec<&str> {
        [Some(self.name.as_str()), self.organization.as_deref()]
            .into_iter()
            .flatten()
            .collect()
    }

    fn date_span(&self, field: DateField) -> Option<(NaiveDate, NaiveDate)> {
        match field {
            DateField::StartDate => {
                let start = self.start_date?;
                Some((start, self.end_date.unwrap_or(start)))
            }
            DateField::EndDate => self.end_date.map(|d| (d, d)),
            DateField::LastActivity | DateField::UpdatedAt => {
                self.last_activity.map(|d| (d, d))
            }
            _ => None,
        }
    }

    fn sort_key(&self, field: &str) -> SortKey {
        match field {
            "value" => number_key(self.value),
            "startDate" => date_key(self.start_date),
            "endDate" => date_key(self.end_date),
            "status" => text_key(self.status.as_deref()),
            "lastActivity" => date_key(self.last_activity),
            _ => text_key(Some(&self.name)),
        }
    }

    fn snippet(&self) -> Option<String> {
        self.notes
            .as_deref()
            .map(|n| truncate_snippet(n, SNIPPET_CHARS))
            .or_else(|| self.organization.clone())
    }
}

/// A sales lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    /// Identifier.
    pub id: String,
    /// Lead name (person or deal).
    pub name: String,
    /// Prospect organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Status (new, contacted, qualified, proposal, won, lost).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Acquisition channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Priority (low, medium, high).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Estimated deal value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_value: Option<f64>,
    /// Last contact date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_contact: Option<NaiveDate>,
    /// Planned follow-up date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_follow_up: Option<NaiveDate>,
    /// Notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Lead {
    /// Returns `true` while the lead is still in the pipeline.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !matches!(
            self.status.as_deref().map(str::to_lowercase).as_deref(),
            Some("won" | "lost" | "closed")
        )
    }
}

impl Record for Lead {
    const ENTITY: EntityType = EntityType::Leads;

    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn priority(&self) -> Option<&str> {
        self.priority.as_deref()
    }

    fn category(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn search_fields(&self) -> Vec<&str> {
        [
            Some(self.name.as_str()),
            self.organization.as_deref(),
            self.email.as_deref(),
            self.source.as_deref(),
            self.notes.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn title_fields(&self) -> Vec<&str> {
        [Some(self.name.as_str()), self.organization.as_deref()]
            .into_iter()
            .flatten()
            .collect()
    }

    fn date_span(&self, field: DateField) -> Option<(NaiveDate, NaiveDate)> {
        let date = match field {
            DateField::DueDate => self.next_follow_up,
            DateField::LastActivity | DateField::UpdatedAt => self.last_contact,
            _ => None,
        }?;
        Some((date, date))
    }

    fn sort_key(&self, field: &str) -> SortKey {
        match field {
            "value" | "estimatedValue" => number_key(self.estimated_value),
            "priority" => self
                .priority
                .as_deref()
                .map_or(SortKey::Missing, |p| SortKey::Rank(priority_rank(p))),
            "status" => text_key(self.status.as_deref()),
            "lastContact" | "lastActivity" => date_key(self.last_contact),
            "nextFollowUp" => date_key(self.next_follow_up),
            _ => text_key(Some(&self.name)),
        }
    }

    fn snippet(&self) -> Option<String> {
        self.notes
            .as_deref()
            .map(|n| truncate_snippet(n, SNIPPET_CHARS))
            .or_else(|| self.organization.clone())
    }
}
