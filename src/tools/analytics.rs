//! Composite scoring tools: event risk, workload, staleness, engagement.
//!
//! Each tool sums weighted signals into a bounded integer score and
//! buckets it with fixed thresholds.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::core::{Contact, EntityType, Event, Lead, Partnership, Task};
use crate::data::{DataSource, collect_pages};
use crate::error::ToolError;

use super::ToolOutput;
use super::params::{
    EngagementParams, RiskParams, StaleParams, WorkloadParams, effective_days, effective_limit,
    window_end,
};
use super::result::{
    EngagementScore, Level, RiskAssessment, StaleItem, Staleness, ToolData, WorkloadEntry,
    WorkloadStatus,
};

const DEFAULT_RISK_WINDOW_DAYS: u32 = 30;
const DEFAULT_STALE_DAYS: u32 = 30;

// Risk weights.
const RISK_OVERDUE_EACH: u32 = 15;
const RISK_OVERDUE_CAP: u32 = 45;
const RISK_BLOCKED_EACH: u32 = 10;
const RISK_BLOCKED_CAP: u32 = 30;
const RISK_MOSTLY_INCOMPLETE: u32 = 20;
const RISK_IMMINENT_PLANNING: u32 = 25;
const RISK_MISSING_FIELD: u32 = 5;
const RISK_HIGH: u8 = 60;
const RISK_MEDIUM: u8 = 30;

// Workload thresholds.
const WORKLOAD_OVERLOADED: u32 = 15;
const WORKLOAD_BUSY: u32 = 8;

// Engagement thresholds.
const ENGAGEMENT_HIGH: u8 = 70;
const ENGAGEMENT_MEDIUM: u8 = 40;

fn clamp_score(raw: u32) -> u8 {
    u8::try_from(raw.min(100)).unwrap_or(100)
}

const fn bucket(score: u8, high: u8, medium: u8) -> Level {
    if score >= high {
        Level::High
    } else if score >= medium {
        Level::Medium
    } else {
        Level::Low
    }
}

/// Scores one event against its linked tasks.
fn assess(event: &Event, tasks: &[&Task], today: NaiveDate) -> RiskAssessment {
    let mut raw = 0;
    let mut factors = Vec::new();

    let overdue = u32::try_from(tasks.iter().filter(|t| t.is_overdue(today)).count())
        .unwrap_or(u32::MAX);
    if overdue > 0 {
        raw += (overdue.saturating_mul(RISK_OVERDUE_EACH)).min(RISK_OVERDUE_CAP);
        factors.push(format!("{overdue} overdue tasks"));
    }

    let blocked =
        u32::try_from(tasks.iter().filter(|t| t.is_blocked()).count()).unwrap_or(u32::MAX);
    if blocked > 0 {
        raw += (blocked.saturating_mul(RISK_BLOCKED_EACH)).min(RISK_BLOCKED_CAP);
        factors.push(format!("{blocked} blocked tasks"));
    }

    let open = tasks.iter().filter(|t| !t.is_closed()).count();
    if !tasks.is_empty() && open * 2 > tasks.len() {
        raw += RISK_MOSTLY_INCOMPLETE;
        factors.push(format!("{open} of {} tasks incomplete", tasks.len()));
    }

    let days_until = (event.start_date - today).num_days();
    let planning = event
        .status
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case("planning"));
    if (0..=7).contains(&days_until) && planning {
        raw += RISK_IMMINENT_PLANNING;
        factors.push(format!("starts in {days_until} days while still planning"));
    }

    if event.location.as_deref().is_none_or(|l| l.trim().is_empty()) {
        raw += RISK_MISSING_FIELD;
        factors.push("no location".to_string());
    }
    if event.budget.is_none() {
        raw += RISK_MISSING_FIELD;
        factors.push("no budget".to_string());
    }

    let score = clamp_score(raw);
    RiskAssessment {
        event_id: event.id.clone(),
        title: event.title.clone(),
        start_date: event.start_date,
        score,
        level: bucket(score, RISK_HIGH, RISK_MEDIUM),
        factors,
    }
}

/// `assess_event_risk`: one event, or every event starting within `days`.
pub async fn event_risk(
    source: &dyn DataSource,
    params: &RiskParams,
    today: NaiveDate,
) -> Result<ToolOutput, ToolError> {
    let events = source.list_events().await?;
    let tasks = source.list_tasks().await?;

    let targets: Vec<&Event> = if let Some(id) = params.event_id.as_deref() {
        let event = events
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| ToolError::NotFound(format!("event {id}")))?;
        vec![event]
    } else {
        let horizon = window_end(
            today,
            effective_days(params.days, DEFAULT_RISK_WINDOW_DAYS),
        )?;
        events
            .iter()
            .filter(|e| e.last_day() >= today && e.start_date <= horizon)
            .collect()
    };

    let mut assessments: Vec<RiskAssessment> = targets
        .into_iter()
        .map(|event| {
            let linked: Vec<&Task> = tasks
                .iter()
                .filter(|t| t.event_id.as_deref() == Some(event.id.as_str()))
                .collect();
            assess(event, &linked, today)
        })
        .collect();
    assessments.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.start_date.cmp(&b.start_date))
    });
    assessments.truncate(effective_limit(params.limit));

    let high = assessments.iter().filter(|a| a.level == Level::High).count();
    let summary = format!("Assessed {} events, {high} at high risk", assessments.len());
    Ok(ToolOutput::new(ToolData::Risk(assessments), summary))
}

#[derive(Default)]
struct Load {
    open: usize,
    high: usize,
    overdue: usize,
}

fn workload_status(score: u32) -> WorkloadStatus {
    if score >= WORKLOAD_OVERLOADED {
        WorkloadStatus::Overloaded
    } else if score >= WORKLOAD_BUSY {
        WorkloadStatus::Busy
    } else {
        WorkloadStatus::Available
    }
}

/// `analyze_workload`: weighted open-task load per assignee.
pub async fn workload(
    source: &dyn DataSource,
    params: &WorkloadParams,
    today: NaiveDate,
) -> Result<ToolOutput, ToolError> {
    let matches = |value: Option<&str>, wanted: Option<&String>| {
        wanted.is_none_or(|w| value.is_some_and(|v| v.eq_ignore_ascii_case(w)))
    };

    let mut loads: BTreeMap<String, Load> = BTreeMap::new();
    for task in source.list_tasks().await? {
        if task.is_closed()
            || !matches(task.department.as_deref(), params.department.as_ref())
            || !matches(task.assignee.as_deref(), params.assignee.as_ref())
        {
            continue;
        }
        let name = task
            .assignee
            .clone()
            .unwrap_or_else(|| "Unassigned".to_string());
        let load = loads.entry(name).or_default();
        load.open += 1;
        if task.is_high_priority() {
            load.high += 1;
        }
        if task.is_overdue(today) {
            load.overdue += 1;
        }
    }

    let mut entries: Vec<WorkloadEntry> = loads
        .into_iter()
        .map(|(assignee, load)| {
            let score = u32::try_from(load.open + 2 * load.high + 3 * load.overdue)
                .unwrap_or(u32::MAX);
            WorkloadEntry {
                assignee,
                open_tasks: load.open,
                high_priority: load.high,
                overdue: load.overdue,
                score,
                status: workload_status(score),
            }
        })
        .collect();
    entries.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.assignee.cmp(&b.assignee)));

    let overloaded = entries
        .iter()
        .filter(|e| e.status == WorkloadStatus::Overloaded)
        .count();
    let summary = format!(
        "{} assignees with open tasks, {overloaded} overloaded",
        entries.len()
    );
    Ok(ToolOutput::new(ToolData::Workload(entries), summary))
}

/// Relationship activity projected from contacts, partnerships, and leads.
struct Activity {
    entity_type: EntityType,
    id: String,
    name: String,
    last: Option<NaiveDate>,
    status: Option<String>,
    value: Option<f64>,
    has_email: bool,
    has_phone: bool,
}

fn non_empty(value: Option<&String>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

impl From<Contact> for Activity {
    fn from(c: Contact) -> Self {
        Self {
            entity_type: EntityType::Contacts,
            has_email: non_empty(c.email.as_ref()),
            has_phone: non_empty(c.phone.as_ref()),
            id: c.id,
            name: c.name,
            last: c.last_contacted,
            status: None,
            value: None,
        }
    }
}

impl From<Partnership> for Activity {
    fn from(p: Partnership) -> Self {
        Self {
            entity_type: EntityType::Partnerships,
            id: p.id,
            name: p.name,
            last: p.last_activity,
            status: p.status,
            value: p.value,
            has_email: false,
            has_phone: false,
        }
    }
}

impl From<Lead> for Activity {
    fn from(l: Lead) -> Self {
        Self {
            entity_type: EntityType::Leads,
            has_email: non_empty(l.email.as_ref()),
            has_phone: non_empty(l.phone.as_ref()),
            id: l.id,
            name: l.name,
            last: l.last_contact,
            status: l.status,
            value: l.estimated_value,
        }
    }
}

async fn relationship_activity(
    source: &dyn DataSource,
    entity_type: Option<EntityType>,
) -> Result<Vec<Activity>, ToolError> {
    let wanted = |t: EntityType| entity_type.is_none_or(|e| e == t);
    if let Some(other) = entity_type
        && !matches!(
            other,
            EntityType::Contacts | EntityType::Partnerships | EntityType::Leads
        )
    {
        return Err(ToolError::InvalidArgument(format!(
            "{other} has no relationship activity; use contacts, partnerships or leads"
        )));
    }

    let mut out = Vec::new();
    if wanted(EntityType::Contacts) {
        let contacts = collect_pages(|page| source.list_contacts(page)).await?;
        out.extend(contacts.into_iter().map(Activity::from));
    }
    if wanted(EntityType::Partnerships) {
        let partnerships = collect_pages(|page| source.list_partnerships(page)).await?;
        out.extend(partnerships.into_iter().map(Activity::from));
    }
    if wanted(EntityType::Leads) {
        out.extend(source.list_leads().await?.into_iter().map(Activity::from));
    }
    Ok(out)
}

/// Bands scale with the threshold: aging from 1x, stale from 2x, critical
/// from 3x or when there is no activity at all.
fn staleness(days_inactive: Option<i64>, threshold: i64) -> Staleness {
    let step = threshold.max(1);
    match days_inactive {
        None => Staleness::Critical,
        Some(d) if d >= step * 3 => Staleness::Critical,
        Some(d) if d >= step * 2 => Staleness::Stale,
        Some(_) => Staleness::Aging,
    }
}

/// `find_stale_items`: relationships with no activity for `days` or more.
pub async fn stale_items(
    source: &dyn DataSource,
    params: &StaleParams,
    today: NaiveDate,
) -> Result<ToolOutput, ToolError> {
    let threshold = i64::from(effective_days(params.days, DEFAULT_STALE_DAYS));
    let activity = relationship_activity(source, params.entity_type).await?;

    let mut items: Vec<StaleItem> = activity
        .into_iter()
        .filter_map(|a| {
            let days_inactive = a.last.map(|d| (today - d).num_days());
            if days_inactive.is_some_and(|d| d < threshold) {
                return None;
            }
            Some(StaleItem {
                entity_type: a.entity_type,
                id: a.id,
                name: a.name,
                last_activity: a.last,
                days_inactive,
                status: staleness(days_inactive, threshold),
            })
        })
        .collect();
    items.sort_by(|a, b| {
        b.status
            .cmp(&a.status)
            .then_with(|| match (a.days_inactive, b.days_inactive) {
                (None, None) => std::cmp::Ordering::Equal,
                (None, Some(_)) => std::cmp::Ordering::Less,
                (Some(_), None) => std::cmp::Ordering::Greater,
                (Some(x), Some(y)) => y.cmp(&x),
            })
            .then_with(|| a.name.cmp(&b.name))
    });

    let total = items.len();
    let critical = items
        .iter()
        .filter(|i| i.status == Staleness::Critical)
        .count();
    items.truncate(effective_limit(params.limit));
    let summary =
        format!("{total} items without activity for {threshold}+ days ({critical} critical)");
    Ok(ToolOutput::new(ToolData::Staleness(items), summary))
}

fn engagement(activity: &Activity, today: NaiveDate) -> u8 {
    let mut raw = 0;
    if let Some(last) = activity.last {
        let days = (today - last).num_days();
        raw += match days {
            ..=7 => 40,
            8..=30 => 25,
            31..=90 => 10,
            _ => 0,
        };
    }
    if activity.status.as_deref().is_some_and(|s| {
        ["active", "qualified", "won"]
            .iter()
            .any(|good| s.eq_ignore_ascii_case(good))
    }) {
        raw += 30;
    }
    match activity.value {
        Some(v) if v > 50_000.0 => raw += 20,
        Some(v) if v > 10_000.0 => raw += 10,
        _ => {}
    }
    if activity.has_email {
        raw += 5;
    }
    if activity.has_phone {
        raw += 5;
    }
    clamp_score(raw)
}

/// `analyze_engagement`: relationship health scores, strongest first.
pub async fn engagement_scores(
    source: &dyn DataSource,
    params: &EngagementParams,
    today: NaiveDate,
) -> Result<ToolOutput, ToolError> {
    let activity = relationship_activity(source, params.entity_type).await?;

    let mut scores: Vec<EngagementScore> = activity
        .into_iter()
        .map(|a| {
            let score = engagement(&a, today);
            EngagementScore {
                entity_type: a.entity_type,
                id: a.id,
                name: a.name,
                score,
                level: bucket(score, ENGAGEMENT_HIGH, ENGAGEMENT_MEDIUM),
            }
        })
        .collect();
    scores.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));

    let total = scores.len();
    let high = scores.iter().filter(|s| s.level == Level::High).count();
    scores.truncate(effective_limit(params.limit));
    let summary = format!("Scored {total} relationships, {high} highly engaged");
    Ok(ToolOutput::new(ToolData::Engagement(scores), summary))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Duration;
    use test_case::test_case;

    use super::*;
    use crate::test_support::{TODAY, fixture_source};

    fn event(status: &str, start: NaiveDate) -> Event {
        Event {
            id: "e1".to_string(),
            title: "Expo".to_string(),
            description: None,
            category: None,
            status: Some(status.to_string()),
            location: None,
            organizer: None,
            start_date: start,
            end_date: None,
            expected_attendees: None,
            budget: None,
        }
    }

    fn task(status: &str, due: NaiveDate) -> Task {
        Task {
            id: format!("t-{status}-{due}"),
            title: "t".to_string(),
            description: None,
            status: Some(status.to_string()),
            priority: Some("high".to_string()),
            due_date: Some(due),
            assignee: Some("Sara".to_string()),
            department: None,
            event_id: Some("e1".to_string()),
            event_title: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_risk_caps_and_clamps() {
        let past = TODAY - Duration::days(3);
        let tasks: Vec<Task> = (0..5)
            .map(|i| task("blocked", past - Duration::days(i)))
            .collect();
        let refs: Vec<&Task> = tasks.iter().collect();
        let soon = TODAY + Duration::days(3);
        let assessment = assess(&event("planning", soon), &refs, TODAY);
        // 45 (overdue cap) + 30 (blocked cap) + 20 + 25 + 5 + 5 = 130 -> 100
        assert_eq!(assessment.score, 100);
        assert_eq!(assessment.level, Level::High);
    }

    #[test]
    fn test_risk_medium_bucket() {
        let future = TODAY + Duration::days(20);
        let tasks = [task("blocked", future), task("done", future)];
        let refs: Vec<&Task> = tasks.iter().collect();
        let mut e = event("confirmed", TODAY + Duration::days(25));
        e.location = Some("Hall 1".to_string());
        // 10 (blocked) + 5 (no budget) = 15, then half incomplete is not > 50%.
        let assessment = assess(&e, &refs, TODAY);
        assert_eq!(assessment.score, 15);
        assert_eq!(assessment.level, Level::Low);

        let tasks = [task("blocked", future), task("todo", future), task("todo", future)];
        let refs: Vec<&Task> = tasks.iter().collect();
        // 10 + 20 + 5 = 35
        let assessment = assess(&e, &refs, TODAY);
        assert_eq!(assessment.score, 35);
        assert_eq!(assessment.level, Level::Medium);
    }

    #[test_case(0 => WorkloadStatus::Available)]
    #[test_case(7 => WorkloadStatus::Available)]
    #[test_case(8 => WorkloadStatus::Busy)]
    #[test_case(14 => WorkloadStatus::Busy)]
    #[test_case(15 => WorkloadStatus::Overloaded)]
    fn test_workload_buckets(score: u32) -> WorkloadStatus {
        workload_status(score)
    }

    #[test_case(None, 30 => Staleness::Critical ; "never")]
    #[test_case(Some(90), 30 => Staleness::Critical ; "ninety")]
    #[test_case(Some(75), 30 => Staleness::Stale ; "seventy five")]
    #[test_case(Some(30), 30 => Staleness::Aging ; "thirty")]
    #[test_case(Some(8), 7 => Staleness::Aging ; "week threshold aging")]
    #[test_case(Some(15), 7 => Staleness::Stale ; "week threshold stale")]
    #[test_case(Some(21), 7 => Staleness::Critical ; "week threshold critical")]
    #[test_case(Some(0), 0 => Staleness::Aging ; "zero threshold")]
    fn test_staleness_buckets(days: Option<i64>, threshold: i64) -> Staleness {
        staleness(days, threshold)
    }

    #[test]
    fn test_engagement_score_components() {
        let activity = Activity {
            entity_type: EntityType::Leads,
            id: "l1".to_string(),
            name: "Lead".to_string(),
            last: Some(TODAY - Duration::days(5)),
            status: Some("Qualified".to_string()),
            value: Some(60_000.0),
            has_email: true,
            has_phone: true,
        };
        // 40 + 30 + 20 + 5 + 5
        assert_eq!(engagement(&activity, TODAY), 100);

        let quiet = Activity {
            last: Some(TODAY - Duration::days(45)),
            status: Some("new".to_string()),
            value: Some(20_000.0),
            has_phone: false,
            ..activity
        };
        // 10 + 10 + 5
        assert_eq!(engagement(&quiet, TODAY), 25);
    }

    #[tokio::test]
    async fn test_workload_groups_open_tasks() {
        let source = fixture_source();
        let out = workload(&source, &WorkloadParams::default(), TODAY)
            .await
            .unwrap_or_else(|e| panic!("workload failed: {e}"));
        let ToolData::Workload(entries) = out.data else {
            panic!("expected workload");
        };
        assert!(!entries.is_empty());
        assert!(entries.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_stale_items_excludes_recent() {
        let source = fixture_source();
        let params = StaleParams {
            entity_type: Some(EntityType::Contacts),
            days: Some(30),
            limit: Some(50),
        };
        let out = stale_items(&source, &params, TODAY)
            .await
            .unwrap_or_else(|e| panic!("stale failed: {e}"));
        let ToolData::Staleness(items) = out.data else {
            panic!("expected staleness");
        };
        assert!(items.iter().all(|i| i.days_inactive.is_none_or(|d| d >= 30)));
        assert!(items.iter().all(|i| i.entity_type == EntityType::Contacts));
    }

    #[tokio::test]
    async fn test_stale_items_short_threshold_uses_scaled_bands() {
        let source = fixture_source();
        let params = StaleParams {
            entity_type: None,
            days: Some(7),
            limit: Some(50),
        };
        let out = stale_items(&source, &params, TODAY)
            .await
            .unwrap_or_else(|e| panic!("stale failed: {e}"));
        assert!(out.summary.contains("7+ days"));
        let ToolData::Staleness(items) = out.data else {
            panic!("expected staleness");
        };
        assert!(!items.is_empty());
        for item in &items {
            let expected = match item.days_inactive {
                Some(d) if d < 14 => Staleness::Aging,
                Some(d) if d < 21 => Staleness::Stale,
                _ => Staleness::Critical,
            };
            assert_eq!(item.status, expected, "{}", item.id);
        }
    }

    #[tokio::test]
    async fn test_huge_windows_are_capped() {
        let source = fixture_source();
        let risk = RiskParams {
            event_id: None,
            days: Some(u32::MAX),
            limit: Some(50),
        };
        assert!(event_risk(&source, &risk, TODAY).await.is_ok());

        let stale = StaleParams {
            entity_type: None,
            days: Some(u32::MAX),
            limit: Some(50),
        };
        let out = stale_items(&source, &stale, TODAY)
            .await
            .unwrap_or_else(|e| panic!("stale failed: {e}"));
        assert!(out.summary.contains("3650+ days"));
    }

    #[tokio::test]
    async fn test_stale_items_rejects_events() {
        let source = fixture_source();
        let params = StaleParams {
            entity_type: Some(EntityType::Events),
            ..StaleParams::default()
        };
        let result = stale_items(&source, &params, TODAY).await;
        assert!(matches!(result, Err(ToolError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_event_risk_unknown_event() {
        let source = fixture_source();
        let params = RiskParams {
            event_id: Some("nope".to_string()),
            ..RiskParams::default()
        };
        let result = event_risk(&source, &params, TODAY).await;
        assert!(matches!(result, Err(ToolError::NotFound(_))));
    }
}
