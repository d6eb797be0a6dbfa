//! Counting, dashboard, event-detail, and deadline tools.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use crate::core::{DateRange, EntityType, Event, Record, SortDirection, Task};
use crate::data::{DataSource, collect_pages};
use crate::error::ToolError;

use super::ToolOutput;
use super::filter::{Criteria, matches_text, passes_filters, sort_records};
use super::params::{
    CountParams, DeadlineParams, EventDetailParams, effective_days, effective_limit, window_end,
};
use super::result::{CountResult, DashboardSummary, EventDetail, TaskProgress, ToolData};

const DEFAULT_DEADLINE_DAYS: u32 = 7;

fn status_key(status: Option<&str>) -> String {
    status.map_or_else(|| "unknown".to_string(), str::to_lowercase)
}

fn tally<R: Record>(records: &[R], status: &[String], range: Option<DateRange>) -> CountTally {
    let criteria = Criteria {
        status,
        date_range: range,
        ..Criteria::default()
    };
    let mut by_status = BTreeMap::new();
    let mut count = 0;
    for record in records.iter().filter(|r| passes_filters(*r, &criteria)) {
        count += 1;
        *by_status.entry(status_key(record.status())).or_insert(0) += 1;
    }
    CountTally { count, by_status }
}

struct CountTally {
    count: usize,
    by_status: BTreeMap<String, usize>,
}

/// `get_count`: number of records of one type, optionally filtered.
pub async fn count(source: &dyn DataSource, params: &CountParams) -> Result<ToolOutput, ToolError> {
    let status = params.status.as_slice();
    let range = params.date_range;
    let counted = match params.entity_type {
        EntityType::Events => tally(&source.list_events().await?, status, range),
        EntityType::ArchivedEvents => tally(&source.list_archived_events().await?, status, range),
        EntityType::Tasks => tally(&source.list_tasks().await?, status, range),
        EntityType::Contacts => tally(
            &collect_pages(|page| source.list_contacts(page)).await?,
            status,
            range,
        ),
        EntityType::Partnerships => tally(
            &collect_pages(|page| source.list_partnerships(page)).await?,
            status,
            range,
        ),
        EntityType::Leads => tally(&source.list_leads().await?, status, range),
    };

    let summary = if status.is_empty() {
        format!("{} {}", counted.count, params.entity_type)
    } else {
        format!(
            "{} {} with status {}",
            counted.count,
            params.entity_type,
            status.join(" or ")
        )
    };
    Ok(ToolOutput::new(
        ToolData::Count(CountResult {
            entity_type: params.entity_type,
            count: counted.count,
            by_status: counted.by_status,
        }),
        summary,
    ))
}

/// `get_dashboard_summary`: one-shot overview across every entity.
pub async fn dashboard(source: &dyn DataSource, today: NaiveDate) -> Result<ToolOutput, ToolError> {
    let (events, tasks, contacts, partnerships, leads) = tokio::try_join!(
        source.list_events(),
        source.list_tasks(),
        collect_pages(|page| source.list_contacts(page)),
        collect_pages(|page| source.list_partnerships(page)),
        source.list_leads(),
    )?;

    let within = |date: NaiveDate, days: i64| date >= today && date <= today + Duration::days(days);

    let mut tasks_by_status = BTreeMap::new();
    for task in &tasks {
        *tasks_by_status.entry(status_key(task.status.as_deref())).or_insert(0) += 1;
    }

    let open_leads: Vec<_> = leads.iter().filter(|l| l.is_open()).collect();
    let summary = DashboardSummary {
        total_events: events.len(),
        events_next_7_days: events.iter().filter(|e| within(e.start_date, 7)).count(),
        events_next_30_days: events.iter().filter(|e| within(e.start_date, 30)).count(),
        total_tasks: tasks.len(),
        overdue_tasks: tasks.iter().filter(|t| t.is_overdue(today)).count(),
        tasks_due_soon: tasks
            .iter()
            .filter(|t| !t.is_closed() && t.due_date.is_some_and(|d| within(d, 7)))
            .count(),
        tasks_by_status,
        total_contacts: contacts.len(),
        total_partnerships: partnerships.len(),
        active_partnerships: partnerships
            .iter()
            .filter(|p| {
                p.status
                    .as_deref()
                    .is_some_and(|s| s.eq_ignore_ascii_case("active"))
            })
            .count(),
        total_leads: leads.len(),
        open_leads: open_leads.len(),
        pipeline_value: open_leads.iter().filter_map(|l| l.estimated_value).sum(),
    };

    let text = format!(
        "{} events ({} in the next 7 days), {} tasks ({} overdue), {} open leads",
        summary.total_events,
        summary.events_next_7_days,
        summary.total_tasks,
        summary.overdue_tasks,
        summary.open_leads
    );
    Ok(ToolOutput::new(ToolData::Summary(Box::new(summary)), text))
}

/// Completion figures for a set of tasks.
pub(crate) fn progress(tasks: &[Task], today: NaiveDate) -> TaskProgress {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.is_closed()).count();
    let percent_complete = if total == 0 {
        0
    } else {
        u8::try_from(completed * 100 / total).unwrap_or(100)
    };
    TaskProgress {
        total,
        completed,
        overdue: tasks.iter().filter(|t| t.is_overdue(today)).count(),
        blocked: tasks.iter().filter(|t| t.is_blocked()).count(),
        percent_complete,
    }
}

fn find_event<'a>(events: &'a [Event], params: &EventDetailParams) -> Option<&'a Event> {
    if let Some(id) = params.event_id.as_deref() {
        return events.iter().find(|e| e.id == id);
    }
    let title = params.title.as_deref()?.trim();
    let lowered = title.to_lowercase();
    events
        .iter()
        .find(|e| e.title.eq_ignore_ascii_case(title))
        .or_else(|| {
            events
                .iter()
                .find(|e| e.title.to_lowercase().contains(&lowered))
        })
        .or_else(|| events.iter().find(|e| matches_text(*e, title)))
}

/// `get_event_details`: one event with linked tasks and progress.
pub async fn event_details(
    source: &dyn DataSource,
    params: &EventDetailParams,
    today: NaiveDate,
) -> Result<ToolOutput, ToolError> {
    if params.event_id.is_none() && params.title.is_none() {
        return Err(ToolError::NotFound(
            "either eventId or title is required".to_string(),
        ));
    }

    let mut events = source.list_events().await?;
    events.extend(source.list_archived_events().await?);
    let event = find_event(&events, params).cloned().ok_or_else(|| {
        ToolError::NotFound(format!(
            "no event matching {}",
            params
                .event_id
                .as_deref()
                .or(params.title.as_deref())
                .unwrap_or_default()
        ))
    })?;

    let mut tasks: Vec<Task> = source
        .list_tasks()
        .await?
        .into_iter()
        .filter(|t| t.event_id.as_deref() == Some(event.id.as_str()))
        .collect();
    sort_records(&mut tasks, "dueDate", SortDirection::Asc);

    let stats = progress(&tasks, today);
    let days_until_start = (event.start_date - today).num_days();
    let summary = format!(
        "{}: {} linked tasks, {}% complete",
        event.title, stats.total, stats.percent_complete
    );
    Ok(ToolOutput::new(
        ToolData::EventDetail(Box::new(EventDetail {
            event,
            tasks,
            progress: stats,
            days_until_start,
        })),
        summary,
    ))
}

/// `get_upcoming_deadlines`: open tasks due soon (and optionally overdue).
pub async fn upcoming_deadlines(
    source: &dyn DataSource,
    params: &DeadlineParams,
    today: NaiveDate,
) -> Result<ToolOutput, ToolError> {
    let days = effective_days(params.days, DEFAULT_DEADLINE_DAYS);
    let include_overdue = params.include_overdue.unwrap_or(true);
    let horizon = window_end(today, days)?;

    let mut tasks: Vec<Task> = source
        .list_tasks()
        .await?
        .into_iter()
        .filter(|t| !t.is_closed())
        .filter(|t| {
            t.due_date
                .is_some_and(|due| due <= horizon && (include_overdue || due >= today))
        })
        .collect();
    sort_records(&mut tasks, "dueDate", SortDirection::Asc);

    let overdue = tasks.iter().filter(|t| t.is_overdue(today)).count();
    let total = tasks.len();
    tasks.truncate(effective_limit(params.limit));

    let summary = if include_overdue {
        format!("{total} tasks due in the next {days} days ({overdue} overdue)")
    } else {
        format!("{total} tasks due in the next {days} days")
    };
    Ok(ToolOutput::new(ToolData::Tasks(tasks), summary))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::test_support::{TODAY, fixture_source};

    #[tokio::test]
    async fn test_count_pending_partnerships() {
        let source = fixture_source();
        let params = CountParams {
            entity_type: EntityType::Partnerships,
            status: vec!["pending".to_string()],
            date_range: None,
        };
        let out = count(&source, &params)
            .await
            .unwrap_or_else(|e| panic!("count failed: {e}"));
        let ToolData::Count(result) = out.data else {
            panic!("expected count");
        };
        assert_eq!(result.count, 5);
        assert_eq!(result.by_status.get("pending"), Some(&5));
    }

    #[tokio::test]
    async fn test_count_all_partnerships() {
        let source = fixture_source();
        let params = CountParams {
            entity_type: EntityType::Partnerships,
            status: Vec::new(),
            date_range: None,
        };
        let out = count(&source, &params)
            .await
            .unwrap_or_else(|e| panic!("count failed: {e}"));
        let ToolData::Count(result) = out.data else {
            panic!("expected count");
        };
        assert_eq!(result.count, 12);
    }

    #[tokio::test]
    async fn test_dashboard_totals() {
        let source = fixture_source();
        let out = dashboard(&source, TODAY)
            .await
            .unwrap_or_else(|e| panic!("dashboard failed: {e}"));
        let ToolData::Summary(summary) = out.data else {
            panic!("expected summary");
        };
        assert_eq!(summary.total_partnerships, 12);
        assert!(summary.overdue_tasks >= 1);
        assert!(summary.pipeline_value > 0.0);
    }

    #[tokio::test]
    async fn test_event_details_by_title_fragment() {
        let source = fixture_source();
        let params = EventDetailParams {
            event_id: None,
            title: Some("defence".to_string()),
        };
        let out = event_details(&source, &params, TODAY)
            .await
            .unwrap_or_else(|e| panic!("details failed: {e}"));
        let ToolData::EventDetail(detail) = out.data else {
            panic!("expected detail");
        };
        assert_eq!(detail.event.id, "evt-idex");
        assert!(detail.progress.total >= 2);
        assert!(
            detail
                .tasks
                .windows(2)
                .all(|w| w[0].due_date <= w[1].due_date)
        );
    }

    #[tokio::test]
    async fn test_event_details_not_found() {
        let source = fixture_source();
        let params = EventDetailParams {
            event_id: Some("missing".to_string()),
            title: None,
        };
        let result = event_details(&source, &params, TODAY).await;
        assert!(matches!(result, Err(ToolError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_deadlines_exclude_overdue_when_asked() {
        let source = fixture_source();
        let params = DeadlineParams {
            days: Some(30),
            include_overdue: Some(false),
            limit: Some(50),
        };
        let out = upcoming_deadlines(&source, &params, TODAY)
            .await
            .unwrap_or_else(|e| panic!("deadlines failed: {e}"));
        let ToolData::Tasks(tasks) = out.data else {
            panic!("expected tasks");
        };
        assert!(tasks.iter().all(|t| t.due_date.is_some_and(|d| d >= TODAY)));
    }

    #[tokio::test]
    async fn test_deadlines_cap_huge_window() {
        let source = fixture_source();
        let params = DeadlineParams {
            days: Some(u32::MAX),
            include_overdue: Some(true),
            limit: Some(50),
        };
        let out = upcoming_deadlines(&source, &params, TODAY)
            .await
            .unwrap_or_else(|e| panic!("deadlines failed: {e}"));
        assert!(out.summary.contains("next 3650 days"));
    }

    #[test]
    fn test_progress_percent() {
        let task = |status: &str| Task {
            id: status.to_string(),
            title: status.to_string(),
            description: None,
            status: Some(status.to_string()),
            priority: None,
            due_date: None,
            assignee: None,
            department: None,
            event_id: None,
            event_title: None,
            created_at: None,
            updated_at: None,
        };
        let tasks = vec![task("done"), task("todo"), task("blocked"), task("done")];
        let p = progress(&tasks, TODAY);
        assert_eq!(p.completed, 2);
        assert_eq!(p.blocked, 1);
        assert_eq!(p.percent_complete, 50);
    }
}
