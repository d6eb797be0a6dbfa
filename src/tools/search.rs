//! Entity search tools.

use crate::core::SortDirection;
use crate::data::{DataSource, collect_pages};
use crate::error::DataError;

use super::ToolOutput;
use super::filter::{Criteria, apply};
use super::params::{
    ContactSearchParams, EventSearchParams, LeadSearchParams, PartnershipSearchParams,
    TaskSearchParams, effective_limit,
};
use super::result::ToolData;

fn found(total: usize, shown: usize, noun: &str) -> String {
    if total > shown {
        format!("Found {total} {noun} (showing {shown})")
    } else {
        format!("Found {total} {noun}")
    }
}

fn event_criteria(params: &EventSearchParams) -> Criteria<'_> {
    Criteria {
        query: params.query.as_deref(),
        date_range: params.date_range,
        status: &params.status,
        category: params.category.as_deref(),
        sort_by: params.sort_by.as_ref(),
        ..Criteria::default()
    }
}

/// `search_events`: active events, earliest first.
pub async fn events(
    source: &dyn DataSource,
    params: &EventSearchParams,
) -> Result<ToolOutput, DataError> {
    let records = source.list_events().await?;
    let out = apply(
        records,
        &event_criteria(params),
        ("startDate", SortDirection::Asc),
        effective_limit(params.limit),
    );
    let summary = found(out.total, out.records.len(), "events");
    Ok(ToolOutput::new(ToolData::Events(out.records), summary))
}

/// `search_archived_events`: past events, most recent first.
pub async fn archived_events(
    source: &dyn DataSource,
    params: &EventSearchParams,
) -> Result<ToolOutput, DataError> {
    let records = source.list_archived_events().await?;
    let out = apply(
        records,
        &event_criteria(params),
        ("startDate", SortDirection::Desc),
        effective_limit(params.limit),
    );
    let summary = found(out.total, out.records.len(), "archived events");
    Ok(ToolOutput::new(ToolData::ArchivedEvents(out.records), summary))
}

/// `search_tasks`: tasks, soonest due first.
pub async fn tasks(
    source: &dyn DataSource,
    params: &TaskSearchParams,
) -> Result<ToolOutput, DataError> {
    let records = source.list_tasks().await?;
    let criteria = Criteria {
        query: params.query.as_deref(),
        date_range: params.date_range,
        status: &params.status,
        priority: &params.priority,
        department: params.department.as_deref(),
        sort_by: params.sort_by.as_ref(),
        ..Criteria::default()
    };
    let out = apply(
        records,
        &criteria,
        ("dueDate", SortDirection::Asc),
        effective_limit(params.limit),
    );
    let summary = found(out.total, out.records.len(), "tasks");
    Ok(ToolOutput::new(ToolData::Tasks(out.records), summary))
}

/// `search_contacts`: contacts by name.
pub async fn contacts(
    source: &dyn DataSource,
    params: &ContactSearchParams,
) -> Result<ToolOutput, DataError> {
    let records = collect_pages(|page| source.list_contacts(page)).await?;
    let criteria = Criteria {
        query: params.query.as_deref(),
        category: params.category.as_deref(),
        sort_by: params.sort_by.as_ref(),
        ..Criteria::default()
    };
    let out = apply(
        records,
        &criteria,
        ("name", SortDirection::Asc),
        effective_limit(params.limit),
    );
    let summary = found(out.total, out.records.len(), "contacts");
    Ok(ToolOutput::new(ToolData::Contacts(out.records), summary))
}

/// `search_partnerships`: partnerships by name.
pub async fn partnerships(
    source: &dyn DataSource,
    params: &PartnershipSearchParams,
) -> Result<ToolOutput, DataError> {
    let records = collect_pages(|page| source.list_partnerships(page)).await?;
    let criteria = Criteria {
        query: params.query.as_deref(),
        date_range: params.date_range,
        status: &params.status,
        sort_by: params.sort_by.as_ref(),
        ..Criteria::default()
    };
    let out = apply(
        records,
        &criteria,
        ("name", SortDirection::Asc),
        effective_limit(params.limit),
    );
    let summary = found(out.total, out.records.len(), "partnerships");
    Ok(ToolOutput::new(ToolData::Partnerships(out.records), summary))
}

/// `search_leads`: leads by name.
pub async fn leads(
    source: &dyn DataSource,
    params: &LeadSearchParams,
) -> Result<ToolOutput, DataError> {
    let records = source.list_leads().await?;
    let criteria = Criteria {
        query: params.query.as_deref(),
        status: &params.status,
        priority: &params.priority,
        sort_by: params.sort_by.as_ref(),
        ..Criteria::default()
    };
    let out = apply(
        records,
        &criteria,
        ("name", SortDirection::Asc),
        effective_limit(params.limit),
    );
    let summary = found(out.total, out.records.len(), "leads");
    Ok(ToolOutput::new(ToolData::Leads(out.records), summary))
}
