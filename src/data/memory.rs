//! In-memory [`DataSource`] backed by a JSON snapshot.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{DataSource, Page};
use crate::core::{Contact, Event, Lead, Partnership, Task};
use crate::error::DataError;

/// Serialized dataset (camelCase JSON).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Active events.
    #[serde(default)]
    pub events: Vec<Event>,
    /// Archived events.
    #[serde(default)]
    pub archived_events: Vec<Event>,
    /// Tasks.
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Contacts.
    #[serde(default)]
    pub contacts: Vec<Contact>,
    /// Partnerships.
    #[serde(default)]
    pub partnerships: Vec<Partnership>,
    /// Leads.
    #[serde(default)]
    pub leads: Vec<Lead>,
}

/// Snapshot-backed data source.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataSource {
    snapshot: Snapshot,
}

impl MemoryDataSource {
    /// Wraps an already-loaded snapshot.
    #[must_use]
    pub const fn from_snapshot(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    /// Loads a snapshot from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Io`] if the file cannot be read and
    /// [`DataError::Parse`] if it is not a valid snapshot.
    pub fn from_path(path: &Path) -> Result<Self, DataError> {
        let raw = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&raw)?;
        debug!(
            path = %path.display(),
            events = snapshot.events.len(),
            tasks = snapshot.tasks.len(),
            contacts = snapshot.contacts.len(),
            partnerships = snapshot.partnerships.len(),
            leads = snapshot.leads.len(),
            "loaded snapshot"
        );
        Ok(Self { snapshot })
    }

    /// Borrows the underlying snapshot.
    #[must_use]
    pub const fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

fn page_of<T: Clone>(items: &[T], page: Page) -> Vec<T> {
    items
        .iter()
        .skip(page.offset)
        .take(page.limit)
        .cloned()
        .collect()
}

#[async_trait]
impl DataSource for MemoryDataSource {
    async fn list_events(&self) -> Result<Vec<Event>, DataError> {
        Ok(self.snapshot.events.clone())
    }

    async fn list_archived_events(&self) -> Result<Vec<Event>, DataError> {
        Ok(self.snapshot.archived_events.clone())
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, DataError> {
        Ok(self.snapshot.tasks.clone())
    }

    async fn list_contacts(&self, page: Page) -> Result<Vec<Contact>, DataError> {
        Ok(page_of(&self.snapshot.contacts, page))
    }

    async fn list_partnerships(&self, page: Page) -> Result<Vec<Partnership>, DataError> {
        Ok(page_of(&self.snapshot.partnerships, page))
    }

    async fn list_leads(&self) -> Result<Vec<Lead>, DataError> {
        Ok(self.snapshot.leads.clone())
    }
}
