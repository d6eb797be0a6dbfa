//! Read-only data-access boundary.
//!
//! Tools never touch storage directly: they go through [`DataSource`],
//! which mirrors the repository functions of the surrounding application
//! (events, archived events, tasks with joined context, paginated contacts
//! and partnerships, leads).

mod memory;

pub use memory::{MemoryDataSource, Snapshot};

use async_trait::async_trait;

use crate::core::{Contact, Event, Lead, Partnership, Task};
use crate::error::DataError;

/// Page window for paginated listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Records to skip.
    pub offset: usize,
    /// Maximum records to return.
    pub limit: usize,
}

impl Page {
    /// Page size the tools use when scanning a paginated listing in full.
    pub const SCAN_SIZE: usize = 200;

    /// First page of `limit` records.
    #[must_use]
    pub const fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    /// The page after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self {
            offset: self.offset + self.limit,
            limit: self.limit,
        }
    }
}

/// Read functions the tool registry consumes.
///
/// Implementations must be shareable across the concurrent tool fan-out.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Active (non-archived) events.
    async fn list_events(&self) -> Result<Vec<Event>, DataError>;

    /// Events moved to the archive.
    async fn list_archived_events(&self) -> Result<Vec<Event>, DataError>;

    /// Tasks with department and event title joined in.
    async fn list_tasks(&self) -> Result<Vec<Task>, DataError>;

    /// One page of contacts.
    async fn list_contacts(&self, page: Page) -> Result<Vec<Contact>, DataError>;

    /// One page of partnerships.
    async fn list_partnerships(&self, page: Page) -> Result<Vec<Partnership>, DataError>;

    /// All leads.
    async fn list_leads(&self) -> Result<Vec<Lead>, DataError>;
}

/// Drains every page of a paginated listing.
pub(crate) async fn collect_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, DataError>
where
    F: FnMut(Page) -> Fut,
    Fut: std::future::Future<Output = Result<Vec<T>, DataError>>,
{
    let mut page = Page::first(Page::SCAN_SIZE);
    let mut all = Vec::new();
    loop {
        let batch = fetch(page).await?;
        let len = batch.len();
        all.extend(batch);
        if len < page.limit {
            return Ok(all);
        }
        page = page.next();
    }
}
