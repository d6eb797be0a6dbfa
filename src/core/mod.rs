//! Core domain types: entity vocabulary, date ranges, and business records.

pub mod entity;
pub mod records;

pub use entity::{DateField, DateRange, EntityType, Intent, SortBy, SortDirection};
pub use records::{Contact, Event, Lead, Partnership, Record, SortKey, Task, priority_rank};
