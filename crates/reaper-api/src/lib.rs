//! Shared domain types for tag-reaper
//!
//! This crate defines the vocabulary every other crate speaks:
//! - Resources, resource kinds, actions and tag filters
//! - Notification schedules (always ordered by descending lead time)
//! - Tag changes (old/new pairs written back to resources)
//! - Classifications and notices
//! - Message templates

mod events;
mod schedule;
mod templates;
mod types;

pub use events::*;
pub use schedule::*;
pub use templates::*;
pub use types::*;
