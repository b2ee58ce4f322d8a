//! Shared utilities for tag-reaper
//!
//! This crate provides:
//! - ID types (ResourceId, Region, RunId)
//! - Calendar date helpers (ISO parsing, tag values, day arithmetic)
//! - Error types
//! - Default paths for the config file and the audit store

mod error;
mod ids;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
