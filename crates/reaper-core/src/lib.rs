//! Lifecycle decision engine and sweep orchestration for tag-reaper
//!
//! This crate is the heart of tag-reaper, containing:
//! - The decision engine (action date + notification history -> classification)
//! - Per-resource planning (tag writes, action, notices)
//! - The sweeper (regions -> kinds -> resources, with dry-run gating)

mod decision;
mod plan;
mod sweep;

pub use decision::*;
pub use plan::*;
pub use sweep::*;
