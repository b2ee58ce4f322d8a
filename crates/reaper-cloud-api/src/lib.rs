//! Cloud provider and notifier interfaces for tag-reaper
//!
//! This crate defines the boundary between the sweep loop and the outside
//! world: enumerating resources, writing tags, executing actions and
//! delivering messages. It contains no provider code itself; mock
//! implementations live here for tests.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
