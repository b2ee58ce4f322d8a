//! Provider backends for tag-reaper
//!
//! Provides:
//! - A JSON inventory file standing in for a cloud account (offline and
//!   simulated runs)
//! - A Slack-compatible chat notifier
//! - A log-only notifier

mod inventory;
mod log_notifier;
mod slack;

pub use inventory::*;
pub use log_notifier::*;
pub use slack::*;
