//! Error types for tag-reaper

use thiserror::Error;

/// Core error type for tag-reaper operations
#[derive(Debug, Error)]
pub enum ReaperError {
    #[error("Invalid ISO date '{value}', please use yyyy-mm-dd")]
    InvalidDate { value: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ReaperError {
    pub fn invalid_date(value: impl Into<String>) -> Self {
        Self::InvalidDate {
            value: value.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ReaperError>;
