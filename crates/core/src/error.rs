//! Error types for the core library

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Task not found: {0}")]
    TaskNotFound(u64),

    #[error("Task already exists: {name} due {deadline}")]
    Duplicate { name: String, deadline: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// True for errors raised before any state was touched
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::Duplicate { .. } | Self::TaskNotFound(_)
        )
    }
}
