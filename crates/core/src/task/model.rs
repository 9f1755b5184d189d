//! Task model definitions

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Identifier assigned by the store when a task is added
pub type TaskId = u64;

/// Date format used for deadlines, both on input and on disk
pub const DEADLINE_FORMAT: &str = "%Y-%m-%d";

/// Task priority level
///
/// Values read from disk that are not one of the three known levels are kept
/// verbatim as `Unrecognized` so that saving does not lose them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    High,
    Medium,
    Low,
    Unrecognized(String),
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

impl Priority {
    /// Sort rank: High < Medium < Low < anything else
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
            Self::Unrecognized(_) => 3,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Unrecognized(raw) => raw,
        }
    }

    fn known(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "high" | "h" => Some(Self::High),
            "medium" | "m" => Some(Self::Medium),
            "low" | "l" => Some(Self::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse for user input; unknown levels are rejected
impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::known(s).ok_or_else(|| {
            Error::InvalidInput(format!(
                "Unknown priority '{}', expected High, Medium or Low",
                s.trim()
            ))
        })
    }
}

/// Stored values map to a level only when they are an exact level name
impl From<String> for Priority {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "High" => Self::High,
            "Medium" => Self::Medium,
            "Low" => Self::Low,
            _ => Self::Unrecognized(raw),
        }
    }
}

impl From<Priority> for String {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// Parse a deadline in `YYYY-MM-DD` form
pub fn parse_deadline(text: &str) -> Result<NaiveDate> {
    let trimmed = text.trim();
    NaiveDate::parse_from_str(trimmed, DEADLINE_FORMAT)
        .map_err(|_| Error::InvalidInput(format!("Invalid date '{}', use YYYY-MM-DD", trimmed)))
}

/// A task in the to-do list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: TaskId,
    pub name: String,
    pub deadline: NaiveDate,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "Local::now")]
    pub created: DateTime<Local>,
}

impl Task {
    /// Key used for duplicate detection and reminder bookkeeping
    pub fn key(&self) -> ReminderKey {
        ReminderKey(self.name.clone(), self.deadline)
    }

    pub fn matches(&self, keyword_lower: &str) -> bool {
        self.name.to_lowercase().contains(keyword_lower)
            || self.notes.to_lowercase().contains(keyword_lower)
    }
}

/// (name, deadline) pair, persisted as a two-element array
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReminderKey(pub String, pub NaiveDate);

/// Unvalidated task fields as entered by the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub name: String,
    pub deadline: String,
    pub priority: Priority,
    pub notes: String,
}

impl TaskDraft {
    /// Create a draft with the given name and deadline text
    pub fn new(name: impl Into<String>, deadline: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deadline: deadline.into(),
            ..Self::default()
        }
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Check the name and date, returning the trimmed name and parsed deadline
    pub fn validate(&self) -> Result<(String, NaiveDate)> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Task name is required".to_string()));
        }
        let deadline = parse_deadline(&self.deadline)?;
        Ok((name.to_string(), deadline))
    }
}

impl From<&Task> for TaskDraft {
    fn from(task: &Task) -> Self {
        Self {
            name: task.name.clone(),
            deadline: task.deadline.format(DEADLINE_FORMAT).to_string(),
            priority: task.priority.clone(),
            notes: task.notes.clone(),
        }
    }
}
