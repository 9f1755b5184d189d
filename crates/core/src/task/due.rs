//! Due-date classification and reminders

use chrono::{Local, NaiveDate};
use std::fmt;

/// Tasks due within this many days (and not today) count as due soon
pub const DUE_SOON_DAYS: i64 = 3;

/// How a task's deadline relates to a reference date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueStatus {
    Overdue,
    DueToday,
    DueSoon,
    Ok,
}

impl DueStatus {
    /// Classify `deadline` relative to `today`
    pub fn classify(deadline: NaiveDate, today: NaiveDate) -> Self {
        let days = (deadline - today).num_days();
        if days < 0 {
            Self::Overdue
        } else if days == 0 {
            Self::DueToday
        } else if days <= DUE_SOON_DAYS {
            Self::DueSoon
        } else {
            Self::Ok
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Overdue => "OVERDUE",
            Self::DueToday => "DUE TODAY",
            Self::DueSoon => "DUE SOON",
            Self::Ok => "",
        }
    }
}

impl fmt::Display for DueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderWhen {
    Today,
    Tomorrow,
}

/// A one-time due notice produced by `TaskStore::check_reminders`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub name: String,
    pub deadline: NaiveDate,
    pub when: ReminderWhen,
}

impl fmt::Display for Reminder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let when = match self.when {
            ReminderWhen::Today => "today",
            ReminderWhen::Tomorrow => "tomorrow",
        };
        write!(f, "'{}' is due {} ({})", self.name, when, self.deadline)
    }
}

/// Source of the current date
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to a single date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
