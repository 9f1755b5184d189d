//! Runtime configuration read from the environment

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DATA_DIR: &str = ".todo-data";
const DEFAULT_REMINDER_SECS: u64 = 60;
const MIN_REMINDER_SECS: u64 = 60;
const MAX_REMINDER_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    /// `None` when reminders are switched off
    pub reminder_interval: Option<Duration>,
}

fn parse_flag(raw: Option<String>, default: bool) -> bool {
    match raw {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        None => default,
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = lookup("TODO_DATA_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let secs = lookup("TODO_REMINDER_INTERVAL_SECS")
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_REMINDER_SECS)
            .clamp(MIN_REMINDER_SECS, MAX_REMINDER_SECS);

        let reminder_interval =
            parse_flag(lookup("TODO_REMINDERS"), true).then_some(Duration::from_secs(secs));

        Self {
            data_dir,
            reminder_interval,
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("tasks.json")
    }

    pub fn legacy_path(&self) -> PathBuf {
        self.data_dir.join("tasks.txt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.data_dir, PathBuf::from(".todo-data"));
        assert_eq!(config.store_path(), PathBuf::from(".todo-data/tasks.json"));
        assert_eq!(config.reminder_interval, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_interval_is_clamped() {
        let config = config_from(&[("TODO_REMINDER_INTERVAL_SECS", "5")]);
        assert_eq!(config.reminder_interval, Some(Duration::from_secs(60)));

        let config = config_from(&[("TODO_REMINDER_INTERVAL_SECS", "3600")]);
        assert_eq!(config.reminder_interval, Some(Duration::from_secs(300)));

        let config = config_from(&[("TODO_REMINDER_INTERVAL_SECS", "120")]);
        assert_eq!(config.reminder_interval, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_reminders_can_be_disabled() {
        let config = config_from(&[("TODO_REMINDERS", "off")]);
        assert_eq!(config.reminder_interval, None);

        let config = config_from(&[("TODO_REMINDERS", "maybe")]);
        assert!(config.reminder_interval.is_some());
    }

    #[test]
    fn test_data_dir_override() {
        let config = config_from(&[("TODO_DATA_DIR", "/tmp/todo")]);
        assert_eq!(config.legacy_path(), PathBuf::from("/tmp/todo/tasks.txt"));
    }
}
