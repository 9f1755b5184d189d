//! File-backed task store
//!
//! Holds the task list in memory and rewrites the whole JSON document
//! after every mutation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::due::{Reminder, ReminderWhen};
use super::legacy;
use super::model::{ReminderKey, Task, TaskDraft, TaskId};
use crate::{Error, Result};

/// Version written to the `version` field of the store document
pub const SCHEMA_VERSION: u32 = 1;

/// Ordering for `TaskStore::sorted`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Deadline,
    Priority,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deadline => "deadline",
            Self::Priority => "priority",
        }
    }
}

impl FromStr for SortMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deadline" => Ok(Self::Deadline),
            "priority" => Ok(Self::Priority),
            other => Err(Error::InvalidInput(format!("Unknown sort mode: {}", other))),
        }
    }
}

/// Result of reading the store file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No file yet
    Missing,
    Loaded { tasks: usize },
    /// File existed but could not be used; the store is now empty
    Reset { reason: String },
}

/// On-disk document and in-memory state
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    next_id: TaskId,
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    reminded: BTreeSet<ReminderKey>,
}

impl StoreState {
    fn empty() -> Self {
        Self {
            version: SCHEMA_VERSION,
            next_id: 1,
            ..Self::default()
        }
    }

    /// Bring an older or hand-edited document up to the current schema
    fn migrate(&mut self) {
        if self.version > SCHEMA_VERSION {
            warn!(
                "Store document version {} is newer than supported {}",
                self.version, SCHEMA_VERSION
            );
        }

        // Ids must be unique, non-zero and leave room for the next one
        let mut seen = HashSet::new();
        let ids_usable = self.next_id < TaskId::MAX
            && self
                .tasks
                .iter()
                .all(|t| t.id != 0 && t.id != TaskId::MAX && seen.insert(t.id));
        if !ids_usable {
            debug!("Re-assigning task ids for {} tasks", self.tasks.len());
            for (index, task) in self.tasks.iter_mut().enumerate() {
                task.id = index as TaskId + 1;
            }
            self.next_id = 0;
        }

        let max_id = self.tasks.iter().map(|t| t.id).max().unwrap_or(0);
        self.next_id = self.next_id.max(max_id + 1);
        self.version = SCHEMA_VERSION;
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    fn find_duplicate(&self, name: &str, deadline: NaiveDate, except: Option<TaskId>) -> bool {
        self.tasks
            .iter()
            .any(|t| Some(t.id) != except && t.name == name && t.deadline == deadline)
    }

    fn insert(&mut self, draft: TaskDraft) -> Result<Task> {
        let (name, deadline) = draft.validate()?;
        if self.find_duplicate(&name, deadline, None) {
            return Err(Error::Duplicate {
                name,
                deadline: deadline.to_string(),
            });
        }

        let next_id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| Error::Storage("Task ids exhausted".to_string()))?;

        let task = Task {
            id: self.next_id,
            name,
            deadline,
            priority: draft.priority,
            notes: draft.notes,
            created: chrono::Local::now(),
        };
        self.next_id = next_id;
        self.tasks.push(task.clone());
        Ok(task)
    }

    fn replace(&mut self, id: TaskId, draft: TaskDraft) -> Result<Task> {
        let (name, deadline) = draft.validate()?;
        let index = self.position(id).ok_or(Error::TaskNotFound(id))?;
        if self.find_duplicate(&name, deadline, Some(id)) {
            return Err(Error::Duplicate {
                name,
                deadline: deadline.to_string(),
            });
        }

        let task = &mut self.tasks[index];
        task.name = name;
        task.deadline = deadline;
        task.priority = draft.priority;
        task.notes = draft.notes;
        Ok(task.clone())
    }

    fn remove(&mut self, id: TaskId) -> Result<Task> {
        let index = self.position(id).ok_or(Error::TaskNotFound(id))?;
        Ok(self.tasks.remove(index))
    }

    fn due_reminders(&mut self, today: NaiveDate) -> Vec<Reminder> {
        let tomorrow = today.succ_opt();
        let mut reminders = Vec::new();

        for task in &self.tasks {
            let when = if task.deadline == today {
                ReminderWhen::Today
            } else if Some(task.deadline) == tomorrow {
                ReminderWhen::Tomorrow
            } else {
                continue;
            };

            if self.reminded.insert(task.key()) {
                reminders.push(Reminder {
                    name: task.name.clone(),
                    deadline: task.deadline,
                    when,
                });
            }
        }

        reminders
    }
}

/// Task store persisted as a single JSON document
pub struct TaskStore {
    /// Path to the JSON file
    path: PathBuf,
    state: RwLock<StoreState>,
}

impl TaskStore {
    /// Create an empty store bound to `path` without reading it
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: RwLock::new(StoreState::empty()),
        }
    }

    /// Create a store and load whatever is currently on disk
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let store = Self::new(path);
        store.load().await;
        store
    }

    /// Path of the JSON document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace in-memory state with the file contents
    ///
    /// Never fails: a missing file leaves the store empty and an unreadable
    /// or malformed one resets it to empty.
    pub async fn load(&self) -> LoadOutcome {
        let (state, outcome) = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => match serde_json::from_str::<StoreState>(&content) {
                Ok(mut state) => {
                    state.migrate();
                    let tasks = state.tasks.len();
                    (state, LoadOutcome::Loaded { tasks })
                }
                Err(e) => {
                    warn!("Failed to parse task file {}: {}", self.path.display(), e);
                    (
                        StoreState::empty(),
                        LoadOutcome::Reset {
                            reason: e.to_string(),
                        },
                    )
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                (StoreState::empty(), LoadOutcome::Missing)
            }
            Err(e) => {
                warn!("Failed to read task file {}: {}", self.path.display(), e);
                (
                    StoreState::empty(),
                    LoadOutcome::Reset {
                        reason: e.to_string(),
                    },
                )
            }
        };

        debug!("Loaded task file {}: {:?}", self.path.display(), outcome);
        *self.state.write().await = state;
        outcome
    }

    /// Persist the full document, replacing the previous file
    pub async fn save(&self) -> Result<()> {
        let content = {
            let state = self.state.read().await;
            serde_json::to_string_pretty(&*state).map_err(|e| {
                Error::Storage(format!("Failed to serialize tasks: {}", e))
            })?
        };

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    Error::Storage(format!("Failed to create directory: {}", e))
                })?;
            }
        }

        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, content).await.map_err(|e| {
            Error::Storage(format!("Failed to write task file: {}", e))
        })?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(Error::Storage(format!("Failed to replace task file: {}", e)));
        }

        debug!("Saved task file {}", self.path.display());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "tasks.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Validate and append a new task
    pub async fn add(&self, draft: TaskDraft) -> Result<Task> {
        let task = {
            let mut state = self.state.write().await;
            state.insert(draft)?
        };
        info!(id = task.id, "Added task '{}' due {}", task.name, task.deadline);
        self.save().await?;
        Ok(task)
    }

    /// Replace the fields of an existing task, keeping its id and creation time
    pub async fn update(&self, id: TaskId, draft: TaskDraft) -> Result<Task> {
        let task = {
            let mut state = self.state.write().await;
            state.replace(id, draft)?
        };
        info!(id, "Updated task '{}' due {}", task.name, task.deadline);
        self.save().await?;
        Ok(task)
    }

    /// Remove a task, returning it
    pub async fn delete(&self, id: TaskId) -> Result<Task> {
        let task = {
            let mut state = self.state.write().await;
            state.remove(id)?
        };
        info!(id, "Deleted task '{}'", task.name);
        self.save().await?;
        Ok(task)
    }

    pub async fn get(&self, id: TaskId) -> Option<Task> {
        let state = self.state.read().await;
        state.position(id).map(|index| state.tasks[index].clone())
    }

    /// All tasks in insertion order
    pub async fn list(&self) -> Vec<Task> {
        self.state.read().await.tasks.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.tasks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.tasks.is_empty()
    }

    /// Keys that have already produced a reminder
    pub async fn reminded(&self) -> Vec<ReminderKey> {
        self.state.read().await.reminded.iter().cloned().collect()
    }

    /// Case-insensitive substring match on name and notes
    pub async fn search(&self, keyword: &str) -> Result<Vec<Task>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(Error::InvalidInput("Search keyword is required".to_string()));
        }

        let needle = keyword.to_lowercase();
        let state = self.state.read().await;
        Ok(state
            .tasks
            .iter()
            .filter(|t| t.matches(&needle))
            .cloned()
            .collect())
    }

    /// All tasks in the requested order; ties keep insertion order
    pub async fn sorted(&self, mode: SortMode) -> Vec<Task> {
        let mut tasks = self.list().await;
        match mode {
            SortMode::Deadline => tasks.sort_by_key(|t| t.deadline),
            SortMode::Priority => tasks.sort_by_key(|t| t.priority.rank()),
        }
        tasks
    }

    /// Reminders for tasks due today or tomorrow that have not been announced yet
    ///
    /// Announced keys are persisted. If saving fails they are forgotten again
    /// so the same reminders come back on the next check.
    pub async fn check_reminders(&self, today: NaiveDate) -> Result<Vec<Reminder>> {
        let reminders = {
            let mut state = self.state.write().await;
            state.due_reminders(today)
        };
        if reminders.is_empty() {
            return Ok(reminders);
        }

        if let Err(e) = self.save().await {
            let mut state = self.state.write().await;
            for reminder in &reminders {
                state
                    .reminded
                    .remove(&ReminderKey(reminder.name.clone(), reminder.deadline));
            }
            return Err(e);
        }

        debug!("Issued {} reminders for {}", reminders.len(), today);
        Ok(reminders)
    }

    /// Add every valid task from a legacy `name;deadline` file, skipping duplicates
    pub async fn import_legacy(&self, path: impl AsRef<Path>) -> Result<usize> {
        let drafts = legacy::import_legacy(path).await?;
        let mut imported = 0;
        {
            let mut state = self.state.write().await;
            for draft in drafts {
                match state.insert(draft) {
                    Ok(_) => imported += 1,
                    Err(e) => debug!("Skipping legacy task: {}", e),
                }
            }
        }

        if imported > 0 {
            self.save().await?;
        }
        info!("Imported {} legacy tasks", imported);
        Ok(imported)
    }
}
