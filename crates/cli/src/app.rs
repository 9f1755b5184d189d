//! Interactive menu loop

use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{info, warn};

use todo_core::task::{
    Clock, DueStatus, LoadOutcome, Priority, SortMode, Task, TaskDraft, TaskId, TaskStore,
};
use todo_core::Error;

const PROMPT: &str = "Choose an option: ";
/// Answer to the notes prompt that empties the notes when editing
const CLEAR_NOTES: &str = "-";

/// A single menu choice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Show,
    Add,
    Remove,
    Search,
    Exit,
    Edit,
    ToggleSort,
}

impl Command {
    fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Self::Show),
            "2" => Some(Self::Add),
            "3" => Some(Self::Remove),
            "4" => Some(Self::Search),
            "5" => Some(Self::Exit),
            "6" => Some(Self::Edit),
            "7" => Some(Self::ToggleSort),
            _ => None,
        }
    }
}

/// Message shown for a failed store operation
fn describe(err: &Error) -> String {
    if err.is_validation() {
        err.to_string()
    } else {
        format!("{}. Changes may not be saved.", err)
    }
}

fn render_task(number: usize, task: &Task, today: NaiveDate) -> String {
    let mut line = format!(
        "{}. {} | {} | {}",
        number, task.name, task.deadline, task.priority
    );
    let status = DueStatus::classify(task.deadline, today);
    if status != DueStatus::Ok {
        line.push_str(" | ");
        line.push_str(status.label());
    }
    if !task.notes.is_empty() {
        line.push_str(" | ");
        line.push_str(&task.notes);
    }
    line
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

pub struct App<R, W, C> {
    store: TaskStore,
    input: Lines<R>,
    out: W,
    clock: C,
    sort: SortMode,
    reminder_interval: Option<Duration>,
    /// Task ids in the order of the last listing; display number `n` is index `n - 1`
    shown: Vec<TaskId>,
}

impl<R, W, C> App<R, W, C>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    C: Clock,
{
    pub fn new(
        store: TaskStore,
        input: R,
        out: W,
        clock: C,
        reminder_interval: Option<Duration>,
    ) -> Self {
        Self {
            store,
            input: input.lines(),
            out,
            clock,
            sort: SortMode::default(),
            reminder_interval,
            shown: Vec::new(),
        }
    }

    #[cfg(test)]
    fn into_parts(self) -> (TaskStore, W) {
        (self.store, self.out)
    }

    /// Report how loading went and pull in a legacy file when starting fresh
    pub async fn startup(&mut self, outcome: LoadOutcome, legacy_path: &Path) -> std::io::Result<()> {
        if let LoadOutcome::Reset { reason } = &outcome {
            let message = format!(
                "Could not read saved tasks ({}). Starting with an empty list.",
                reason
            );
            self.say(&message).await?;
        }

        if self.store.is_empty().await && tokio::fs::try_exists(legacy_path).await.unwrap_or(false) {
            match self.store.import_legacy(legacy_path).await {
                Ok(0) => {}
                Ok(count) => {
                    let message = format!("Imported {} tasks from {}.", count, legacy_path.display());
                    self.say(&message).await?;
                }
                Err(e) => {
                    warn!("Legacy import failed: {}", e);
                    self.say(&describe(&e)).await?;
                }
            }
        }

        Ok(())
    }

    /// Run the menu until the user exits or input ends
    pub async fn run(&mut self) -> std::io::Result<()> {
        self.remind().await?;

        let mut ticker = self.reminder_interval.map(|period| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            self.print_menu().await?;
            let Some(choice) = self.read_choice(&mut ticker).await? else {
                break;
            };

            match Command::parse(&choice) {
                Some(Command::Show) => self.show().await?,
                Some(Command::Add) => self.add().await?,
                Some(Command::Remove) => self.remove().await?,
                Some(Command::Search) => self.search().await?,
                Some(Command::Edit) => self.edit().await?,
                Some(Command::ToggleSort) => self.toggle_sort().await?,
                Some(Command::Exit) => break,
                None => self.say("Invalid choice!").await?,
            }
        }

        self.exit().await
    }

    async fn print_menu(&mut self) -> std::io::Result<()> {
        let other = match self.sort {
            SortMode::Deadline => SortMode::Priority,
            SortMode::Priority => SortMode::Deadline,
        };
        let menu = format!(
            "\n1. Show tasks\n2. Add task\n3. Remove task\n4. Search tasks\n5. Exit\n6. Edit task\n7. Sort by {}\n{}",
            other.as_str(),
            PROMPT
        );
        self.write(&menu).await
    }

    /// Wait for a menu choice, printing reminders whenever the timer fires
    async fn read_choice(&mut self, ticker: &mut Option<Interval>) -> std::io::Result<Option<String>> {
        loop {
            tokio::select! {
                biased;
                line = self.input.next_line() => return line,
                _ = next_tick(ticker) => {}
            }
            if self.remind().await? {
                self.write(PROMPT).await?;
            }
        }
    }

    /// Print pending reminders; returns whether anything was printed
    async fn remind(&mut self) -> std::io::Result<bool> {
        if self.reminder_interval.is_none() {
            return Ok(false);
        }

        let today = self.clock.today();
        match self.store.check_reminders(today).await {
            Ok(reminders) => {
                for reminder in &reminders {
                    let message = format!("\nReminder: {}", reminder);
                    self.say(&message).await?;
                }
                Ok(!reminders.is_empty())
            }
            Err(e) => {
                warn!("Reminder check failed: {}", e);
                self.say(&format!("\n{}", describe(&e))).await?;
                Ok(true)
            }
        }
    }

    async fn show(&mut self) -> std::io::Result<()> {
        let tasks = self.store.sorted(self.sort).await;
        self.list(&tasks, "No tasks yet.").await
    }

    async fn list(&mut self, tasks: &[Task], empty: &str) -> std::io::Result<()> {
        self.shown = tasks.iter().map(|t| t.id).collect();
        if tasks.is_empty() {
            return self.say(empty).await;
        }

        let today = self.clock.today();
        let lines: Vec<String> = tasks
            .iter()
            .enumerate()
            .map(|(i, task)| render_task(i + 1, task, today))
            .collect();
        self.say(&lines.join("\n")).await
    }

    async fn add(&mut self) -> std::io::Result<()> {
        let Some(name) = self.prompt("Enter a new task: ").await? else {
            return Ok(());
        };
        let Some(deadline) = self.prompt("Deadline (YYYY-MM-DD): ").await? else {
            return Ok(());
        };
        let Some(priority) = self.prompt_priority(None).await? else {
            return Ok(());
        };
        let Some(notes) = self.prompt("Notes: ").await? else {
            return Ok(());
        };

        let draft = TaskDraft::new(name, deadline)
            .with_priority(priority)
            .with_notes(notes.trim());
        match self.store.add(draft).await {
            Ok(task) => {
                info!(id = task.id, "Task added from console");
                self.say("Task added.").await
            }
            Err(e) => self.say(&describe(&e)).await,
        }
    }

    async fn remove(&mut self) -> std::io::Result<()> {
        self.show().await?;
        if self.shown.is_empty() {
            return Ok(());
        }

        let Some(id) = self.prompt_task_number("Enter the task number to remove: ").await? else {
            return Ok(());
        };
        match self.store.delete(id).await {
            Ok(task) => self.say(&format!("Removed '{}'.", task.name)).await,
            Err(e) => self.say(&describe(&e)).await,
        }
    }

    async fn search(&mut self) -> std::io::Result<()> {
        let Some(keyword) = self.prompt("Enter a keyword: ").await? else {
            return Ok(());
        };

        match self.store.search(&keyword).await {
            Ok(found) => self.list(&found, "No matching tasks.").await,
            Err(e) => self.say(&describe(&e)).await,
        }
    }

    async fn edit(&mut self) -> std::io::Result<()> {
        self.show().await?;
        if self.shown.is_empty() {
            return Ok(());
        }

        let Some(id) = self.prompt_task_number("Enter the task number to edit: ").await? else {
            return Ok(());
        };
        let Some(current) = self.store.get(id).await else {
            return self.say(&Error::TaskNotFound(id).to_string()).await;
        };

        let mut draft = TaskDraft::from(&current);
        let Some(name) = self.prompt(&format!("Name [{}]: ", draft.name)).await? else {
            return Ok(());
        };
        if !name.trim().is_empty() {
            draft.name = name;
        }
        let Some(deadline) = self.prompt(&format!("Deadline [{}]: ", draft.deadline)).await? else {
            return Ok(());
        };
        if !deadline.trim().is_empty() {
            draft.deadline = deadline;
        }
        let Some(priority) = self.prompt_priority(Some(&current.priority)).await? else {
            return Ok(());
        };
        draft.priority = priority;
        let Some(notes) = self
            .prompt(&format!("Notes [{}] ({} to clear): ", draft.notes, CLEAR_NOTES))
            .await?
        else {
            return Ok(());
        };
        match notes.trim() {
            "" => {}
            CLEAR_NOTES => draft.notes.clear(),
            text => draft.notes = text.to_string(),
        }

        match self.store.update(id, draft).await {
            Ok(_) => self.say("Task updated.").await,
            Err(e) => self.say(&describe(&e)).await,
        }
    }

    async fn toggle_sort(&mut self) -> std::io::Result<()> {
        self.sort = match self.sort {
            SortMode::Deadline => SortMode::Priority,
            SortMode::Priority => SortMode::Deadline,
        };
        let message = format!("Sorting by {}.", self.sort.as_str());
        self.say(&message).await
    }

    async fn exit(&mut self) -> std::io::Result<()> {
        if let Err(e) = self.store.save().await {
            warn!("Final save failed: {}", e);
            self.say(&describe(&e)).await?;
        }
        self.say("Goodbye!").await
    }

    /// Read a display number and map it to a task id
    async fn prompt_task_number(&mut self, text: &str) -> std::io::Result<Option<TaskId>> {
        let Some(raw) = self.prompt(text).await? else {
            return Ok(None);
        };

        let id = raw
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .and_then(|n| self.shown.get(n - 1).copied());
        if id.is_none() {
            self.say("Invalid task number!").await?;
        }
        Ok(id)
    }

    /// Ask for a priority; blank keeps `current` or falls back to Medium.
    /// Returns `None` on end of input or after reporting an unknown level.
    async fn prompt_priority(&mut self, current: Option<&Priority>) -> std::io::Result<Option<Priority>> {
        let text = match current {
            Some(current) => format!("Priority (High/Medium/Low) [{}]: ", current),
            None => "Priority (High/Medium/Low) [Medium]: ".to_string(),
        };
        let Some(raw) = self.prompt(&text).await? else {
            return Ok(None);
        };

        if raw.trim().is_empty() {
            return Ok(Some(current.cloned().unwrap_or_default()));
        }
        match raw.parse::<Priority>() {
            Ok(priority) => Ok(Some(priority)),
            Err(e) => {
                self.say(&describe(&e)).await?;
                Ok(None)
            }
        }
    }

    async fn prompt(&mut self, text: &str) -> std::io::Result<Option<String>> {
        self.write(text).await?;
        self.input.next_line().await
    }

    async fn say(&mut self, text: &str) -> std::io::Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await
    }

    async fn write(&mut self, text: &str) -> std::io::Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use todo_core::task::FixedClock;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    async fn run_session(store: TaskStore, input: &'static str) -> (TaskStore, String) {
        let mut app = App::new(
            store,
            input.as_bytes(),
            Vec::new(),
            FixedClock(today()),
            Some(Duration::from_secs(60)),
        );
        app.run().await.unwrap();
        let (store, out) = app.into_parts();
        (store, String::from_utf8(out).unwrap())
    }

    fn test_store() -> (TaskStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = TaskStore::new(temp_dir.path().join("tasks.json"));
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_add_and_show() {
        let (store, _temp) = test_store();
        let (store, out) = run_session(
            store,
            "2\nPay rent\n2025-01-01\nhigh\n\n1\n5\n",
        )
        .await;

        assert!(out.contains("Task added."));
        assert!(out.contains("1. Pay rent | 2025-01-01 | High | DUE TODAY"));
        assert!(out.contains("Goodbye!"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_invalid_choice_redisplays_menu() {
        let (store, _temp) = test_store();
        let (_, out) = run_session(store, "9\n5\n").await;

        assert!(out.contains("Invalid choice!"));
        assert_eq!(out.matches("1. Show tasks").count(), 2);
    }

    #[tokio::test]
    async fn test_show_empty() {
        let (store, _temp) = test_store();
        let (_, out) = run_session(store, "1\n5\n").await;
        assert!(out.contains("No tasks yet."));
    }

    #[tokio::test]
    async fn test_add_rejects_bad_date() {
        let (store, _temp) = test_store();
        let (store, out) = run_session(store, "2\nPay rent\nnot-a-date\n\n\n5\n").await;

        assert!(out.contains("Invalid date"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_add_duplicate_reported() {
        let (store, _temp) = test_store();
        store.add(TaskDraft::new("Pay rent", "2025-03-01")).await.unwrap();

        let (store, out) = run_session(store, "2\nPay rent\n2025-03-01\n\n\n5\n").await;
        assert!(out.contains("already exists"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_uses_displayed_number() {
        let (store, _temp) = test_store();
        store.add(TaskDraft::new("Later", "2025-05-01")).await.unwrap();
        store.add(TaskDraft::new("Sooner", "2025-02-01")).await.unwrap();

        // Sorted by deadline, number 1 is "Sooner"
        let (store, out) = run_session(store, "3\n1\n3\n7\n5\n").await;
        assert!(out.contains("Removed 'Sooner'."));
        assert!(out.contains("Invalid task number!"));
        let names: Vec<_> = store.list().await.into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Later"]);
    }

    #[tokio::test]
    async fn test_search() {
        let (store, _temp) = test_store();
        store.add(TaskDraft::new("Buy milk", "2025-02-01")).await.unwrap();
        store.add(TaskDraft::new("Gym", "2025-02-02")).await.unwrap();

        let (_, out) = run_session(store, "4\nMILK\n4\n\n4\nzzz\n5\n").await;
        assert!(out.contains("1. Buy milk"));
        assert!(!out.contains("1. Gym"));
        assert!(out.contains("Search keyword is required"));
        assert!(out.contains("No matching tasks."));
    }

    #[tokio::test]
    async fn test_edit_keeps_blank_fields() {
        let (store, _temp) = test_store();
        store
            .add(TaskDraft::new("Draft", "2025-02-01").with_notes("first"))
            .await
            .unwrap();

        let (store, out) = run_session(store, "6\n1\nFinal\n\nlow\n\n5\n").await;
        assert!(out.contains("Task updated."));

        let task = &store.list().await[0];
        assert_eq!(task.name, "Final");
        assert_eq!(task.deadline.to_string(), "2025-02-01");
        assert_eq!(task.priority, Priority::Low);
        assert_eq!(task.notes, "first");
    }

    #[tokio::test]
    async fn test_edit_clears_notes() {
        let (store, _temp) = test_store();
        store
            .add(TaskDraft::new("Gym", "2025-02-01").with_notes("legs"))
            .await
            .unwrap();

        let (store, out) = run_session(store, "6\n1\n\n\n\n-\n5\n").await;
        assert!(out.contains("Task updated."));

        let task = &store.list().await[0];
        assert_eq!(task.name, "Gym");
        assert!(task.notes.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reminder_tick_while_waiting_for_choice() {
        let (store, _temp) = test_store();
        store.add(TaskDraft::new("Dentist", "2025-01-02")).await.unwrap();

        let (mut input, input_end) = tokio::io::duplex(4096);
        let (output_end, mut output) = tokio::io::duplex(64 * 1024);
        let mut app = App::new(
            store,
            tokio::io::BufReader::new(input_end),
            output_end,
            FixedClock(today()),
            Some(Duration::from_secs(60)),
        );

        let driver = async {
            // Added after startup, so only a timer tick can announce it
            input
                .write_all(b"2\nPay rent\n2025-01-01\n\n\n")
                .await
                .unwrap();

            let mut out = String::new();
            let mut buf = [0u8; 1024];
            let mut exit_sent = false;
            while !out.contains("Goodbye!") {
                let n = output.read(&mut buf).await.unwrap();
                assert!(n > 0, "output closed before exit");
                out.push_str(std::str::from_utf8(&buf[..n]).unwrap());
                if !exit_sent && out.contains("'Pay rent' is due today") {
                    input.write_all(b"5\n").await.unwrap();
                    exit_sent = true;
                }
            }
            out
        };

        let (result, out) = tokio::join!(app.run(), driver);
        result.unwrap();

        assert_eq!(out.matches("Reminder: 'Dentist' is due tomorrow").count(), 1);
        assert_eq!(out.matches("Reminder: 'Pay rent' is due today").count(), 1);
        assert!(out.contains("Reminder: 'Pay rent' is due today (2025-01-01)\nChoose an option: "));
        // Two menus plus one prompt re-printed after the tick
        assert_eq!(out.matches(PROMPT).count(), 3);
    }

    #[tokio::test]
    async fn test_toggle_sort() {
        let (store, _temp) = test_store();
        store
            .add(TaskDraft::new("Low soon", "2025-02-01").with_priority(Priority::Low))
            .await
            .unwrap();
        store
            .add(TaskDraft::new("High later", "2025-06-01").with_priority(Priority::High))
            .await
            .unwrap();

        let (_, out) = run_session(store, "7\n1\n5\n").await;
        assert!(out.contains("Sorting by priority."));
        assert!(out.contains("1. High later"));
        assert!(out.contains("2. Low soon"));
    }

    #[tokio::test]
    async fn test_reminders_shown_once_at_startup() {
        let (store, _temp) = test_store();
        store.add(TaskDraft::new("Pay rent", "2025-01-01")).await.unwrap();
        store.add(TaskDraft::new("Dentist", "2025-01-02")).await.unwrap();

        let (store, out) = run_session(store, "5\n").await;
        assert!(out.contains("Reminder: 'Pay rent' is due today (2025-01-01)"));
        assert!(out.contains("Reminder: 'Dentist' is due tomorrow (2025-01-02)"));

        let (_, out) = run_session(store, "5\n").await;
        assert!(!out.contains("Reminder:"));
    }

    #[tokio::test]
    async fn test_end_of_input_exits_and_saves() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tasks.json");
        let (_, out) = run_session(TaskStore::new(&path), "").await;

        assert!(out.contains("Goodbye!"));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_startup_reports_reset_and_imports_legacy() {
        let temp_dir = TempDir::new().unwrap();
        let legacy = temp_dir.path().join("tasks.txt");
        std::fs::write(&legacy, "Pay rent;2025-01-01\nBuy milk;2025-01-02\n").unwrap();

        let store = TaskStore::new(temp_dir.path().join("tasks.json"));
        let mut app = App::new(store, "".as_bytes(), Vec::new(), FixedClock(today()), None);
        app.startup(
            LoadOutcome::Reset {
                reason: "bad json".to_string(),
            },
            &legacy,
        )
        .await
        .unwrap();

        let (store, out) = app.into_parts();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Could not read saved tasks (bad json)"));
        assert!(out.contains("Imported 2 tasks"));
        assert_eq!(store.len().await, 2);
    }

    #[test]
    fn test_render_task() {
        let task = Task {
            id: 1,
            name: "Gym".to_string(),
            deadline: NaiveDate::from_ymd_opt(2025, 1, 3).unwrap(),
            priority: Priority::Medium,
            notes: "legs".to_string(),
            created: chrono::Local::now(),
        };
        assert_eq!(
            render_task(2, &task, today()),
            "2. Gym | 2025-01-03 | Medium | DUE SOON | legs"
        );
    }
}
