//! Console to-do list
//!
//! Interactive menu over the task store, with periodic due-date reminders.

mod app;
mod config;

use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::App;
use crate::config::Config;
use todo_core::task::{SystemClock, TaskStore};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they stay out of the menu
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todo_cli=info,todo_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();
    tracing::info!("Using data directory: {:?}", config.data_dir);

    let store = TaskStore::new(config.store_path());
    let outcome = store.load().await;
    tracing::info!("Task file {}: {:?}", store.path().display(), outcome);

    let input = BufReader::new(tokio::io::stdin());
    let mut app = App::new(
        store,
        input,
        tokio::io::stdout(),
        SystemClock,
        config.reminder_interval,
    );
    app.startup(outcome, &config.legacy_path()).await?;
    app.run().await?;

    Ok(())
}
