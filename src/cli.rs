use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::model::Priority;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "todocal",
    version,
    about = "Personal tasks with a calendar and a daily timeline.",
    after_help = "Examples:\n  todocal add \"Write report\" --start 2024-01-01T09:00 --end 2024-01-01T10:00 --priority high\n  todocal timeline --date tomorrow\n  todocal done 3"
)]
pub struct Cli {
    /// Override the data directory (defaults to platform-specific app dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Override the tracing filter (e.g. "info", "debug", or full directives)
    #[arg(long = "log", value_name = "DIRECTIVE", global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// List every task ordered by start time (default command)
    List,
    /// Create a task
    Add(AddArgs),
    /// Change fields of an existing task
    Edit(EditArgs),
    /// Mark a task completed
    Done(IdArgs),
    /// Mark a completed task pending again
    Reopen(IdArgs),
    /// Delete a task permanently; adding it again assigns a new id
    Delete(IdArgs),
    /// Show one day's tasks in start order
    Timeline(DateArgs),
    /// Show the week containing a date, Monday first
    Calendar(DateArgs),
    /// Count completed, pending, and recurring tasks
    Summary,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Task title
    #[arg(value_name = "TITLE", required = true)]
    pub title: Vec<String>,

    /// Start time (RFC 3339, or local "YYYY-MM-DDTHH:MM")
    #[arg(long, value_name = "TIME")]
    pub start: String,

    /// End time; must not precede the start
    #[arg(long, value_name = "TIME")]
    pub end: String,

    /// Why the task matters
    #[arg(long)]
    pub reason: Option<String>,

    /// Free-form recurrence label (e.g. "weekly")
    #[arg(long)]
    pub recurrence: Option<String>,

    #[arg(long, value_enum, ignore_case = true)]
    pub priority: Option<Priority>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    #[arg(value_name = "ID")]
    pub id: i64,

    #[arg(long)]
    pub title: Option<String>,

    /// New reason; pass an empty string to clear it
    #[arg(long)]
    pub reason: Option<String>,

    #[arg(long, value_name = "TIME")]
    pub start: Option<String>,

    #[arg(long, value_name = "TIME")]
    pub end: Option<String>,

    /// New recurrence label; pass an empty string to clear it
    #[arg(long)]
    pub recurrence: Option<String>,

    #[arg(long, value_enum, ignore_case = true)]
    pub priority: Option<Priority>,
}

impl EditArgs {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.reason.is_none()
            && self.start.is_none()
            && self.end.is_none()
            && self.recurrence.is_none()
            && self.priority.is_none()
    }
}

#[derive(Args, Debug, Clone)]
pub struct IdArgs {
    #[arg(value_name = "ID")]
    pub id: i64,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DateArgs {
    /// Day to show (YYYY-MM-DD, today, tomorrow, yesterday)
    #[arg(long, value_name = "DATE", default_value = "today")]
    pub date: String,
}
