//! State models the sync controller keeps alongside the task snapshot.

use todocal_core::parser::{format_timestamp, parse_timestamp};
use todocal_core::{NewTask, Priority, Task, TaskPatch};

pub(crate) const INVALID_FORM_MESSAGE: &str = "Please enter a valid task and date/time.";
pub(crate) const BLANK_TITLE_MESSAGE: &str = "Title cannot be blank.";
pub(crate) const INVERTED_RANGE_MESSAGE: &str = "End time cannot be before start time.";
pub(crate) const INVALID_TIME_MESSAGE: &str = "Start and end times must be valid date/times.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnackbarAction {
    /// Re-create the most recently deleted task under a new id.
    UndoDelete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snackbar {
    pub message: String,
    pub severity: Severity,
    pub action: Option<SnackbarAction>,
}

impl Snackbar {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
            action: None,
        }
    }

    pub fn with_action(mut self, action: SnackbarAction) -> Self {
        self.action = Some(action);
        self
    }
}

/// The add-task form shown above the list view. Times are raw user input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    pub title: String,
    pub reason: String,
    pub start_time: String,
    pub end_time: String,
    pub recurrence: String,
    pub priority: Priority,
}

impl TaskForm {
    pub fn to_new_task(&self) -> Result<NewTask, String> {
        let title = self.title.trim();
        let start = parse_timestamp(&self.start_time);
        let end = parse_timestamp(&self.end_time);
        let (Ok(start_time), Ok(end_time)) = (start, end) else {
            return Err(INVALID_FORM_MESSAGE.to_string());
        };
        if title.is_empty() {
            return Err(INVALID_FORM_MESSAGE.to_string());
        }

        Ok(NewTask {
            title: title.to_string(),
            reason: non_blank(&self.reason),
            start_time,
            end_time,
            recurrence: non_blank(&self.recurrence),
            priority: Some(self.priority),
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Uncommitted edits to one task. The committed task is untouched until the
/// draft is saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub task_id: i64,
    pub title: String,
    pub reason: String,
    pub start_time: String,
    pub end_time: String,
    pub recurrence: String,
    pub priority: Priority,
    pub error: Option<String>,
}

impl EditDraft {
    pub fn from_task(task: &Task) -> Self {
        Self {
            task_id: task.id,
            title: task.title.clone(),
            reason: task.reason.clone().unwrap_or_default(),
            start_time: format_timestamp(&task.start_time),
            end_time: format_timestamp(&task.end_time),
            recurrence: task.recurrence.clone().unwrap_or_default(),
            priority: task.priority,
            error: None,
        }
    }

    /// Local validation performed before anything is sent.
    pub fn to_patch(&self) -> Result<TaskPatch, String> {
        if self.title.trim().is_empty() {
            return Err(BLANK_TITLE_MESSAGE.to_string());
        }
        let (Ok(start_time), Ok(end_time)) = (
            parse_timestamp(&self.start_time),
            parse_timestamp(&self.end_time),
        ) else {
            return Err(INVALID_TIME_MESSAGE.to_string());
        };
        if end_time < start_time {
            return Err(INVERTED_RANGE_MESSAGE.to_string());
        }

        Ok(TaskPatch {
            title: Some(self.title.trim().to_string()),
            reason: Some(non_blank(&self.reason)),
            start_time: Some(start_time),
            end_time: Some(end_time),
            recurrence: Some(non_blank(&self.recurrence)),
            priority: Some(self.priority),
            status: None,
        })
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
