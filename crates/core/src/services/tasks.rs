use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::database::Database;
use crate::error::{Result, TaskError};
use crate::model::{Changes, NewTask, Task, TaskPatch, TaskStatus};

/// Validates and mutates tasks. Every call opens its own connection so the
/// store serialises access.
#[derive(Debug, Clone)]
pub struct TasksService {
    config: AppConfig,
}

impl TasksService {
    pub fn new(config: AppConfig) -> Result<Self> {
        Database::initialize(&config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// All tasks ordered by start time, ties broken by id.
    pub fn list(&self) -> Result<Vec<Task>> {
        let db = self.open_database()?;
        let tasks = db.fetch_tasks()?;
        debug!(count = tasks.len(), "listed tasks");
        Ok(tasks)
    }

    pub fn get(&self, id: i64) -> Result<Option<Task>> {
        let db = self.open_database()?;
        db.fetch_task(id)
    }

    pub fn create(&self, input: NewTask) -> Result<Task> {
        let input = normalize_new_task(input);
        if let Err(err) = validate_new_task(&input) {
            warn!(error = %err, "rejected new task");
            return Err(err);
        }

        let db = self.open_database()?;
        let id = db.insert_task(&input)?;
        info!(task_id = id, title = input.title.as_str(), "created task");
        db.fetch_task(id)?.ok_or(TaskError::NotFound(id))
    }

    /// Merge `patch` over the stored row. An unknown id yields zero changes
    /// rather than an error.
    pub fn update(&self, id: i64, patch: &TaskPatch) -> Result<Changes> {
        let db = self.open_database()?;
        let Some(existing) = db.fetch_task(id)? else {
            debug!(task_id = id, "update target missing");
            return Ok(Changes::default());
        };

        let merged = normalize_task(patch.apply(&existing));
        if let Err(err) = validate_fields(&merged.title, &merged.start_time, &merged.end_time) {
            warn!(task_id = id, error = %err, "rejected task update");
            return Err(err);
        }

        let changes = db.update_task(&merged)?;
        info!(task_id = id, changes, "updated task");
        Ok(Changes::new(changes))
    }

    pub fn delete(&self, id: i64) -> Result<Changes> {
        let db = self.open_database()?;
        let changes = db.delete_task(id)?;
        info!(task_id = id, changes, "deleted task");
        Ok(Changes::new(changes))
    }

    /// Flip status without requiring the full task payload.
    pub fn set_status(&self, id: i64, status: TaskStatus) -> Result<Changes> {
        let db = self.open_database()?;
        let changes = db.update_status(id, status)?;
        info!(task_id = id, status = status.as_str(), changes, "set task status");
        Ok(Changes::new(changes))
    }

    pub fn complete(&self, id: i64) -> Result<Changes> {
        self.set_status(id, TaskStatus::Completed)
    }

    fn open_database(&self) -> Result<Database> {
        Database::initialize(&self.config).map_err(|err| {
            tracing::error!(error = %err, path = %self.config.db_path().display(), "failed to open task store");
            err
        })
    }
}

fn normalize_new_task(mut input: NewTask) -> NewTask {
    input.title = input.title.trim().to_string();
    input.reason = normalize_optional(input.reason);
    input.recurrence = normalize_optional(input.recurrence);
    input
}

fn normalize_task(mut task: Task) -> Task {
    task.title = task.title.trim().to_string();
    task.reason = normalize_optional(task.reason);
    task.recurrence = normalize_optional(task.recurrence);
    task
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn validate_new_task(input: &NewTask) -> Result<()> {
    validate_fields(&input.title, &input.start_time, &input.end_time)
}

fn validate_fields(
    title: &str,
    start_time: &chrono::DateTime<chrono::Utc>,
    end_time: &chrono::DateTime<chrono::Utc>,
) -> Result<()> {
    if title.trim().is_empty() {
        return Err(TaskError::validation("Task title cannot be blank"));
    }
    if end_time < start_time {
        return Err(TaskError::validation("End time cannot be before start time"));
    }
    Ok(())
}
