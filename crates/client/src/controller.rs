//! Keeps a local snapshot of tasks in step with the backend. Every mutation
//! is followed by a full reload; the snapshot is never patched in place.

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone};
use todocal_core::projector::{self, CalendarEvent, Summary};
use todocal_core::{Changes, NewTask, Task, TaskPatch, TaskStatus};

use crate::api::{ApiError, TaskApi};
use crate::state::{EditDraft, LoadState, Severity, Snackbar, SnackbarAction, TaskForm};
use crate::telemetry::{Event, Handle};

/// Every projection of the current snapshot, computed together.
#[derive(Debug, Clone, PartialEq)]
pub struct Views {
    pub list: Arc<[Task]>,
    pub calendar: Vec<CalendarEvent>,
    pub timeline: Vec<Task>,
    pub summary: Summary,
}

pub struct SyncController<A: TaskApi> {
    api: A,
    tasks: Arc<[Task]>,
    state: LoadState,
    generation: u64,
    busy: bool,
    snackbar: Option<Snackbar>,
    last_deleted: Option<Task>,
    form: TaskForm,
    draft: Option<EditDraft>,
    telemetry: Handle,
}

impl<A: TaskApi> SyncController<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            tasks: Vec::new().into(),
            state: LoadState::Idle,
            generation: 0,
            busy: false,
            snackbar: None,
            last_deleted: None,
            form: TaskForm::default(),
            draft: None,
            telemetry: Handle::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn tasks(&self) -> Arc<[Task]> {
        self.tasks.clone()
    }

    pub fn task(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn snackbar(&self) -> Option<&Snackbar> {
        self.snackbar.as_ref()
    }

    pub fn dismiss_snackbar(&mut self) -> Option<Snackbar> {
        self.snackbar.take()
    }

    pub fn last_deleted(&self) -> Option<&Task> {
        self.last_deleted.as_ref()
    }

    pub fn form(&self) -> &TaskForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut TaskForm {
        &mut self.form
    }

    pub fn draft(&self) -> Option<&EditDraft> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut EditDraft> {
        self.draft.as_mut()
    }

    pub fn telemetry(&self) -> &Handle {
        &self.telemetry
    }

    /// Start a reload and return its generation. Only the newest generation
    /// may replace the snapshot.
    pub fn begin_reload(&mut self) -> u64 {
        self.generation += 1;
        self.state = LoadState::Loading;
        self.telemetry.record(Event::ReloadRequested {
            generation: self.generation,
        });
        self.generation
    }

    /// Apply a fetch result. Returns `false` when a newer reload has started
    /// since `generation` was issued.
    pub fn finish_reload(&mut self, generation: u64, result: Result<Vec<Task>, ApiError>) -> bool {
        if generation != self.generation {
            self.telemetry.record(Event::ReloadDiscarded { generation });
            return false;
        }

        match result {
            Ok(tasks) => {
                self.telemetry.record(Event::ReloadCompleted {
                    generation,
                    count: tasks.len(),
                });
                self.tasks = tasks.into();
                self.state = LoadState::Loaded;
            }
            Err(err) => {
                self.telemetry.record(Event::ReloadFailed {
                    generation,
                    error: err.message.clone(),
                });
                self.tasks = Vec::new().into();
                self.state = LoadState::Failed(err.message);
            }
        }
        true
    }

    pub async fn reload(&mut self) -> bool {
        let generation = self.begin_reload();
        let result = self.api.fetch_tasks().await;
        self.finish_reload(generation, result)
    }

    /// Validate the add form locally, then create. The form is cleared only
    /// when the backend accepts the task.
    pub async fn submit_form(&mut self) -> Option<Task> {
        let input = match self.form.to_new_task() {
            Ok(input) => input,
            Err(message) => {
                self.snackbar = Some(Snackbar::new(message, Severity::Warning));
                return None;
            }
        };

        let created = self.create(input).await;
        if created.is_some() {
            self.form.reset();
        }
        created
    }

    pub async fn create(&mut self, input: NewTask) -> Option<Task> {
        self.busy = true;
        let result = self.api.create_task(input).await;
        let created = match result {
            Ok(task) => {
                self.succeed("add task", Snackbar::new("Task added!", Severity::Success));
                Some(task)
            }
            Err(err) => {
                self.fail("add task", &err);
                None
            }
        };
        self.settle().await;
        created
    }

    /// Completed tasks go back to pending through a status patch; pending
    /// tasks use the dedicated complete endpoint.
    pub async fn toggle_complete(&mut self, id: i64) -> bool {
        let Some(status) = self.task(id).map(|task| task.status) else {
            self.fail("update task", &ApiError::not_found(id));
            return false;
        };

        self.busy = true;
        let (result, message) = match status {
            TaskStatus::Completed => (
                self.api
                    .update_task(id, TaskPatch::status(TaskStatus::Pending))
                    .await,
                "Marked as pending",
            ),
            TaskStatus::Pending => (self.api.complete_task(id).await, "Marked as completed!"),
        };
        let applied = self.apply_changes(
            "update task",
            id,
            result,
            Snackbar::new(message, Severity::Success),
        );
        self.settle().await;
        applied
    }

    pub async fn delete(&mut self, id: i64) -> bool {
        let snapshot = self.task(id).cloned();
        let mut notice = Snackbar::new("Task deleted", Severity::Info);
        if snapshot.is_some() {
            notice = notice.with_action(SnackbarAction::UndoDelete);
        }

        self.busy = true;
        let result = self.api.delete_task(id).await;
        let applied = self.apply_changes("delete task", id, result, notice);
        if applied {
            self.last_deleted = snapshot;
        }
        self.settle().await;
        applied
    }

    /// Re-create the last deleted task. The restored task gets a fresh id and
    /// creation time; a completed task is completed again after creation.
    pub async fn undo_delete(&mut self) -> bool {
        let Some(task) = self.last_deleted.clone() else {
            return false;
        };

        self.busy = true;
        let result = self.api.create_task(NewTask::from(&task)).await;
        let applied = match result {
            Ok(created) => {
                self.last_deleted = None;
                let recompleted = if task.is_completed() {
                    self.api.complete_task(created.id).await.map(|_| ())
                } else {
                    Ok(())
                };
                match recompleted {
                    Ok(()) => {
                        self.succeed(
                            "restore task",
                            Snackbar::new("Task restored", Severity::Success),
                        );
                        true
                    }
                    Err(err) => {
                        // The row exists again; only its completed status was lost.
                        self.telemetry.record(Event::MutationFailed {
                            action: "restore task".to_string(),
                            error: err.message.clone(),
                        });
                        self.snackbar = Some(Snackbar::new(
                            format!("Task restored as pending: {}", err.message),
                            Severity::Warning,
                        ));
                        false
                    }
                }
            }
            Err(err) => {
                self.fail("restore task", &err);
                false
            }
        };
        self.settle().await;
        applied
    }

    pub fn begin_edit(&mut self, id: i64) -> bool {
        match self.task(id).map(EditDraft::from_task) {
            Some(draft) => {
                self.draft = Some(draft);
                true
            }
            None => false,
        }
    }

    /// Drop the draft without contacting the backend.
    pub fn cancel_edit(&mut self) {
        self.draft = None;
    }

    pub async fn save_edit(&mut self) -> bool {
        let (id, patch) = {
            let Some(draft) = self.draft.as_mut() else {
                return false;
            };
            match draft.to_patch() {
                Ok(patch) => {
                    draft.error = None;
                    (draft.task_id, patch)
                }
                Err(message) => {
                    draft.error = Some(message);
                    return false;
                }
            }
        };

        self.busy = true;
        let result = self.api.update_task(id, patch).await;
        let applied = self.apply_changes(
            "update task",
            id,
            result,
            Snackbar::new("Task updated!", Severity::Success),
        );
        if applied {
            self.draft = None;
        } else if let Some(draft) = self.draft.as_mut() {
            draft.error = self.snackbar.as_ref().map(|notice| notice.message.clone());
        }
        self.settle().await;
        applied
    }

    pub fn views<Tz: TimeZone>(&self, date: NaiveDate, tz: &Tz) -> Views {
        Views {
            list: self.tasks.clone(),
            calendar: projector::to_calendar_events(&self.tasks),
            timeline: projector::to_timeline(&self.tasks, date, tz),
            summary: projector::summarize(&self.tasks),
        }
    }

    fn apply_changes(
        &mut self,
        action: &str,
        id: i64,
        result: Result<Changes, ApiError>,
        notice: Snackbar,
    ) -> bool {
        match result {
            Ok(changes) if changes.applied() => {
                self.succeed(action, notice);
                true
            }
            Ok(_) => {
                self.fail(action, &ApiError::not_found(id));
                false
            }
            Err(err) => {
                self.fail(action, &err);
                false
            }
        }
    }

    fn succeed(&mut self, action: &str, notice: Snackbar) {
        self.telemetry.record(Event::MutationApplied(action.to_string()));
        self.snackbar = Some(notice);
    }

    fn fail(&mut self, action: &str, err: &ApiError) {
        self.telemetry.record(Event::MutationFailed {
            action: action.to_string(),
            error: err.message.clone(),
        });
        self.snackbar = Some(Snackbar::new(
            format!("Failed to {action}: {}", err.message),
            Severity::Error,
        ));
    }

    async fn settle(&mut self) {
        self.reload().await;
        self.busy = false;
    }
}
