//! Client side of the REST surface. [`LocalApi`] routes requests through the
//! in-process dispatcher so the controller sees the same JSON contract a
//! remote backend would return.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use todocal_core::api::{self, Method};
use todocal_core::{Changes, NewTask, Task, TaskError, TaskPatch, TasksService};

/// A failed request. `message` carries the server's `{error}` text verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    /// A mutation that touched no rows.
    pub fn not_found(id: i64) -> Self {
        let err = TaskError::NotFound(id);
        Self::new(err.status_code(), err.to_string())
    }
}

#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn fetch_tasks(&self) -> Result<Vec<Task>, ApiError>;
    async fn create_task(&self, task: NewTask) -> Result<Task, ApiError>;
    async fn update_task(&self, id: i64, patch: TaskPatch) -> Result<Changes, ApiError>;
    async fn delete_task(&self, id: i64) -> Result<Changes, ApiError>;
    async fn complete_task(&self, id: i64) -> Result<Changes, ApiError>;
}

#[derive(Debug, Clone)]
pub struct LocalApi {
    service: Arc<TasksService>,
}

impl LocalApi {
    pub fn new(service: TasksService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    pub fn service(&self) -> &TasksService {
        &self.service
    }

    async fn request<T>(&self, method: Method, path: String, body: Option<Value>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let service = self.service.clone();
        let response =
            tokio::task::spawn_blocking(move || api::dispatch(&service, method, &path, body))
                .await
                .map_err(|err| ApiError::internal(format!("blocking task failed: {err}")))?;

        if !response.is_success() {
            let message = response
                .error_message()
                .unwrap_or("Request failed")
                .to_string();
            return Err(ApiError::new(response.status, message));
        }

        serde_json::from_value(response.body)
            .map_err(|err| ApiError::internal(format!("Malformed response: {err}")))
    }
}

fn encode(body: &impl Serialize) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|err| ApiError::internal(err.to_string()))
}

#[async_trait]
impl TaskApi for LocalApi {
    async fn fetch_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.request(Method::Get, "/tasks".into(), None).await
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, ApiError> {
        let body = encode(&task)?;
        self.request(Method::Post, "/tasks".into(), Some(body)).await
    }

    async fn update_task(&self, id: i64, patch: TaskPatch) -> Result<Changes, ApiError> {
        let body = encode(&patch)?;
        self.request(Method::Put, format!("/tasks/{id}"), Some(body))
            .await
    }

    async fn delete_task(&self, id: i64) -> Result<Changes, ApiError> {
        self.request(Method::Delete, format!("/tasks/{id}"), None)
            .await
    }

    async fn complete_task(&self, id: i64) -> Result<Changes, ApiError> {
        self.request(Method::Patch, format!("/tasks/{id}/complete"), None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;
    use todocal_core::AppConfig;

    fn local_api() -> (LocalApi, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let config = AppConfig::from_data_dir(dir.path().to_path_buf()).expect("config");
        (LocalApi::new(TasksService::new(config).expect("service")), dir)
    }

    #[tokio::test]
    async fn validation_errors_carry_server_message() {
        let (api, _dir) = local_api();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let err = api
            .create_task(NewTask::new("", start, start))
            .await
            .unwrap_err();
        assert_eq!(err.status, 400);
        assert_eq!(err.message, "Task title cannot be blank");
    }

    #[tokio::test]
    async fn create_then_fetch_through_wire_format() {
        let (api, _dir) = local_api();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let created = api
            .create_task(NewTask::new("Write report", start, end))
            .await
            .expect("create");

        let tasks = api.fetch_tasks().await.expect("fetch");
        assert_eq!(tasks, vec![created.clone()]);

        let changes = api.complete_task(created.id).await.expect("complete");
        assert_eq!(changes, Changes::new(1));
        let missing = api.delete_task(created.id + 1).await.expect("delete");
        assert_eq!(missing, Changes::new(0));
    }
}
