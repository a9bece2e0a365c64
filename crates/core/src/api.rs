//! REST surface over [`TasksService`], independent of any HTTP transport.
//! A server binding only needs to forward method, path, and JSON body here.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::error::{Result, TaskError};
use crate::model::{NewTask, TaskPatch};
use crate::services::TasksService;

static TASK_ROUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/tasks/([^/]+)(/complete)?/?$").expect("valid task route regex"));

pub const ROOT_MESSAGE: &str = "To-Do with Calendar backend is running.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Method {
    type Err = TaskError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            other => Err(TaskError::validation(format!("Unsupported method '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: impl Serialize) -> Result<Self> {
        Ok(Self {
            status: 200,
            body: serde_json::to_value(body)?,
        })
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The `{error}` message of a failed response.
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }
}

impl From<TaskError> for ApiResponse {
    fn from(err: TaskError) -> Self {
        ApiResponse::error(err.status_code(), err.to_string())
    }
}

#[derive(Debug)]
enum Route {
    Root,
    Tasks,
    Task(i64),
    Complete(i64),
}

/// Handle one request. Never fails: every error is folded into an `{error}` body.
pub fn dispatch(
    service: &TasksService,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> ApiResponse {
    let route = match resolve(path) {
        Ok(Some(route)) => route,
        Ok(None) => return ApiResponse::error(404, format!("Cannot {method} {path}")),
        Err(err) => return err.into(),
    };

    match handle(service, method, path, &route, body) {
        Ok(response) => response,
        Err(err) => {
            match &err {
                TaskError::Validation(message) => {
                    info!(%method, path, error = message.as_str(), "rejected request")
                }
                other => error!(%method, path, error = %other, "request failed"),
            }
            err.into()
        }
    }
}

fn handle(
    service: &TasksService,
    method: Method,
    path: &str,
    route: &Route,
    body: Option<Value>,
) -> Result<ApiResponse> {
    match (method, route) {
        (Method::Get, Route::Root) => ApiResponse::ok(ROOT_MESSAGE),
        (Method::Get, Route::Tasks) => ApiResponse::ok(service.list()?),
        (Method::Post, Route::Tasks) => {
            let input: NewTask = decode(body, "Missing required fields: title, startTime, or endTime")?;
            ApiResponse::ok(service.create(input)?)
        }
        (Method::Put, Route::Task(id)) => {
            let patch: TaskPatch = decode(body, "Request body must be a JSON object")?;
            ApiResponse::ok(service.update(*id, &patch)?)
        }
        (Method::Delete, Route::Task(id)) => ApiResponse::ok(service.delete(*id)?),
        (Method::Patch, Route::Complete(id)) => ApiResponse::ok(service.complete(*id)?),
        _ => Ok(ApiResponse::error(404, format!("Cannot {method} {path}"))),
    }
}

fn resolve(path: &str) -> Result<Option<Route>> {
    let path = path.split('?').next().unwrap_or_default();
    match path {
        "/" | "" => return Ok(Some(Route::Root)),
        "/tasks" | "/tasks/" => return Ok(Some(Route::Tasks)),
        _ => {}
    }

    let Some(captures) = TASK_ROUTE.captures(path) else {
        return Ok(None);
    };
    let raw_id = &captures[1];
    let id: i64 = raw_id
        .parse()
        .map_err(|_| TaskError::validation(format!("Invalid task id '{raw_id}'")))?;
    if captures.get(2).is_some() {
        Ok(Some(Route::Complete(id)))
    } else {
        Ok(Some(Route::Task(id)))
    }
}

fn decode<T: DeserializeOwned>(body: Option<Value>, missing: &str) -> Result<T> {
    let body = match body {
        Some(Value::Object(map)) => Value::Object(map),
        _ => return Err(TaskError::validation(missing)),
    };
    serde_json::from_value(body).map_err(|err| {
        let message = err.to_string();
        if message.starts_with("missing field") {
            TaskError::validation(missing)
        } else {
            TaskError::validation(format!("Invalid request body: {message}"))
        }
    })
}
