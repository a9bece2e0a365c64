use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::TaskError;
use crate::parser::timestamp;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "PascalCase", try_from = "String")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    /// Solid indicator color used for priority dots.
    pub fn color(&self) -> &'static str {
        match self {
            Priority::High => "#FF3B30",
            Priority::Medium => "#FFCC00",
            Priority::Low => "#34C759",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" | "med" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(TaskError::validation(format!(
                "Unknown priority '{other}': expected High|Medium|Low"
            ))),
        }
    }
}

impl TryFrom<String> for Priority {
    type Error = TaskError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl ValueEnum for Priority {
    fn value_variants<'a>() -> &'a [Self] {
        const VARIANTS: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];
        &VARIANTS
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            TaskStatus::Pending => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::Pending,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "completed" | "done" => Ok(TaskStatus::Completed),
            other => Err(TaskError::validation(format!(
                "Unknown status '{other}': expected pending|completed"
            ))),
        }
    }
}

impl TryFrom<String> for TaskStatus {
    type Error = TaskError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(with = "timestamp")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub recurrence: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence
            .as_deref()
            .map(|label| !label.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Body of `POST /tasks`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(with = "timestamp")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub end_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            start_time,
            end_time,
            ..Self::default()
        }
    }
}

impl From<&Task> for NewTask {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            reason: task.reason.clone(),
            start_time: task.start_time,
            end_time: task.end_time,
            recurrence: task.recurrence.clone(),
            priority: Some(task.priority),
        }
    }
}

/// Body of `PUT /tasks/:id`. Absent keys leave the stored value untouched; an
/// explicit `null` clears `reason` or `recurrence`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub reason: Option<Option<String>>,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub recurrence: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Produce the task as it would look after this patch; identity and
    /// creation time are carried over untouched.
    pub fn apply(&self, task: &Task) -> Task {
        let mut merged = task.clone();
        if let Some(title) = &self.title {
            merged.title = title.clone();
        }
        if let Some(reason) = &self.reason {
            merged.reason = reason.clone();
        }
        if let Some(start_time) = self.start_time {
            merged.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            merged.end_time = end_time;
        }
        if let Some(recurrence) = &self.recurrence {
            merged.recurrence = recurrence.clone();
        }
        if let Some(priority) = self.priority {
            merged.priority = priority;
        }
        if let Some(status) = self.status {
            merged.status = status;
        }
        merged
    }
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Row count reported by every mutating endpoint. Zero means the target id was absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changes {
    pub changes: usize,
}

impl Changes {
    pub fn new(changes: usize) -> Self {
        Self { changes }
    }

    pub fn applied(&self) -> bool {
        self.changes > 0
    }
}
