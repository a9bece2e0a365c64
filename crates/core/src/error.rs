use thiserror::Error;

/// Failures raised by the task service and the route dispatcher.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Missing, blank, or inconsistent input; rejected before anything is persisted.
    #[error("{0}")]
    Validation(String),
    #[error("Task {0} not found")]
    NotFound(i64),
    #[error("{0}")]
    Store(#[from] rusqlite::Error),
    #[error("{0}")]
    Encode(#[from] serde_json::Error),
}

impl TaskError {
    pub fn validation(message: impl Into<String>) -> Self {
        TaskError::Validation(message.into())
    }

    /// HTTP status code the REST surface reports for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            TaskError::Validation(_) => 400,
            TaskError::NotFound(_) => 404,
            TaskError::Store(_) | TaskError::Encode(_) => 500,
        }
    }
}

pub type Result<T, E = TaskError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(TaskError::validation("bad").status_code(), 400);
        assert_eq!(TaskError::NotFound(7).status_code(), 404);
        let store = TaskError::from(rusqlite::Error::InvalidQuery);
        assert_eq!(store.status_code(), 500);
        assert_eq!(TaskError::NotFound(7).to_string(), "Task 7 not found");
    }
}
