pub mod api;
pub mod controller;
pub mod state;
pub mod telemetry;

pub use api::{ApiError, LocalApi, TaskApi};
pub use controller::{SyncController, Views};
pub use state::{EditDraft, LoadState, Severity, Snackbar, SnackbarAction, TaskForm};
