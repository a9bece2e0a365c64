pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod model;
pub mod parser;
pub mod projector;
pub mod services;

pub use config::AppConfig;
pub use database::Database;
pub use error::{Result, TaskError};
pub use model::*;
pub use services::TasksService;
