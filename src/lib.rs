pub mod cli;
pub mod commands;
pub mod config;

pub use todocal_core as core;
pub use todocal_core::model;
pub use todocal_core::parser;
pub use todocal_core::projector;

pub use todocal_client as client;
pub use todocal_client::SyncController;
