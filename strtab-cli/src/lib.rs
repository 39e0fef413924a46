//! CLI library for testing purposes

pub mod config;
pub mod options;
pub mod view;

pub use config::CliConfig;
pub use strtab::{FormatType, JobService, ResourceJob};
