pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod coverage;
pub mod error;
pub mod predict;
pub mod utils;

pub use error::{PipelineError, Result};
