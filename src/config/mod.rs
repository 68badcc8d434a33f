mod config;

pub use config::{Config, ToolPaths};
