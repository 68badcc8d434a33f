use crate::coverage::Stage;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors surfaced by both pipelines. Every variant carries the file it was
/// working on so an operator can find the offending artifact.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed input {path}:{line}: {reason}")]
    InputFormat {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("failed to load model {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("[{stage}] htslib failed on {path}: {source}")]
    Alignment {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: rust_htslib::errors::Error,
    },

    #[error("[{stage}] `{tool}` {status} while processing {path}{}", stderr_suffix(.stderr))]
    ExternalToolFailure {
        stage: Stage,
        tool: String,
        path: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("[{stage}] `{tool}` did not finish within {timeout:?} while processing {path}")]
    ExternalToolTimeout {
        stage: Stage,
        tool: String,
        path: PathBuf,
        timeout: Duration,
    },

    #[error("{path}: {source}")]
    FileSystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PipelineError {
    pub(crate) fn fs(path: impl AsRef<Path>, source: io::Error) -> Self {
        PipelineError::FileSystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn input(path: impl AsRef<Path>, line: usize, reason: impl Into<String>) -> Self {
        PipelineError::InputFormat {
            path: path.as_ref().to_path_buf(),
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn alignment(
        stage: Stage,
        path: impl AsRef<Path>,
        source: rust_htslib::errors::Error,
    ) -> Self {
        PipelineError::Alignment {
            stage,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}
