use std::sync::Arc;

/// Progress callback used by the pipelines to report to the CLI layer.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Progress events emitted while a pipeline runs
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    Started { task: String },
    Progress { task: String, current: u64, total: u64 },
    Message { task: String, message: String },
    Completed { task: String },
    Error { task: String, error: String },
}
