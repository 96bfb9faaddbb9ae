//! Errors raised while a task or a DAG run is executing.

use std::path::PathBuf;

use pipeline::{EventSourceError, PipelineError, TaskId, TemplateError};
use thiserror::Error;

/// A task failed. The executor records the message and marks downstream
/// tasks as not run; nothing is retried.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A path or query template could not be rendered.
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// The event service could not be reached or answered with an error.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] EventSourceError),

    /// Reading, writing, or creating a directory failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The raw event document is not a JSON array of event records.
    #[error("Invalid event document {}: {source}", .path.display())]
    Parse {
        /// The document that failed to parse.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Writing the output table failed.
    #[error("Failed to write table {}: {source}", .path.display())]
    Csv {
        /// The table being written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: csv::Error,
    },

    /// The blocking worker running the task panicked or was cancelled.
    #[error("Task aborted: {message}")]
    Aborted {
        /// Description from the join error.
        message: String,
    },
}

impl TaskError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A DAG run could not be started.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The DAG definition or window is invalid.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A declared task has no implementation registered.
    #[error("No implementation registered for task '{task}'")]
    Unregistered {
        /// The declared id.
        task: TaskId,
    },

    /// An implementation was registered for a task the DAG does not declare.
    #[error("Task '{task}' is not declared in DAG '{dag_id}'")]
    Undeclared {
        /// The implementation's id.
        task: TaskId,
        /// The DAG it was registered with.
        dag_id: String,
    },
}
