//! Error types for the pipeline domain.
//!
//! [`PipelineError`] covers conditions that prevent a DAG run from being
//! planned at all: an invalid window, a malformed schedule, a broken task
//! graph. Failures that happen while a task is executing are defined in the
//! `tasks` crate; [`EventSourceError`] is the error half of the
//! [`crate::EventSource`] port and is produced by infrastructure adapters.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::TaskId;

// ---------------------------------------------------------------------------
// Pipeline-level errors
// ---------------------------------------------------------------------------

/// Errors raised while defining a DAG or resolving the window it runs for.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A batch window whose end does not lie strictly after its start.
    #[error("Invalid batch window: start {start} is not before end {end}")]
    InvalidWindow {
        /// Inclusive window start.
        start: DateTime<Utc>,
        /// Exclusive window end.
        end: DateTime<Utc>,
    },

    /// Window arithmetic left the range chrono can represent.
    #[error("No {schedule} window can be built around {at}: date out of range")]
    WindowOutOfRange {
        /// The instant the window was anchored on.
        at: DateTime<Utc>,
        /// The schedule preset, e.g. `@daily`.
        schedule: &'static str,
    },

    /// The requested window starts before the DAG's configured start date.
    #[error("Window {ds} starts before the DAG start date {start_date}")]
    WindowBeforeStartDate {
        /// Start date of the rejected window.
        ds: NaiveDate,
        /// First date the DAG is allowed to run for.
        start_date: NaiveDate,
    },

    /// A schedule string that is not one of the supported presets.
    #[error("Unsupported schedule interval '{value}' (expected @hourly, @daily or @weekly)")]
    InvalidSchedule {
        /// The rejected value.
        value: String,
    },

    /// A task id that is empty or only whitespace.
    #[error("Invalid task id '{value}'")]
    InvalidTaskId {
        /// The rejected value.
        value: String,
    },

    /// A task id was declared twice in the same DAG.
    #[error("Task '{task}' is declared more than once")]
    DuplicateTask {
        /// The repeated id.
        task: TaskId,
    },

    /// An edge or a selector named a task the DAG does not declare.
    #[error("Unknown task '{task}'")]
    UnknownTask {
        /// The missing id.
        task: TaskId,
    },

    /// An edge from a task to itself.
    #[error("Task '{task}' cannot depend on itself")]
    SelfDependency {
        /// The offending task.
        task: TaskId,
    },

    /// The dependency edges contain a cycle; no execution order exists.
    #[error("Dependency cycle between tasks: {}", join_ids(.tasks))]
    DependencyCycle {
        /// Tasks that could not be ordered.
        tasks: Vec<TaskId>,
    },

    /// A path or query template could not be rendered.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

fn join_ids(ids: &[TaskId]) -> String {
    ids.iter()
        .map(TaskId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Template errors
// ---------------------------------------------------------------------------

/// Errors raised while rendering a `{{ ... }}` template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A `{{` without a matching `}}`.
    #[error("Unterminated placeholder starting at byte {offset} in '{template}'")]
    Unterminated {
        /// The template being rendered.
        template: String,
        /// Byte offset of the opening braces.
        offset: usize,
    },

    /// A placeholder naming a variable the context does not define.
    #[error("Unknown template variable '{name}'")]
    UnknownVariable {
        /// The variable name as written.
        name: String,
    },

    /// A `:FORMAT` suffix on a variable that is not a datetime.
    #[error("Template variable '{name}' does not accept a format")]
    FormatNotSupported {
        /// The variable name as written.
        name: String,
    },

    /// A strftime pattern chrono could not apply.
    #[error("Invalid date format '{format}' for variable '{name}'")]
    InvalidFormat {
        /// The variable name as written.
        name: String,
        /// The rejected pattern.
        format: String,
    },
}

// ---------------------------------------------------------------------------
// Event source errors
// ---------------------------------------------------------------------------

/// Errors returned by an [`crate::EventSource`] implementation.
#[derive(Debug, Error)]
pub enum EventSourceError {
    /// The request could not be constructed (bad base URL, bad query).
    #[error("Invalid event request: {message}")]
    InvalidRequest {
        /// Description of the problem.
        message: String,
    },

    /// Connection, TLS, timeout, or body read failure.
    #[error("Request to {url} failed: {message}")]
    Transport {
        /// The URL that was requested.
        url: String,
        /// The client's error message.
        message: String,
    },

    /// The service answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code.
        status: u16,
    },
}
