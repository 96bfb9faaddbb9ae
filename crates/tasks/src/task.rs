//! The task abstraction the executor drives.

use std::path::PathBuf;

use async_trait::async_trait;
use pipeline::{BatchWindow, DagId, DagRunId, TaskId, TemplateContext};
use serde::Serialize;

use crate::TaskError;

/// Everything a task may read about the run it belongs to.
///
/// This replaces an open-ended keyword bag: tasks render the templates they
/// were configured with against [`TaskContext::templates`] and ignore the rest.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub dag_id: DagId,
    pub run_id: DagRunId,
    pub window: BatchWindow,
    pub templates: TemplateContext,
}

/// What a successful task produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOutput {
    /// File the task wrote.
    pub artifact: PathBuf,
    /// One-line human summary, e.g. `"3 events, 2 rows"`.
    pub summary: String,
}

/// One unit of work in a DAG.
#[async_trait]
pub trait Task: Send + Sync {
    /// The id this task is declared under.
    fn task_id(&self) -> &TaskId;

    /// Runs the task for the window in `ctx`.
    async fn execute(&self, ctx: &TaskContext) -> Result<TaskOutput, TaskError>;
}
