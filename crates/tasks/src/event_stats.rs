//! The daily event stats DAG: `fetch_events >> calculate_stats`.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use pipeline::{DagDefinition, DagId, EventSource, ScheduleInterval, TaskId};

use crate::{
    CalculateStatsTask, CalculateStatsTemplates, DagExecutor, ExecutorError, FetchEventsTask,
    FetchTemplates,
};

pub const FETCH_EVENTS: &str = "fetch_events";
pub const CALCULATE_STATS: &str = "calculate_stats";

/// Settings for [`event_stats_dag`].
#[derive(Debug, Clone)]
pub struct EventStatsDag {
    pub dag_id: DagId,
    pub start_date: NaiveDate,
    pub schedule: ScheduleInterval,
    /// Directory both artifacts live in; exposed to templates as `data_dir`.
    pub data_dir: PathBuf,
    pub fetch: FetchTemplates,
    pub stats: CalculateStatsTemplates,
}

/// Declares the two tasks, their ordering edge, and wires in `source`.
pub fn event_stats_dag(
    settings: EventStatsDag,
    source: Arc<dyn EventSource>,
) -> Result<DagExecutor, ExecutorError> {
    let fetch_id = task_id(FETCH_EVENTS)?;
    let stats_id = task_id(CALCULATE_STATS)?;

    let mut dag = DagDefinition::new(settings.dag_id, settings.start_date, settings.schedule);
    dag.add_task(fetch_id.clone())?;
    dag.add_task(stats_id.clone())?;
    dag.add_edge(fetch_id.clone(), stats_id.clone())?;

    let mut executor = DagExecutor::new(dag)
        .with_variable("data_dir", settings.data_dir.to_string_lossy());
    executor.register(Arc::new(FetchEventsTask::new(fetch_id, source, settings.fetch)))?;
    executor.register(Arc::new(CalculateStatsTask::new(stats_id, settings.stats)))?;
    Ok(executor)
}

fn task_id(name: &str) -> Result<TaskId, ExecutorError> {
    TaskId::new(name).ok_or_else(|| {
        ExecutorError::Pipeline(pipeline::PipelineError::InvalidTaskId {
            value: name.to_owned(),
        })
    })
}
