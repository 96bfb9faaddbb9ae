//! The `calculate_stats` task: count events per `(date, user)` and write
//! the result as a CSV table.
//!
//! The table has the header `date,user,count` and one row per group, sorted
//! by date then user. It is written to a temporary file next to the target
//! and renamed into place, so a failed run never leaves a partial table.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pipeline::{count_by_date_and_user, parse_event_document, DailyUserCount, TaskId, TemplateContext};
use tracing::{debug, info};

use crate::{Task, TaskContext, TaskError, TaskOutput};

const HEADER: [&str; 3] = ["date", "user", "count"];

/// Unrendered templates for [`CalculateStatsTask`].
#[derive(Debug, Clone)]
pub struct CalculateStatsTemplates {
    /// Raw event document, e.g. `{{data_dir}}/{{ds}}.json`.
    pub input_path: String,
    /// Output table, e.g. `{{data_dir}}/{{ds}}.csv`.
    pub output_path: String,
}

impl Default for CalculateStatsTemplates {
    fn default() -> Self {
        Self {
            input_path: "{{data_dir}}/{{ds}}.json".to_owned(),
            output_path: "{{data_dir}}/{{ds}}.csv".to_owned(),
        }
    }
}

impl CalculateStatsTemplates {
    pub fn render(&self, ctx: &TemplateContext) -> Result<CalculateStatsParams, TaskError> {
        Ok(CalculateStatsParams {
            input_path: PathBuf::from(ctx.render(&self.input_path)?),
            output_path: PathBuf::from(ctx.render(&self.output_path)?),
        })
    }
}

/// The two inputs the aggregation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculateStatsParams {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

/// Counts from one aggregation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSummary {
    /// Events read from the raw document.
    pub events: usize,
    /// Rows written (distinct `(date, user)` pairs).
    pub rows: usize,
}

/// Reads the raw document, aggregates it and writes the table.
///
/// Blocking; the task runs it on the blocking pool. Any read, parse or write
/// error aborts before the output path is touched.
pub fn calculate_stats(params: &CalculateStatsParams) -> Result<StatsSummary, TaskError> {
    let raw = fs::read(&params.input_path).map_err(|e| TaskError::io(&params.input_path, e))?;
    let events = parse_event_document(&raw).map_err(|source| TaskError::Parse {
        path: params.input_path.clone(),
        source,
    })?;
    let rows = count_by_date_and_user(&events);
    debug!(events = events.len(), rows = rows.len(), "Aggregated events");

    write_table(&params.output_path, &rows)?;
    Ok(StatsSummary {
        events: events.len(),
        rows: rows.len(),
    })
}

fn write_table(path: &Path, rows: &[DailyUserCount]) -> Result<(), TaskError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| TaskError::io(dir, e))?;

    let staging = tempfile::NamedTempFile::new_in(dir).map_err(|e| TaskError::io(dir, e))?;
    let csv_error = |source: csv::Error| TaskError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(staging);
    writer.write_record(HEADER).map_err(csv_error)?;
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }
    writer.flush().map_err(|e| TaskError::io(path, e))?;
    let staging = writer
        .into_inner()
        .map_err(|e| TaskError::io(path, e.into_error()))?;

    staging
        .persist(path)
        .map_err(|e| TaskError::io(path, e.error))?;
    Ok(())
}

/// Runs [`calculate_stats`] with paths rendered from its templates.
pub struct CalculateStatsTask {
    task_id: TaskId,
    templates: CalculateStatsTemplates,
}

impl CalculateStatsTask {
    pub fn new(task_id: TaskId, templates: CalculateStatsTemplates) -> Self {
        Self { task_id, templates }
    }
}

#[async_trait]
impl Task for CalculateStatsTask {
    fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    async fn execute(&self, ctx: &TaskContext) -> Result<TaskOutput, TaskError> {
        let params = self.templates.render(&ctx.templates)?;
        debug!(
            input = %params.input_path.display(),
            output = %params.output_path.display(),
            "Calculating stats"
        );

        let worker_params = params.clone();
        let summary = tokio::task::spawn_blocking(move || calculate_stats(&worker_params))
            .await
            .map_err(|e| TaskError::Aborted {
                message: e.to_string(),
            })??;

        info!(
            events = summary.events,
            rows = summary.rows,
            output = %params.output_path.display(),
            "Wrote stats table"
        );
        Ok(TaskOutput {
            artifact: params.output_path,
            summary: format!("{} events, {} rows", summary.events, summary.rows),
        })
    }
}
