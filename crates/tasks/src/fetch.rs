//! The `fetch_events` task: download one window's raw events to disk.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use pipeline::{EventQuery, EventSource, TaskId, TemplateContext};
use tracing::{debug, info};

use crate::{Task, TaskContext, TaskError, TaskOutput};

/// Unrendered templates for [`FetchEventsTask`].
#[derive(Debug, Clone)]
pub struct FetchTemplates {
    /// Where the raw body is written, e.g. `{{data_dir}}/{{ds}}.json`.
    pub output_path: String,
    /// `start_date` query value, e.g. `{{execution_date:%Y-%m-%d}}`.
    pub start_date: String,
    /// `end_date` query value, e.g. `{{next_execution_date:%Y-%m-%d}}`.
    pub end_date: String,
}

impl Default for FetchTemplates {
    fn default() -> Self {
        Self {
            output_path: "{{data_dir}}/{{ds}}.json".to_owned(),
            start_date: "{{execution_date:%Y-%m-%d}}".to_owned(),
            end_date: "{{next_execution_date:%Y-%m-%d}}".to_owned(),
        }
    }
}

impl FetchTemplates {
    /// Renders every template for one run.
    pub fn render(&self, ctx: &TemplateContext) -> Result<FetchParams, TaskError> {
        Ok(FetchParams {
            output_path: PathBuf::from(ctx.render(&self.output_path)?),
            query: EventQuery {
                start_date: ctx.render(&self.start_date)?,
                end_date: ctx.render(&self.end_date)?,
            },
        })
    }
}

/// Rendered parameters for one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchParams {
    pub output_path: PathBuf,
    pub query: EventQuery,
}

/// Requests the window's events and stores the response body verbatim.
pub struct FetchEventsTask {
    task_id: TaskId,
    source: Arc<dyn EventSource>,
    templates: FetchTemplates,
}

impl FetchEventsTask {
    pub fn new(task_id: TaskId, source: Arc<dyn EventSource>, templates: FetchTemplates) -> Self {
        Self {
            task_id,
            source,
            templates,
        }
    }
}

#[async_trait]
impl Task for FetchEventsTask {
    fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    async fn execute(&self, ctx: &TaskContext) -> Result<TaskOutput, TaskError> {
        let params = self.templates.render(&ctx.templates)?;
        debug!(
            start_date = %params.query.start_date,
            end_date = %params.query.end_date,
            output = %params.output_path.display(),
            "Fetching events"
        );

        let body = self.source.fetch_events(&params.query).await?;

        if let Some(parent) = params.output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TaskError::io(parent, e))?;
        }
        tokio::fs::write(&params.output_path, &body)
            .await
            .map_err(|e| TaskError::io(&params.output_path, e))?;

        info!(bytes = body.len(), output = %params.output_path.display(), "Stored raw events");
        Ok(TaskOutput {
            summary: format!("{} bytes", body.len()),
            artifact: params.output_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context_for, StaticEventSource};
    use pipeline::EventSourceError;

    #[tokio::test]
    async fn writes_body_verbatim_under_window_date() {
        let dir = tempfile::tempdir().unwrap();
        let body = br#"[{"date":"2023-11-01","user":"a"}]"#.to_vec();
        let source = Arc::new(StaticEventSource::ok(body.clone()));
        let task = FetchEventsTask::new(
            TaskId::new("fetch_events").unwrap(),
            source.clone(),
            FetchTemplates::default(),
        );

        let output = task.execute(&context_for(dir.path(), "2023-11-01")).await.unwrap();

        let expected = dir.path().join("2023-11-01.json");
        assert_eq!(output.artifact, expected);
        assert_eq!(std::fs::read(&expected).unwrap(), body);
        assert_eq!(
            source.queries(),
            vec![EventQuery {
                start_date: "2023-11-01".to_owned(),
                end_date: "2023-11-02".to_owned(),
            }]
        );
    }

    #[tokio::test]
    async fn creates_missing_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("raw").join("events");
        let task = FetchEventsTask::new(
            TaskId::new("fetch_events").unwrap(),
            Arc::new(StaticEventSource::ok(b"[]".to_vec())),
            FetchTemplates::default(),
        );

        task.execute(&context_for(&nested, "2023-11-03")).await.unwrap();
        assert!(nested.join("2023-11-03.json").is_file());
    }

    #[tokio::test]
    async fn source_errors_fail_the_task_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let task = FetchEventsTask::new(
            TaskId::new("fetch_events").unwrap(),
            Arc::new(StaticEventSource::failing(503)),
            FetchTemplates::default(),
        );

        let err = task.execute(&context_for(dir.path(), "2023-11-01")).await.unwrap_err();
        assert!(matches!(err, TaskError::Fetch(EventSourceError::Status { status: 503, .. })));
        assert!(!dir.path().join("2023-11-01.json").exists());
    }
}
