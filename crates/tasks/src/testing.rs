//! Fakes shared by the unit tests in this crate.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use pipeline::{
    DagId, DagRunId, EventQuery, EventSource, EventSourceError, ScheduleInterval, TaskId,
    TemplateContext,
};

use crate::{Task, TaskContext, TaskError, TaskOutput};

/// A daily-window context for `ds` with `data_dir` pointing at `data_dir`.
pub(crate) fn context_for(data_dir: &Path, ds: &str) -> TaskContext {
    let date = NaiveDate::parse_from_str(ds, "%Y-%m-%d").unwrap();
    let window = ScheduleInterval::Daily.window_for_date(date).unwrap();
    let dag_id = DagId::new("test_dag").unwrap();
    let run_id = DagRunId::new_random();
    TaskContext {
        templates: TemplateContext::new(&dag_id, run_id, &window)
            .with_var("data_dir", data_dir.to_string_lossy()),
        dag_id,
        run_id,
        window,
    }
}

enum Reply {
    Body(Vec<u8>),
    Status(u16),
}

/// Answers every query with the same body or status, recording the queries.
pub(crate) struct StaticEventSource {
    reply: Reply,
    queries: Mutex<Vec<EventQuery>>,
}

impl StaticEventSource {
    pub(crate) fn ok(body: Vec<u8>) -> Self {
        Self {
            reply: Reply::Body(body),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(status: u16) -> Self {
        Self {
            reply: Reply::Status(status),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn queries(&self) -> Vec<EventQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSource for StaticEventSource {
    async fn fetch_events(&self, query: &EventQuery) -> Result<Vec<u8>, EventSourceError> {
        self.queries.lock().unwrap().push(query.clone());
        match &self.reply {
            Reply::Body(body) => Ok(body.clone()),
            Reply::Status(status) => Err(EventSourceError::Status {
                url: "http://events.test/events".to_owned(),
                status: *status,
            }),
        }
    }
}

/// Appends `"<task_id> <data_dir> <ds>"` to a shared log, then succeeds or
/// fails with `"boom"`.
pub(crate) struct RecordingTask {
    task_id: TaskId,
    fail: bool,
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingTask {
    pub(crate) fn new(task_id: TaskId, fail: bool, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self { task_id, fail, log }
    }
}

#[async_trait]
impl Task for RecordingTask {
    fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    async fn execute(&self, ctx: &TaskContext) -> Result<TaskOutput, TaskError> {
        let entry = ctx.templates.render(&format!("{} {{{{data_dir}}}} {{{{ds}}}}", self.task_id))?;
        self.log.lock().unwrap().push(entry);
        if self.fail {
            return Err(TaskError::Aborted {
                message: "boom".to_owned(),
            });
        }
        Ok(TaskOutput {
            artifact: "/dev/null".into(),
            summary: "recorded".to_owned(),
        })
    }
}
