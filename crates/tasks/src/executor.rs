//! Sequential DAG execution for one batch window.
//!
//! The executor walks the DAG's execution order and awaits each task before
//! starting the next. A failed task marks every task downstream of it as
//! [`TaskState::UpstreamFailed`]; tasks that do not depend on the failure
//! still run. Nothing is retried.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use pipeline::{BatchWindow, DagDefinition, DagId, DagRunId, TaskId, TemplateContext};
use serde::Serialize;
use tracing::{error, info, info_span, warn, Instrument};

use crate::{ExecutorError, Task, TaskContext, TaskOutput};

/// Final state of one task in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Success,
    Failed,
    /// Not run because a task it depends on did not succeed.
    UpstreamFailed,
}

/// Outcome of one task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRun {
    pub task_id: TaskId,
    pub state: TaskState,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<TaskOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a whole run, in execution order.
#[derive(Debug, Clone, Serialize)]
pub struct DagRunReport {
    pub dag_id: DagId,
    pub run_id: DagRunId,
    pub window: BatchWindow,
    pub tasks: Vec<TaskRun>,
}

impl DagRunReport {
    /// `true` when every task that was scheduled succeeded.
    pub fn succeeded(&self) -> bool {
        self.tasks.iter().all(|t| t.state == TaskState::Success)
    }

    /// Ids of tasks that ran and failed.
    pub fn failed_tasks(&self) -> Vec<&TaskId> {
        self.tasks
            .iter()
            .filter(|t| t.state == TaskState::Failed)
            .map(|t| &t.task_id)
            .collect()
    }

    pub fn task(&self, task_id: &TaskId) -> Option<&TaskRun> {
        self.tasks.iter().find(|t| &t.task_id == task_id)
    }
}

/// Runs a [`DagDefinition`] with registered task implementations.
pub struct DagExecutor {
    dag: DagDefinition,
    tasks: HashMap<TaskId, Arc<dyn Task>>,
    variables: BTreeMap<String, String>,
}

impl DagExecutor {
    pub fn new(dag: DagDefinition) -> Self {
        Self {
            dag,
            tasks: HashMap::new(),
            variables: BTreeMap::new(),
        }
    }

    /// Registers the implementation for a declared task.
    pub fn register(&mut self, task: Arc<dyn Task>) -> Result<(), ExecutorError> {
        let task_id = task.task_id().clone();
        if !self.dag.contains(&task_id) {
            return Err(ExecutorError::Undeclared {
                task: task_id,
                dag_id: self.dag.dag_id().to_string(),
            });
        }
        self.tasks.insert(task_id, task);
        Ok(())
    }

    /// Adds a template variable available to every task, e.g. `data_dir`.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn dag(&self) -> &DagDefinition {
        &self.dag
    }

    /// Runs every task for `window` in dependency order.
    pub async fn run(
        &self,
        window: BatchWindow,
        run_id: DagRunId,
    ) -> Result<DagRunReport, ExecutorError> {
        let order = self.dag.execution_order()?;
        self.execute(order, window, run_id, true).await
    }

    /// Runs a single task for `window`, ignoring its upstream dependencies.
    pub async fn run_task(
        &self,
        task_id: &TaskId,
        window: BatchWindow,
        run_id: DagRunId,
    ) -> Result<DagRunReport, ExecutorError> {
        if !self.dag.contains(task_id) {
            return Err(pipeline::PipelineError::UnknownTask {
                task: task_id.clone(),
            }
            .into());
        }
        self.execute(vec![task_id.clone()], window, run_id, false).await
    }

    async fn execute(
        &self,
        order: Vec<TaskId>,
        window: BatchWindow,
        run_id: DagRunId,
        respect_upstream: bool,
    ) -> Result<DagRunReport, ExecutorError> {
        // Resolve every implementation before anything runs.
        let resolved = order
            .into_iter()
            .map(|id| match self.tasks.get(&id) {
                Some(task) => Ok((id, Arc::clone(task))),
                None => Err(ExecutorError::Unregistered { task: id }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let dag_id = self.dag.dag_id().clone();
        let templates = self
            .variables
            .iter()
            .fold(TemplateContext::new(&dag_id, run_id, &window), |ctx, (k, v)| {
                ctx.with_var(k.as_str(), v.as_str())
            });
        let ctx = TaskContext {
            dag_id: dag_id.clone(),
            run_id,
            window,
            templates,
        };

        let span = info_span!("dag_run", dag_id = %dag_id, run_id = %run_id, ds = %window.ds());
        async move {
            info!(window = %window, tasks = resolved.len(), "Starting DAG run");

            let mut not_ok: HashSet<TaskId> = HashSet::new();
            let mut runs = Vec::with_capacity(resolved.len());
            for (task_id, task) in resolved {
                let blocked = respect_upstream
                    && self
                        .dag
                        .upstream_of(&task_id)
                        .into_iter()
                        .any(|up| not_ok.contains(up));
                if blocked {
                    warn!(task_id = %task_id, "Skipping task: upstream failed");
                    not_ok.insert(task_id.clone());
                    runs.push(TaskRun {
                        task_id,
                        state: TaskState::UpstreamFailed,
                        elapsed_ms: 0,
                        output: None,
                        error: None,
                    });
                    continue;
                }

                let started = Instant::now();
                let result = task
                    .execute(&ctx)
                    .instrument(info_span!("task", task_id = %task_id))
                    .await;
                let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

                match result {
                    Ok(output) => {
                        info!(task_id = %task_id, elapsed_ms, summary = %output.summary, "Task succeeded");
                        runs.push(TaskRun {
                            task_id,
                            state: TaskState::Success,
                            elapsed_ms,
                            output: Some(output),
                            error: None,
                        });
                    }
                    Err(e) => {
                        error!(task_id = %task_id, elapsed_ms, error = %e, "Task failed");
                        not_ok.insert(task_id.clone());
                        runs.push(TaskRun {
                            task_id,
                            state: TaskState::Failed,
                            elapsed_ms,
                            output: None,
                            error: Some(e.to_string()),
                        });
                    }
                }
            }

            let report = DagRunReport {
                dag_id,
                run_id,
                window,
                tasks: runs,
            };
            if report.succeeded() {
                info!("DAG run succeeded");
            } else {
                error!(failed = ?report.failed_tasks(), "DAG run failed");
            }
            Ok(report)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TaskError, testing::RecordingTask};
    use chrono::NaiveDate;
    use pipeline::ScheduleInterval;
    use std::sync::Mutex;

    fn id(s: &str) -> TaskId {
        TaskId::new(s).unwrap()
    }

    fn window() -> BatchWindow {
        ScheduleInterval::Daily.window_for_date(NaiveDate::from_ymd_opt(2023, 11, 1).unwrap()).unwrap()
    }

    fn executor(tasks: &[&str], edges: &[(&str, &str)], failing: &[&str]) -> (DagExecutor, Arc<Mutex<Vec<String>>>) {
        let mut dag = DagDefinition::new(
            DagId::new("test_dag").unwrap(),
            NaiveDate::from_ymd_opt(2023, 11, 1).unwrap(),
            ScheduleInterval::Daily,
        );
        for task in tasks {
            dag.add_task(id(task)).unwrap();
        }
        for (up, down) in edges {
            dag.add_edge(id(up), id(down)).unwrap();
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut executor = DagExecutor::new(dag).with_variable("data_dir", "/data");
        for task in tasks {
            executor
                .register(Arc::new(RecordingTask::new(id(task), failing.contains(task), log.clone())))
                .unwrap();
        }
        (executor, log)
    }

    #[tokio::test]
    async fn runs_tasks_in_dependency_order() {
        let (executor, log) = executor(
            &["calculate_stats", "fetch_events"],
            &[("fetch_events", "calculate_stats")],
            &[],
        );

        let report = executor.run(window(), DagRunId::new_random()).await.unwrap();

        assert!(report.succeeded());
        assert_eq!(*log.lock().unwrap(), vec!["fetch_events /data 2023-11-01", "calculate_stats /data 2023-11-01"]);
    }

    #[tokio::test]
    async fn failure_blocks_downstream_but_not_independent_tasks() {
        let (executor, log) = executor(
            &["fetch_events", "calculate_stats", "cleanup"],
            &[("fetch_events", "calculate_stats")],
            &["fetch_events"],
        );

        let report = executor.run(window(), DagRunId::new_random()).await.unwrap();

        assert!(!report.succeeded());
        assert_eq!(report.failed_tasks(), vec![&id("fetch_events")]);
        assert_eq!(report.task(&id("calculate_stats")).unwrap().state, TaskState::UpstreamFailed);
        assert_eq!(report.task(&id("cleanup")).unwrap().state, TaskState::Success);
        assert_eq!(log.lock().unwrap().len(), 2);
        assert!(report.task(&id("fetch_events")).unwrap().error.as_deref().unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn single_task_runs_without_upstream() {
        let (executor, log) = executor(
            &["fetch_events", "calculate_stats"],
            &[("fetch_events", "calculate_stats")],
            &["fetch_events"],
        );

        let report = executor
            .run_task(&id("calculate_stats"), window(), DagRunId::new_random())
            .await
            .unwrap();

        assert!(report.succeeded());
        assert_eq!(report.tasks.len(), 1);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_and_unregistered_tasks_are_rejected() {
        let (mut executor, _) = executor(&["a"], &[], &[]);
        assert!(matches!(
            executor.run_task(&id("b"), window(), DagRunId::new_random()).await,
            Err(ExecutorError::Pipeline(pipeline::PipelineError::UnknownTask { .. }))
        ));

        let log = Arc::new(Mutex::new(Vec::new()));
        assert!(matches!(
            executor.register(Arc::new(RecordingTask::new(id("b"), false, log))),
            Err(ExecutorError::Undeclared { .. })
        ));

        let mut dag = DagDefinition::new(
            DagId::new("bare").unwrap(),
            NaiveDate::from_ymd_opt(2023, 11, 1).unwrap(),
            ScheduleInterval::Daily,
        );
        dag.add_task(id("a")).unwrap();
        let bare = DagExecutor::new(dag);
        assert!(matches!(
            bare.run(window(), DagRunId::new_random()).await,
            Err(ExecutorError::Unregistered { .. })
        ));
    }

    #[test]
    fn task_error_messages_carry_paths() {
        let err = TaskError::io(
            "/tmp/x.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(err.to_string(), "I/O error on /tmp/x.json: missing");
    }
}
