//! Command handlers.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use events_api::HttpEventSource;
use pipeline::{BatchWindow, DagRunId, TaskId};
use serde::Serialize;
use tasks::{event_stats_dag, DagExecutor, DagRunReport, TaskState, CALCULATE_STATS, FETCH_EVENTS};
use tracing::info;

use crate::cli::{RunArgs, ShowArgs, WindowArgs};
use crate::config::Config;

/// Builds the DAG with the HTTP event source.
pub fn build_executor(config: &Config) -> Result<DagExecutor> {
    let source = HttpEventSource::new(&config.source).context("Invalid event source settings")?;
    event_stats_dag(config.event_stats_dag(), Arc::new(source))
        .context("Failed to build the event stats DAG")
}

/// `run`: the whole DAG, or one task when `--task` is given.
pub async fn run(config: &Config, args: &RunArgs) -> Result<()> {
    let task = args
        .task
        .as_deref()
        .map(|name| TaskId::new(name).with_context(|| format!("Invalid task id '{name}'")))
        .transpose()?;
    execute(config, &args.window, task).await
}

/// `fetch` / `stats`: a single named task.
pub async fn run_single(config: &Config, args: &WindowArgs, task: &str) -> Result<()> {
    let task = TaskId::new(task).with_context(|| format!("Invalid task id '{task}'"))?;
    execute(config, args, Some(task)).await
}

async fn execute(config: &Config, args: &WindowArgs, task: Option<TaskId>) -> Result<()> {
    let executor = build_executor(config)?;
    let window = executor
        .dag()
        .resolve_window(args.date, Utc::now())
        .context("Cannot resolve the batch window")?;
    let run_id = DagRunId::new_random();
    info!(run_id = %run_id, window = %window, task = ?task.as_ref().map(TaskId::as_str), "Dispatching run");

    let report = match &task {
        Some(task) => executor.run_task(task, window, run_id).await?,
        None => executor.run(window, run_id).await?,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&report));
    }

    if !report.succeeded() {
        let failed: Vec<_> = report.failed_tasks().iter().map(|t| t.as_str()).collect();
        bail!("DAG run {} failed for {}: {}", report.run_id, report.window.ds(), failed.join(", "));
    }
    Ok(())
}

/// Plain-text rendering of a run report, one line per task.
pub fn render_report(report: &DagRunReport) -> String {
    let mut out = format!(
        "DAG {} run {} window {}\n",
        report.dag_id, report.run_id, report.window
    );
    for task in &report.tasks {
        let state = match task.state {
            TaskState::Success => "success",
            TaskState::Failed => "failed",
            TaskState::UpstreamFailed => "upstream_failed",
        };
        let detail = match (&task.output, &task.error) {
            (Some(output), _) => format!("{} ({})", output.artifact.display(), output.summary),
            (None, Some(error)) => error.clone(),
            (None, None) => String::new(),
        };
        out.push_str(&format!(
            "  {:<20} {:<16} {:>7} ms  {}\n",
            task.task_id.as_str(),
            state,
            task.elapsed_ms,
            detail
        ));
    }
    out
}

#[derive(Serialize)]
struct DagOverview<'a> {
    dag_id: &'a str,
    schedule: String,
    start_date: String,
    execution_order: Vec<TaskOverview<'a>>,
    latest_window: Option<BatchWindow>,
}

#[derive(Serialize)]
struct TaskOverview<'a> {
    task_id: &'a str,
    upstream: Vec<&'a str>,
}

/// `show`: the DAG's shape and the window a dateless run would cover.
pub fn show(config: &Config, args: &ShowArgs) -> Result<()> {
    let executor = build_executor(config)?;
    let dag = executor.dag();
    let order = dag.execution_order()?;

    let overview = DagOverview {
        dag_id: dag.dag_id().as_str(),
        schedule: dag.schedule().to_string(),
        start_date: dag.start_date().to_string(),
        execution_order: order
            .iter()
            .map(|task| TaskOverview {
                task_id: task.as_str(),
                upstream: dag.upstream_of(task).into_iter().map(TaskId::as_str).collect(),
            })
            .collect(),
        latest_window: dag.resolve_window(None, Utc::now()).ok(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
        return Ok(());
    }

    println!("DAG:        {}", overview.dag_id);
    println!("Schedule:   {} (no catch-up)", overview.schedule);
    println!("Start date: {}", overview.start_date);
    match &overview.latest_window {
        Some(window) => println!("Next run:   {} -> {}", window.ds(), window.next_ds()),
        None => println!("Next run:   none yet (start date not reached)"),
    }
    println!("Tasks:");
    for (i, task) in overview.execution_order.iter().enumerate() {
        if task.upstream.is_empty() {
            println!("  {}. {}", i + 1, task.task_id);
        } else {
            println!("  {}. {} (after {})", i + 1, task.task_id, task.upstream.join(", "));
        }
    }
    Ok(())
}
