//! Task implementations and the executor for the daily event stats DAG.
//!
//! This crate provides the two tasks of the pipeline (`fetch_events` and
//! `calculate_stats`), the [`DagExecutor`] that runs a DAG for one batch
//! window, and [`event_stats_dag`] which wires them together.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Tasks sequence calls between business logic in
//! the [`pipeline`] crate, the filesystem, and the [`pipeline::EventSource`]
//! port. The HTTP transport lives in `events-api`.

pub mod errors;
pub mod event_stats;
pub mod executor;
pub mod fetch;
pub mod stats;
pub mod task;

#[cfg(test)]
mod testing;

pub use errors::{ExecutorError, TaskError};
pub use event_stats::{event_stats_dag, EventStatsDag, CALCULATE_STATS, FETCH_EVENTS};
pub use executor::{DagExecutor, DagRunReport, TaskRun, TaskState};
pub use fetch::{FetchEventsTask, FetchParams, FetchTemplates};
pub use stats::{calculate_stats, CalculateStatsParams, CalculateStatsTask, CalculateStatsTemplates, StatsSummary};
pub use task::{Task, TaskContext, TaskOutput};
