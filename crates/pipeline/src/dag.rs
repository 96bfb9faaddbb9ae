//! DAG definitions: which tasks exist, which must run first, and which
//! window a run covers.
//!
//! A [`DagDefinition`] is declarative. It knows task ids and edges, not task
//! bodies; the `tasks` crate pairs each id with an implementation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

use crate::{BatchWindow, DagId, PipelineError, ScheduleInterval, TaskId};

/// A dependency edge: `upstream` must succeed before `downstream` starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    /// Task that runs first.
    pub upstream: TaskId,
    /// Task that waits for `upstream`.
    pub downstream: TaskId,
}

/// A named graph of tasks with a schedule.
///
/// Each invocation runs exactly one window. There is no catch-up: a run
/// without an explicit date processes only the most recent complete window.
#[derive(Debug, Clone, Serialize)]
pub struct DagDefinition {
    dag_id: DagId,
    start_date: NaiveDate,
    schedule: ScheduleInterval,
    tasks: Vec<TaskId>,
    edges: Vec<Edge>,
}

impl DagDefinition {
    /// Creates an empty DAG.
    pub fn new(dag_id: DagId, start_date: NaiveDate, schedule: ScheduleInterval) -> Self {
        Self {
            dag_id,
            start_date,
            schedule,
            tasks: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Declares a task. Ids must be unique.
    pub fn add_task(&mut self, task: TaskId) -> Result<(), PipelineError> {
        if self.tasks.contains(&task) {
            return Err(PipelineError::DuplicateTask { task });
        }
        self.tasks.push(task);
        Ok(())
    }

    /// Declares that `downstream` depends on `upstream`.
    ///
    /// Both tasks must already be declared. Cycles are only detected by
    /// [`DagDefinition::execution_order`], since they need the whole graph.
    pub fn add_edge(&mut self, upstream: TaskId, downstream: TaskId) -> Result<(), PipelineError> {
        for task in [&upstream, &downstream] {
            if !self.tasks.contains(task) {
                return Err(PipelineError::UnknownTask { task: task.clone() });
            }
        }
        if upstream == downstream {
            return Err(PipelineError::SelfDependency { task: upstream });
        }
        let edge = Edge {
            upstream,
            downstream,
        };
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
        Ok(())
    }

    pub fn dag_id(&self) -> &DagId {
        &self.dag_id
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn schedule(&self) -> ScheduleInterval {
        self.schedule
    }

    pub fn tasks(&self) -> &[TaskId] {
        &self.tasks
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns `true` if `task` is declared in this DAG.
    pub fn contains(&self, task: &TaskId) -> bool {
        self.tasks.contains(task)
    }

    /// Direct upstream dependencies of `task`, in declaration order.
    pub fn upstream_of(&self, task: &TaskId) -> Vec<&TaskId> {
        self.edges
            .iter()
            .filter(|edge| &edge.downstream == task)
            .map(|edge| &edge.upstream)
            .collect()
    }

    /// A topological order of all tasks.
    ///
    /// Among tasks whose dependencies are satisfied, the one declared first
    /// runs first, so the order is stable across invocations.
    pub fn execution_order(&self) -> Result<Vec<TaskId>, PipelineError> {
        let index_of = |id: &TaskId| self.tasks.iter().position(|t| t == id);

        let mut pending_upstream = vec![0usize; self.tasks.len()];
        for edge in &self.edges {
            if let Some(i) = index_of(&edge.downstream) {
                pending_upstream[i] += 1;
            }
        }

        let mut done = vec![false; self.tasks.len()];
        let mut order = Vec::with_capacity(self.tasks.len());
        while let Some(next) = (0..self.tasks.len()).find(|&i| !done[i] && pending_upstream[i] == 0)
        {
            done[next] = true;
            order.push(self.tasks[next].clone());
            for edge in self.edges.iter().filter(|e| e.upstream == self.tasks[next]) {
                if let Some(i) = index_of(&edge.downstream) {
                    pending_upstream[i] -= 1;
                }
            }
        }

        if order.len() < self.tasks.len() {
            let stuck = self
                .tasks
                .iter()
                .zip(&done)
                .filter(|(_, done)| !**done)
                .map(|(task, _)| task.clone())
                .collect();
            return Err(PipelineError::DependencyCycle { tasks: stuck });
        }
        Ok(order)
    }

    /// Resolves the window a run covers.
    ///
    /// With an explicit `date` the run covers the window containing that
    /// date; otherwise it covers the latest window complete at `now`. Windows
    /// that start before the DAG's start date are rejected.
    pub fn resolve_window(
        &self,
        date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<BatchWindow, PipelineError> {
        let window = match date {
            Some(date) => self.schedule.window_for_date(date)?,
            None => self.schedule.latest_complete_window(now)?,
        };
        debug!(dag_id = %self.dag_id, %window, explicit = date.is_some(), "Resolved batch window");

        if window.start_date() < self.start_date {
            return Err(PipelineError::WindowBeforeStartDate {
                ds: window.start_date(),
                start_date: self.start_date,
            });
        }
        Ok(window)
    }
}
