//! Core domain for the daily event stats pipeline.
//!
//! This crate contains every domain concept, newtype identifier, value type
//! and error type used by the pipeline. Infrastructure crates implement the
//! traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`DagId`, `TaskId`, `DagRunId`) |
//! | [`types`] | Value types (`BatchWindow`, `EventRecord`, `DailyUserCount`) |
//! | [`schedule`] | Schedule presets and window arithmetic |
//! | [`template`] | `{{ variable }}` rendering for paths and queries |
//! | [`dag`] | DAG definition, ordering and window resolution |
//! | [`aggregate`] | Parsing and per-(date, user) counting |
//! | [`ports`] | The [`EventSource`] trait |
//! | [`errors`] | Domain error types |

pub mod aggregate;
pub mod dag;
pub mod errors;
pub mod identifiers;
pub mod ports;
pub mod schedule;
pub mod template;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use aggregate::{count_by_date_and_user, parse_event_document};
pub use dag::{DagDefinition, Edge};
pub use errors::{EventSourceError, PipelineError, TemplateError};
pub use identifiers::{DagId, DagRunId, TaskId};
pub use ports::{EventQuery, EventSource};
pub use schedule::ScheduleInterval;
pub use template::TemplateContext;
pub use types::{BatchWindow, DailyUserCount, EventRecord};
