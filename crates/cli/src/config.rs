//! TOML configuration for the event stats binary.
//!
//! Every section and key is optional; omitted values take the defaults
//! below. CLI flags and their environment variables override the file.
//!
//! ```toml
//! [dag]
//! dag_id = "no_catch_up"
//! start_date = "2023-11-01"
//! schedule = "@daily"
//!
//! [source]
//! base_url = "http://localhost:5000"
//! endpoint = "events"
//! timeout_secs = 30
//!
//! [storage]
//! data_dir = "/tmp"
//!
//! [templates]
//! raw_events = "{{data_dir}}/{{ds}}.json"
//! stats_table = "{{data_dir}}/{{ds}}.csv"
//! query_start = "{{execution_date:%Y-%m-%d}}"
//! query_end = "{{next_execution_date:%Y-%m-%d}}"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use events_api::HttpEventSourceConfig;
use pipeline::{DagId, ScheduleInterval};
use serde::{Deserialize, Serialize};
use tasks::{CalculateStatsTemplates, EventStatsDag, FetchTemplates};
use tracing::{debug, info};

/// Used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "event-stats.toml";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub dag: DagSection,
    pub source: HttpEventSourceConfig,
    pub storage: StorageSection,
    pub templates: TemplateSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DagSection {
    pub dag_id: DagId,
    /// First logical date the DAG may run for.
    pub start_date: NaiveDate,
    pub schedule: ScheduleInterval,
}

impl Default for DagSection {
    fn default() -> Self {
        Self {
            dag_id: DagId::new("no_catch_up").expect("default DAG id is non-empty"),
            start_date: NaiveDate::from_ymd_opt(2023, 11, 1).expect("default start date is valid"),
            schedule: ScheduleInterval::Daily,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSection {
    /// Exposed to templates as `{{data_dir}}`.
    pub data_dir: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/tmp"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateSection {
    /// Raw download path; written by fetch_events, read by calculate_stats.
    pub raw_events: String,
    /// Aggregated table path.
    pub stats_table: String,
    /// `start_date` query parameter.
    pub query_start: String,
    /// `end_date` query parameter.
    pub query_end: String,
}

impl Default for TemplateSection {
    fn default() -> Self {
        let fetch = FetchTemplates::default();
        let stats = CalculateStatsTemplates::default();
        Self {
            raw_events: fetch.output_path,
            stats_table: stats.output_path,
            query_start: fetch.start_date,
            query_end: fetch.end_date,
        }
    }
}

impl Config {
    /// Loads the configuration.
    ///
    /// An explicitly requested file must exist. When no path is given the
    /// default file is read if present, otherwise defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_PATH), false),
        };

        if !explicit && !path.exists() {
            debug!(path = %path.display(), "No configuration file; using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid configuration file {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Applies command-line overrides.
    pub fn with_overrides(mut self, base_url: Option<String>, data_dir: Option<PathBuf>) -> Self {
        if let Some(base_url) = base_url {
            self.source.base_url = base_url;
        }
        if let Some(data_dir) = data_dir {
            self.storage.data_dir = data_dir;
        }
        self
    }

    /// DAG settings for [`tasks::event_stats_dag`].
    pub fn event_stats_dag(&self) -> EventStatsDag {
        EventStatsDag {
            dag_id: self.dag.dag_id.clone(),
            start_date: self.dag.start_date,
            schedule: self.dag.schedule,
            data_dir: self.storage.data_dir.clone(),
            fetch: FetchTemplates {
                output_path: self.templates.raw_events.clone(),
                start_date: self.templates.query_start.clone(),
                end_date: self.templates.query_end.clone(),
            },
            stats: CalculateStatsTemplates {
                input_path: self.templates.raw_events.clone(),
                output_path: self.templates.stats_table.clone(),
            },
        }
    }
}
