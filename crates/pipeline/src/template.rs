//! `{{ variable }}` substitution for paths and query parameters.
//!
//! A placeholder is either `{{ name }}` or `{{ name:FORMAT }}`, where
//! `FORMAT` is a chrono strftime pattern. Formats are only accepted on the
//! datetime variables `execution_date` and `next_execution_date`; without a
//! format those render as RFC 3339.
//!
//! | Variable | Example |
//! |----------|---------|
//! | `dag_id` | `no_catch_up` |
//! | `run_id` | `5f0c…` |
//! | `ds` | `2023-11-01` |
//! | `ds_nodash` | `20231101` |
//! | `next_ds` | `2023-11-02` |
//! | `execution_date` | `2023-11-01T00:00:00+00:00` |
//! | `next_execution_date` | `2023-11-02T00:00:00+00:00` |
//!
//! Callers may add their own string variables with [`TemplateContext::with_var`].

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::{BatchWindow, DagId, DagRunId, TemplateError};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Variables available to templates for one DAG run.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    strings: BTreeMap<String, String>,
    datetimes: BTreeMap<String, DateTime<Utc>>,
}

impl TemplateContext {
    /// Builds the standard variable set for `window`.
    pub fn new(dag_id: &DagId, run_id: DagRunId, window: &BatchWindow) -> Self {
        let strings = BTreeMap::from([
            ("dag_id".to_owned(), dag_id.to_string()),
            ("run_id".to_owned(), run_id.to_string()),
            ("ds".to_owned(), window.ds()),
            ("ds_nodash".to_owned(), window.ds_nodash()),
            ("next_ds".to_owned(), window.next_ds()),
        ]);
        let datetimes = BTreeMap::from([
            ("execution_date".to_owned(), window.start()),
            ("next_execution_date".to_owned(), window.end()),
        ]);
        Self { strings, datetimes }
    }

    /// Adds (or replaces) a plain string variable.
    #[must_use]
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.strings.insert(name.into(), value.into());
        self
    }

    /// Looks up a string variable.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.strings.get(name).map(String::as_str)
    }

    /// Renders `template`, replacing every placeholder.
    pub fn render(&self, template: &str) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        let mut consumed = 0;

        while let Some(open) = rest.find(OPEN) {
            out.push_str(&rest[..open]);
            let body_start = open + OPEN.len();
            let close = rest[body_start..]
                .find(CLOSE)
                .ok_or_else(|| TemplateError::Unterminated {
                    template: template.to_owned(),
                    offset: consumed + open,
                })?;
            self.expand(rest[body_start..body_start + close].trim(), &mut out)?;

            let next = body_start + close + CLOSE.len();
            consumed += next;
            rest = &rest[next..];
        }
        out.push_str(rest);
        Ok(out)
    }

    fn expand(&self, placeholder: &str, out: &mut String) -> Result<(), TemplateError> {
        let (name, format) = match placeholder.split_once(':') {
            Some((name, format)) => (name.trim(), Some(format.trim())),
            None => (placeholder, None),
        };

        if let Some(value) = self.strings.get(name) {
            if format.is_some() {
                return Err(TemplateError::FormatNotSupported {
                    name: name.to_owned(),
                });
            }
            out.push_str(value);
            return Ok(());
        }

        let Some(value) = self.datetimes.get(name) else {
            return Err(TemplateError::UnknownVariable {
                name: name.to_owned(),
            });
        };
        match format {
            None => out.push_str(&value.to_rfc3339()),
            // chrono reports an unusable pattern as a fmt::Error from Display.
            Some(format) => write!(out, "{}", value.format(format)).map_err(|_| {
                TemplateError::InvalidFormat {
                    name: name.to_owned(),
                    format: format.to_owned(),
                }
            })?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScheduleInterval;
    use chrono::NaiveDate;

    fn context() -> TemplateContext {
        let window =
            ScheduleInterval::Daily.window_for_date(NaiveDate::from_ymd_opt(2023, 11, 1).unwrap()).unwrap();
        TemplateContext::new(&DagId::new("no_catch_up").unwrap(), DagRunId::new_random(), &window)
            .with_var("data_dir", "/tmp")
    }

    #[test]
    fn renders_plain_variables() {
        let ctx = context();
        assert_eq!(ctx.render("{{data_dir}}/{{ds}}.json").unwrap(), "/tmp/2023-11-01.json");
        assert_eq!(ctx.render("{{ data_dir }}/{{ ds_nodash }}.csv").unwrap(), "/tmp/20231101.csv");
        assert_eq!(ctx.render("no placeholders").unwrap(), "no placeholders");
    }

    #[test]
    fn renders_datetimes_with_and_without_format() {
        let ctx = context();
        assert_eq!(
            ctx.render("start_date={{execution_date:%Y-%m-%d}}&end_date={{next_execution_date:%Y-%m-%d}}")
                .unwrap(),
            "start_date=2023-11-01&end_date=2023-11-02"
        );
        assert_eq!(ctx.render("{{execution_date}}").unwrap(), "2023-11-01T00:00:00+00:00");
        assert_eq!(ctx.render("{{ execution_date:%H:%M }}").unwrap(), "00:00");
    }

    #[test]
    fn rejects_unknown_variables() {
        assert_eq!(
            context().render("{{ tomorrow }}").unwrap_err(),
            TemplateError::UnknownVariable {
                name: "tomorrow".to_owned()
            }
        );
    }

    #[test]
    fn rejects_formats_on_string_variables() {
        assert!(matches!(
            context().render("{{ds:%Y}}"),
            Err(TemplateError::FormatNotSupported { .. })
        ));
    }

    #[test]
    fn rejects_invalid_strftime_patterns() {
        assert!(matches!(
            context().render("{{execution_date:%Y-%}}"),
            Err(TemplateError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn reports_offset_of_unterminated_placeholder() {
        assert_eq!(
            context().render("{{ds}}/{{data_dir").unwrap_err(),
            TemplateError::Unterminated {
                template: "{{ds}}/{{data_dir".to_owned(),
                offset: 7,
            }
        );
    }
}
