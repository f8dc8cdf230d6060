//! Response analytics aggregation.
//!
//! Aggregation is read-only and runs over a bounded response sample; a
//! response written mid-aggregation may or may not be included.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::model::{Form, Response};

/// Default trailing window for the general-purpose time series.
pub const DEFAULT_WINDOW_DAYS: u32 = 30;
/// Narrower window used for attendance-type forms.
pub const ATTENDANCE_WINDOW_DAYS: u32 = 14;
/// Cap on the response sample an aggregation reads, for cost control.
pub const SAMPLE_CAP: usize = 200;

/// Per-field option distributions: field id → option value → count.
pub type Distributions = BTreeMap<String, BTreeMap<String, u64>>;

/// One calendar-day bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: u64,
}

/// Option distributions for every choice-kind field on a form.
///
/// Array-valued (checkbox) answers increment each selected value's bucket
/// independently, so a checkbox field's bucket counts may sum past the
/// response count.
pub fn aggregate_distributions(form: &Form, responses: &[Response]) -> Distributions {
    let mut distributions = Distributions::new();

    for field in form.fields.iter().filter(|f| f.kind.is_choice()) {
        let mut buckets: BTreeMap<String, u64> = BTreeMap::new();
        for response in responses {
            let Some(value) = response.answer(&field.id) else {
                continue;
            };
            match value {
                Value::Array(selected) => {
                    for item in selected {
                        *buckets.entry(stringify(item)).or_default() += 1;
                    }
                }
                Value::Null => {}
                scalar => *buckets.entry(stringify(scalar)).or_default() += 1,
            }
        }
        distributions.insert(field.id.clone(), buckets);
    }

    distributions
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Bucket responses by the calendar day they were submitted, keeping only
/// days within the trailing window (inclusive), ascending by date.
///
/// The window spans exactly `days` calendar days ending at `now`'s date.
pub fn time_series(responses: &[Response], days: u32, now: DateTime<Utc>) -> Vec<DayCount> {
    let today = now.date_naive();
    let cutoff = today - Duration::days(i64::from(days.saturating_sub(1)));

    let mut buckets: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for response in responses {
        let day = response.submitted_at.date_naive();
        if day >= cutoff && day <= today {
            *buckets.entry(day).or_default() += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(date, count)| DayCount { date, count })
        .collect()
}

/// Attendance summary: total plus a 14-day series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceStats {
    pub total: u64,
    pub by_day: Vec<DayCount>,
}

pub fn attendance_stats(responses: &[Response], now: DateTime<Utc>) -> AttendanceStats {
    AttendanceStats {
        total: responses.len() as u64,
        by_day: time_series(responses, ATTENDANCE_WINDOW_DAYS, now),
    }
}

/// A complete analytics snapshot for one form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub form_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// Total stored responses for the form.
    pub total: u64,
    /// How many responses the aggregation actually read.
    pub sampled: usize,
    pub window_days: u32,
    pub by_day: Vec<DayCount>,
    pub distributions: Distributions,
}

impl AnalyticsReport {
    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: AnalyticsReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }
}
