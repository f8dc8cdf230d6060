//! The `canvass stats` command.
//!
//! Computes analytics offline from a JSON dump of stored responses.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use comfy_table::{Cell, Table};

use canvass_core::analytics::{aggregate_distributions, time_series, AnalyticsReport};
use canvass_core::model::Response;
use canvass_core::schema;

pub fn execute(
    form_path: PathBuf,
    responses_path: PathBuf,
    days: u32,
    output: Option<PathBuf>,
) -> Result<()> {
    let draft = schema::parse_form_file(&form_path)?;
    let form = super::offline_form(draft);

    let responses_json = std::fs::read_to_string(&responses_path)
        .with_context(|| format!("failed to read responses: {}", responses_path.display()))?;
    let responses: Vec<Response> = serde_json::from_str(&responses_json)
        .with_context(|| format!("failed to parse responses: {}", responses_path.display()))?;

    let now = Utc::now();
    let report = AnalyticsReport {
        form_id: form.id,
        generated_at: now,
        total: responses.len() as u64,
        sampled: responses.len(),
        window_days: days,
        by_day: time_series(&responses, days, now),
        distributions: aggregate_distributions(&form, &responses),
    };

    println!("Form: {} ({} responses)", form.title, report.total);

    if !report.distributions.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Field", "Option", "Count"]);
        for (field_id, buckets) in &report.distributions {
            let label = form
                .field(field_id)
                .map(|f| f.label.as_str())
                .unwrap_or(field_id.as_str());
            for (option, count) in buckets {
                table.add_row(vec![
                    Cell::new(label),
                    Cell::new(option),
                    Cell::new(count),
                ]);
            }
        }
        println!("{table}");
    }

    if !report.by_day.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Date", "Responses"]);
        for day in &report.by_day {
            table.add_row(vec![Cell::new(day.date), Cell::new(day.count)]);
        }
        println!("{table}");
    } else {
        println!("No responses in the trailing {days}-day window.");
    }

    if let Some(path) = output {
        report.save_json(&path)?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}
