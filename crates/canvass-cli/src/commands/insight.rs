//! The `canvass insight` command.
//!
//! Summarizes a response dump with the configured AI backend.

use std::path::PathBuf;

use anyhow::{Context, Result};

use canvass_core::analytics::SAMPLE_CAP;
use canvass_core::model::Response;
use canvass_core::schema;
use canvass_core::summary::{Summarizer, SummaryRequest};
use canvass_insight::{create_summarizer, load_config_from};

pub async fn execute(
    form_path: PathBuf,
    responses_path: PathBuf,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let Some(summarizer_config) = config.summarizer else {
        anyhow::bail!("no summarizer configured; add a [summarizer] section to canvass.toml");
    };
    let summarizer = create_summarizer(&summarizer_config);

    let draft = schema::parse_form_file(&form_path)?;
    let form = super::offline_form(draft);

    let responses_json = std::fs::read_to_string(&responses_path)
        .with_context(|| format!("failed to read responses: {}", responses_path.display()))?;
    let responses: Vec<Response> = serde_json::from_str(&responses_json)
        .with_context(|| format!("failed to parse responses: {}", responses_path.display()))?;

    let total = responses.len() as u64;
    let sample = &responses[..responses.len().min(SAMPLE_CAP)];
    let request = SummaryRequest::from_sample(&form, sample, total);

    let insight = summarizer.summarize(&request).await?;
    println!("Insight ({}):", summarizer.name());
    println!("{insight}");

    Ok(())
}
