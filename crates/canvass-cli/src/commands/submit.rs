//! The `canvass submit` command.
//!
//! Dry-runs a submission: the form definition is loaded into an
//! in-memory engine, published, and fed the payload, so form authors can
//! check validation and scoring without deploying anything.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use canvass_core::engine::{EngineConfig, FormEngine};
use canvass_core::error::EngineError;
use canvass_core::model::SubmissionPayload;
use canvass_core::schema;
use canvass_store::MemoryStore;

pub async fn execute(form_path: PathBuf, payload_path: PathBuf, at: Option<String>) -> Result<()> {
    let draft = schema::parse_form_file(&form_path)?;

    let payload_json = std::fs::read_to_string(&payload_path)
        .with_context(|| format!("failed to read payload: {}", payload_path.display()))?;
    let payload: SubmissionPayload = serde_json::from_str(&payload_json)
        .with_context(|| format!("failed to parse payload: {}", payload_path.display()))?;

    let now = match at {
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .with_context(|| format!("invalid --at timestamp: {s}"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let store = Arc::new(MemoryStore::new());
    let engine = FormEngine::new(store.clone(), store, EngineConfig::default());

    let form = engine.create_form("local", draft).await?;
    engine.publish_form("local", form.id).await?;

    match engine.submit(&form.slug, payload, now).await {
        Ok(response) => {
            println!("Submission accepted: {}", response.id);
            if let (Some(score), Some(max)) = (response.score, response.max_score) {
                print!("Score: {score}/{max}");
                match response.metadata.get("passed").and_then(|v| v.as_bool()) {
                    Some(true) => println!(" (passed)"),
                    Some(false) => println!(" (failed)"),
                    None => println!(),
                }
            }
            Ok(())
        }
        Err(EngineError::Validation(violations)) => {
            for v in &violations {
                let prefix = v
                    .field
                    .as_ref()
                    .map(|id| format!("  [{id}]"))
                    .unwrap_or_else(|| "  ".to_string());
                println!("{prefix} REJECTED: {}", v.message);
            }
            anyhow::bail!("submission rejected: {} broken rule(s)", violations.len())
        }
        Err(e) => Err(e.into()),
    }
}
