//! AI summarization collaborator contract.
//!
//! Implemented by `canvass-insight`; the engine only ever sees this
//! trait. Summaries are an opaque external capability: the engine hands
//! over a bounded sample digest and gets back a free-text insight.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{Form, Response};

/// Trait for backends that turn a response sample into a short insight.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Human-readable backend name (e.g. "openai").
    fn name(&self) -> &str;

    /// Produce a free-text insight for a response sample.
    async fn summarize(&self, request: &SummaryRequest) -> anyhow::Result<String>;
}

/// What a summarizer receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub form_title: String,
    /// Total responses stored for the form, which may exceed the sample.
    pub response_count: u64,
    /// One line per sampled answer: "<label>: <value>".
    pub sample_lines: Vec<String>,
}

impl SummaryRequest {
    /// Build a request from a form and a response sample, one digest line
    /// per answered public field.
    pub fn from_sample(form: &Form, responses: &[Response], total: u64) -> Self {
        let mut sample_lines = Vec::new();
        for response in responses {
            for field in form.public_fields() {
                if let Some(value) = response.answer(&field.id) {
                    if !value.is_null() {
                        sample_lines.push(format!("{}: {}", field.label, value));
                    }
                }
            }
        }
        Self {
            form_title: form.title.clone(),
            response_count: total,
            sample_lines,
        }
    }
}
