//! canvass-insight — AI summarization backends.
//!
//! Implements the `Summarizer` trait for an OpenAI-compatible HTTP
//! endpoint, plus a mock for testing, so canvass can turn a response
//! sample into a free-text insight.

pub mod config;
pub mod error;
pub mod mock;
pub mod openai;

pub use config::{create_summarizer, load_config, load_config_from, InsightConfig, SummarizerConfig};
pub use error::InsightError;
pub use mock::MockSummarizer;
pub use openai::OpenAiSummarizer;
