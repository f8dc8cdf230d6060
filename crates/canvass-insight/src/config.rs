//! Summarizer configuration and factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use canvass_core::summary::Summarizer;

use crate::mock::MockSummarizer;
use crate::openai::OpenAiSummarizer;

/// Configuration for a summarization backend.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure
/// in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SummarizerConfig {
    OpenAi {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
    Mock {
        #[serde(default)]
        reply: String,
    },
}

impl std::fmt::Debug for SummarizerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummarizerConfig::OpenAi {
                api_key: _,
                base_url,
                model,
            } => f
                .debug_struct("OpenAi")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
            SummarizerConfig::Mock { reply } => {
                f.debug_struct("Mock").field("reply", reply).finish()
            }
        }
    }
}

/// Top-level canvass configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsightConfig {
    /// Summarization backend, if any.
    #[serde(default)]
    pub summarizer: Option<SummarizerConfig>,
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_summarizer_config(config: &SummarizerConfig) -> SummarizerConfig {
    match config {
        SummarizerConfig::OpenAi {
            api_key,
            base_url,
            model,
        } => SummarizerConfig::OpenAi {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            model: model.clone(),
        },
        SummarizerConfig::Mock { reply } => SummarizerConfig::Mock {
            reply: reply.clone(),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `canvass.toml` in the current directory
/// 2. `~/.config/canvass/config.toml`
///
/// Environment variable override: `CANVASS_OPENAI_KEY`.
pub fn load_config() -> Result<InsightConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<InsightConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("canvass.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<InsightConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => InsightConfig::default(),
    };

    // Apply env var override
    if let Ok(key) = std::env::var("CANVASS_OPENAI_KEY") {
        match config.summarizer.as_mut() {
            Some(SummarizerConfig::OpenAi { api_key, .. }) => *api_key = key,
            _ => {
                config.summarizer = Some(SummarizerConfig::OpenAi {
                    api_key: key,
                    base_url: None,
                    model: None,
                });
            }
        }
    }

    config.summarizer = config.summarizer.as_ref().map(resolve_summarizer_config);

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("canvass"))
}

/// Create a summarizer instance from its configuration.
pub fn create_summarizer(config: &SummarizerConfig) -> Arc<dyn Summarizer> {
    match config {
        SummarizerConfig::OpenAi {
            api_key,
            base_url,
            model,
        } => Arc::new(OpenAiSummarizer::new(
            api_key,
            base_url.clone(),
            model.clone(),
        )),
        SummarizerConfig::Mock { reply } => Arc::new(MockSummarizer::with_fixed_reply(reply)),
    }
}
