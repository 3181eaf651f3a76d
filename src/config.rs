//! Application constants and environment-driven pipeline settings.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::pipeline::structuring::{GenerationKnobs, RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};

/// Application-level constants
pub const APP_NAME: &str = "nurse-handoff";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_STRUCTURED_MODEL: &str = "gpt-oss:20b";
pub const DEFAULT_NARRATIVE_MODEL: &str = "gemma3:4b";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_PIPELINE_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_RETRIEVAL_TOP_K: usize = 3;
pub const KNOWLEDGE_FILE_NAME: &str = "clinical_knowledge.json";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,nurse_handoff=debug,reqwest=warn,hyper=warn"
}

/// Per-user data directory (`~/.local/share/nurse-handoff` on Linux).
/// Falls back to the working directory when the platform has none.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the clinical knowledge file.
pub fn default_knowledge_path() -> PathBuf {
    app_data_dir().join(KNOWLEDGE_FILE_NAME)
}

/// Everything the pipeline and its backends need, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub ollama_url: String,
    pub structured_model: String,
    pub narrative_model: String,
    /// Per generator request.
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    /// Whole run, all phases.
    pub pipeline_timeout: Duration,
    pub knowledge_path: PathBuf,
    pub retrieval_top_k: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.into(),
            structured_model: DEFAULT_STRUCTURED_MODEL.into(),
            narrative_model: DEFAULT_NARRATIVE_MODEL.into(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
            pipeline_timeout: Duration::from_secs(DEFAULT_PIPELINE_TIMEOUT_SECS),
            knowledge_path: default_knowledge_path(),
            retrieval_top_k: DEFAULT_RETRIEVAL_TOP_K,
        }
    }
}

impl PipelineSettings {
    /// Read `HANDOFF_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Missing keys take defaults;
    /// unparseable values log a warning and take defaults too.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str, default: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        Self {
            ollama_url: text("HANDOFF_OLLAMA_URL", defaults.ollama_url),
            structured_model: text("HANDOFF_STRUCTURED_MODEL", defaults.structured_model),
            narrative_model: text("HANDOFF_NARRATIVE_MODEL", defaults.narrative_model),
            request_timeout: Duration::from_secs(parsed(
                &lookup,
                "HANDOFF_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            retry: RetryPolicy {
                max_attempts: parsed(&lookup, "HANDOFF_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS),
                delay: Duration::from_millis(parsed(
                    &lookup,
                    "HANDOFF_RETRY_DELAY_MS",
                    DEFAULT_RETRY_DELAY.as_millis() as u64,
                )),
            },
            pipeline_timeout: Duration::from_secs(parsed(
                &lookup,
                "HANDOFF_PIPELINE_TIMEOUT_SECS",
                DEFAULT_PIPELINE_TIMEOUT_SECS,
            )),
            knowledge_path: lookup("HANDOFF_KNOWLEDGE_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.knowledge_path),
            retrieval_top_k: parsed(&lookup, "HANDOFF_RETRIEVAL_TOP_K", DEFAULT_RETRIEVAL_TOP_K),
        }
    }

    pub fn structured_knobs(&self) -> GenerationKnobs {
        GenerationKnobs::structured(&self.structured_model)
    }

    pub fn narrative_knobs(&self) -> GenerationKnobs {
        GenerationKnobs::narrative(&self.narrative_model)
    }
}

fn parsed<T: FromStr + Copy + std::fmt::Display>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, default = %default, "Invalid setting, using default");
                default
            }
        },
    }
}
