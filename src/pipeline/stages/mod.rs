//! The five reasoning stages. Each one builds a prompt, calls the generator
//! through the extractor and retry envelope, and never fails: any
//! [`StageError`](crate::pipeline::structuring::StageError) is absorbed into
//! the stage's own fallback record.

pub mod extract;
pub mod temporal;
pub mod risk;
pub mod omissions;
pub mod summarize;

pub use extract::extract_entities;
pub use omissions::analyze_omissions;
pub use risk::detect_risks;
pub use summarize::summarize_handoff;
pub use temporal::resolve_temporal;

use std::sync::Arc;

use serde::Serialize;

use crate::pipeline::rag::KnowledgeRetriever;
use crate::pipeline::structuring::{GenerationKnobs, LlmClient, RetryPolicy, StageError};

/// Everything a stage needs besides its inputs. Shared read-only by all
/// stages of all runs.
pub struct StageEnv {
    pub llm: Arc<dyn LlmClient>,
    pub retriever: Arc<KnowledgeRetriever>,
    /// Knobs for the four JSON-producing stages.
    pub structured: GenerationKnobs,
    /// Knobs for the narrative summary.
    pub narrative: GenerationKnobs,
    pub retry: RetryPolicy,
    pub retrieval_top_k: usize,
}

/// Pretty JSON for embedding a record in a prompt.
pub(crate) fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Retrieved knowledge, or `placeholder` when nothing came back.
///
/// A retrieval outage is returned as-is; the calling stage falls back.
pub(crate) async fn knowledge_or(
    env: &StageEnv,
    stage: &'static str,
    query: &str,
    placeholder: &str,
) -> Result<String, StageError> {
    let text = env
        .retriever
        .retrieve(query, env.retrieval_top_k)
        .await
        .inspect_err(|e| tracing::warn!(stage, error = %e, "Knowledge retrieval failed"))?;
    if text.is_empty() {
        return Ok(placeholder.to_string());
    }
    Ok(text)
}
