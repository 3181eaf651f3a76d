use std::sync::Arc;

use tokio::sync::OnceCell;

use super::types::{CollectionLoader, KnowledgeCollection};
use crate::models::ExtractedRecord;
use crate::pipeline::structuring::StageError;

/// Separator placed between retrieved documents.
pub const DOCUMENT_SEPARATOR: &str = "\n\n---\n\n";

const OMISSION_QUERY_SUFFIX: &str = " monitoring protocol handoff requirements";

/// Lazily-opened handle on the knowledge collection.
///
/// The collection is opened on first use, at most once even when callers
/// race. A failed open is not remembered; the next call tries again.
pub struct KnowledgeRetriever {
    loader: Arc<dyn CollectionLoader>,
    opened: OnceCell<OpenCollection>,
}

struct OpenCollection {
    collection: Arc<dyn KnowledgeCollection>,
    count: usize,
}

impl KnowledgeRetriever {
    pub fn new(loader: Arc<dyn CollectionLoader>) -> Self {
        Self {
            loader,
            opened: OnceCell::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.opened.initialized()
    }

    async fn open(&self) -> Result<&OpenCollection, StageError> {
        self.opened
            .get_or_try_init(|| async {
                let collection = self.loader.open().await?;
                let count = collection.count().await?;
                if count == 0 {
                    tracing::warn!("Knowledge base is empty, retrieval will return nothing");
                } else {
                    tracing::info!(documents = count, "Knowledge base ready");
                }
                Ok::<_, StageError>(OpenCollection { collection, count })
            })
            .await
    }

    /// Top `min(k, count)` documents for `query`, joined by [`DOCUMENT_SEPARATOR`].
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<String, StageError> {
        if query.trim().is_empty() {
            return Ok(String::new());
        }

        let open = self.open().await?;
        let n = k.min(open.count);
        if n == 0 {
            return Ok(String::new());
        }

        let documents = open.collection.query(query, n).await?;
        if documents.is_empty() {
            tracing::debug!(query = %truncate(query, 80), "Knowledge query returned nothing");
            return Ok(String::new());
        }

        tracing::debug!(
            query = %truncate(query, 60),
            retrieved = documents.len(),
            top_score = documents[0].score,
            "Knowledge query"
        );
        Ok(documents
            .into_iter()
            .map(|d| d.text)
            .collect::<Vec<_>>()
            .join(DOCUMENT_SEPARATOR))
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn join_non_empty<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Query for the risk stage: medications, symptoms, vitals, chief complaint.
pub fn risk_query(extracted: &ExtractedRecord) -> String {
    let vitals: Vec<String> = extracted
        .vitals
        .iter()
        .map(|v| format!("{} {}", v.vital_type, v.value))
        .collect();

    join_non_empty(
        extracted
            .medication_names()
            .chain(extracted.symptoms.iter().map(|s| s.description.as_str()))
            .chain(vitals.iter().map(String::as_str))
            .chain(extracted.chief_complaint()),
    )
}

/// Query for the omission stage: medications, chief complaint, symptoms.
pub fn omission_query(extracted: &ExtractedRecord) -> String {
    let mut query = join_non_empty(
        extracted
            .medication_names()
            .chain(extracted.chief_complaint())
            .chain(extracted.symptoms.iter().map(|s| s.description.as_str())),
    );
    query.push_str(OMISSION_QUERY_SUFFIX);
    query
}
