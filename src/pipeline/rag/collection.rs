use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use super::types::{CollectionLoader, KnowledgeCollection, KnowledgeDocument, ScoredDocument};
use crate::pipeline::structuring::StageError;

type TermVector = HashMap<String, f32>;

/// In-memory collection ranked by cosine similarity of term-frequency vectors.
///
/// Ties keep insertion order.
#[derive(Default)]
pub struct InMemoryCollection {
    entries: Vec<StoredEntry>,
}

struct StoredEntry {
    document: KnowledgeDocument,
    terms: TermVector,
}

impl InMemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents(documents: Vec<KnowledgeDocument>) -> Self {
        let mut collection = Self::new();
        for document in documents {
            collection.add(document);
        }
        collection
    }

    pub fn add(&mut self, document: KnowledgeDocument) {
        let terms = term_frequencies(&document.text);
        self.entries.push(StoredEntry { document, terms });
    }

    fn rank(&self, text: &str, k: usize) -> Vec<ScoredDocument> {
        let query = term_frequencies(text);

        let mut scored: Vec<(f32, &StoredEntry)> = self
            .entries
            .iter()
            .map(|entry| (cosine_similarity(&query, &entry.terms), entry))
            .collect();

        // Stable sort, so equal scores stay in insertion order.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .take(k)
            .map(|(score, entry)| ScoredDocument {
                id: entry.document.id.clone(),
                text: entry.document.text.clone(),
                score,
            })
            .collect()
    }
}

#[async_trait]
impl KnowledgeCollection for InMemoryCollection {
    async fn count(&self) -> Result<usize, StageError> {
        Ok(self.entries.len())
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredDocument>, StageError> {
        Ok(self.rank(text, k))
    }
}

fn term_frequencies(text: &str) -> TermVector {
    let mut terms = TermVector::new();
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        *terms.entry(token.to_lowercase()).or_insert(0.0) += 1.0;
    }
    terms
}

fn cosine_similarity(a: &TermVector, b: &TermVector) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let dot: f32 = a
        .iter()
        .filter_map(|(term, x)| b.get(term).map(|y| x * y))
        .sum();
    let norm_a: f32 = a.values().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.values().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Loads a JSON array of `{"id", "text"}` objects into an [`InMemoryCollection`].
///
/// A missing file opens as an empty collection.
pub struct JsonFileLoader {
    path: PathBuf,
}

impl JsonFileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CollectionLoader for JsonFileLoader {
    async fn open(&self) -> Result<Arc<dyn KnowledgeCollection>, StageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Knowledge file not found");
                return Ok(Arc::new(InMemoryCollection::new()));
            }
            Err(e) => {
                return Err(StageError::CollaboratorUnavailable(format!(
                    "Cannot read {}: {e}",
                    self.path.display()
                )))
            }
        };

        let documents: Vec<KnowledgeDocument> = serde_json::from_slice(&bytes).map_err(|e| {
            StageError::CollaboratorUnavailable(format!(
                "Invalid knowledge file {}: {e}",
                self.path.display()
            ))
        })?;

        Ok(Arc::new(InMemoryCollection::from_documents(documents)))
    }
}

/// Hands out an already-built collection.
pub struct StaticLoader {
    collection: Arc<dyn KnowledgeCollection>,
}

impl StaticLoader {
    pub fn new(collection: Arc<dyn KnowledgeCollection>) -> Self {
        Self { collection }
    }
}

#[async_trait]
impl CollectionLoader for StaticLoader {
    async fn open(&self) -> Result<Arc<dyn KnowledgeCollection>, StageError> {
        Ok(Arc::clone(&self.collection))
    }
}
