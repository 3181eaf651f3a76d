use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::pipeline::structuring::StageError;

/// A reference document as stored in the knowledge collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub id: String,
    pub text: String,
}

/// A document returned by a query, with its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub id: String,
    pub text: String,
    pub score: f32,
}

/// Nearest-neighbour document lookup (allows mocking).
#[async_trait]
pub trait KnowledgeCollection: Send + Sync {
    async fn count(&self) -> Result<usize, StageError>;

    /// Up to `k` documents, most similar first.
    async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredDocument>, StageError>;
}

/// Opens a [`KnowledgeCollection`]. Called lazily by the retriever.
#[async_trait]
pub trait CollectionLoader: Send + Sync {
    async fn open(&self) -> Result<Arc<dyn KnowledgeCollection>, StageError>;
}
