//! Resilient structured-output layer around the text generator.
//!
//! `parser` recovers a typed record from raw generator text, `schemas`
//! holds the per-record alias tables, `retry` bounds repeated attempts,
//! and `ollama` talks to the generation backend.

pub mod types;
pub mod ollama;
pub mod parser;
pub mod schemas;
pub mod retry;

pub use types::*;
pub use ollama::*;
pub use parser::*;
pub use schemas::*;
pub use retry::*;

use thiserror::Error;

/// Recoverable failures inside a stage. Every variant is absorbed by the
/// stage's fallback; none of them reaches the pipeline caller.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Malformed generator output: {0}")]
    MalformedOutput(String),

    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("Generation backend returned error (status {status}): {body}")]
    Backend { status: u16, body: String },

    #[error("Gave up after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<StageError>,
    },
}

impl StageError {
    /// Innermost error, looking through `RetryExhausted`.
    pub fn root(&self) -> &StageError {
        match self {
            StageError::RetryExhausted { source, .. } => source.root(),
            other => other,
        }
    }
}
