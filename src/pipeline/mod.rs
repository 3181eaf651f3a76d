pub mod structuring;
pub mod rag;
pub mod temporal_fallback;
pub mod stages;
pub mod orchestrator;

pub use orchestrator::HandoffPipeline;

use std::time::Duration;

use thiserror::Error;

use crate::models::InvalidHandoffTime;

/// Failures that end a pipeline run. Nothing partial is returned with them.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Pipeline timed out after {0:?}")]
    Timeout(Duration),

    #[error("Processing error: {0}")]
    Processing(String),
}

impl From<InvalidHandoffTime> for PipelineError {
    fn from(e: InvalidHandoffTime) -> Self {
        PipelineError::InvalidInput(e.to_string())
    }
}
