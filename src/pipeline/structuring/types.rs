use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::StageError;

/// One call to the generation backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Per-call model selection and sampling knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationKnobs {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationKnobs {
    /// Deterministic knobs for the four JSON-producing stages.
    pub fn structured(model: &str) -> Self {
        Self {
            model: model.to_string(),
            max_tokens: 6000,
            temperature: 0.0,
        }
    }

    /// Slightly creative knobs for the narrative summary.
    pub fn narrative(model: &str) -> Self {
        Self {
            model: model.to_string(),
            max_tokens: 2048,
            temperature: 0.3,
        }
    }

    pub fn request(&self, system: &str, prompt: String) -> GenerationRequest {
        GenerationRequest {
            model: self.model.clone(),
            system: system.to_string(),
            prompt,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

/// Generation backend abstraction (allows mocking).
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, StageError>;

    async fn list_models(&self) -> Result<Vec<String>, StageError>;

    async fn is_model_available(&self, model: &str) -> Result<bool, StageError> {
        let models = self.list_models().await?;
        Ok(models.iter().any(|m| m.starts_with(model)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_knobs_are_deterministic() {
        let knobs = GenerationKnobs::structured("gpt-oss:20b");
        assert_eq!(knobs.temperature, 0.0);
        assert_eq!(knobs.max_tokens, 6000);
    }

    #[test]
    fn narrative_knobs_are_warmer() {
        let knobs = GenerationKnobs::narrative("gemma3:4b");
        assert!(knobs.temperature > 0.0);
        assert_eq!(knobs.max_tokens, 2048);
    }

    #[test]
    fn request_carries_knobs() {
        let req = GenerationKnobs::structured("m").request("sys", "user".into());
        assert_eq!(req.model, "m");
        assert_eq!(req.system, "sys");
        assert_eq!(req.prompt, "user");
    }

    #[test]
    fn trait_is_object_safe() {
        fn _assert(_: &dyn LlmClient) {}
    }
}
