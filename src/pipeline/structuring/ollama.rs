use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::types::{GenerationRequest, LlmClient};
use super::StageError;

/// Ollama HTTP client for generation.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Create a new OllamaClient pointing at an Ollama instance.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, StageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StageError::CollaboratorUnavailable(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, e: reqwest::Error) -> StageError {
        if e.is_connect() {
            StageError::CollaboratorUnavailable(format!("Ollama is not running at {}", self.base_url))
        } else if e.is_timeout() {
            StageError::CollaboratorUnavailable(format!(
                "Request timed out after {}s",
                self.timeout_secs
            ))
        } else {
            StageError::CollaboratorUnavailable(e.to_string())
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StageError::Backend {
            status: status.as_u16(),
            body,
        })
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

/// Response body from Ollama /api/tags
#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, StageError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model: &request.model,
            prompt: &request.prompt,
            system: &request.system,
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let parsed: OllamaGenerateResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| StageError::MalformedOutput(format!("Ollama response body: {e}")))?;

        Ok(parsed.response)
    }

    async fn list_models(&self) -> Result<Vec<String>, StageError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let parsed: OllamaTagsResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| StageError::MalformedOutput(format!("Ollama tags body: {e}")))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }
}

/// Scripted reply for [`MockLlmClient`].
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Unavailable,
}

impl MockReply {
    pub fn text(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Mock LLM client for testing.
///
/// Replies come from, in order: the queue (one reply per call), the first
/// route whose marker appears in the system prompt, then the default.
pub struct MockLlmClient {
    queued: Mutex<VecDeque<MockReply>>,
    routes: Vec<(String, MockReply)>,
    default: MockReply,
    latency: Duration,
    available_models: Vec<String>,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self::with_default(MockReply::text(response))
    }

    pub fn unavailable() -> Self {
        Self::with_default(MockReply::Unavailable)
    }

    fn with_default(default: MockReply) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            routes: Vec::new(),
            default,
            latency: Duration::ZERO,
            available_models: vec!["gpt-oss:20b".to_string()],
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Reply with `reply` whenever the system prompt contains `marker`.
    pub fn route(mut self, marker: &str, reply: MockReply) -> Self {
        self.routes.push((marker.to_string(), reply));
        self
    }

    /// Queue replies consumed one per call before routes apply.
    pub fn then(self, reply: MockReply) -> Self {
        if let Ok(mut queue) = self.queued.lock() {
            queue.push_back(reply);
        }
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.available_models = models;
        self
    }

    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    fn next_reply(&self, request: &GenerationRequest) -> MockReply {
        if let Some(reply) = self.queued.lock().ok().and_then(|mut q| q.pop_front()) {
            return reply;
        }
        self.routes
            .iter()
            .find(|(marker, _)| request.system.contains(marker.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.default.clone())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, StageError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.next_reply(request) {
            MockReply::Text(text) => Ok(text),
            MockReply::Unavailable => Err(StageError::CollaboratorUnavailable(
                "mock backend offline".into(),
            )),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, StageError> {
        Ok(self.available_models.clone())
    }
}
