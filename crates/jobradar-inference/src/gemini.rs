//! Gemini REST transport implementing the [`LlmClient`] seam.
//!
//! Single-call semantics only: rotation, throttling, and retries belong
//! to the dispatcher. This client's one policy job is classification: a
//! quota signal (HTTP 429, `RESOURCE_EXHAUSTED`, "quota", "rate limit")
//! becomes `Error::RateLimited`; everything else that fails becomes
//! `Error::Transport`.
//!
//! Credentials travel in the `x-goog-api-key` header, never in the URL,
//! so they cannot surface in reqwest error strings or logs.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use jobradar_core::{defaults, Error, GenerationParams, LlmClient, Result};

/// Default Gemini API endpoint.
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini REST client.
pub struct GeminiClient {
    client: Client,
    base_url: String,
}

impl GeminiClient {
    /// Create a client against the public Gemini endpoint.
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_GEMINI_URL)
    }

    /// Create a client against a custom endpoint (tests, proxies).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(defaults::LLM_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

/// True when a provider reply identifies as a per-credential quota limit.
fn is_rate_limit_signal(status: u16, body: &str) -> bool {
    let lower = body.to_lowercase();
    status == 429
        || body.contains("RESOURCE_EXHAUSTED")
        || lower.contains("quota")
        || lower.contains("rate limit")
}

fn classify_failure(status: u16, body: &str) -> Error {
    let truncated: String = body.chars().take(300).collect();
    if is_rate_limit_signal(status, body) {
        Error::RateLimited(format!("Gemini returned {status}: {truncated}"))
    } else {
        Error::Transport(format!("Gemini returned {status}: {truncated}"))
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Serialize)]
struct EmbedRequest {
    content: Content,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(
        &self,
        credential: &str,
        model: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String> {
        let start = Instant::now();
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: params.temperature,
                max_output_tokens: params.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, model))
            .header("x-goog-api-key", credential)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let reply: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Transport(format!("Failed to parse response: {e}")))?;

        let text = reply
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| Error::Transport("Gemini returned no candidates".to_string()))?;

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            subsystem = "inference",
            component = "gemini",
            op = "generate",
            model,
            response_len = text.len(),
            duration_ms = elapsed,
            "Generation complete"
        );
        if elapsed > 30_000 {
            warn!(
                subsystem = "inference",
                component = "gemini",
                duration_ms = elapsed,
                prompt_len = prompt.len(),
                slow = true,
                "Slow generation operation"
            );
        }

        Ok(text.trim().to_string())
    }

    async fn embed(&self, credential: &str, model: &str, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let request = EmbedRequest {
            content: Content {
                parts: vec![Part {
                    text: text.to_string(),
                }],
            },
        };

        let response = self
            .client
            .post(format!("{}/models/{}:embedContent", self.base_url, model))
            .header("x-goog-api-key", credential)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let reply: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::Transport(format!("Failed to parse response: {e}")))?;

        debug!(
            subsystem = "inference",
            component = "gemini",
            op = "embed",
            model,
            result_count = reply.embedding.values.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Embedding complete"
        );

        Ok(reply.embedding.values)
    }
}
