//! Collaborator traits for jobradar abstractions.
//!
//! These traits define the seams between the core and its external
//! collaborators (LLM provider transport, storage, cache, raw-job log),
//! enabling pluggable backends and testability.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{EnrichedJob, JobFilter, StreamMessage};

// =============================================================================
// LLM TRANSPORT
// =============================================================================

/// Sampling parameters passed through to the provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: crate::defaults::GEN_TEMPERATURE,
            max_output_tokens: crate::defaults::GEN_MAX_OUTPUT_TOKENS,
        }
    }
}

/// Transport to the LLM provider. The dispatcher owns credential
/// rotation and throttling; implementations of this trait only perform a
/// single call with the credential handed to them.
///
/// Error contract: a per-credential quota signal must surface as
/// `Error::RateLimited`; any other provider failure as `Error::Transport`.
/// Implementations never retry internally.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate text for `prompt` using `model`, authenticated with
    /// `credential`.
    async fn generate(
        &self,
        credential: &str,
        model: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String>;

    /// Embed `text` with `model`, authenticated with `credential`.
    ///
    /// Returns the raw provider vector; dimensionality enforcement is the
    /// dispatcher's job.
    async fn embed(&self, credential: &str, model: &str, text: &str) -> Result<Vec<f32>>;
}

// =============================================================================
// STORAGE
// =============================================================================

/// Repository for enriched-job storage and retrieval.
///
/// All writes are upserts keyed by the external job id; the upsert is
/// atomic per row and preserves `created_at` on conflict.
#[async_trait]
pub trait EnrichedJobRepository: Send + Sync {
    /// Insert or replace an enriched job (last writer wins per id).
    async fn upsert(&self, job: &EnrichedJob) -> Result<()>;

    /// Fetch a single job by id.
    async fn fetch(&self, id: &str) -> Result<Option<EnrichedJob>>;

    /// List jobs with a non-empty embedding matching the filter, newest
    /// first. The matcher loads ranking candidates through this.
    async fn list_embedded(&self, filter: &JobFilter) -> Result<Vec<EnrichedJob>>;
}

// =============================================================================
// CACHE
// =============================================================================

/// Best-effort job cache. Failures are logged by callers and never block
/// the pipeline.
#[async_trait]
pub trait JobCache: Send + Sync {
    async fn cache_job(&self, job: &EnrichedJob, ttl: Duration) -> Result<()>;
}

// =============================================================================
// RAW-JOB LOG
// =============================================================================

/// Consumer interface over the durable raw-job log.
///
/// The log delivers at-least-once; a message is redelivered until
/// committed. Each worker replica holds a distinct consumer-group member
/// identity so the log assigns disjoint partitions.
#[async_trait]
pub trait RawJobStream: Send + Sync {
    /// Wait up to `timeout` for the next message. `None` means the log is
    /// currently empty.
    async fn poll(&mut self, timeout: Duration) -> Result<Option<StreamMessage>>;

    /// Acknowledge a message as fully processed. Uncommitted messages are
    /// redelivered after a restart.
    async fn commit(&mut self, message: &StreamMessage) -> Result<()>;
}
