//! Default values for every tunable in the jobradar workspace.
//!
//! Each constant is read exactly once, by the config struct that owns the
//! knob. Environment overrides go through those configs, never through
//! scattered `std::env::var` calls.

// ─── Dispatcher (LLM provider) ─────────────────────────────────────────────

/// Default generation model.
pub const GEN_MODEL: &str = "gemini-2.5-flash-lite";

/// Default embedding model.
pub const EMBED_MODEL: &str = "text-embedding-004";

/// Expected embedding dimensionality. Vectors of any other length are
/// rejected at the dispatcher and excluded from ranking.
pub const EMBED_DIMENSION: usize = 768;

/// Minimum gap between any two provider submissions (throttle floor).
pub const MIN_CALL_GAP_MS: u64 = 2_000;

/// How long a credential slot stays cooling after a rate-limit signal.
pub const SLOT_COOLDOWN_SECS: u64 = 60;

/// Maximum tokens requested per generation.
pub const GEN_MAX_OUTPUT_TOKENS: u32 = 1_500;

/// Sampling temperature for generation.
pub const GEN_TEMPERATURE: f32 = 0.3;

/// Request timeout for provider calls (seconds).
pub const LLM_TIMEOUT_SECS: u64 = 120;

// ─── Enrichment ────────────────────────────────────────────────────────────

/// Cap on the number of skills kept per enriched job.
pub const MAX_SKILLS: usize = 15;

// ─── Stream worker ─────────────────────────────────────────────────────────

/// Redis stream carrying raw job records.
pub const RAW_JOBS_STREAM: &str = "jobs_raw";

/// Consumer group identity for the enrichment worker.
pub const CONSUMER_GROUP: &str = "job_enrichment_group";

/// Poll timeout when the stream is empty.
pub const POLL_TIMEOUT_MS: u64 = 1_000;

/// Bounded retries for transport failures before a message is committed
/// with a logged failure.
pub const WORKER_MAX_RETRIES: u32 = 3;

/// TTL for the best-effort job cache.
pub const CACHE_TTL_SECS: u64 = 3_600;

// ─── Résumé matching ───────────────────────────────────────────────────────

/// Résumé pages handed to the extractor collaborator.
pub const MAX_RESUME_PAGES: usize = 3;

/// Default top-k for match requests.
pub const MATCH_LIMIT: usize = 5;

/// Default similarity threshold. Inherited from the source without
/// empirical justification; tunable, not load-bearing.
pub const MIN_SIMILARITY: f32 = 0.3;

/// How many of the top matches receive gap analysis by default.
pub const GAP_DEPTH: usize = 3;

// ─── HTTP surface ──────────────────────────────────────────────────────────

/// Default API listen port.
pub const HTTP_PORT: u16 = 8000;

/// Maximum accepted résumé upload size in bytes.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Body returned with HTTP 429 when the dispatcher is exhausted.
pub const BUSY_MESSAGE: &str = "AI Analysis is busy. Please wait and try again.";
