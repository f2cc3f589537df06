//! Dispatcher configuration.

use std::time::Duration;

use jobradar_core::{defaults, Error, GenerationParams, Result};

/// Configuration for the credential pool and dispatch protocol.
///
/// This is the only environment surface of the core: every other
/// collaborator (storage, cache, log) carries its own configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Ordered, non-empty rotation pool of provider credentials.
    pub credentials: Vec<String>,
    /// Model identifier for generation calls.
    pub model_generate: String,
    /// Model identifier for embedding calls.
    pub model_embed: String,
    /// Throttle floor: minimum gap between any two provider submissions.
    pub min_gap_between_calls: Duration,
    /// How long a slot stays cooling after a rate-limit signal.
    pub per_slot_cooldown: Duration,
    /// Retry budget before a call fails with `Exhausted`.
    pub max_retries_on_rate_limit: usize,
    /// Required embedding dimensionality.
    pub embedding_dim: usize,
    /// Passed through to the provider.
    pub max_output_tokens: u32,
    /// Passed through to the provider, clamped to [0, 1].
    pub generation_temperature: f32,
}

impl DispatcherConfig {
    /// Create a config with defaults for the given credential pool.
    ///
    /// The retry budget defaults to the pool size, so a single dispatch
    /// attempts every credential at most once before exhausting.
    pub fn new(credentials: Vec<String>) -> Self {
        let max_retries_on_rate_limit = credentials.len();
        Self {
            credentials,
            model_generate: defaults::GEN_MODEL.to_string(),
            model_embed: defaults::EMBED_MODEL.to_string(),
            min_gap_between_calls: Duration::from_millis(defaults::MIN_CALL_GAP_MS),
            per_slot_cooldown: Duration::from_secs(defaults::SLOT_COOLDOWN_SECS),
            max_retries_on_rate_limit,
            embedding_dim: defaults::EMBED_DIMENSION,
            max_output_tokens: defaults::GEN_MAX_OUTPUT_TOKENS,
            generation_temperature: defaults::GEN_TEMPERATURE,
        }
    }

    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `GEMINI_API_KEYS` | required | Comma-separated credential pool |
    /// | `GEMINI_API_KEY` | required | Single-credential fallback |
    /// | `JOBRADAR_GEN_MODEL` | `gemini-2.5-flash-lite` | Generation model |
    /// | `JOBRADAR_EMBED_MODEL` | `text-embedding-004` | Embedding model |
    /// | `JOBRADAR_MIN_CALL_GAP_MS` | `2000` | Throttle floor |
    /// | `JOBRADAR_SLOT_COOLDOWN_SECS` | `60` | Per-slot cooldown |
    /// | `JOBRADAR_LLM_MAX_RETRIES` | pool size | Retry budget |
    /// | `JOBRADAR_EMBED_DIM` | `768` | Embedding dimensionality |
    /// | `JOBRADAR_MAX_OUTPUT_TOKENS` | `1500` | Generation token cap |
    /// | `JOBRADAR_GEN_TEMPERATURE` | `0.3` | Sampling temperature |
    pub fn from_env() -> Result<Self> {
        let credentials = read_credentials()?;
        let mut config = Self::new(credentials);

        if let Ok(model) = std::env::var("JOBRADAR_GEN_MODEL") {
            if !model.is_empty() {
                config.model_generate = model;
            }
        }
        if let Ok(model) = std::env::var("JOBRADAR_EMBED_MODEL") {
            if !model.is_empty() {
                config.model_embed = model;
            }
        }
        if let Some(ms) = parse_env::<u64>("JOBRADAR_MIN_CALL_GAP_MS") {
            config.min_gap_between_calls = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_env::<u64>("JOBRADAR_SLOT_COOLDOWN_SECS") {
            config.per_slot_cooldown = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_env::<usize>("JOBRADAR_LLM_MAX_RETRIES") {
            config.max_retries_on_rate_limit = retries.max(1);
        }
        if let Some(dim) = parse_env::<usize>("JOBRADAR_EMBED_DIM") {
            config.embedding_dim = dim;
        }
        if let Some(tokens) = parse_env::<u32>("JOBRADAR_MAX_OUTPUT_TOKENS") {
            config.max_output_tokens = tokens;
        }
        if let Some(temp) = parse_env::<f32>("JOBRADAR_GEN_TEMPERATURE") {
            config.generation_temperature = temp.clamp(0.0, 1.0);
        }

        Ok(config)
    }

    /// Set the throttle floor.
    pub fn with_min_gap(mut self, gap: Duration) -> Self {
        self.min_gap_between_calls = gap;
        self
    }

    /// Set the per-slot cooldown.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.per_slot_cooldown = cooldown;
        self
    }

    /// Set the retry budget (minimum 1).
    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries_on_rate_limit = retries.max(1);
        self
    }

    /// Set the required embedding dimensionality.
    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    /// Sampling parameters handed to the provider on generation calls.
    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.generation_temperature,
            max_output_tokens: self.max_output_tokens,
        }
    }
}

/// Read the credential pool: `GEMINI_API_KEYS` (comma-separated) first,
/// then the single-key `GEMINI_API_KEY` fallback.
fn read_credentials() -> Result<Vec<String>> {
    let keys: Vec<String> = std::env::var("GEMINI_API_KEYS")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect();

    if !keys.is_empty() {
        return Ok(keys);
    }

    match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Ok(vec![key.trim().to_string()]),
        _ => Err(Error::Config(
            "No credentials configured (set GEMINI_API_KEYS or GEMINI_API_KEY)".to_string(),
        )),
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
