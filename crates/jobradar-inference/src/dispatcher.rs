//! Credential pool and dispatch protocol.
//!
//! Every LLM call in the platform funnels through [`Dispatcher`]. One
//! tokio mutex guards the pool for the whole of
//! throttle → select slot → invoke → classify, so two properties hold by
//! construction and are locally verifiable here:
//!
//! - at least `min_gap_between_calls` elapses between any two provider
//!   submissions, pool-wide;
//! - at most one call is outstanding against the pool at a time, and
//!   waiters are served FIFO by the mutex.
//!
//! Contention on the mutex is not the bottleneck: the provider's
//! per-second budget is far tighter than anything the lock could cost.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use jobradar_core::{Error, LlmClient, Result};

use crate::config::DispatcherConfig;
use crate::structured::{parse_array, parse_object, ResponseShape};

/// Health state of one credential slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Slot is usable.
    Healthy,
    /// Slot observed a rate-limit signal and is unusable until
    /// `cooldown_until` elapses.
    Cooling,
}

/// One entry in the rotation pool. Mutated only under the pool mutex.
struct CredentialSlot {
    credential: String,
    state: SlotState,
    cooldown_until: Option<Instant>,
    calls: u64,
    last_call: Option<Instant>,
}

impl CredentialSlot {
    fn new(credential: String) -> Self {
        Self {
            credential,
            state: SlotState::Healthy,
            cooldown_until: None,
            calls: 0,
            last_call: None,
        }
    }
}

/// Observability view of one slot. Carries the slot index, never the
/// credential.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSnapshot {
    pub index: usize,
    pub state: SlotState,
    pub calls: u64,
    pub cooldown_remaining: Option<Duration>,
}

struct PoolState {
    slots: Vec<CredentialSlot>,
    cursor: usize,
    last_call: Option<Instant>,
}

impl PoolState {
    /// First usable slot at or after the cursor. A cooling slot whose
    /// cooldown has elapsed is reset to healthy here.
    fn select(&mut self, now: Instant) -> Option<usize> {
        let len = self.slots.len();
        for offset in 0..len {
            let idx = (self.cursor + offset) % len;
            let slot = &mut self.slots[idx];
            match slot.state {
                SlotState::Healthy => return Some(idx),
                SlotState::Cooling => {
                    if slot.cooldown_until.is_some_and(|until| until <= now) {
                        slot.state = SlotState::Healthy;
                        slot.cooldown_until = None;
                        return Some(idx);
                    }
                }
            }
        }
        None
    }

    /// Earliest cooldown expiry across the pool. `None` only if the pool
    /// has a usable slot.
    fn nearest_cooldown(&self) -> Option<Instant> {
        self.slots.iter().filter_map(|s| s.cooldown_until).min()
    }
}

/// Multi-credential dispatcher in front of a strictly rate-limited
/// provider.
///
/// Callers see exactly one of: a fresh result, [`Error::Exhausted`]
/// (retry budget spent, or deadline hit while the whole pool cools), or a
/// transport/parse error they can distinguish from rate limiting.
/// Credentials never leak to callers, logs, or error messages.
pub struct Dispatcher {
    client: Arc<dyn LlmClient>,
    config: DispatcherConfig,
    pool: Mutex<PoolState>,
}

impl Dispatcher {
    /// Build a dispatcher over an injected provider transport.
    ///
    /// Fails with a configuration error when the credential pool is
    /// empty. Slots are created once here and never added or removed at
    /// runtime.
    pub fn new(client: Arc<dyn LlmClient>, config: DispatcherConfig) -> Result<Self> {
        if config.credentials.is_empty() {
            return Err(Error::Config(
                "Dispatcher requires at least one credential".to_string(),
            ));
        }

        let slots = config
            .credentials
            .iter()
            .cloned()
            .map(CredentialSlot::new)
            .collect();

        debug!(
            subsystem = "inference",
            component = "dispatcher",
            pool_size = config.credentials.len(),
            min_gap_ms = config.min_gap_between_calls.as_millis() as u64,
            cooldown_secs = config.per_slot_cooldown.as_secs(),
            "Dispatcher initialized"
        );

        Ok(Self {
            client,
            config,
            pool: Mutex::new(PoolState {
                slots,
                cursor: 0,
                last_call: None,
            }),
        })
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Generate free text.
    #[instrument(skip(self, prompt), fields(subsystem = "inference", component = "dispatcher", op = "generate", prompt_len = prompt.len()))]
    pub async fn generate_text(&self, prompt: &str, deadline: Option<Instant>) -> Result<String> {
        let client = Arc::clone(&self.client);
        let model = self.config.model_generate.clone();
        let params = self.config.generation_params();
        let prompt = prompt.to_string();

        self.dispatch(deadline, move |credential| {
            let client = Arc::clone(&client);
            let model = model.clone();
            let prompt = prompt.clone();
            Box::pin(async move { client.generate(&credential, &model, &prompt, &params).await })
        })
        .await
    }

    /// Generate a single JSON object matching `shape`.
    ///
    /// Code fences are stripped and list coercions applied; a reply that
    /// still misses the shape is a parse error, surfaced without
    /// consuming retry budget.
    pub async fn generate_structured(
        &self,
        prompt: &str,
        shape: &ResponseShape,
        deadline: Option<Instant>,
    ) -> Result<Map<String, Value>> {
        let raw = self.generate_text(prompt, deadline).await?;
        parse_object(&raw, shape)
    }

    /// Generate a JSON array of objects, each matching `shape`.
    ///
    /// Used for batched prompts that answer several items in one call
    /// (combined gap analysis), preserving input order.
    pub async fn generate_structured_list(
        &self,
        prompt: &str,
        shape: &ResponseShape,
        deadline: Option<Instant>,
    ) -> Result<Vec<Map<String, Value>>> {
        let raw = self.generate_text(prompt, deadline).await?;
        parse_array(&raw, shape)
    }

    /// Embed text into a vector of exactly the configured dimensionality.
    ///
    /// A provider vector of any other length fails with a parse error;
    /// the dispatcher never pads, truncates, or substitutes.
    #[instrument(skip(self, text), fields(subsystem = "inference", component = "dispatcher", op = "embed", prompt_len = text.len()))]
    pub async fn embed(&self, text: &str, deadline: Option<Instant>) -> Result<Vec<f32>> {
        let client = Arc::clone(&self.client);
        let model = self.config.model_embed.clone();
        let text = text.to_string();

        let vector = self
            .dispatch(deadline, move |credential| {
                let client = Arc::clone(&client);
                let model = model.clone();
                let text = text.clone();
                Box::pin(async move { client.embed(&credential, &model, &text).await })
            })
            .await?;

        if vector.len() != self.config.embedding_dim {
            return Err(Error::Parse(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.config.embedding_dim,
                vector.len()
            )));
        }
        Ok(vector)
    }

    /// Observability snapshot of the pool (indices and counters only).
    pub async fn snapshot(&self) -> Vec<SlotSnapshot> {
        let now = Instant::now();
        let pool = self.pool.lock().await;
        pool.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| SlotSnapshot {
                index,
                state: slot.state,
                calls: slot.calls,
                cooldown_remaining: slot
                    .cooldown_until
                    .filter(|_| slot.state == SlotState::Cooling)
                    .map(|until| until.saturating_duration_since(now)),
            })
            .collect()
    }

    /// The dispatch protocol: throttle, select a slot, invoke, classify.
    ///
    /// Runs entirely under the pool mutex, so submissions are serialized
    /// process-wide and FIFO across waiters.
    async fn dispatch<T>(
        &self,
        deadline: Option<Instant>,
        call: impl Fn(String) -> BoxFuture<'static, Result<T>>,
    ) -> Result<T> {
        let mut pool = self.pool.lock().await;
        let mut attempts = 0usize;

        loop {
            // Throttle floor between any two submissions against the pool.
            if let Some(last) = pool.last_call {
                let next_allowed = last + self.config.min_gap_between_calls;
                let now = Instant::now();
                if next_allowed > now {
                    let wait = next_allowed - now;
                    debug!(
                        subsystem = "inference",
                        component = "dispatcher",
                        wait_ms = wait.as_millis() as u64,
                        "Throttling before next provider call"
                    );
                    sleep(wait).await;
                }
            }

            // Slot selection. When every slot is cooling, wait out the
            // earliest cooldown rather than busy-looping; a caller
            // deadline that cannot be met converts to exhaustion.
            let idx = loop {
                let now = Instant::now();
                if let Some(idx) = pool.select(now) {
                    break idx;
                }
                let nearest = match pool.nearest_cooldown() {
                    Some(at) => at,
                    None => return Err(Error::Exhausted),
                };
                if deadline.is_some_and(|limit| nearest > limit) {
                    warn!(
                        subsystem = "inference",
                        component = "dispatcher",
                        "Deadline falls inside pool-wide cooldown"
                    );
                    return Err(Error::Exhausted);
                }
                let wait = nearest.saturating_duration_since(now);
                warn!(
                    subsystem = "inference",
                    component = "dispatcher",
                    wait_ms = wait.as_millis() as u64,
                    "All credential slots cooling; waiting for earliest cooldown"
                );
                sleep(wait).await;
            };

            let submitted = Instant::now();
            pool.last_call = Some(submitted);
            let credential = {
                let slot = &mut pool.slots[idx];
                slot.calls += 1;
                slot.last_call = Some(submitted);
                slot.credential.clone()
            };

            match call(credential).await {
                Ok(value) => {
                    // Round-robin fairness: move past the slot that served.
                    pool.cursor = (idx + 1) % pool.slots.len();
                    debug!(
                        subsystem = "inference",
                        component = "dispatcher",
                        slot = idx,
                        duration_ms = submitted.elapsed().as_millis() as u64,
                        "Provider call succeeded"
                    );
                    return Ok(value);
                }
                Err(err) if err.is_rate_limit() => {
                    attempts += 1;
                    {
                        let slot = &mut pool.slots[idx];
                        slot.state = SlotState::Cooling;
                        slot.cooldown_until = Some(Instant::now() + self.config.per_slot_cooldown);
                    }
                    pool.cursor = (idx + 1) % pool.slots.len();
                    warn!(
                        subsystem = "inference",
                        component = "dispatcher",
                        slot = idx,
                        retry = attempts,
                        "Rate limit hit; cooling slot and rotating"
                    );
                    if attempts >= self.config.max_retries_on_rate_limit {
                        warn!(
                            subsystem = "inference",
                            component = "dispatcher",
                            attempts,
                            "Retry budget spent across the pool"
                        );
                        return Err(Error::Exhausted);
                    }
                }
                // Transport and parse failures are the caller's to see;
                // the slot is not cooled.
                Err(err) => return Err(err),
            }
        }
    }
}
