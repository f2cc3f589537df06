//! Deterministic mock LLM transport for testing.
//!
//! Implements [`LlmClient`] with scripted outcomes and a call log, so the
//! dispatcher's rotation, throttling, and classification paths can be
//! exercised without a provider. Compiled unconditionally so integration
//! tests in downstream crates can use it.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use jobradar_inference::mock::MockLlmClient;
//! use jobradar_inference::{Dispatcher, DispatcherConfig};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let client = Arc::new(
//!     MockLlmClient::new()
//!         .with_rate_limit()
//!         .with_generation("recovered"),
//! );
//! let config = DispatcherConfig::new(vec!["a".into(), "b".into()])
//!     .with_min_gap(std::time::Duration::from_millis(1));
//! let dispatcher = Dispatcher::new(client.clone(), config).unwrap();
//!
//! let text = dispatcher.generate_text("hi", None).await.unwrap();
//! assert_eq!(text, "recovered");
//! assert_eq!(client.generate_call_count(), 2);
//! # }
//! ```

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;

use jobradar_core::{defaults, Error, GenerationParams, LlmClient, Result};

/// One scripted provider outcome.
#[derive(Debug, Clone)]
enum Scripted<T> {
    Ok(T),
    RateLimited,
    Transport(String),
}

/// One logged provider call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub operation: &'static str,
    pub credential: String,
    pub model: String,
    pub input: String,
    pub at: Instant,
}

#[derive(Debug)]
struct MockState {
    generate_script: VecDeque<Scripted<String>>,
    embed_script: VecDeque<Scripted<Vec<f32>>>,
    default_generation: String,
    default_embedding: Vec<f32>,
    rate_limited_credentials: HashSet<String>,
    calls: Vec<MockCall>,
}

/// Mock LLM transport with scripted outcomes.
///
/// Scripts are consumed front-to-front per operation; once a script is
/// empty, the default response is returned. Credentials listed via
/// [`with_rate_limited_credential`](Self::with_rate_limited_credential)
/// always rate-limit regardless of scripts, which models a key whose
/// quota is durably spent.
#[derive(Clone)]
pub struct MockLlmClient {
    state: Arc<Mutex<MockState>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                generate_script: VecDeque::new(),
                embed_script: VecDeque::new(),
                default_generation: "Mock response".to_string(),
                default_embedding: vec![0.1; defaults::EMBED_DIMENSION],
                rate_limited_credentials: HashSet::new(),
                calls: Vec::new(),
            })),
        }
    }

    /// Queue a successful generation outcome.
    pub fn with_generation(self, text: impl Into<String>) -> Self {
        self.state
            .lock()
            .unwrap()
            .generate_script
            .push_back(Scripted::Ok(text.into()));
        self
    }

    /// Queue a rate-limit outcome for the next generation call.
    pub fn with_rate_limit(self) -> Self {
        self.state
            .lock()
            .unwrap()
            .generate_script
            .push_back(Scripted::RateLimited);
        self
    }

    /// Queue a transport failure for the next generation call.
    pub fn with_transport_error(self, message: impl Into<String>) -> Self {
        self.state
            .lock()
            .unwrap()
            .generate_script
            .push_back(Scripted::Transport(message.into()));
        self
    }

    /// Queue a successful embedding outcome.
    pub fn with_embedding(self, vector: Vec<f32>) -> Self {
        self.state
            .lock()
            .unwrap()
            .embed_script
            .push_back(Scripted::Ok(vector));
        self
    }

    /// Queue a rate-limit outcome for the next embedding call.
    pub fn with_embed_rate_limit(self) -> Self {
        self.state
            .lock()
            .unwrap()
            .embed_script
            .push_back(Scripted::RateLimited);
        self
    }

    /// Set the fallback generation text used once the script is empty.
    pub fn with_default_generation(self, text: impl Into<String>) -> Self {
        self.state.lock().unwrap().default_generation = text.into();
        self
    }

    /// Set the fallback embedding used once the script is empty.
    pub fn with_default_embedding(self, vector: Vec<f32>) -> Self {
        self.state.lock().unwrap().default_embedding = vector;
        self
    }

    /// Make every call with `credential` rate-limit, regardless of script.
    pub fn with_rate_limited_credential(self, credential: impl Into<String>) -> Self {
        self.state
            .lock()
            .unwrap()
            .rate_limited_credentials
            .insert(credential.into());
        self
    }

    /// All logged calls, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Credentials in call order (both operations).
    pub fn credentials_used(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .map(|c| c.credential.clone())
            .collect()
    }

    pub fn generate_call_count(&self) -> usize {
        self.count("generate")
    }

    pub fn embed_call_count(&self) -> usize {
        self.count("embed")
    }

    fn count(&self, operation: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    fn log(&self, operation: &'static str, credential: &str, model: &str, input: &str) {
        self.state.lock().unwrap().calls.push(MockCall {
            operation,
            credential: credential.to_string(),
            model: model.to_string(),
            input: input.to_string(),
            at: Instant::now(),
        });
    }

    fn resolve<T: Clone>(
        &self,
        credential: &str,
        pick: impl FnOnce(&mut MockState) -> Option<Scripted<T>>,
        default: impl FnOnce(&MockState) -> T,
    ) -> Result<T> {
        let mut state = self.state.lock().unwrap();
        if state.rate_limited_credentials.contains(credential) {
            return Err(Error::RateLimited("simulated quota exhaustion".into()));
        }
        match pick(&mut state) {
            Some(Scripted::Ok(value)) => Ok(value),
            Some(Scripted::RateLimited) => {
                Err(Error::RateLimited("simulated 429 RESOURCE_EXHAUSTED".into()))
            }
            Some(Scripted::Transport(msg)) => Err(Error::Transport(msg)),
            None => Ok(default(&state)),
        }
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(
        &self,
        credential: &str,
        model: &str,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<String> {
        self.log("generate", credential, model, prompt);
        self.resolve(
            credential,
            |state| state.generate_script.pop_front(),
            |state| state.default_generation.clone(),
        )
    }

    async fn embed(&self, credential: &str, model: &str, text: &str) -> Result<Vec<f32>> {
        self.log("embed", credential, model, text);
        self.resolve(
            credential,
            |state| state.embed_script.pop_front(),
            |state| state.default_embedding.clone(),
        )
    }
}

/// Deterministic embedding vectors for tests.
///
/// Character-based hashing keeps the same text mapping to the same unit
/// vector, so similarity assertions are reproducible.
pub struct MockEmbeddingGenerator;

impl MockEmbeddingGenerator {
    /// Generate a normalized embedding from text.
    pub fn generate(text: &str, dimension: usize) -> Vec<f32> {
        let mut vec = vec![0.0; dimension];
        for (i, c) in text.chars().enumerate() {
            let idx = (c as usize + i) % dimension;
            vec[idx] += 0.1;
        }
        Self::normalize(&mut vec);
        vec
    }

    /// Generate a normalized embedding from a seed, using an LCG so no
    /// RNG state leaks between tests.
    pub fn generate_with_seed(seed: u64, dimension: usize) -> Vec<f32> {
        let mut vec = vec![0.0; dimension];
        let mut state = seed;
        for item in vec.iter_mut() {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            *item = ((state % 1000) as f32) / 1000.0 - 0.5;
        }
        Self::normalize(&mut vec);
        vec
    }

    fn normalize(vec: &mut [f32]) {
        let magnitude: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            vec.iter_mut().for_each(|x| *x /= magnitude);
        }
    }
}
