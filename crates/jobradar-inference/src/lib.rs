//! # jobradar-inference
//!
//! Multi-credential LLM dispatcher for jobradar.
//!
//! This crate provides:
//! - The credential pool and dispatch protocol: throttle floor, per-slot
//!   cooldown, round-robin rotation, bounded retry on rate limits
//! - The structured-output contract (shape validation over model JSON)
//! - A Gemini REST transport implementing the injected [`LlmClient`] seam
//! - A deterministic mock transport for tests
//!
//! All provider traffic in the platform converges on [`Dispatcher`]; it is
//! the only component that holds credential state and the only producer of
//! [`jobradar_core::Error::Exhausted`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use jobradar_inference::{Dispatcher, DispatcherConfig, GeminiClient};
//!
//! #[tokio::main]
//! async fn main() -> jobradar_core::Result<()> {
//!     let config = DispatcherConfig::from_env()?;
//!     let client = Arc::new(GeminiClient::new()?);
//!     let dispatcher = Dispatcher::new(client, config)?;
//!     let text = dispatcher.generate_text("Say hello.", None).await?;
//!     println!("{text}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatcher;
pub mod gemini;
pub mod structured;

// Deterministic mock transport. Always compiled so downstream crates'
// integration tests can drive a real Dispatcher without a provider.
pub mod mock;

pub use jobradar_core::{Error, LlmClient, Result};

pub use config::DispatcherConfig;
pub use dispatcher::{Dispatcher, SlotSnapshot, SlotState};
pub use gemini::GeminiClient;
pub use structured::{FieldKind, ResponseShape};
