//! # jobradar-core
//!
//! Core types, traits, and abstractions for the jobradar platform.
//!
//! This crate provides the foundational data structures and trait
//! definitions that the other jobradar crates depend on: the domain
//! models (raw and enriched jobs, résumé profiles, match results), the
//! workspace-wide error type, and the collaborator seams (LLM transport,
//! storage, cache, raw-job log).

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
