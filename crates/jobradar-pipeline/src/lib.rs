//! # jobradar-pipeline
//!
//! The enrichment pipeline: consumes raw job records from the durable
//! log, turns each into an [`jobradar_core::EnrichedJob`] through the LLM
//! dispatcher (structured extraction followed by embedding), and persists
//! the result idempotently.
//!
//! Two pieces:
//! - [`Enricher`] (the transform): raw job in, enriched job out, two
//!   sequential dispatcher calls whose results are stored together or not
//!   at all
//! - [`StreamWorker`] (the loop): poll, decode, enrich, upsert, cache,
//!   commit, with a poison policy for undecodable records and bounded
//!   retries for transport failures

pub mod enrich;
pub mod worker;

pub use enrich::Enricher;
pub use worker::{StreamWorker, WorkerConfig, WorkerHandle, WorkerOutcome};
