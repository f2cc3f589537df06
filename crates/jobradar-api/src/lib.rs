//! # jobradar-api
//!
//! The résumé-matching request path: accept an uploaded résumé, extract a
//! professional profile and embedding through the dispatcher, rank stored
//! jobs by cosine similarity, and annotate the top matches with a single
//! combined skill-gap call.
//!
//! The HTTP surface is one route plus a liveness check; dispatcher
//! exhaustion maps to HTTP 429 with a fixed human-readable body.

pub mod analyzer;
pub mod extract;
pub mod handlers;

pub use analyzer::{AnalyzeOptions, ResumeAnalysis, ResumeAnalyzer};
pub use extract::{PlainTextExtractor, ResumeExtractor};
pub use handlers::{router, AppState};
