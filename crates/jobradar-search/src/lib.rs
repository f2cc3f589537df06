//! # jobradar-search
//!
//! Semantic job matching: ranks stored enriched jobs against a query
//! vector by cosine similarity, under optional structured filters.
//!
//! Correctness floor is a full scan, O(N·D) per query. An ANN index may
//! replace the scan as long as the ordering contract on the returned
//! top-k and the similarity threshold on returned items are preserved.

pub mod matcher;
pub mod similarity;

pub use matcher::JobMatcher;
pub use similarity::cosine_similarity;
