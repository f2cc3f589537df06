//! Vector matcher: rank stored jobs against a query embedding.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use tracing::{debug, warn};

use jobradar_core::{EnrichedJobRepository, Error, JobFilter, MatchResult, Result};

use crate::similarity::cosine_similarity;

/// Ranks persisted job embeddings against a query vector.
///
/// Stored vectors whose length differs from the expected dimensionality
/// are excluded from ranking and counted; they are never truncated or
/// padded. Placeholder vectors are legal but rank near random.
pub struct JobMatcher {
    repo: Arc<dyn EnrichedJobRepository>,
    expected_dim: usize,
    dimension_mismatches: AtomicU64,
}

impl JobMatcher {
    pub fn new(repo: Arc<dyn EnrichedJobRepository>, expected_dim: usize) -> Self {
        Self {
            repo,
            expected_dim,
            dimension_mismatches: AtomicU64::new(0),
        }
    }

    /// Rank candidates by descending cosine similarity.
    ///
    /// Returns at most `limit` results, every one with
    /// `similarity >= min_similarity`, ties broken by ascending job id.
    pub async fn rank(
        &self,
        query: &[f32],
        limit: usize,
        min_similarity: f32,
        filter: Option<&JobFilter>,
    ) -> Result<Vec<MatchResult>> {
        if query.len() != self.expected_dim {
            return Err(Error::InvalidInput(format!(
                "Query vector has dimension {}, expected {}",
                query.len(),
                self.expected_dim
            )));
        }

        let default_filter = JobFilter::default();
        let filter = filter.unwrap_or(&default_filter);
        let candidates = self.repo.list_embedded(filter).await?;
        let candidate_count = candidates.len();

        let mut results: Vec<MatchResult> = Vec::new();
        for job in candidates {
            if job.embedding.len() != self.expected_dim {
                self.dimension_mismatches
                    .fetch_add(1, AtomicOrdering::Relaxed);
                warn!(
                    subsystem = "search",
                    component = "matcher",
                    job_id = %job.id,
                    dimension = job.embedding.len(),
                    expected = self.expected_dim,
                    "Excluding job with mismatched embedding dimension"
                );
                continue;
            }

            let similarity = cosine_similarity(query, &job.embedding);
            if similarity >= min_similarity {
                results.push(MatchResult {
                    job,
                    similarity,
                    gap: None,
                });
            }
        }

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.job.id.cmp(&b.job.id))
        });
        results.truncate(limit);

        debug!(
            subsystem = "search",
            component = "matcher",
            op = "rank",
            candidates = candidate_count,
            result_count = results.len(),
            min_similarity,
            "Ranked job candidates"
        );

        Ok(results)
    }

    /// Rank jobs similar to a stored job, excluding the job itself.
    ///
    /// Returns an empty list when the reference job is unknown or has no
    /// usable embedding.
    pub async fn similar_to_job(&self, job_id: &str, limit: usize) -> Result<Vec<MatchResult>> {
        let reference = match self.repo.fetch(job_id).await? {
            Some(job) if job.embedding.len() == self.expected_dim => job,
            _ => return Ok(Vec::new()),
        };

        // One extra slot because the reference job ranks first against
        // its own embedding.
        let mut results = self.rank(&reference.embedding, limit + 1, 0.0, None).await?;
        results.retain(|m| m.job.id != job_id);
        results.truncate(limit);
        Ok(results)
    }

    /// How many stored vectors were excluded for dimensionality mismatch
    /// since this matcher was built.
    pub fn dimension_mismatches(&self) -> u64 {
        self.dimension_mismatches.load(AtomicOrdering::Relaxed)
    }
}
