//! Matcher integration tests over an in-memory repository.

use std::sync::Arc;

use async_trait::async_trait;
use jobradar_core::{
    EnrichedJob, EnrichedJobRepository, Error, JobFilter, RawJob, Result, Seniority,
};
use jobradar_search::JobMatcher;

const DIM: usize = 8;

/// In-memory repository fixture.
struct MemoryRepo {
    jobs: Vec<EnrichedJob>,
}

#[async_trait]
impl EnrichedJobRepository for MemoryRepo {
    async fn upsert(&self, _job: &EnrichedJob) -> Result<()> {
        unimplemented!("read-only fixture")
    }

    async fn fetch(&self, id: &str) -> Result<Option<EnrichedJob>> {
        Ok(self.jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn list_embedded(&self, filter: &JobFilter) -> Result<Vec<EnrichedJob>> {
        Ok(self
            .jobs
            .iter()
            .filter(|j| !j.embedding.is_empty() && filter.matches(j))
            .cloned()
            .collect())
    }
}

fn job(id: &str, seniority: Seniority, skills: &[&str], embedding: Vec<f32>) -> EnrichedJob {
    EnrichedJob::compose(
        RawJob {
            id: id.to_string(),
            company: "Acme".into(),
            position: format!("{id} position"),
            location: "Remote".into(),
            url: String::new(),
            tags: vec![],
            description: String::new(),
        },
        skills.iter().map(|s| s.to_string()).collect(),
        seniority,
        "A role.".into(),
        embedding,
    )
}

/// Unit vector along one axis.
fn axis(i: usize) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[i] = 1.0;
    v
}

fn matcher(jobs: Vec<EnrichedJob>) -> JobMatcher {
    JobMatcher::new(Arc::new(MemoryRepo { jobs }), DIM)
}

#[tokio::test]
async fn results_are_sorted_descending_and_thresholded() {
    // Query along axis 0; similarities are the first component of each
    // stored unit vector.
    let jobs = vec![
        job("J1", Seniority::Mid, &[], {
            let mut v = axis(0);
            v[1] = 1.0; // 45° from the query: sim ≈ 0.707
            v
        }),
        job("J2", Seniority::Mid, &[], axis(0)), // sim = 1.0
        job("J3", Seniority::Mid, &[], axis(1)), // sim = 0.0
    ];
    let matcher = matcher(jobs);

    let results = matcher.rank(&axis(0), 10, 0.5, None).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].job.id, "J2");
    assert!((results[0].similarity - 1.0).abs() < 1e-5);
    assert_eq!(results[1].job.id, "J1");
    for pair in results.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }
    for result in &results {
        assert!(result.similarity >= 0.5);
    }
}

#[tokio::test]
async fn limit_caps_result_length() {
    let jobs = (0..6)
        .map(|i| job(&format!("J{i}"), Seniority::Mid, &[], axis(0)))
        .collect();
    let matcher = matcher(jobs);

    let results = matcher.rank(&axis(0), 3, 0.0, None).await.unwrap();
    assert_eq!(results.len(), 3);
}

#[tokio::test]
async fn equal_similarity_ties_break_by_id() {
    let jobs = vec![
        job("J-b", Seniority::Mid, &[], axis(0)),
        job("J-a", Seniority::Mid, &[], axis(0)),
        job("J-c", Seniority::Mid, &[], axis(0)),
    ];
    let matcher = matcher(jobs);

    let results = matcher.rank(&axis(0), 10, 0.0, None).await.unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.job.id.as_str()).collect();
    assert_eq!(ids, vec!["J-a", "J-b", "J-c"]);
}

#[tokio::test]
async fn mismatched_dimension_is_excluded_and_counted() {
    // A legacy 4-length embedding among 8-length ones: excluded from the
    // results, counted, never truncated or padded.
    let jobs = vec![
        job("legacy", Seniority::Mid, &[], vec![1.0; 4]),
        job("current", Seniority::Mid, &[], axis(0)),
    ];
    let matcher = matcher(jobs);

    let results = matcher.rank(&axis(0), 10, 0.0, None).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].job.id, "current");
    assert_eq!(matcher.dimension_mismatches(), 1);
}

#[tokio::test]
async fn exact_stored_vector_ranks_first_with_similarity_one() {
    let stored = {
        let mut v = vec![0.0; DIM];
        v[2] = 0.6;
        v[5] = 0.8;
        v
    };
    let jobs = vec![
        job("target", Seniority::Mid, &[], stored.clone()),
        job("other", Seniority::Mid, &[], axis(1)),
    ];
    let matcher = matcher(jobs);

    let results = matcher.rank(&stored, 10, 0.0, None).await.unwrap();
    assert_eq!(results[0].job.id, "target");
    assert!((results[0].similarity - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn min_similarity_of_one_returns_only_exact_matches() {
    let near = {
        let mut v = axis(0);
        v[1] = 0.05;
        v
    };
    let jobs = vec![
        job("exact", Seniority::Mid, &[], axis(0)),
        job("near", Seniority::Mid, &[], near),
    ];
    let matcher = matcher(jobs);

    // Tolerance for f32 rounding on the exact match.
    let results = matcher.rank(&axis(0), 10, 1.0 - 1e-5, None).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].job.id, "exact");
}

#[tokio::test]
async fn seniority_filter_restricts_candidates() {
    let jobs = vec![
        job("senior", Seniority::Senior, &[], axis(0)),
        job("junior", Seniority::Junior, &[], axis(0)),
    ];
    let matcher = matcher(jobs);

    let filter = JobFilter {
        seniority: Some(Seniority::Senior),
        skills: None,
    };
    let results = matcher.rank(&axis(0), 10, 0.0, Some(&filter)).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].job.id, "senior");
}

#[tokio::test]
async fn skills_filter_requires_all_listed_skills() {
    let jobs = vec![
        job("full", Seniority::Mid, &["Rust", "Kafka"], axis(0)),
        job("partial", Seniority::Mid, &["Rust"], axis(0)),
    ];
    let matcher = matcher(jobs);

    let filter = JobFilter {
        seniority: None,
        skills: Some(vec!["rust".into(), "kafka".into()]),
    };
    let results = matcher.rank(&axis(0), 10, 0.0, Some(&filter)).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].job.id, "full");
}

#[tokio::test]
async fn query_dimension_mismatch_is_invalid_input() {
    let matcher = matcher(vec![]);
    let err = matcher.rank(&[1.0; 3], 10, 0.0, None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn similar_to_job_excludes_the_reference() {
    let jobs = vec![
        job("ref", Seniority::Mid, &[], axis(0)),
        job("close", Seniority::Mid, &[], {
            let mut v = axis(0);
            v[1] = 0.3;
            v
        }),
        job("far", Seniority::Mid, &[], axis(3)),
    ];
    let matcher = matcher(jobs);

    let results = matcher.similar_to_job("ref", 2).await.unwrap();
    assert!(results.iter().all(|m| m.job.id != "ref"));
    assert_eq!(results[0].job.id, "close");
}

#[tokio::test]
async fn similar_to_unknown_job_is_empty() {
    let matcher = matcher(vec![job("J1", Seniority::Mid, &[], axis(0))]);
    let results = matcher.similar_to_job("missing", 5).await.unwrap();
    assert!(results.is_empty());
}
