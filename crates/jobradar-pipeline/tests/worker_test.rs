//! Stream worker integration tests over in-memory collaborators.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jobradar_core::{
    EnrichedJob, EnrichedJobRepository, Error, JobCache, JobFilter, RawJobStream, Result,
    StreamMessage,
};
use jobradar_inference::mock::MockLlmClient;
use jobradar_inference::{Dispatcher, DispatcherConfig};
use jobradar_pipeline::{Enricher, StreamWorker, WorkerConfig, WorkerOutcome};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// In-memory raw-job log: a queue of pending messages plus a commit log.
struct MemoryStream {
    pending: VecDeque<StreamMessage>,
    committed: Arc<Mutex<Vec<String>>>,
}

impl MemoryStream {
    fn with_messages(payloads: Vec<&[u8]>) -> (Self, Arc<Mutex<Vec<String>>>) {
        let committed = Arc::new(Mutex::new(Vec::new()));
        let pending = payloads
            .into_iter()
            .enumerate()
            .map(|(i, payload)| StreamMessage {
                id: format!("{}-0", i + 1),
                payload: payload.to_vec(),
            })
            .collect();
        (
            Self {
                pending,
                committed: Arc::clone(&committed),
            },
            committed,
        )
    }
}

#[async_trait]
impl RawJobStream for MemoryStream {
    async fn poll(&mut self, _timeout: Duration) -> Result<Option<StreamMessage>> {
        Ok(self.pending.pop_front())
    }

    async fn commit(&mut self, message: &StreamMessage) -> Result<()> {
        self.committed.lock().unwrap().push(message.id.clone());
        Ok(())
    }
}

/// In-memory enriched-job store.
#[derive(Clone, Default)]
struct MemoryRepo {
    jobs: Arc<Mutex<HashMap<String, EnrichedJob>>>,
}

#[async_trait]
impl EnrichedJobRepository for MemoryRepo {
    async fn upsert(&self, job: &EnrichedJob) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        // Preserve the first write's created_at, like the real upsert.
        let created_at = jobs
            .get(&job.id)
            .map(|existing| existing.created_at)
            .unwrap_or(job.created_at);
        let mut stored = job.clone();
        stored.created_at = created_at;
        jobs.insert(job.id.clone(), stored);
        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<Option<EnrichedJob>> {
        Ok(self.jobs.lock().unwrap().get(id).cloned())
    }

    async fn list_embedded(&self, filter: &JobFilter) -> Result<Vec<EnrichedJob>> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .values()
            .filter(|j| !j.embedding.is_empty() && filter.matches(j))
            .cloned()
            .collect())
    }
}

/// Cache that records ids, or fails on demand.
#[derive(Clone)]
struct MemoryCache {
    cached: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl MemoryCache {
    fn new(fail: bool) -> Self {
        Self {
            cached: Arc::new(Mutex::new(Vec::new())),
            fail,
        }
    }
}

#[async_trait]
impl JobCache for MemoryCache {
    async fn cache_job(&self, job: &EnrichedJob, _ttl: Duration) -> Result<()> {
        if self.fail {
            return Err(Error::Cache("simulated cache outage".into()));
        }
        self.cached.lock().unwrap().push(job.id.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const RAW_J1: &[u8] = br#"{
    "id": "J1",
    "company": "Acme",
    "position": "Senior Python Developer",
    "location": "Remote",
    "url": "https://example.com/j1",
    "tags": ["python"],
    "description": "Python, AWS, Docker and more."
}"#;

const EXTRACTION_J1: &str =
    r#"{"skills": ["Python", "AWS", "Docker"], "seniority": "Senior", "summary": "Backend role."}"#;

fn enricher(client: &Arc<MockLlmClient>, pool_size: usize) -> Enricher {
    let config = DispatcherConfig::new((0..pool_size).map(|i| format!("key-{i}")).collect())
        .with_min_gap(Duration::from_millis(1))
        .with_cooldown(Duration::from_millis(20));
    let dispatcher = Dispatcher::new(
        Arc::clone(client) as Arc<dyn jobradar_core::LlmClient>,
        config,
    )
    .unwrap();
    Enricher::new(Arc::new(dispatcher))
}

struct Harness {
    worker: StreamWorker,
    committed: Arc<Mutex<Vec<String>>>,
    repo: MemoryRepo,
    cache: MemoryCache,
}

fn harness(payloads: Vec<&[u8]>, client: &Arc<MockLlmClient>, cache_fails: bool) -> Harness {
    let (stream, committed) = MemoryStream::with_messages(payloads);
    let repo = MemoryRepo::default();
    let cache = MemoryCache::new(cache_fails);
    let worker = StreamWorker::new(
        Box::new(stream),
        enricher(client, 1),
        Arc::new(repo.clone()),
        Arc::new(cache.clone()),
        WorkerConfig::default()
            .with_poll_timeout(Duration::from_millis(5))
            .with_max_transport_retries(2),
    );
    Harness {
        worker,
        committed,
        repo,
        cache,
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn happy_enrichment_stores_and_commits() {
    let client = Arc::new(MockLlmClient::new().with_generation(EXTRACTION_J1));
    let mut h = harness(vec![RAW_J1], &client, false);

    let outcome = h.worker.process_next().await.unwrap();
    assert_eq!(
        outcome,
        WorkerOutcome::Processed {
            job_id: "J1".into()
        }
    );

    let stored = h.repo.fetch("J1").await.unwrap().expect("job stored");
    assert_eq!(stored.skills, vec!["Python", "AWS", "Docker"]);
    assert_eq!(stored.seniority.as_str(), "Senior");
    assert_eq!(stored.embedding.len(), 768);
    assert_eq!(stored.company, "Acme");

    assert_eq!(h.committed.lock().unwrap().as_slice(), &["1-0".to_string()]);
    assert_eq!(h.cache.cached.lock().unwrap().as_slice(), &["J1".to_string()]);
}

#[tokio::test]
async fn empty_log_is_idle() {
    let client = Arc::new(MockLlmClient::new());
    let mut h = harness(vec![], &client, false);

    assert_eq!(h.worker.process_next().await.unwrap(), WorkerOutcome::Idle);
    assert_eq!(client.generate_call_count(), 0);
}

#[tokio::test]
async fn undecodable_payload_is_committed_as_poison() {
    let client = Arc::new(MockLlmClient::new());
    let mut h = harness(vec![b"this is not json"], &client, false);

    let outcome = h.worker.process_next().await.unwrap();
    assert_eq!(
        outcome,
        WorkerOutcome::Poisoned {
            stream_id: "1-0".into()
        }
    );

    // Committed without touching the dispatcher or storage.
    assert_eq!(h.committed.lock().unwrap().len(), 1);
    assert_eq!(client.generate_call_count(), 0);
    assert!(h.repo.jobs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn exhaustion_retries_same_record_without_committing() {
    // First enrichment attempt exhausts the single-slot pool; the worker
    // backs off one cooldown and retries the same record to success.
    let client = Arc::new(
        MockLlmClient::new()
            .with_rate_limit()
            .with_generation(EXTRACTION_J1),
    );
    let mut h = harness(vec![RAW_J1], &client, false);

    let outcome = h.worker.process_next().await.unwrap();
    assert_eq!(
        outcome,
        WorkerOutcome::Processed {
            job_id: "J1".into()
        }
    );
    assert_eq!(client.generate_call_count(), 2);
    assert_eq!(h.committed.lock().unwrap().len(), 1);
    assert!(h.repo.fetch("J1").await.unwrap().is_some());
}

#[tokio::test]
async fn transport_failures_commit_as_failed_after_bound() {
    // Bound of 2 retries → 3 attempts, then a logged failure commit so
    // the partition is not poisoned.
    let client = Arc::new(
        MockLlmClient::new()
            .with_transport_error("dns")
            .with_transport_error("dns")
            .with_transport_error("dns"),
    );
    let mut h = harness(vec![RAW_J1], &client, false);

    let outcome = h.worker.process_next().await.unwrap();
    assert_eq!(
        outcome,
        WorkerOutcome::Failed {
            stream_id: "1-0".into()
        }
    );
    assert_eq!(client.generate_call_count(), 3);
    assert!(h.repo.jobs.lock().unwrap().is_empty());
    assert_eq!(h.committed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unparseable_model_output_is_poison_after_one_retry() {
    let client = Arc::new(
        MockLlmClient::new()
            .with_generation("garbage")
            .with_generation("more garbage"),
    );
    let mut h = harness(vec![RAW_J1], &client, false);

    let outcome = h.worker.process_next().await.unwrap();
    assert_eq!(
        outcome,
        WorkerOutcome::Failed {
            stream_id: "1-0".into()
        }
    );
    assert_eq!(client.generate_call_count(), 2);
}

#[tokio::test]
async fn cache_failure_does_not_block_commit() {
    let client = Arc::new(MockLlmClient::new().with_generation(EXTRACTION_J1));
    let mut h = harness(vec![RAW_J1], &client, true);

    let outcome = h.worker.process_next().await.unwrap();
    assert_eq!(
        outcome,
        WorkerOutcome::Processed {
            job_id: "J1".into()
        }
    );
    assert!(h.repo.fetch("J1").await.unwrap().is_some());
    assert_eq!(h.committed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn redelivery_preserves_first_created_at() {
    // The same record delivered twice: content is replaced, created_at
    // keeps the first write's value.
    let client = Arc::new(
        MockLlmClient::new()
            .with_generation(EXTRACTION_J1)
            .with_generation(EXTRACTION_J1),
    );
    let mut h = harness(vec![RAW_J1, RAW_J1], &client, false);

    h.worker.process_next().await.unwrap();
    let first = h.repo.fetch("J1").await.unwrap().unwrap();

    h.worker.process_next().await.unwrap();
    let second = h.repo.fetch("J1").await.unwrap().unwrap();

    assert_eq!(first.created_at, second.created_at);
    assert_eq!(first.id, second.id);
    assert_eq!(h.committed.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn worker_handle_shutdown_stops_the_loop() {
    let client = Arc::new(MockLlmClient::new());
    let h = harness(vec![], &client, false);

    let handle = h.worker.start();
    handle.shutdown().await.unwrap();
}
