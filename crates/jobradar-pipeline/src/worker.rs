//! Stream worker: drives the enrichment transform from the raw-job log.
//!
//! The loop is plain poll/commit with explicit boundaries. Shutdown is
//! honored between messages only; a worker killed mid-message is
//! indistinguishable from a crash and is covered by the log's
//! at-least-once redelivery.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use jobradar_core::{
    defaults, EnrichedJobRepository, Error, JobCache, RawJob, RawJobStream, Result, StreamMessage,
};

use crate::enrich::Enricher;

/// Configuration for the stream worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Poll timeout when the log is empty.
    pub poll_timeout: Duration,
    /// Bounded retries for transport failures before a record is
    /// committed with a logged failure.
    pub max_transport_retries: u32,
    /// TTL for the best-effort job cache.
    pub cache_ttl: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(defaults::POLL_TIMEOUT_MS),
            max_transport_retries: defaults::WORKER_MAX_RETRIES,
            cache_ttl: Duration::from_secs(defaults::CACHE_TTL_SECS),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `JOBRADAR_POLL_TIMEOUT_MS` | `1000` | Poll timeout |
    /// | `JOBRADAR_WORKER_MAX_RETRIES` | `3` | Transport retry bound |
    /// | `JOBRADAR_CACHE_TTL_SECS` | `3600` | Cache TTL |
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ms) = parse_env::<u64>("JOBRADAR_POLL_TIMEOUT_MS") {
            config.poll_timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = parse_env::<u32>("JOBRADAR_WORKER_MAX_RETRIES") {
            config.max_transport_retries = retries;
        }
        if let Some(secs) = parse_env::<u64>("JOBRADAR_CACHE_TTL_SECS") {
            config.cache_ttl = Duration::from_secs(secs);
        }
        config
    }

    /// Set the poll timeout.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the transport retry bound.
    pub fn with_max_transport_retries(mut self, retries: u32) -> Self {
        self.max_transport_retries = retries;
        self
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// What one worker iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// The poll timed out with no message.
    Idle,
    /// A record was enriched, stored, and committed.
    Processed { job_id: String },
    /// The payload could not be decoded; committed without processing.
    Poisoned { stream_id: String },
    /// Enrichment failed past the retry policy; committed with a logged
    /// failure to avoid blocking the partition.
    Failed { stream_id: String },
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl WorkerHandle {
    /// Signal shutdown and wait for the worker to finish its current
    /// message and exit.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown_tx.send(()).await;
        self.handle
            .await
            .map_err(|e| Error::Stream(format!("Worker task failed: {e}")))
    }
}

/// Long-running task that pulls raw jobs off the log, enriches them, and
/// commits idempotently.
///
/// Replicate horizontally by giving each replica its own consumer-group
/// member identity; the log assigns disjoint records.
pub struct StreamWorker {
    stream: Box<dyn RawJobStream>,
    enricher: Enricher,
    repo: Arc<dyn EnrichedJobRepository>,
    cache: Arc<dyn JobCache>,
    config: WorkerConfig,
}

impl StreamWorker {
    pub fn new(
        stream: Box<dyn RawJobStream>,
        enricher: Enricher,
        repo: Arc<dyn EnrichedJobRepository>,
        cache: Arc<dyn JobCache>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            stream,
            enricher,
            repo,
            cache,
            config,
        }
    }

    /// Start the worker loop and return a control handle.
    pub fn start(mut self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let handle = tokio::spawn(async move {
            info!(
                subsystem = "pipeline",
                component = "worker",
                "Stream worker started"
            );
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    info!(
                        subsystem = "pipeline",
                        component = "worker",
                        "Stream worker received shutdown signal"
                    );
                    break;
                }
                if let Err(e) = self.process_next().await {
                    // Collaborator hiccup (log or storage). The record is
                    // uncommitted and will be redelivered; don't spin.
                    error!(
                        subsystem = "pipeline",
                        component = "worker",
                        error = %e,
                        "Worker iteration failed"
                    );
                    sleep(self.config.poll_timeout).await;
                }
            }
            info!(
                subsystem = "pipeline",
                component = "worker",
                "Stream worker stopped"
            );
        });

        WorkerHandle {
            shutdown_tx,
            handle,
        }
    }

    /// One iteration: poll, decode, enrich with retries, persist, commit.
    ///
    /// Errors bubble up only for collaborator failures that leave the
    /// record uncommitted (poll, commit, storage); enrichment failures
    /// resolve into [`WorkerOutcome`] per the retry policy.
    #[instrument(skip(self), fields(subsystem = "pipeline", component = "worker", op = "process"))]
    pub async fn process_next(&mut self) -> Result<WorkerOutcome> {
        let message = match self.stream.poll(self.config.poll_timeout).await? {
            Some(message) => message,
            None => return Ok(WorkerOutcome::Idle),
        };

        let raw: RawJob = match serde_json::from_slice(&message.payload) {
            Ok(raw) => raw,
            Err(e) => {
                // Poison-message policy: discard rather than block the
                // partition.
                warn!(
                    subsystem = "pipeline",
                    component = "worker",
                    stream_id = %message.id,
                    error = %e,
                    "Undecodable raw-job record; committing as poison"
                );
                self.stream.commit(&message).await?;
                return Ok(WorkerOutcome::Poisoned {
                    stream_id: message.id,
                });
            }
        };

        debug!(
            subsystem = "pipeline",
            component = "worker",
            stream_id = %message.id,
            job_id = %raw.id,
            position = %raw.position,
            "Processing raw job"
        );

        match self.enrich_with_retries(&message, &raw).await {
            Some(job) => {
                let job_id = job.id.clone();
                self.repo.upsert(&job).await?;

                if let Err(e) = self.cache.cache_job(&job, self.config.cache_ttl).await {
                    warn!(
                        subsystem = "pipeline",
                        component = "worker",
                        job_id = %job_id,
                        error = %e,
                        "Job cache write failed"
                    );
                }

                self.stream.commit(&message).await?;
                info!(
                    subsystem = "pipeline",
                    component = "worker",
                    stream_id = %message.id,
                    job_id = %job_id,
                    "Enriched job stored and committed"
                );
                Ok(WorkerOutcome::Processed { job_id })
            }
            None => {
                self.stream.commit(&message).await?;
                Ok(WorkerOutcome::Failed {
                    stream_id: message.id,
                })
            }
        }
    }

    /// Retry policy around the transform.
    ///
    /// - Exhaustion: never committed past; sleep one dispatcher-derived
    ///   back-off and retry the same record, indefinitely. The log
    ///   redelivers if the process dies mid-retry.
    /// - Parse: one retry (models are noisy), then poison.
    /// - Transport and the rest: bounded retries, then a logged failure.
    async fn enrich_with_retries(
        &self,
        message: &StreamMessage,
        raw: &RawJob,
    ) -> Option<jobradar_core::EnrichedJob> {
        let mut transport_retries = 0u32;
        let mut parse_retries = 0u32;

        loop {
            match self.enricher.enrich(raw.clone()).await {
                Ok(job) => return Some(job),
                Err(Error::Exhausted) => {
                    let backoff = self.enricher.retry_backoff();
                    warn!(
                        subsystem = "pipeline",
                        component = "worker",
                        stream_id = %message.id,
                        job_id = %raw.id,
                        backoff_ms = backoff.as_millis() as u64,
                        "Dispatcher exhausted; backing off before retrying the record"
                    );
                    sleep(backoff).await;
                }
                Err(Error::Parse(e)) => {
                    parse_retries += 1;
                    if parse_retries > 1 {
                        error!(
                            subsystem = "pipeline",
                            component = "worker",
                            stream_id = %message.id,
                            job_id = %raw.id,
                            error = %e,
                            "Model output unusable after retry; committing as failed"
                        );
                        return None;
                    }
                    warn!(
                        subsystem = "pipeline",
                        component = "worker",
                        job_id = %raw.id,
                        error = %e,
                        "Model output failed validation; retrying once"
                    );
                }
                Err(e) => {
                    transport_retries += 1;
                    if transport_retries > self.config.max_transport_retries {
                        error!(
                            subsystem = "pipeline",
                            component = "worker",
                            stream_id = %message.id,
                            job_id = %raw.id,
                            error = %e,
                            retries = transport_retries - 1,
                            "Enrichment failed past the retry bound; committing as failed"
                        );
                        return None;
                    }
                    warn!(
                        subsystem = "pipeline",
                        component = "worker",
                        job_id = %raw.id,
                        error = %e,
                        retry = transport_retries,
                        "Enrichment failed; retrying"
                    );
                }
            }
        }
    }
}
