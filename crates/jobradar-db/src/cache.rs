//! Redis-based best-effort cache for enriched jobs.
//!
//! The pipeline writes each enriched job here after the storage upsert so
//! readers can serve recent jobs without touching Postgres. Failures are
//! surfaced as errors for the caller to log; the worker never blocks a
//! commit on this cache.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `REDIS_ENABLED`: set to "false" to disable caching (default: true)
//! - `REDIS_URL`: Redis connection URL (default: redis://localhost:6379)

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use jobradar_core::{EnrichedJob, Error, JobCache, Result};

const KEY_PREFIX: &str = "jobradar:job:";

/// Job cache backed by Redis.
pub struct RedisJobCache {
    /// `None` when disabled or the initial connection failed.
    connection: Mutex<Option<ConnectionManager>>,
}

impl RedisJobCache {
    /// Create a cache from environment configuration.
    ///
    /// A missing or unreachable Redis downgrades to a disabled cache with
    /// a warning; the pipeline keeps running without it.
    pub async fn from_env() -> Self {
        let enabled = std::env::var("REDIS_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let connection = if enabled {
            match redis::Client::open(redis_url.as_str()) {
                Ok(client) => match ConnectionManager::new(client).await {
                    Ok(conn) => {
                        info!(
                            subsystem = "db",
                            component = "cache",
                            "Redis job cache enabled"
                        );
                        Some(conn)
                    }
                    Err(e) => {
                        warn!(
                            subsystem = "db",
                            component = "cache",
                            error = %e,
                            "Failed to connect to Redis, cache disabled"
                        );
                        None
                    }
                },
                Err(e) => {
                    warn!(
                        subsystem = "db",
                        component = "cache",
                        error = %e,
                        "Invalid Redis URL, cache disabled"
                    );
                    None
                }
            }
        } else {
            info!(
                subsystem = "db",
                component = "cache",
                "Redis job cache disabled via REDIS_ENABLED=false"
            );
            None
        };

        Self {
            connection: Mutex::new(connection),
        }
    }

    /// Create a disabled cache (for tests or when Redis is unavailable).
    pub fn disabled() -> Self {
        Self {
            connection: Mutex::new(None),
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    fn key(id: &str) -> String {
        format!("{KEY_PREFIX}{id}")
    }
}

#[async_trait]
impl JobCache for RedisJobCache {
    async fn cache_job(&self, job: &EnrichedJob, ttl: Duration) -> Result<()> {
        let mut guard = self.connection.lock().await;
        let conn = match guard.as_mut() {
            Some(conn) => conn,
            // Disabled cache is a successful no-op, not a failure.
            None => return Ok(()),
        };

        let serialized = serde_json::to_string(job)?;
        let key = Self::key(&job.id);

        conn.set_ex::<_, _, ()>(&key, serialized, ttl.as_secs())
            .await
            .map_err(|e| Error::Cache(e.to_string()))?;

        debug!(
            subsystem = "db",
            component = "cache",
            op = "set",
            job_id = %job.id,
            ttl_secs = ttl.as_secs(),
            "Cached enriched job"
        );
        Ok(())
    }
}
