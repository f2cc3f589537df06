//! Redis Streams consumer for the raw-job log.
//!
//! Implements the [`RawJobStream`] contract over a Redis stream with a
//! consumer group: `XREADGROUP` is the poll, `XACK` is the commit, and
//! entries left unacknowledged are redelivered after a restart, which
//! gives the at-least-once delivery the worker relies on. Each worker
//! replica registers its own consumer name so the group assigns disjoint
//! pending entries.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use tracing::{debug, info};

use jobradar_core::{defaults, Error, RawJobStream, Result, StreamMessage};

/// Field under which producers place the JSON-encoded raw job.
const PAYLOAD_FIELD: &str = "payload";

/// Raw-job log consumer over a Redis stream.
pub struct RedisJobStream {
    connection: ConnectionManager,
    stream: String,
    group: String,
    consumer: String,
}

impl RedisJobStream {
    /// Connect and register the consumer group (created at the stream
    /// head if missing; an already-existing group is not an error).
    pub async fn connect(
        url: &str,
        stream: impl Into<String>,
        group: impl Into<String>,
        consumer: impl Into<String>,
    ) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| Error::Stream(e.to_string()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| Error::Stream(e.to_string()))?;

        let mut this = Self {
            connection,
            stream: stream.into(),
            group: group.into(),
            consumer: consumer.into(),
        };
        this.ensure_group().await?;

        info!(
            subsystem = "db",
            component = "stream",
            stream = %this.stream,
            group = %this.group,
            consumer = %this.consumer,
            "Raw-job stream consumer registered"
        );
        Ok(this)
    }

    /// Connect from environment configuration.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `REDIS_URL` | `redis://localhost:6379` |
    /// | `JOBRADAR_RAW_STREAM` | `jobs_raw` |
    /// | `JOBRADAR_CONSUMER_GROUP` | `job_enrichment_group` |
    /// | `JOBRADAR_CONSUMER_NAME` | `worker-<pid>` |
    pub async fn from_env() -> Result<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let stream = std::env::var("JOBRADAR_RAW_STREAM")
            .unwrap_or_else(|_| defaults::RAW_JOBS_STREAM.to_string());
        let group = std::env::var("JOBRADAR_CONSUMER_GROUP")
            .unwrap_or_else(|_| defaults::CONSUMER_GROUP.to_string());
        let consumer = std::env::var("JOBRADAR_CONSUMER_NAME")
            .unwrap_or_else(|_| format!("worker-{}", std::process::id()));

        Self::connect(&url, stream, group, consumer).await
    }

    async fn ensure_group(&mut self) -> Result<()> {
        let created: std::result::Result<(), redis::RedisError> = self
            .connection
            .xgroup_create_mkstream(&self.stream, &self.group, "0")
            .await;

        match created {
            Ok(()) => Ok(()),
            Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
            Err(e) => Err(Error::Stream(e.to_string())),
        }
    }
}

#[async_trait]
impl RawJobStream for RedisJobStream {
    async fn poll(&mut self, timeout: Duration) -> Result<Option<StreamMessage>> {
        let options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .block(timeout.as_millis() as usize)
            .count(1);

        let reply: StreamReadReply = self
            .connection
            .xread_options(&[&self.stream], &[">"], &options)
            .await
            .map_err(|e| Error::Stream(e.to_string()))?;

        let entry = reply
            .keys
            .into_iter()
            .flat_map(|key| key.ids)
            .next();

        let Some(entry) = entry else {
            return Ok(None);
        };

        // A record without the payload field decodes to empty bytes and
        // falls into the worker's poison path.
        let payload = entry
            .map
            .get(PAYLOAD_FIELD)
            .and_then(|value| redis::from_redis_value::<Vec<u8>>(value).ok())
            .unwrap_or_default();

        debug!(
            subsystem = "db",
            component = "stream",
            op = "poll",
            stream_id = %entry.id,
            payload_len = payload.len(),
            "Received raw-job record"
        );

        Ok(Some(StreamMessage {
            id: entry.id,
            payload,
        }))
    }

    async fn commit(&mut self, message: &StreamMessage) -> Result<()> {
        let acked: i64 = self
            .connection
            .xack(&self.stream, &self.group, &[&message.id])
            .await
            .map_err(|e| Error::Stream(e.to_string()))?;

        debug!(
            subsystem = "db",
            component = "stream",
            op = "commit",
            stream_id = %message.id,
            acked,
            "Committed raw-job record"
        );
        Ok(())
    }
}
