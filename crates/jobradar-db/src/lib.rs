//! # jobradar-db
//!
//! Collaborator implementations for the jobradar core:
//! - PostgreSQL connection pool and enriched-job repository (embeddings
//!   stored with pgvector)
//! - best-effort Redis job cache
//! - Redis Streams raw-job log consumer (consumer-group poll/commit with
//!   at-least-once delivery)
//!
//! ## Example
//!
//! ```rust,ignore
//! use jobradar_db::{create_pool, PgEnrichedJobRepository};
//!
//! #[tokio::main]
//! async fn main() -> jobradar_core::Result<()> {
//!     let pool = create_pool("postgres://localhost/jobs").await?;
//!     let repo = PgEnrichedJobRepository::new(pool);
//!     repo.migrate().await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod jobs;
pub mod pool;
pub mod stream;

pub use cache::RedisJobCache;
pub use jobs::PgEnrichedJobRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use stream::RedisJobStream;

pub use jobradar_core::*;
