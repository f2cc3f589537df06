//! Enriched-job repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pgvector::Vector;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use jobradar_core::{EnrichedJob, EnrichedJobRepository, Error, JobFilter, Result, Seniority};

/// PostgreSQL implementation of [`EnrichedJobRepository`].
///
/// Embeddings are stored in a dimension-unconstrained `vector` column so
/// legacy rows with a different dimensionality remain readable; the
/// matcher excludes them at ranking time rather than the database
/// rejecting them at write time.
pub struct PgEnrichedJobRepository {
    pool: PgPool,
}

impl PgEnrichedJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotent schema bootstrap: extension, table, and indexes.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs_enriched (
                id TEXT PRIMARY KEY,
                company TEXT NOT NULL DEFAULT '',
                position TEXT NOT NULL DEFAULT '',
                location TEXT NOT NULL DEFAULT '',
                url TEXT NOT NULL DEFAULT '',
                tags TEXT[] NOT NULL DEFAULT '{}',
                skills TEXT[] NOT NULL DEFAULT '{}',
                seniority TEXT NOT NULL DEFAULT 'Mid',
                summary TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                embedding vector,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_jobs_enriched_company ON jobs_enriched(company)",
            "CREATE INDEX IF NOT EXISTS idx_jobs_enriched_seniority ON jobs_enriched(seniority)",
            "CREATE INDEX IF NOT EXISTS idx_jobs_enriched_created_at ON jobs_enriched(created_at)",
        ] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(Error::Database)?;
        }

        info!(
            subsystem = "db",
            component = "jobs",
            op = "migrate",
            "Schema bootstrap complete"
        );
        Ok(())
    }

    fn row_to_job(row: &sqlx::postgres::PgRow) -> EnrichedJob {
        let embedding: Option<Vector> = row.get("embedding");
        let seniority: String = row.get("seniority");
        let created_at: DateTime<Utc> = row.get("created_at");

        EnrichedJob {
            id: row.get("id"),
            company: row.get("company"),
            position: row.get("position"),
            location: row.get("location"),
            url: row.get("url"),
            tags: row.get("tags"),
            description: row.get("description"),
            skills: row.get("skills"),
            seniority: Seniority::normalize(&seniority),
            summary: row.get("summary"),
            embedding: embedding.map(|v| v.to_vec()).unwrap_or_default(),
            created_at,
        }
    }
}

#[async_trait]
impl EnrichedJobRepository for PgEnrichedJobRepository {
    /// Upsert keyed by the external job id. Every column except
    /// `created_at` is replaced, so redelivery keeps the first write's
    /// timestamp (last writer wins for content, first writer for age).
    async fn upsert(&self, job: &EnrichedJob) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs_enriched
                (id, company, position, location, url, tags, skills,
                 seniority, summary, description, embedding, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE SET
                company = EXCLUDED.company,
                position = EXCLUDED.position,
                location = EXCLUDED.location,
                url = EXCLUDED.url,
                tags = EXCLUDED.tags,
                skills = EXCLUDED.skills,
                seniority = EXCLUDED.seniority,
                summary = EXCLUDED.summary,
                description = EXCLUDED.description,
                embedding = EXCLUDED.embedding
            "#,
        )
        .bind(&job.id)
        .bind(&job.company)
        .bind(&job.position)
        .bind(&job.location)
        .bind(&job.url)
        .bind(&job.tags)
        .bind(&job.skills)
        .bind(job.seniority.as_str())
        .bind(&job.summary)
        .bind(&job.description)
        .bind(Vector::from(job.embedding.clone()))
        .bind(job.created_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "jobs",
            op = "upsert",
            job_id = %job.id,
            "Upserted enriched job"
        );
        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<Option<EnrichedJob>> {
        let row = sqlx::query(
            "SELECT id, company, position, location, url, tags, skills,
                    seniority, summary, description, embedding, created_at
             FROM jobs_enriched
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(Self::row_to_job))
    }

    async fn list_embedded(&self, filter: &JobFilter) -> Result<Vec<EnrichedJob>> {
        // Seniority narrows in SQL; the skills filter is case-insensitive
        // and applied after load.
        let rows = match filter.seniority {
            Some(seniority) => {
                sqlx::query(
                    "SELECT id, company, position, location, url, tags, skills,
                            seniority, summary, description, embedding, created_at
                     FROM jobs_enriched
                     WHERE embedding IS NOT NULL AND seniority = $1
                     ORDER BY created_at DESC",
                )
                .bind(seniority.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT id, company, position, location, url, tags, skills,
                            seniority, summary, description, embedding, created_at
                     FROM jobs_enriched
                     WHERE embedding IS NOT NULL
                     ORDER BY created_at DESC",
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(Error::Database)?;

        let jobs = rows
            .iter()
            .map(Self::row_to_job)
            .filter(|job| filter.matches(job))
            .collect();

        Ok(jobs)
    }
}
