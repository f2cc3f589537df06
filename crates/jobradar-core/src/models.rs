//! Domain models for the jobradar platform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// SENIORITY
// =============================================================================

/// Closed seniority set for enriched jobs.
///
/// LLM output is normalized into this set; anything unrecognized maps to
/// [`Seniority::Mid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seniority {
    Junior,
    Mid,
    Senior,
    Lead,
}

impl Seniority {
    /// Normalize free-form model output into the closed set.
    ///
    /// Exact matches are honored first; common variations ("entry",
    /// "sr.", "principal", "staff") map to their level; everything else
    /// falls back to `Mid`.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim() {
            "Junior" => return Self::Junior,
            "Mid" => return Self::Mid,
            "Senior" => return Self::Senior,
            "Lead" => return Self::Lead,
            _ => {}
        }

        let lower = raw.to_lowercase();
        if lower.contains("junior") || lower.contains("entry") {
            Self::Junior
        } else if lower.contains("senior") || lower.contains("sr") {
            Self::Senior
        } else if lower.contains("lead") || lower.contains("principal") || lower.contains("staff") {
            Self::Lead
        } else {
            Self::Mid
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Junior => "Junior",
            Self::Mid => "Mid",
            Self::Senior => "Senior",
            Self::Lead => "Lead",
        }
    }
}

impl std::fmt::Display for Seniority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Seniority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Junior" => Ok(Self::Junior),
            "Mid" => Ok(Self::Mid),
            "Senior" => Ok(Self::Senior),
            "Lead" => Ok(Self::Lead),
            _ => Err(format!("Invalid seniority: {}", s)),
        }
    }
}

// =============================================================================
// JOBS
// =============================================================================

/// A job posting as received from the raw-job log. Immutable once received.
///
/// Every field except `id` is optional in the wire format; producers are
/// scrapers and frequently omit fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawJob {
    pub id: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: String,
}

/// The persistent unit in storage: a raw job plus structured enrichment
/// fields and its embedding vector.
///
/// Invariants: `embedding.len()` equals the configured dimensionality,
/// `seniority` is drawn from the closed set, `id` is unique (storage
/// upserts by id, last writer wins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedJob {
    pub id: String,
    pub company: String,
    pub position: String,
    pub location: String,
    pub url: String,
    pub tags: Vec<String>,
    pub description: String,
    pub skills: Vec<String>,
    pub seniority: Seniority,
    pub summary: String,
    pub embedding: Vec<f32>,
    /// Server-assigned on first write and preserved across re-enrichment.
    pub created_at: DateTime<Utc>,
}

impl EnrichedJob {
    /// Compose an enriched job from its raw source and enrichment outputs.
    ///
    /// `created_at` is stamped here; the storage upsert keeps the first
    /// write's value on conflict.
    pub fn compose(
        raw: RawJob,
        skills: Vec<String>,
        seniority: Seniority,
        summary: String,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: raw.id,
            company: raw.company,
            position: raw.position,
            location: raw.location,
            url: raw.url,
            tags: raw.tags,
            description: raw.description,
            skills,
            seniority,
            summary,
            embedding,
            created_at: Utc::now(),
        }
    }
}

/// Structured filters for candidate selection in the matcher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobFilter {
    /// Exact-equality match on seniority.
    pub seniority: Option<Seniority>,
    /// Subset containment: every listed skill must appear in the job's
    /// skills (case-insensitive).
    pub skills: Option<Vec<String>>,
}

impl JobFilter {
    pub fn is_empty(&self) -> bool {
        self.seniority.is_none() && self.skills.is_none()
    }

    /// Whether the given job passes this filter.
    pub fn matches(&self, job: &EnrichedJob) -> bool {
        if let Some(seniority) = self.seniority {
            if job.seniority != seniority {
                return false;
            }
        }
        if let Some(required) = &self.skills {
            let have: Vec<String> = job.skills.iter().map(|s| s.to_lowercase()).collect();
            if !required
                .iter()
                .all(|skill| have.contains(&skill.to_lowercase()))
            {
                return false;
            }
        }
        true
    }
}

// =============================================================================
// RÉSUMÉ ANALYSIS
// =============================================================================

/// Professional profile extracted from a résumé. Transient per-request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeProfile {
    #[serde(default)]
    pub skills: Vec<String>,
    /// Estimated years of professional experience; `None` when unknown.
    #[serde(default)]
    pub experience_years: Option<u32>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_strengths: Vec<String>,
    #[serde(default)]
    pub education: String,
    #[serde(default)]
    pub job_titles: Vec<String>,
}

/// Skill gap between a candidate profile and one job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillGap {
    #[serde(rename = "missing_skills", default)]
    pub missing: Vec<String>,
    #[serde(rename = "matching_skills", default)]
    pub matching: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// One ranked match produced by the vector matcher.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub job: EnrichedJob,
    /// Cosine similarity against the query vector, in [-1, 1].
    pub similarity: f32,
    /// Populated for the top `gap_depth` matches when gap analysis is on.
    pub gap: Option<SkillGap>,
}

// =============================================================================
// RAW-JOB LOG
// =============================================================================

/// One entry read from the raw-job log collaborator.
///
/// `payload` is a self-describing JSON encoding of a [`RawJob`]; `id` is
/// the log's own entry id, used for commit.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamMessage {
    pub id: String,
    pub payload: Vec<u8>,
}
