//! Enrichment transform: raw job in, enriched job out.
//!
//! Each enrichment is two coupled dispatcher calls (structured
//! extraction, then an embedding over the extraction's output), so the
//! calls are sequential by data dependency and their results are stored
//! together or not at all. A partial result is worse than none: ranking
//! against a missing embedding is meaningless.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, instrument};

use jobradar_core::{defaults, EnrichedJob, RawJob, Result, Seniority};
use jobradar_inference::{Dispatcher, FieldKind, ResponseShape};

/// Turns raw jobs into enriched jobs via the dispatcher.
pub struct Enricher {
    dispatcher: Arc<Dispatcher>,
}

impl Enricher {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Back-off the worker sleeps after the dispatcher reports
    /// exhaustion: one per-slot cooldown, after which at least one slot
    /// is usable again.
    pub fn retry_backoff(&self) -> Duration {
        self.dispatcher.config().per_slot_cooldown
    }

    /// Enrich one raw job.
    ///
    /// Dispatcher errors (exhaustion, transport, parse) are re-raised
    /// unchanged; the worker owns the retry policy. There is no heuristic
    /// fallback here: keyword extraction and placeholder embeddings would
    /// obscure outages and poison similarity ranking.
    #[instrument(skip(self, raw), fields(subsystem = "pipeline", component = "enricher", op = "enrich", job_id = %raw.id))]
    pub async fn enrich(&self, raw: RawJob) -> Result<EnrichedJob> {
        let start = Instant::now();

        let prompt = enrichment_prompt(&raw.position, &raw.description);
        let fields = self
            .dispatcher
            .generate_structured(&prompt, &enrichment_shape(), None)
            .await?;

        let skills: Vec<String> = fields
            .get("skills")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let skills = dedup_skills(skills, defaults::MAX_SKILLS);

        let seniority = fields
            .get("seniority")
            .and_then(|v| v.as_str())
            .map(Seniority::normalize)
            .unwrap_or(Seniority::Mid);

        let summary = fields
            .get("summary")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let embedding = self
            .dispatcher
            .embed(&embedding_input(&raw.position, &summary, &skills), None)
            .await?;

        debug!(
            subsystem = "pipeline",
            component = "enricher",
            job_id = %raw.id,
            skill_count = skills.len(),
            seniority = %seniority,
            duration_ms = start.elapsed().as_millis() as u64,
            "Enrichment complete"
        );

        Ok(EnrichedJob::compose(raw, skills, seniority, summary, embedding))
    }
}

/// Shape of the extraction reply. `seniority` is optional: an absent
/// value normalizes to Mid rather than failing the whole record.
fn enrichment_shape() -> ResponseShape {
    ResponseShape::new()
        .field("skills", FieldKind::TextList)
        .optional("seniority", FieldKind::Text)
        .field("summary", FieldKind::Text)
}

fn enrichment_prompt(position: &str, description: &str) -> String {
    format!(
        r#"Analyze the following job posting and extract structured information.

Job Title: {position}

Job Description:
{description}

Provide a JSON object with the following fields:
1. "skills": a list of technical skills, tools, and technologies mentioned (max 15 items)
2. "seniority": the seniority level, one of "Junior", "Mid", "Senior", or "Lead"
3. "summary": a concise 2-sentence summary of the role and key requirements

Return ONLY valid JSON, no additional text or markdown formatting."#
    )
}

/// Dedupe case-insensitively, keep first occurrences, cap at `max`.
fn dedup_skills(skills: Vec<String>, max: usize) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut result = Vec::new();
    for skill in skills {
        let trimmed = skill.trim();
        if trimmed.is_empty() {
            continue;
        }
        let key = trimmed.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            result.push(trimmed.to_string());
            if result.len() == max {
                break;
            }
        }
    }
    result
}

/// Text handed to the embedding model: title, summary, and the skill
/// list rendering.
fn embedding_input(position: &str, summary: &str, skills: &[String]) -> String {
    format!("{position}\n{summary}\nSkills: {}", skills.join(", "))
}
