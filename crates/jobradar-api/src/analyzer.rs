//! Résumé analyzer: profile extraction, embedding, ranking, and combined
//! gap analysis.
//!
//! Three dispatcher calls per full request, no matter the match count:
//! profile extraction, one embedding, and one batched gap prompt covering
//! all selected matches. Per-match gap calls would multiply provider
//! traffic by `gap_depth` and are the dominant quota consumer otherwise.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use jobradar_core::{
    defaults, Error, MatchResult, Result, ResumeProfile, SkillGap,
};
use jobradar_inference::{Dispatcher, FieldKind, ResponseShape};
use jobradar_search::JobMatcher;

/// Shortest résumé text worth sending to the model.
const MIN_RESUME_CHARS: usize = 50;

/// Caller-tunable knobs for one analysis request.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Top-k matches to return.
    pub limit: usize,
    /// Similarity threshold for returned matches.
    pub min_similarity: f32,
    /// Whether to run gap analysis at all.
    pub include_gap: bool,
    /// How many of the top matches receive a gap (clamped to `limit`).
    pub gap_depth: usize,
    /// Per-request deadline; a pool-wide cooldown that cannot finish in
    /// time fails fast as busy instead of stalling the request.
    pub deadline: Option<Instant>,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            limit: defaults::MATCH_LIMIT,
            min_similarity: defaults::MIN_SIMILARITY,
            include_gap: true,
            gap_depth: defaults::GAP_DEPTH,
            deadline: None,
        }
    }
}

/// Aggregate result of one analysis request.
#[derive(Debug, Clone)]
pub struct ResumeAnalysis {
    pub profile: ResumeProfile,
    pub matches: Vec<MatchResult>,
    pub processing_time_ms: u64,
}

/// Converts résumé text into ranked job matches with optional gaps.
pub struct ResumeAnalyzer {
    dispatcher: Arc<Dispatcher>,
    matcher: Arc<JobMatcher>,
}

impl ResumeAnalyzer {
    pub fn new(dispatcher: Arc<Dispatcher>, matcher: Arc<JobMatcher>) -> Self {
        Self {
            dispatcher,
            matcher,
        }
    }

    /// Full analysis: profile → embedding → rank → combined gap.
    #[instrument(skip(self, resume_text, options), fields(subsystem = "api", component = "analyzer", op = "analyze", resume_len = resume_text.len()))]
    pub async fn analyze(
        &self,
        resume_text: &str,
        options: &AnalyzeOptions,
    ) -> Result<ResumeAnalysis> {
        let start = Instant::now();

        let profile = self.extract_profile(resume_text, options.deadline).await?;
        let embedding = self
            .dispatcher
            .embed(&embedding_input(&profile, resume_text), options.deadline)
            .await?;

        let mut matches = self
            .matcher
            .rank(&embedding, options.limit, options.min_similarity, None)
            .await?;

        if options.include_gap && !matches.is_empty() {
            let depth = options.gap_depth.min(options.limit).min(matches.len());
            if depth > 0 {
                self.attach_gaps(&profile, &mut matches, depth, options.deadline)
                    .await?;
            }
        }

        let processing_time_ms = start.elapsed().as_millis() as u64;
        debug!(
            subsystem = "api",
            component = "analyzer",
            result_count = matches.len(),
            duration_ms = processing_time_ms,
            "Resume analysis complete"
        );

        Ok(ResumeAnalysis {
            profile,
            matches,
            processing_time_ms,
        })
    }

    /// Profile extraction without matching. Returns the profile and the
    /// embedding dimensionality actually produced.
    pub async fn profile_only(&self, resume_text: &str) -> Result<(ResumeProfile, usize)> {
        let profile = self.extract_profile(resume_text, None).await?;
        let embedding = self
            .dispatcher
            .embed(&embedding_input(&profile, resume_text), None)
            .await?;
        Ok((profile, embedding.len()))
    }

    async fn extract_profile(
        &self,
        resume_text: &str,
        deadline: Option<Instant>,
    ) -> Result<ResumeProfile> {
        if resume_text.trim().len() < MIN_RESUME_CHARS {
            return Err(Error::InvalidInput(
                "Could not extract meaningful text from resume".to_string(),
            ));
        }

        let fields = self
            .dispatcher
            .generate_structured(&profile_prompt(resume_text), &profile_shape(), deadline)
            .await?;

        let profile: ResumeProfile = serde_json::from_value(Value::Object(fields))
            .map_err(|e| Error::Parse(format!("Profile did not match expected shape: {e}")))?;
        Ok(profile)
    }

    /// One batched gap call for the first `depth` matches, spliced back
    /// by position.
    async fn attach_gaps(
        &self,
        profile: &ResumeProfile,
        matches: &mut [MatchResult],
        depth: usize,
        deadline: Option<Instant>,
    ) -> Result<()> {
        let selected = &matches[..depth];
        let prompt = gap_prompt(profile, selected);

        let gaps = self
            .dispatcher
            .generate_structured_list(&prompt, &gap_shape(), deadline)
            .await?;

        if gaps.len() < depth {
            warn!(
                subsystem = "api",
                component = "analyzer",
                expected = depth,
                result_count = gaps.len(),
                "Gap analysis returned fewer entries than jobs; remainder left unannotated"
            );
        }

        for (result, gap_fields) in matches.iter_mut().take(depth).zip(gaps.into_iter()) {
            let gap: SkillGap = serde_json::from_value(Value::Object(gap_fields))
                .map_err(|e| Error::Parse(format!("Gap entry did not match expected shape: {e}")))?;
            result.gap = Some(gap);
        }
        Ok(())
    }
}

fn profile_shape() -> ResponseShape {
    ResponseShape::new()
        .field("skills", FieldKind::TextList)
        .optional("experience_years", FieldKind::Integer)
        .field("summary", FieldKind::Text)
        .optional("key_strengths", FieldKind::TextList)
        .optional("education", FieldKind::Text)
        .optional("job_titles", FieldKind::TextList)
}

fn gap_shape() -> ResponseShape {
    ResponseShape::new()
        .optional("missing_skills", FieldKind::TextList)
        .optional("matching_skills", FieldKind::TextList)
        .optional("recommendations", FieldKind::TextList)
}

fn profile_prompt(resume_text: &str) -> String {
    format!(
        r#"Analyze the following resume and extract structured information.

Resume Text:
{resume_text}

Provide a JSON object with the following fields:
1. "skills": a list of technical skills, tools, and technologies (max 20 items)
2. "experience_years": estimated years of professional experience (integer)
3. "summary": a concise 3-sentence professional summary
4. "key_strengths": top 5 key strengths or areas of expertise
5. "education": highest degree and field of study
6. "job_titles": list of previous job titles (max 5)

Return ONLY valid JSON, no additional text or markdown formatting."#
    )
}

fn gap_prompt(profile: &ResumeProfile, matches: &[MatchResult]) -> String {
    let mut jobs_text = String::new();
    for (i, m) in matches.iter().enumerate() {
        let description: String = m.job.description.chars().take(300).collect();
        jobs_text.push_str(&format!(
            "Job {}:\n- Title: {}\n- Company: {}\n- Required Skills: {}\n- Description: {}\n\n",
            i + 1,
            m.job.position,
            m.job.company,
            m.job.skills.join(", "),
            description,
        ));
    }

    format!(
        r#"Analyze the skill gaps between this candidate and multiple job opportunities.

CANDIDATE PROFILE:
Skills: {}
Summary: {}

JOBS TO ANALYZE:
{}For EACH job, provide a JSON object with:
1. "missing_skills": top 3 skills the candidate should learn
2. "matching_skills": skills the candidate already has
3. "recommendations": 2-3 specific recommendations

Return a JSON array with one object per job, in the same order as listed.
Return ONLY valid JSON, no additional text."#,
        profile.skills.join(", "),
        profile.summary,
        jobs_text,
    )
}

/// Embedding input composed from the extracted profile, with a truncated
/// slice of the raw text for context.
fn embedding_input(profile: &ResumeProfile, resume_text: &str) -> String {
    let truncated: String = resume_text.chars().take(2_000).collect();
    format!(
        "Professional Summary: {}\n\nSkills: {}\n\nExperience: {} years\n\nKey Strengths: {}\n\nEducation: {}\n\nPrevious Roles: {}\n\nResume:\n{}",
        profile.summary,
        profile.skills.join(", "),
        profile.experience_years.unwrap_or(0),
        profile.key_strengths.join(", "),
        profile.education,
        profile.job_titles.join(", "),
        truncated,
    )
}
