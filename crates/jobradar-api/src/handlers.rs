//! HTTP handlers and error mapping for the résumé-matching surface.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use jobradar_core::{defaults, Error, MatchResult, ResumeProfile, Seniority, SkillGap};

use crate::analyzer::{AnalyzeOptions, ResumeAnalyzer};
use crate::extract::ResumeExtractor;

/// Shared state for the HTTP surface.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<ResumeAnalyzer>,
    pub extractor: Arc<dyn ResumeExtractor>,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/resume/match", post(match_resume))
        .layer(DefaultBodyLimit::max(defaults::MAX_UPLOAD_BYTES))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters for the match request.
#[derive(Debug, Deserialize)]
pub struct MatchParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,
    #[serde(default = "default_include_gap")]
    pub include_skill_gap: bool,
    #[serde(default = "default_gap_depth")]
    pub gap_depth: usize,
}

fn default_limit() -> usize {
    defaults::MATCH_LIMIT
}

fn default_min_similarity() -> f32 {
    defaults::MIN_SIMILARITY
}

fn default_include_gap() -> bool {
    true
}

fn default_gap_depth() -> usize {
    defaults::GAP_DEPTH
}

/// One matched job in the response. The embedding stays server-side.
#[derive(Debug, Serialize)]
pub struct JobMatchBody {
    pub id: String,
    pub company: String,
    pub position: String,
    pub location: String,
    pub url: String,
    pub skills: Vec<String>,
    pub seniority: Seniority,
    pub summary: String,
    pub similarity: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_gap: Option<SkillGap>,
}

impl From<MatchResult> for JobMatchBody {
    fn from(result: MatchResult) -> Self {
        Self {
            id: result.job.id,
            company: result.job.company,
            position: result.job.position,
            location: result.job.location,
            url: result.job.url,
            skills: result.job.skills,
            seniority: result.job.seniority,
            summary: result.job.summary,
            similarity: result.similarity,
            skill_gap: result.gap,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MatchResponseBody {
    pub profile: ResumeProfile,
    pub matches: Vec<JobMatchBody>,
    pub total_matches: usize,
    pub processing_time_ms: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// Upload a résumé and get ranked job matches with skill-gap analysis.
async fn match_resume(
    State(state): State<AppState>,
    Query(params): Query<MatchParams>,
    multipart: Multipart,
) -> Response {
    let upload = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(err) => return error_response(err),
    };

    if !state.extractor.supports(&upload.filename) {
        return error_response(Error::InvalidInput(format!(
            "Unsupported file type: {}",
            upload.filename
        )));
    }
    if upload.bytes.is_empty() {
        return error_response(Error::InvalidInput("Uploaded file is empty".to_string()));
    }

    let text = match state
        .extractor
        .extract_text(&upload.bytes, defaults::MAX_RESUME_PAGES)
    {
        Ok(text) => text,
        Err(err) => return error_response(err),
    };

    let options = AnalyzeOptions {
        limit: params.limit,
        min_similarity: params.min_similarity,
        include_gap: params.include_skill_gap,
        gap_depth: params.gap_depth,
        deadline: None,
    };

    match state.analyzer.analyze(&text, &options).await {
        Ok(analysis) => {
            let matches: Vec<JobMatchBody> =
                analysis.matches.into_iter().map(JobMatchBody::from).collect();
            info!(
                subsystem = "api",
                component = "resume",
                op = "match",
                result_count = matches.len(),
                duration_ms = analysis.processing_time_ms,
                "Resume matched"
            );
            Json(MatchResponseBody {
                profile: analysis.profile,
                total_matches: matches.len(),
                matches,
                processing_time_ms: analysis.processing_time_ms,
            })
            .into_response()
        }
        Err(err) => error_response(err),
    }
}

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

async fn read_upload(mut multipart: Multipart) -> jobradar_core::Result<Upload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidInput(format!("Malformed multipart payload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("resume").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidInput(format!("Failed to read upload: {e}")))?;
        return Ok(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
    }
    Err(Error::InvalidInput(
        "Missing \"file\" field in upload".to_string(),
    ))
}

/// Map core errors onto the HTTP contract: exhaustion → 429 with the
/// fixed busy body, malformed input → 400, everything else → 500.
pub fn error_response(err: Error) -> Response {
    match err {
        Error::Exhausted => {
            warn!(
                subsystem = "api",
                component = "resume",
                "Dispatcher exhausted; returning busy"
            );
            (StatusCode::TOO_MANY_REQUESTS, defaults::BUSY_MESSAGE).into_response()
        }
        Error::InvalidInput(message) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": message})),
        )
            .into_response(),
        err => {
            error!(
                subsystem = "api",
                component = "resume",
                error = %err,
                "Resume processing failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Resume processing failed"})),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_maps_to_429() {
        let response = error_response(Error::Exhausted);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn invalid_input_maps_to_400() {
        let response = error_response(Error::InvalidInput("empty".into()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn transport_and_parse_map_to_500() {
        assert_eq!(
            error_response(Error::Transport("down".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            error_response(Error::Parse("bad json".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn match_params_defaults() {
        let params: MatchParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.limit, 5);
        assert_eq!(params.min_similarity, 0.3);
        assert!(params.include_skill_gap);
        assert_eq!(params.gap_depth, 3);
    }
}
