//! HTTP handlers.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::job::GenerationJob;
use crate::state::AppState;
use crate::text;
use crate::writer::{self, WriterDraft};

/// Liveness probe.
pub async fn index() -> &'static str {
    "video-robot is running"
}

#[derive(Debug, Deserialize)]
pub struct WriterRequest {
    #[serde(default)]
    pub keyword: String,
}

#[derive(Debug, Serialize)]
pub struct WriterResponse {
    pub success: bool,
    #[serde(flatten)]
    pub draft: WriterDraft,
}

/// `POST /api/video-robot/ai-writer`
pub async fn ai_writer(
    State(state): State<AppState>,
    payload: Result<Json<WriterRequest>, JsonRejection>,
) -> ApiResult<Json<WriterResponse>> {
    let Json(req) = payload?;
    let keyword = req.keyword.trim();
    if keyword.is_empty() {
        return Err(ApiError::bad_request("Keyword is required"));
    }

    info!(keyword, "writing draft");
    let draft = writer::write_from_keyword(&state.invoker, keyword).await?;
    Ok(Json(WriterResponse { success: true, draft }))
}

/// `duration` arrives either as a JSON number or as a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DurationField {
    Secs(u32),
    Text(String),
}

impl DurationField {
    fn secs(&self) -> Result<Option<u32>, ApiError> {
        match self {
            DurationField::Secs(n) => Ok(Some(*n)),
            DurationField::Text(raw) if raw.trim().is_empty() => Ok(None),
            DurationField::Text(raw) => raw
                .trim()
                .parse::<u32>()
                .map(Some)
                .map_err(|_| ApiError::bad_request("Duration must be a whole number of seconds")),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub duration: Option<DurationField>,
    #[serde(default)]
    pub subtitle: bool,
    #[serde(rename = "footage_keyword")]
    pub footage_keyword: Option<String>,
    pub source_type: Option<String>,
    pub youtube_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub success: bool,
    pub video_url: String,
    pub job_id: String,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Turns the request into title + narration, asking the model when needed.
async fn resolve_script(
    state: &AppState,
    req: &ProcessRequest,
) -> ApiResult<(String, String, Option<String>)> {
    if req.source_type.as_deref() == Some("youtube") {
        let url = non_blank(&req.youtube_url)
            .ok_or_else(|| ApiError::bad_request("youtubeUrl is required for YouTube sources"))?;
        let draft = writer::write_from_youtube(&state.invoker, url).await?;
        return Ok((draft.title, draft.content, draft.footage_keyword));
    }

    if let Some(content) = non_blank(&req.content) {
        let title = non_blank(&req.title)
            .map(str::to_string)
            .unwrap_or_else(|| text::title_from_content(content));
        return Ok((title, content.to_string(), None));
    }

    if let Some(title) = non_blank(&req.title) {
        let draft = writer::write_from_keyword(&state.invoker, title).await?;
        return Ok((draft.title, draft.content, draft.footage_keyword));
    }

    Err(ApiError::bad_request("Either title or content is required"))
}

/// Base URL under which `/output` is reachable for this request.
fn public_base(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(base) = &state.config.public_base_url {
        return base.trim_end_matches('/').to_string();
    }
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{proto}://{host}")
}

/// `POST /api/video-robot/process`
pub async fn process(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> ApiResult<Json<ProcessResponse>> {
    let Json(req) = payload?;
    let requested = match &req.duration {
        Some(field) => field.secs()?,
        None => None,
    };
    let duration = state.config.video_duration(requested);

    let (title, narration, drafted_keyword) = resolve_script(&state, &req).await?;
    let keyword = non_blank(&req.footage_keyword)
        .map(str::to_string)
        .or(drafted_keyword);

    let job = GenerationJob::new(title, narration, duration)
        .with_subtitles(req.subtitle)
        .with_footage_keyword(keyword);

    let report = state.pipeline.render(&job).await?;
    let video_url = format!("{}/output/{}", public_base(&state, &headers), report.file_name);

    Ok(Json(ProcessResponse {
        success: true,
        video_url,
        job_id: report.job_id.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_accepts_number_or_string() {
        let req: ProcessRequest = serde_json::from_str(r#"{"duration": 45}"#).unwrap();
        assert_eq!(req.duration.unwrap().secs().unwrap(), Some(45));

        let req: ProcessRequest = serde_json::from_str(r#"{"duration": " 20 "}"#).unwrap();
        assert_eq!(req.duration.unwrap().secs().unwrap(), Some(20));

        let req: ProcessRequest = serde_json::from_str(r#"{"duration": ""}"#).unwrap();
        assert_eq!(req.duration.unwrap().secs().unwrap(), None);

        let req: ProcessRequest = serde_json::from_str(r#"{"duration": "long"}"#).unwrap();
        assert!(req.duration.unwrap().secs().is_err());
    }

    #[test]
    fn test_process_request_field_names() {
        let req: ProcessRequest = serde_json::from_value(serde_json::json!({
            "sourceType": "youtube",
            "youtubeUrl": "https://youtu.be/x",
            "footage_keyword": "city",
            "subtitle": true
        }))
        .unwrap();
        assert_eq!(req.source_type.as_deref(), Some("youtube"));
        assert_eq!(req.youtube_url.as_deref(), Some("https://youtu.be/x"));
        assert_eq!(req.footage_keyword.as_deref(), Some("city"));
        assert!(req.subtitle);
    }

    #[test]
    fn test_process_response_is_camel_case() {
        let body = serde_json::to_value(ProcessResponse {
            success: true,
            video_url: "http://h/output/v.mp4".to_string(),
            job_id: "abc".to_string(),
        })
        .unwrap();
        assert_eq!(body["videoUrl"], "http://h/output/v.mp4");
        assert_eq!(body["jobId"], "abc");
    }
}
