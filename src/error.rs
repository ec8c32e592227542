//! Error types.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::process::ProcessError;

/// Failures talking to the generative text service.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("model {model} is over quota")]
    QuotaExceeded { model: String },

    #[error("model {model} returned HTTP {status}: {message}")]
    Service {
        model: String,
        status: u16,
        message: String,
    },

    #[error("request to model {model} failed: {message}")]
    Transport { model: String, message: String },

    #[error("model {model} did not answer within {secs}s")]
    Timeout { model: String, secs: u64 },

    #[error("model {model} returned malformed JSON: {message}")]
    MalformedResponse { model: String, message: String },

    #[error(
        "all {attempted} candidate models failed (last error: {})",
        .last_error.as_deref().unwrap_or("none")
    )]
    AllModelsExhausted {
        attempted: usize,
        last_error: Option<String>,
    },
}

impl GenerationError {
    pub fn is_quota(&self) -> bool {
        matches!(self, GenerationError::QuotaExceeded { .. })
    }
}

/// Failures of the media assembly pipeline that abort a job.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("video encoder failed: {0}")]
    Encoder(#[source] ProcessError),

    #[error("encoder finished but no output was written to {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("job workspace error: {0}")]
    Workspace(#[from] std::io::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Generation(_) => StatusCode::BAD_GATEWAY,
            ApiError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client; details stay in the server log.
    fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Generation(GenerationError::MalformedResponse { .. }) => {
                "The AI returned an unreadable answer. Please try again.".to_string()
            }
            ApiError::Generation(_) => {
                "Failed to generate content automatically. Please try again later.".to_string()
            }
            ApiError::Render(_) => "Failed to render the video.".to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            success: false,
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_message_includes_last_error() {
        let err = GenerationError::AllModelsExhausted {
            attempted: 3,
            last_error: Some("boom".to_string()),
        };
        assert_eq!(err.to_string(), "all 3 candidate models failed (last error: boom)");
    }

    #[test]
    fn test_api_error_status_codes() {
        let bad = ApiError::bad_request("missing keyword");
        assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(bad.public_message(), "missing keyword");

        let gen_err = ApiError::from(GenerationError::AllModelsExhausted {
            attempted: 1,
            last_error: None,
        });
        assert_eq!(gen_err.status_code(), StatusCode::BAD_GATEWAY);

        let render = ApiError::from(RenderError::MissingOutput(PathBuf::from("x.mp4")));
        assert_eq!(render.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!render.public_message().contains("x.mp4"));
    }
}
