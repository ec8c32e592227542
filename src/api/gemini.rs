use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::TextGenerator;
use crate::config::Config;
use crate::error::GenerationError;

const MAX_ERROR_BODY_CHARS: usize = 800;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Google Generative Language API (`generateContent`).
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(client: Client, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    pub fn from_config(client: Client, cfg: &Config) -> Self {
        Self::new(client, cfg.gemini_api_key.clone(), cfg.gemini_base_url.clone())
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        json: bool,
    ) -> Result<String, GenerationError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: json.then_some(GenerationConfig {
                response_mime_type: "application/json",
            }),
        };

        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport {
                model: model.to_string(),
                message: e.without_url().to_string(),
            })?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            let snippet: String = raw.chars().take(MAX_ERROR_BODY_CHARS).collect();
            if is_quota_signal(status, &raw) {
                return Err(GenerationError::QuotaExceeded {
                    model: model.to_string(),
                });
            }
            return Err(GenerationError::Service {
                model: model.to_string(),
                status: status.as_u16(),
                message: snippet,
            });
        }

        match extract_text(&raw) {
            Some(text) => Ok(text),
            None => {
                let snippet: String = raw.chars().take(MAX_ERROR_BODY_CHARS).collect();
                warn!(model, body = %snippet, "Gemini response carried no text");
                Err(GenerationError::Service {
                    model: model.to_string(),
                    status: status.as_u16(),
                    message: "response contained no text".to_string(),
                })
            }
        }
    }
}

/// HTTP 429, or a `RESOURCE_EXHAUSTED` status in the error body.
fn is_quota_signal(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    let Ok(root) = serde_json::from_str::<serde_json::Value>(body) else {
        return false;
    };
    root.pointer("/error/status").and_then(|v| v.as_str()) == Some("RESOURCE_EXHAUSTED")
}

fn extract_text(raw: &str) -> Option<String> {
    let resp: GenerateResponse = serde_json::from_str(raw).ok()?;
    let content = resp.candidates.into_iter().next()?.content?;
    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    if text.trim().is_empty() { None } else { Some(text) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

    async fn server_replying(template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(query_param("key", "secret"))
            .respond_with(template)
            .mount(&server)
            .await;
        server
    }

    fn client(server: &MockServer) -> GeminiClient {
        GeminiClient::new(Client::new(), "secret", server.uri())
    }

    #[tokio::test]
    async fn test_generate_returns_text() {
        let server = server_replying(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "{\"title\":\"T\"}"}]}}]
        })))
        .await;

        let text = client(&server)
            .generate("gemini-2.5-flash", "prompt", true)
            .await
            .unwrap();
        assert_eq!(text, r#"{"title":"T"}"#);
    }

    #[tokio::test]
    async fn test_generate_429_is_quota() {
        let server = server_replying(ResponseTemplate::new(429)).await;

        let err = client(&server)
            .generate("gemini-2.5-flash", "prompt", false)
            .await
            .unwrap_err();
        match err {
            GenerationError::QuotaExceeded { model } => assert_eq!(model, "gemini-2.5-flash"),
            other => panic!("expected quota error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_resource_exhausted_is_quota() {
        let server = server_replying(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "status": "RESOURCE_EXHAUSTED", "message": "quota"}
        })))
        .await;

        let err = client(&server)
            .generate("gemini-2.5-flash", "prompt", false)
            .await
            .unwrap_err();
        assert!(err.is_quota());
    }

    #[tokio::test]
    async fn test_generate_other_status_is_service_error() {
        let server = server_replying(
            ResponseTemplate::new(404).set_body_string(r#"{"error":{"status":"NOT_FOUND"}}"#),
        )
        .await;

        let err = client(&server)
            .generate("gemini-2.5-flash", "prompt", false)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Service { status: 404, .. }));
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}]}}]}"#;
        assert_eq!(extract_text(raw).as_deref(), Some("Hello world"));
    }

    #[test]
    fn test_extract_text_empty() {
        assert_eq!(extract_text(r#"{"candidates":[]}"#), None);
        assert_eq!(extract_text(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#), None);
        assert_eq!(extract_text("not json"), None);
    }

    #[test]
    fn test_quota_detection() {
        assert!(is_quota_signal(StatusCode::TOO_MANY_REQUESTS, ""));
        let body = r#"{"error":{"code":403,"status":"RESOURCE_EXHAUSTED","message":"quota"}}"#;
        assert!(is_quota_signal(StatusCode::FORBIDDEN, body));
        assert!(!is_quota_signal(StatusCode::NOT_FOUND, r#"{"error":{"status":"NOT_FOUND"}}"#));
    }

    #[test]
    fn test_json_mode_sets_mime_type() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: "hi" }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json",
            }),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
    }
}
