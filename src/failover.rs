//! Prioritized model failover for the generative text service.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::api::TextGenerator;
use crate::config::Config;
use crate::error::GenerationError;

static FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\A\s*```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)\r?\n?[ \t]*```\s*\z").unwrap()
});

/// Tries each candidate model in order until one answers.
pub struct FailoverInvoker {
    generator: Arc<dyn TextGenerator>,
    models: Vec<String>,
    quota_backoff: Duration,
    call_timeout: Option<Duration>,
}

impl FailoverInvoker {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        models: Vec<String>,
        quota_backoff: Duration,
    ) -> Self {
        Self {
            generator,
            models,
            quota_backoff,
            call_timeout: None,
        }
    }

    pub fn from_config(generator: Arc<dyn TextGenerator>, cfg: &Config) -> Self {
        Self::new(generator, cfg.models.clone(), cfg.quota_backoff)
            .with_call_timeout(cfg.generation_timeout)
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Raw text from the first candidate that answers.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
        self.invoke(prompt, false, |_, text| Ok(text)).await
    }

    /// Strict JSON from the first candidate that answers. A candidate that answers with text that
    /// does not parse as `T` ends the run with `MalformedResponse`; the remaining candidates are
    /// not tried.
    pub async fn generate_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
    ) -> Result<T, GenerationError> {
        self.invoke(prompt, true, |model, text| {
            serde_json::from_str(strip_code_fence(&text)).map_err(|e| {
                GenerationError::MalformedResponse {
                    model: model.to_string(),
                    message: e.to_string(),
                }
            })
        })
        .await
    }

    async fn invoke<T, F>(&self, prompt: &str, json: bool, accept: F) -> Result<T, GenerationError>
    where
        F: Fn(&str, String) -> Result<T, GenerationError>,
    {
        let mut last_error = None;

        for (idx, model) in self.models.iter().enumerate() {
            info!(
                model = %model,
                attempt = idx + 1,
                of = self.models.len(),
                "calling generative model"
            );

            match self.call(model, prompt, json).await {
                Ok(text) => {
                    info!(model = %model, chars = text.len(), "generative model answered");
                    return accept(model, text);
                }
                Err(err) if err.is_quota() => {
                    warn!(
                        model = %model,
                        backoff = ?self.quota_backoff,
                        "model over quota, backing off"
                    );
                    last_error = Some(err.to_string());
                    tokio::time::sleep(self.quota_backoff).await;
                }
                Err(err) => {
                    warn!(model = %model, error = %err, "model failed, trying next candidate");
                    last_error = Some(err.to_string());
                }
            }
        }

        Err(GenerationError::AllModelsExhausted {
            attempted: self.models.len(),
            last_error,
        })
    }

    async fn call(&self, model: &str, prompt: &str, json: bool) -> Result<String, GenerationError> {
        let fut = self.generator.generate(model, prompt, json);
        match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .unwrap_or_else(|_| {
                    Err(GenerationError::Timeout {
                        model: model.to_string(),
                        secs: limit.as_secs(),
                    })
                }),
            None => fut.await,
        }
    }
}

/// Removes one pair of surrounding code-fence markers (```` ```json ... ``` ````), if present.
pub fn strip_code_fence(text: &str) -> &str {
    match FENCE_RE.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => text.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    enum Reply {
        Text(&'static str),
        Quota,
        Fail,
        Hang,
    }

    struct ScriptedGenerator {
        replies: Mutex<VecDeque<Reply>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            model: &str,
            _prompt: &str,
            _json: bool,
        ) -> Result<String, GenerationError> {
            self.calls.lock().unwrap().push(model.to_string());
            let reply = self.replies.lock().unwrap().pop_front();
            match reply {
                Some(Reply::Text(t)) => Ok(t.to_string()),
                Some(Reply::Quota) => Err(GenerationError::QuotaExceeded {
                    model: model.to_string(),
                }),
                Some(Reply::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok("late".to_string())
                }
                Some(Reply::Fail) | None => Err(GenerationError::Service {
                    model: model.to_string(),
                    status: 500,
                    message: "boom".to_string(),
                }),
            }
        }
    }

    #[derive(Debug, Deserialize)]
    struct Draft {
        title: String,
        content: String,
    }

    fn models(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("model-{i}")).collect()
    }

    fn invoker(generator: Arc<ScriptedGenerator>, n: usize) -> FailoverInvoker {
        FailoverInvoker::new(generator, models(n), Duration::from_secs(2))
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_candidate_success_stops() {
        let generator = ScriptedGenerator::new(vec![Reply::Text("hello")]);
        let inv = invoker(generator.clone(), 3);

        let start = tokio::time::Instant::now();
        assert_eq!(inv.generate_text("p").await.unwrap(), "hello");
        assert_eq!(generator.calls(), vec!["model-1"]);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_failures_back_off_then_succeed() {
        let generator =
            ScriptedGenerator::new(vec![Reply::Quota, Reply::Quota, Reply::Text("third")]);
        let inv = invoker(generator.clone(), 5);

        let start = tokio::time::Instant::now();
        assert_eq!(inv.generate_text("p").await.unwrap(), "third");
        assert_eq!(generator.calls(), vec!["model-1", "model-2", "model-3"]);
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_errors_do_not_wait() {
        let generator = ScriptedGenerator::new(vec![Reply::Fail, Reply::Text("ok")]);
        let inv = invoker(generator.clone(), 2);

        let start = tokio::time::Instant::now();
        assert_eq!(inv.generate_text("p").await.unwrap(), "ok");
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_candidates_fail() {
        let generator = ScriptedGenerator::new(vec![Reply::Fail, Reply::Quota, Reply::Fail]);
        let inv = invoker(generator.clone(), 3);

        match inv.generate_text("p").await {
            Err(GenerationError::AllModelsExhausted { attempted, last_error }) => {
                assert_eq!(attempted, 3);
                assert!(last_error.unwrap().contains("model-3"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(generator.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_candidate_list_is_exhausted() {
        let generator = ScriptedGenerator::new(vec![]);
        let inv = invoker(generator.clone(), 0);
        let err = inv.generate_text("p").await.unwrap_err();
        assert!(matches!(err, GenerationError::AllModelsExhausted { attempted: 0, .. }));
        assert!(generator.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_model_times_out_and_fails_over() {
        let generator = ScriptedGenerator::new(vec![Reply::Hang, Reply::Text("fast")]);
        let inv = invoker(generator.clone(), 2).with_call_timeout(Duration::from_secs(10));

        assert_eq!(inv.generate_text("p").await.unwrap(), "fast");
        assert_eq!(generator.calls(), vec!["model-1", "model-2"]);
    }

    #[tokio::test]
    async fn test_json_mode_parses_fenced_answer() {
        let generator = ScriptedGenerator::new(vec![Reply::Text(
            "```json\n{\"title\": \"T\", \"content\": \"C\"}\n```",
        )]);
        let inv = invoker(generator, 1);

        let draft: Draft = inv.generate_json("p").await.unwrap();
        assert_eq!(draft.title, "T");
        assert_eq!(draft.content, "C");
    }

    #[tokio::test]
    async fn test_json_parse_failure_is_not_retried() {
        let generator = ScriptedGenerator::new(vec![
            Reply::Text("{\"title\": \"only a title\"}"),
            Reply::Text("{\"title\": \"T\", \"content\": \"C\"}"),
        ]);
        let inv = invoker(generator.clone(), 2);

        let err = inv.generate_json::<Draft>("p").await.unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse { .. }));
        assert_eq!(generator.calls(), vec!["model-1"]);
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  ```\n{\"a\":1}\n```  "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn test_strip_code_fence_removes_only_one_pair() {
        let nested = "```json\n```inner```\n```";
        assert_eq!(strip_code_fence(nested), "```inner```");
    }
}
