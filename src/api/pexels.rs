use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{FootageSearch, FootageVideo};

const PEXELS_VIDEO_SEARCH: &str = "https://api.pexels.com/videos/search";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    videos: Vec<FootageVideo>,
}

/// Pexels video search.
pub struct PexelsClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl PexelsClient {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            endpoint: PEXELS_VIDEO_SEARCH.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl FootageSearch for PexelsClient {
    async fn search(&self, query: &str) -> Result<Vec<FootageVideo>> {
        let resp = self
            .client
            .get(&self.endpoint)
            .header("Authorization", &self.api_key)
            .query(&[("query", query), ("per_page", "1"), ("orientation", "landscape")])
            .send()
            .await
            .context("Pexels request failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("Pexels search HTTP {}", status.as_u16());
        }

        let body: SearchResponse = resp
            .json()
            .await
            .context("Pexels response parse failed")?;
        Ok(body.videos)
    }
}
