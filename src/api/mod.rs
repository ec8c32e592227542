//! Clients for the remote services, and the traits the rest of the crate talks to.

pub mod gemini;
pub mod pexels;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::GenerationError;

/// A generative text backend addressed by model identifier.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates a completion for `prompt` with `model`. `json` asks the backend for a JSON
    /// response where it supports that; callers still validate the text themselves.
    async fn generate(&self, model: &str, prompt: &str, json: bool)
    -> Result<String, GenerationError>;
}

/// One stock-footage search hit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FootageVideo {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub video_files: Vec<FootageFile>,
}

/// One encoded variant of a footage hit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FootageFile {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub quality: Option<String>,
    pub link: String,
}

/// A stock-footage search backend.
#[async_trait]
pub trait FootageSearch: Send + Sync {
    async fn search(&self, query: &str) -> anyhow::Result<Vec<FootageVideo>>;
}
