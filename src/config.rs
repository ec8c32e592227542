use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODELS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-2.5-flash-lite",
    "gemini-2.0-flash",
    "gemini-2.0-flash-001",
    "gemini-2.0-flash-lite",
    "gemini-2.0-flash-lite-001",
    "gemini-flash-latest",
    "gemini-flash-lite-latest",
    "gemini-2.5-pro",
    "gemini-pro-latest",
    "gemma-3-27b-it",
    "gemma-3-12b-it",
];

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Process-wide settings, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    /// Candidate models in priority order.
    pub models: Vec<String>,
    pub quota_backoff: Duration,
    pub generation_timeout: Duration,
    pub pexels_api_key: Option<String>,
    pub footage_min_width: u32,
    pub footage_max_width: u32,
    pub footage_timeout: Duration,
    pub output_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub public_base_url: Option<String>,
    pub cors_origins: Vec<String>,
    pub tts_program: String,
    pub tts_language: String,
    pub tts_timeout: Duration,
    pub ffmpeg_program: String,
    pub font_file: Option<PathBuf>,
    pub default_video_secs: u32,
    pub max_video_secs: u32,
    pub render_timeout: Duration,
    pub retention: Duration,
    pub sweep_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            gemini_api_key: String::new(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            quota_backoff: Duration::from_secs(2),
            generation_timeout: Duration::from_secs(60),
            pexels_api_key: None,
            footage_min_width: 1280,
            footage_max_width: 1920,
            footage_timeout: Duration::from_secs(15),
            output_dir: PathBuf::from("output"),
            temp_dir: PathBuf::from("tmp"),
            public_base_url: None,
            cors_origins: vec!["*".to_string()],
            tts_program: "gtts-cli".to_string(),
            tts_language: "id".to_string(),
            tts_timeout: Duration::from_secs(60),
            ffmpeg_program: "ffmpeg".to_string(),
            font_file: None,
            default_video_secs: 30,
            max_video_secs: 60,
            render_timeout: Duration::from_secs(300),
            retention: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(600),
        }
    }
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let Some(gemini_api_key) = get("GEMINI_API_KEY") else {
            anyhow::bail!("GEMINI_API_KEY missing");
        };

        let models = match get("GEMINI_MODELS") {
            Some(list) => split_list(&list),
            None => defaults.models,
        };
        if models.is_empty() {
            anyhow::bail!("GEMINI_MODELS: at least one model identifier is required");
        }

        let secs = |key: &str, fallback: Duration| -> Result<Duration> {
            Ok(parse_opt::<u64>(key, get(key))?
                .map(Duration::from_secs)
                .unwrap_or(fallback))
        };

        let config = Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_opt("PORT", get("PORT"))?.unwrap_or(defaults.port),
            gemini_api_key,
            gemini_base_url: get("GEMINI_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.gemini_base_url),
            models,
            quota_backoff: secs("GEMINI_QUOTA_BACKOFF_SECS", defaults.quota_backoff)?,
            generation_timeout: secs("GEMINI_TIMEOUT_SECS", defaults.generation_timeout)?,
            pexels_api_key: get("PEXELS_API_KEY"),
            footage_min_width: parse_opt("FOOTAGE_MIN_WIDTH", get("FOOTAGE_MIN_WIDTH"))?
                .unwrap_or(defaults.footage_min_width),
            footage_max_width: parse_opt("FOOTAGE_MAX_WIDTH", get("FOOTAGE_MAX_WIDTH"))?
                .unwrap_or(defaults.footage_max_width),
            footage_timeout: secs("PEXELS_TIMEOUT_SECS", defaults.footage_timeout)?,
            output_dir: get("OUTPUT_DIR").map(PathBuf::from).unwrap_or(defaults.output_dir),
            temp_dir: get("TEMP_DIR").map(PathBuf::from).unwrap_or(defaults.temp_dir),
            public_base_url: get("PUBLIC_BASE_URL").map(|u| u.trim_end_matches('/').to_string()),
            cors_origins: get("CORS_ORIGINS")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.cors_origins),
            tts_program: get("TTS_PROGRAM").unwrap_or(defaults.tts_program),
            tts_language: get("TTS_LANG").unwrap_or(defaults.tts_language),
            tts_timeout: secs("TTS_TIMEOUT_SECS", defaults.tts_timeout)?,
            ffmpeg_program: get("FFMPEG_PROGRAM").unwrap_or(defaults.ffmpeg_program),
            font_file: get("FONT_FILE").map(PathBuf::from),
            default_video_secs: parse_opt("DEFAULT_VIDEO_SECS", get("DEFAULT_VIDEO_SECS"))?
                .unwrap_or(defaults.default_video_secs),
            max_video_secs: parse_opt("MAX_VIDEO_SECS", get("MAX_VIDEO_SECS"))?
                .unwrap_or(defaults.max_video_secs),
            render_timeout: secs("RENDER_TIMEOUT_SECS", defaults.render_timeout)?,
            retention: secs("RETENTION_SECS", defaults.retention)?,
            sweep_interval: secs("SWEEP_INTERVAL_SECS", defaults.sweep_interval)?,
        };

        if config.footage_min_width > config.footage_max_width {
            anyhow::bail!(
                "FOOTAGE_MIN_WIDTH ({}) exceeds FOOTAGE_MAX_WIDTH ({})",
                config.footage_min_width,
                config.footage_max_width
            );
        }
        if config.sweep_interval.is_zero() {
            anyhow::bail!("SWEEP_INTERVAL_SECS must be greater than zero");
        }

        Ok(config)
    }

    /// Clamps a requested length to what the encoder is allowed to render.
    pub fn video_duration(&self, requested: Option<u32>) -> u32 {
        let max = self.max_video_secs.max(MIN_VIDEO_SECS);
        requested
            .unwrap_or(self.default_video_secs)
            .clamp(MIN_VIDEO_SECS, max)
    }
}

pub const MIN_VIDEO_SECS: u32 = 5;

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_opt<T>(key: &str, value: Option<String>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .map(|v| v.parse::<T>().with_context(|| format!("{key}: invalid value {v:?}")))
        .transpose()
}
