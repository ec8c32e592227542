use std::fmt;
use uuid::Uuid;

/// Unique identifier of one render job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Output file name for this job, the same every time it is asked for.
    pub fn output_file_name(&self) -> String {
        format!("video_{}.mp4", self.0)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Everything the media pipeline needs to render one video.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub id: JobId,
    pub title: String,
    pub narration: String,
    pub duration_secs: u32,
    pub subtitles: bool,
    pub footage_keyword: Option<String>,
}

impl GenerationJob {
    pub fn new(title: impl Into<String>, narration: impl Into<String>, duration_secs: u32) -> Self {
        Self {
            id: JobId::new(),
            title: title.into(),
            narration: narration.into(),
            duration_secs,
            subtitles: false,
            footage_keyword: None,
        }
    }

    pub fn with_subtitles(mut self, subtitles: bool) -> Self {
        self.subtitles = subtitles;
        self
    }

    pub fn with_footage_keyword(mut self, keyword: Option<String>) -> Self {
        self.footage_keyword = keyword.filter(|k| !k.trim().is_empty());
        self
    }

    /// Keyword for the footage search: the explicit one, else the title.
    pub fn search_keyword(&self) -> &str {
        self.footage_keyword.as_deref().unwrap_or(&self.title)
    }
}
