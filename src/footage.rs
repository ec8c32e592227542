use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::api::{FootageFile, FootageSearch};
use crate::config::Config;

/// Picks a stock clip URL for a keyword.
pub struct FootageResolver {
    search: Arc<dyn FootageSearch>,
    width_range: RangeInclusive<u32>,
    timeout: Duration,
}

impl FootageResolver {
    pub fn new(
        search: Arc<dyn FootageSearch>,
        width_range: RangeInclusive<u32>,
        timeout: Duration,
    ) -> Self {
        Self {
            search,
            width_range,
            timeout,
        }
    }

    pub fn from_config(search: Arc<dyn FootageSearch>, cfg: &Config) -> Self {
        Self::new(
            search,
            cfg.footage_min_width..=cfg.footage_max_width,
            cfg.footage_timeout,
        )
    }

    /// Direct media URL for the first hit, or `None` when nothing usable came back. Search
    /// failures are logged and reported as `None`.
    pub async fn resolve(&self, keyword: &str) -> Option<String> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return None;
        }

        let videos = match tokio::time::timeout(self.timeout, self.search.search(keyword)).await {
            Ok(Ok(videos)) => videos,
            Ok(Err(err)) => {
                warn!(keyword, error = %err, "footage search failed");
                return None;
            }
            Err(_) => {
                warn!(keyword, timeout = ?self.timeout, "footage search timed out");
                return None;
            }
        };

        let Some(first) = videos.first() else {
            info!(keyword, "no footage found");
            return None;
        };

        let chosen = select_variant(&first.video_files, &self.width_range)?;
        info!(keyword, video_id = first.id, width = ?chosen.width, "footage selected");
        Some(chosen.link.clone())
    }
}

/// First variant whose width falls in `range`, else the first variant.
pub fn select_variant<'a>(
    files: &'a [FootageFile],
    range: &RangeInclusive<u32>,
) -> Option<&'a FootageFile> {
    files
        .iter()
        .find(|f| f.width.is_some_and(|w| range.contains(&w)))
        .or_else(|| files.first())
}
