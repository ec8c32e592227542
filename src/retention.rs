//! Background removal of old rendered videos.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::config::Config;

/// Outcome of one sweep over the output directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub deleted: usize,
    pub failed: usize,
}

pub struct RetentionSweeper {
    dir: PathBuf,
    max_age: Duration,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(dir: impl Into<PathBuf>, max_age: Duration, interval: Duration) -> Self {
        Self {
            dir: dir.into(),
            max_age,
            interval,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.output_dir.clone(), cfg.retention, cfg.sweep_interval)
    }

    /// Sweeps on a fixed interval forever. Spawn it as a background task.
    pub async fn run(self) {
        info!(
            dir = %self.dir.display(),
            max_age = ?self.max_age,
            interval = ?self.interval,
            "starting retention sweeper"
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let report = self.sweep_once().await;
            if report.deleted > 0 || report.failed > 0 {
                info!(
                    scanned = report.scanned,
                    deleted = report.deleted,
                    failed = report.failed,
                    "retention sweep complete"
                );
            }
        }
    }

    pub async fn sweep_once(&self) -> SweepReport {
        let dir = self.dir.clone();
        let max_age = self.max_age;
        let now = SystemTime::now();
        match tokio::task::spawn_blocking(move || sweep_at(&dir, max_age, now)).await {
            Ok(report) => report,
            Err(err) => {
                error!(error = %err, "retention sweep task panicked");
                SweepReport::default()
            }
        }
    }
}

/// Deletes regular files directly inside `dir` whose modification time is more than
/// `max_age` before `now`. Files stamped in the future count as brand new.
pub fn sweep_at(dir: &Path, max_age: Duration, now: SystemTime) -> SweepReport {
    let mut report = SweepReport::default();
    if !dir.is_dir() {
        return report;
    }

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                warn!(error = %err, "unreadable entry in output directory");
                report.failed += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        report.scanned += 1;

        let modified = match entry.metadata().ok().and_then(|m| m.modified().ok()) {
            Some(t) => t,
            None => {
                report.failed += 1;
                continue;
            }
        };
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age <= max_age {
            continue;
        }

        match std::fs::remove_file(entry.path()) {
            Ok(()) => {
                let stamp: DateTime<Utc> = modified.into();
                info!(
                    path = %entry.path().display(),
                    modified = %stamp.format("%Y-%m-%d %H:%M:%S"),
                    "deleted expired video"
                );
                report.deleted += 1;
            }
            Err(err) => {
                warn!(
                    path = %entry.path().display(),
                    error = %err,
                    "failed to delete expired video"
                );
                report.failed += 1;
            }
        }
    }

    report
}
