use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

use crate::config::Config;
use crate::process;

/// Creates the output and scratch directories if they are missing.
pub async fn ensure_directories(cfg: &Config) -> Result<()> {
    for dir in [&cfg.output_dir, &cfg.temp_dir] {
        if !Path::new(dir).exists() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
            info!(dir = %dir.display(), "created directory");
        }
    }
    let cleared = clear_stale_workspaces(&cfg.temp_dir).await?;
    if cleared > 0 {
        info!(dir = %cfg.temp_dir.display(), cleared, "removed stale job workspaces");
    }
    Ok(())
}

/// Removes `job_*` workspaces left by a previous process. Only safe before any job starts.
pub async fn clear_stale_workspaces(temp_dir: &Path) -> Result<usize> {
    let mut entries = fs::read_dir(temp_dir)
        .await
        .with_context(|| format!("reading {}", temp_dir.display()))?;
    let mut cleared = 0;
    while let Some(entry) = entries.next_entry().await? {
        let is_workspace = entry.file_name().to_string_lossy().starts_with("job_");
        if !is_workspace || !entry.file_type().await?.is_dir() {
            continue;
        }
        match fs::remove_dir_all(entry.path()).await {
            Ok(()) => cleared += 1,
            Err(err) => {
                warn!(
                    path = %entry.path().display(),
                    error = %err,
                    "failed to remove stale workspace"
                )
            }
        }
    }
    Ok(cleared)
}

/// Warns about missing external tools. Jobs still run; they degrade or fail per job.
pub async fn check_tools(cfg: &Config) -> bool {
    let ffmpeg = process::probe(&cfg.ffmpeg_program, "-version").await;
    if !ffmpeg {
        warn!(program = %cfg.ffmpeg_program, "ffmpeg not runnable; every render will fail");
    }
    let tts = process::probe(&cfg.tts_program, "--help").await;
    if !tts {
        warn!(program = %cfg.tts_program, "speech tool not runnable; videos will be silent");
    }
    ffmpeg && tts
}
