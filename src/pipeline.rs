//! Media assembly: narration audio + visual + one encode.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::fs;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::RenderError;
use crate::ffmpeg::{self, AudioSource, EncoderSettings, VisualSource};
use crate::footage::FootageResolver;
use crate::job::{GenerationJob, JobId};
use crate::process::ProcessRunner;
use crate::tts::{self, SpeechSettings};

/// Progress of one job through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    TextReady,
    AudioReady,
    VisualReady,
    Encoding,
    Done,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::TextReady => "text-ready",
            JobState::AudioReady => "audio-ready",
            JobState::VisualReady => "visual-ready",
            JobState::Encoding => "encoding",
            JobState::Done => "done",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of a finished job.
#[derive(Debug, Clone)]
pub struct RenderReport {
    pub job_id: JobId,
    pub state: JobState,
    pub file_name: String,
    pub output_path: PathBuf,
    pub audio: AudioSource,
    pub visual: VisualSource,
}

/// Scratch directory owned by one job. Everything inside is deleted when it is dropped.
struct JobWorkspace {
    dir: TempDir,
}

impl JobWorkspace {
    async fn create(root: &Path, id: &JobId) -> std::io::Result<Self> {
        fs::create_dir_all(root).await?;
        let root = root.to_path_buf();
        let prefix = format!("job_{id}_");
        let dir = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new().prefix(&prefix).tempdir_in(root)
        })
        .await
        .map_err(std::io::Error::other)??;
        Ok(Self { dir })
    }

    fn narration_path(&self) -> PathBuf {
        self.dir.path().join("narration.mp3")
    }

    fn fallback_image_path(&self) -> PathBuf {
        self.dir.path().join("fallback.png")
    }

    async fn close(self, id: &JobId) {
        let path = self.dir.path().to_path_buf();
        match tokio::task::spawn_blocking(move || self.dir.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(
                    job_id = %id,
                    path = %path.display(),
                    error = %err,
                    "failed to remove job workspace"
                )
            }
            Err(err) => {
                warn!(
                    job_id = %id,
                    path = %path.display(),
                    error = %err,
                    "workspace cleanup task failed"
                )
            }
        }
    }
}

/// Deletes the output file on drop unless disarmed. Covers encoder errors and a dropped render
/// future alike.
struct OutputGuard {
    path: PathBuf,
    armed: bool,
}

impl OutputGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!(path = %self.path.display(), "removed partial output"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to remove partial output")
            }
        }
    }
}

async fn non_empty_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

pub struct MediaPipeline {
    runner: Arc<dyn ProcessRunner>,
    footage: Option<FootageResolver>,
    encoder: EncoderSettings,
    speech: SpeechSettings,
    output_dir: PathBuf,
    temp_dir: PathBuf,
}

impl MediaPipeline {
    pub fn new(
        cfg: &Config,
        runner: Arc<dyn ProcessRunner>,
        footage: Option<FootageResolver>,
    ) -> Self {
        Self {
            runner,
            footage,
            encoder: EncoderSettings::from_config(cfg),
            speech: SpeechSettings::from_config(cfg),
            output_dir: cfg.output_dir.clone(),
            temp_dir: cfg.temp_dir.clone(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Renders `job` into `<output_dir>/<job file name>`.
    pub async fn render(&self, job: &GenerationJob) -> Result<RenderReport, RenderError> {
        let id = job.id;
        info!(job_id = %id, state = %JobState::TextReady, title = %job.title, "job started");

        let workspace = JobWorkspace::create(&self.temp_dir, &id).await?;
        fs::create_dir_all(&self.output_dir).await?;

        let audio = self.prepare_audio(job, &workspace).await;
        info!(job_id = %id, state = %JobState::AudioReady, audio = ?audio, "audio selected");

        let visual = self.prepare_visual(job, &workspace).await;
        info!(job_id = %id, state = %JobState::VisualReady, visual = ?visual, "visual selected");

        let file_name = id.output_file_name();
        let output_path = self.output_dir.join(&file_name);
        let subtitle = job.subtitles.then_some(job.narration.as_str());
        let cmd = ffmpeg::render_command(
            &self.encoder,
            &visual,
            &audio,
            job.duration_secs,
            subtitle,
            &output_path,
        );

        info!(
            job_id = %id,
            state = %JobState::Encoding,
            output = %output_path.display(),
            "encoding"
        );
        let guard = OutputGuard::new(output_path);
        let encoded = match self.runner.run(&cmd).await {
            Ok(_) if non_empty_file(&guard.path).await => Ok(()),
            Ok(_) => Err(RenderError::MissingOutput(guard.path.clone())),
            Err(err) => Err(RenderError::Encoder(err)),
        };

        if let Err(err) = encoded {
            error!(job_id = %id, state = %JobState::Failed, error = %err, "render failed");
            drop(guard);
            workspace.close(&id).await;
            return Err(err);
        }

        let output_path = guard.disarm();
        workspace.close(&id).await;
        info!(job_id = %id, state = %JobState::Done, file = %file_name, "render complete");

        Ok(RenderReport {
            job_id: id,
            state: JobState::Done,
            file_name,
            output_path,
            audio,
            visual,
        })
    }

    async fn prepare_audio(&self, job: &GenerationJob, workspace: &JobWorkspace) -> AudioSource {
        let out = workspace.narration_path();
        let Some(cmd) = tts::speech_command(&self.speech, &job.narration, &out) else {
            warn!(job_id = %job.id, "narration empty after sanitizing; using silent audio");
            return AudioSource::Silent;
        };

        match self.runner.run(&cmd).await {
            Ok(_) if non_empty_file(&out).await => AudioSource::Speech(out),
            Ok(_) => {
                warn!(job_id = %job.id, "speech tool produced no audio; using silent audio");
                AudioSource::Silent
            }
            Err(err) => {
                warn!(
                    job_id = %job.id,
                    error = %err,
                    "speech synthesis failed; using silent audio"
                );
                AudioSource::Silent
            }
        }
    }

    async fn prepare_visual(&self, job: &GenerationJob, workspace: &JobWorkspace) -> VisualSource {
        if let Some(resolver) = &self.footage {
            if let Some(url) = resolver.resolve(job.search_keyword()).await {
                return VisualSource::Footage(url);
            }
        }

        let image = workspace.fallback_image_path();
        let cmd = ffmpeg::fallback_image_command(&self.encoder, &job.title, &image);
        match self.runner.run(&cmd).await {
            Ok(_) if non_empty_file(&image).await => VisualSource::FallbackImage(image),
            Ok(_) => {
                warn!(
                    job_id = %job.id,
                    "fallback image missing after render; using solid background"
                );
                VisualSource::SolidColor
            }
            Err(err) => {
                warn!(
                    job_id = %job.id,
                    error = %err,
                    "fallback image failed; using solid background"
                );
                VisualSource::SolidColor
            }
        }
    }
}
