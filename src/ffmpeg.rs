//! ffmpeg command lines for the fallback image and the final render.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::process::CommandSpec;
use crate::text::{self, SUBTITLE_MAX_CHARS, TITLE_MAX_CHARS};

pub const FRAME_WIDTH: u32 = 1280;
pub const FRAME_HEIGHT: u32 = 720;
pub const FRAME_RATE: u32 = 30;
const BACKGROUND_COLOR: &str = "0x101828";
const IMAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Visual input chosen for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisualSource {
    /// Remote stock clip, streamed by ffmpeg straight from its URL.
    Footage(String),
    /// Locally rendered title card.
    FallbackImage(PathBuf),
    /// Generated solid background, used when even the title card could not be rendered.
    SolidColor,
}

/// Audio input chosen for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    Speech(PathBuf),
    Silent,
}

#[derive(Debug, Clone)]
pub struct EncoderSettings {
    pub program: String,
    pub font_file: Option<PathBuf>,
    pub render_timeout: Duration,
}

impl EncoderSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            program: cfg.ffmpeg_program.clone(),
            font_file: cfg.font_file.clone(),
            render_timeout: cfg.render_timeout,
        }
    }

    fn base(&self) -> CommandSpec {
        CommandSpec::new(&self.program).args(["-y", "-hide_banner", "-loglevel", "error"])
    }

    fn drawtext(&self, text: &str, font_size: u32, y: &str, boxed: bool) -> String {
        let mut filter = String::from("drawtext=expansion=none");
        if let Some(font) = &self.font_file {
            filter.push_str(&format!(":fontfile='{}'", font.display()));
        }
        filter.push_str(&format!(
            ":text='{}':fontcolor=white:fontsize={}:x=(w-text_w)/2:y={}",
            text, font_size, y
        ));
        if boxed {
            filter.push_str(":box=1:boxcolor=black@0.55:boxborderw=12");
        }
        filter
    }
}

/// Title card: solid background with the title centered.
pub fn fallback_image_command(
    settings: &EncoderSettings,
    title: &str,
    out_png: &Path,
) -> CommandSpec {
    let title = text::overlay_text(title, TITLE_MAX_CHARS);
    let mut spec = settings.base().args([
        "-f".to_string(),
        "lavfi".to_string(),
        "-i".to_string(),
        format!("color=c={}:s={}x{}", BACKGROUND_COLOR, FRAME_WIDTH, FRAME_HEIGHT),
    ]);
    if !title.is_empty() {
        spec = spec.args(["-vf".to_string(), settings.drawtext(&title, 56, "(h-text_h)/2", false)]);
    }
    spec.args(["-frames:v".to_string(), "1".to_string(), out_png.display().to_string()])
        .timeout(IMAGE_TIMEOUT)
}

fn visual_input_args(visual: &VisualSource) -> Vec<String> {
    match visual {
        VisualSource::Footage(url) => vec!["-i".to_string(), url.clone()],
        VisualSource::FallbackImage(path) => vec![
            "-loop".to_string(),
            "1".to_string(),
            "-framerate".to_string(),
            FRAME_RATE.to_string(),
            "-i".to_string(),
            path.display().to_string(),
        ],
        VisualSource::SolidColor => vec![
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
            format!(
                "color=c={}:s={}x{}:r={}",
                BACKGROUND_COLOR, FRAME_WIDTH, FRAME_HEIGHT, FRAME_RATE
            ),
        ],
    }
}

fn audio_input_args(audio: &AudioSource, duration_secs: u32) -> Vec<String> {
    match audio {
        AudioSource::Speech(path) => vec!["-i".to_string(), path.display().to_string()],
        AudioSource::Silent => vec![
            "-f".to_string(),
            "lavfi".to_string(),
            "-t".to_string(),
            duration_secs.to_string(),
            "-i".to_string(),
            "anullsrc=channel_layout=stereo:sample_rate=44100".to_string(),
        ],
    }
}

/// Filter chain for the visual stream: cover-scale, center-crop, optional burned-in subtitle.
pub fn video_filter(settings: &EncoderSettings, subtitle: Option<&str>) -> String {
    let mut filter = format!(
        "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},setsar=1,fps={fps}",
        w = FRAME_WIDTH,
        h = FRAME_HEIGHT,
        fps = FRAME_RATE
    );
    if let Some(raw) = subtitle {
        let line = text::overlay_text(raw, SUBTITLE_MAX_CHARS);
        if !line.is_empty() {
            filter.push(',');
            filter.push_str(&settings.drawtext(&line, 30, "h-text_h-48", true));
        }
    }
    filter
}

/// The single encode producing the job's output file.
pub fn render_command(
    settings: &EncoderSettings,
    visual: &VisualSource,
    audio: &AudioSource,
    duration_secs: u32,
    subtitle: Option<&str>,
    out_mp4: &Path,
) -> CommandSpec {
    settings
        .base()
        .args(visual_input_args(visual))
        .args(audio_input_args(audio, duration_secs))
        .args([
            "-map".to_string(),
            "0:v:0".to_string(),
            "-map".to_string(),
            "1:a:0".to_string(),
            "-vf".to_string(),
            video_filter(settings, subtitle),
            "-t".to_string(),
            duration_secs.to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "veryfast".to_string(),
            "-crf".to_string(),
            "23".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            "128k".to_string(),
            "-shortest".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            out_mp4.display().to_string(),
        ])
        .timeout(settings.render_timeout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> EncoderSettings {
        EncoderSettings {
            program: "ffmpeg".to_string(),
            font_file: None,
            render_timeout: Duration::from_secs(300),
        }
    }

    #[test]
    fn test_render_with_footage_and_speech() {
        let spec = render_command(
            &settings(),
            &VisualSource::Footage("https://cdn/clip.mp4".to_string()),
            &AudioSource::Speech(PathBuf::from("/tmp/job/narration.mp3")),
            30,
            None,
            Path::new("output/video_1.mp4"),
        );

        let inputs: Vec<_> = spec
            .args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-i")
            .map(|(i, _)| spec.args[i + 1].as_str())
            .collect();
        assert_eq!(inputs, vec!["https://cdn/clip.mp4", "/tmp/job/narration.mp3"]);
        assert_eq!(spec.value_of("-t"), Some("30"));
        assert_eq!(spec.value_of("-c:v"), Some("libx264"));
        assert_eq!(spec.value_of("-c:a"), Some("aac"));
        assert_eq!(spec.value_of("-pix_fmt"), Some("yuv420p"));
        assert!(spec.args.contains(&"-shortest".to_string()));
        assert_eq!(spec.args.last().map(String::as_str), Some("output/video_1.mp4"));
        assert_eq!(spec.timeout, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_render_with_image_and_silence() {
        let spec = render_command(
            &settings(),
            &VisualSource::FallbackImage(PathBuf::from("/tmp/job/fallback.png")),
            &AudioSource::Silent,
            20,
            None,
            Path::new("out.mp4"),
        );
        assert_eq!(spec.value_of("-loop"), Some("1"));
        assert!(spec.args.iter().any(|a| a.starts_with("anullsrc")));
        assert_eq!(spec.value_of("-t"), Some("20"));
    }

    #[test]
    fn test_subtitle_overlay_is_sanitized() {
        let filter = video_filter(&settings(), Some("Fact: it's 100% \"true\""));
        assert!(filter.starts_with("scale=1280:720"));
        assert!(filter.contains("drawtext=expansion=none"));
        assert!(filter.contains(":text='Fact its 100 true':"));
    }

    #[test]
    fn test_no_subtitle_means_no_drawtext() {
        assert!(!video_filter(&settings(), None).contains("drawtext"));
        assert!(!video_filter(&settings(), Some(" \"\" ")).contains("drawtext"));
    }

    #[test]
    fn test_fallback_image_command() {
        let mut s = settings();
        s.font_file = Some(PathBuf::from("/fonts/Inter.ttf"));
        let out = Path::new("/tmp/job/fallback.png");
        let spec = fallback_image_command(&s, "Top: 10 \"Facts\"", out);

        assert_eq!(spec.value_of("-f"), Some("lavfi"));
        assert_eq!(spec.value_of("-frames:v"), Some("1"));
        let vf = spec.value_of("-vf").unwrap();
        assert!(vf.contains("fontfile='/fonts/Inter.ttf'"));
        assert!(vf.contains("text='Top 10 Facts'"));
        assert_eq!(spec.args.last().map(String::as_str), Some("/tmp/job/fallback.png"));
    }
}
