use std::path::Path;
use std::time::Duration;

use crate::config::Config;
use crate::process::CommandSpec;
use crate::text;

/// How to reach the speech synthesis tool.
#[derive(Debug, Clone)]
pub struct SpeechSettings {
    pub program: String,
    pub language: String,
    pub timeout: Duration,
}

impl SpeechSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            program: cfg.tts_program.clone(),
            language: cfg.tts_language.clone(),
            timeout: cfg.tts_timeout,
        }
    }
}

/// `gtts-cli <text> --lang <lang> --output <file>`; `None` when nothing speakable remains.
pub fn speech_command(
    settings: &SpeechSettings,
    narration: &str,
    out_mp3: &Path,
) -> Option<CommandSpec> {
    let excerpt = text::speech_excerpt(narration);
    if excerpt.is_empty() {
        return None;
    }
    Some(
        CommandSpec::new(&settings.program)
            .arg(excerpt)
            .args(["--lang", settings.language.as_str(), "--output"])
            .arg(out_mp3.display().to_string())
            .timeout(settings.timeout),
    )
}
