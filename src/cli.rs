//! One-shot run: keyword in, video file out. No HTTP server.
//!
//! Usage: `video-robot-cli <keyword...> [--seconds N] [--subtitle]`

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use video_robot::api::gemini::GeminiClient;
use video_robot::api::pexels::PexelsClient;
use video_robot::footage::FootageResolver;
use video_robot::process::TokioProcessRunner;
use video_robot::{Config, FailoverInvoker, GenerationJob, MediaPipeline, init, writer};

struct Args {
    keyword: String,
    seconds: Option<u32>,
    subtitle: bool,
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Args> {
    let mut words = Vec::new();
    let mut seconds = None;
    let mut subtitle = false;
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--seconds" => {
                let value = raw.next().context("--seconds needs a value")?;
                let parsed = value
                    .parse()
                    .with_context(|| format!("invalid --seconds {value}"))?;
                seconds = Some(parsed);
            }
            "--subtitle" => subtitle = true,
            _ => words.push(arg),
        }
    }
    let keyword = words.join(" ");
    if keyword.trim().is_empty() {
        bail!("usage: video-robot-cli <keyword...> [--seconds N] [--subtitle]");
    }
    Ok(Args { keyword, seconds, subtitle })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = parse_args(std::env::args().skip(1))?;
    let config = Config::from_env()?;

    init::ensure_directories(&config).await?;
    if !init::check_tools(&config).await {
        eprintln!("[WARNING] ffmpeg or the speech tool is missing; output may fail or be silent.");
    }

    let client = reqwest::Client::new();
    let generator = Arc::new(GeminiClient::from_config(client.clone(), &config));
    let invoker = FailoverInvoker::from_config(generator, &config);
    let footage = config.pexels_api_key.as_ref().map(|key| {
        let search = Arc::new(PexelsClient::new(client.clone(), key.clone()));
        FootageResolver::from_config(search, &config)
    });
    let pipeline = MediaPipeline::new(&config, Arc::new(TokioProcessRunner), footage);

    let draft = writer::write_from_keyword(&invoker, &args.keyword).await?;
    println!("Title: {}", draft.title);

    let job = GenerationJob::new(draft.title, draft.content, config.video_duration(args.seconds))
        .with_subtitles(args.subtitle)
        .with_footage_keyword(draft.footage_keyword);
    let report = pipeline.render(&job).await?;

    println!("{}", report.output_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_args() {
        let parsed = args(&["black", "holes", "--seconds", "20", "--subtitle"]).unwrap();
        assert_eq!(parsed.keyword, "black holes");
        assert_eq!(parsed.seconds, Some(20));
        assert!(parsed.subtitle);

        assert!(args(&[]).is_err());
        assert!(args(&["x", "--seconds"]).is_err());
        assert!(args(&["x", "--seconds", "ten"]).is_err());
    }
}
