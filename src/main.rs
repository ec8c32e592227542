use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use video_robot::api::gemini::GeminiClient;
use video_robot::api::pexels::PexelsClient;
use video_robot::footage::FootageResolver;
use video_robot::process::TokioProcessRunner;
use video_robot::{
    AppState, Config, FailoverInvoker, MediaPipeline, RetentionSweeper, create_router, init,
};

fn init_tracing() -> Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("video_robot=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(env_filter)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let config = Config::from_env()?;
    info!(
        host = %config.host,
        port = config.port,
        models = config.models.len(),
        "starting video-robot"
    );

    init::ensure_directories(&config).await?;
    init::check_tools(&config).await;

    let client = reqwest::Client::builder()
        .user_agent(concat!("video-robot/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building HTTP client")?;

    let generator = Arc::new(GeminiClient::from_config(client.clone(), &config));
    let invoker = FailoverInvoker::from_config(generator, &config);

    let footage = match &config.pexels_api_key {
        Some(key) => Some(FootageResolver::from_config(
            Arc::new(PexelsClient::new(client.clone(), key.clone())),
            &config,
        )),
        None => {
            info!("PEXELS_API_KEY not set; videos will use title cards");
            None
        }
    };
    let pipeline = MediaPipeline::new(&config, Arc::new(TokioProcessRunner), footage);

    let sweeper = RetentionSweeper::from_config(&config);
    tokio::spawn(sweeper.run());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", config.host, config.port))?;

    let app = create_router(AppState::new(config, invoker, pipeline));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("received shutdown signal");
}
