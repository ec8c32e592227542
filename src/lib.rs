pub mod api;
pub mod config;
pub mod error;
pub mod failover;
pub mod ffmpeg;
pub mod footage;
pub mod handlers;
pub mod init;
pub mod job;
pub mod pipeline;
pub mod process;
pub mod retention;
pub mod routes;
pub mod state;
pub mod text;
pub mod tts;
pub mod writer;

pub use config::Config;
pub use error::{ApiError, GenerationError, RenderError};
pub use failover::FailoverInvoker;
pub use job::{GenerationJob, JobId};
pub use pipeline::{JobState, MediaPipeline, RenderReport};
pub use retention::RetentionSweeper;
pub use routes::create_router;
pub use state::AppState;
