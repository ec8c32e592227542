//! Application state.

use std::sync::Arc;

use crate::config::Config;
use crate::failover::FailoverInvoker;
use crate::pipeline::MediaPipeline;

/// Shared application state. Everything inside is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub invoker: Arc<FailoverInvoker>,
    pub pipeline: Arc<MediaPipeline>,
}

impl AppState {
    pub fn new(config: Config, invoker: FailoverInvoker, pipeline: MediaPipeline) -> Self {
        Self {
            config: Arc::new(config),
            invoker: Arc::new(invoker),
            pipeline: Arc::new(pipeline),
        }
    }
}
