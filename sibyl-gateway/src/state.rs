//! Shared application state.

use sibyl_core::Settings;

use crate::pipeline::RagPipeline;

/// State shared across all HTTP handlers.
pub struct AppState {
    pub pipeline: RagPipeline,
    pub settings: Settings,
}

impl AppState {
    pub fn new(pipeline: RagPipeline, settings: Settings) -> Self {
        Self { pipeline, settings }
    }
}
