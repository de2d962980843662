use std::sync::Arc;

use crate::config::ServerConfig;
use crate::ocr::OcrProvider;

/// Per-listener state. The config snapshot is the one the listener was bound
/// with and never changes while it runs.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub ocr: OcrProvider,
}

impl AppState {
    pub fn new(config: Arc<ServerConfig>, ocr: OcrProvider) -> Self {
        Self { config, ocr }
    }
}
