use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use tracing::{info, warn};

use super::engine::RecognitionEngine;
use super::geometry::build_result;
use super::preprocessing::prepare_image;
use super::tesseract::TesseractEngine;
use crate::config::{OcrConfig, RecognitionOptions};
use crate::error::{OcrServerError, Result};
use crate::models::OcrResult;

#[derive(Clone)]
enum OcrBackend {
    Engine { engine: Arc<dyn RecognitionEngine> },
    Unavailable { reason: String },
}

/// Adapter between uploads and a [`RecognitionEngine`].
///
/// Decodes the image, runs the engine under a timeout and converts its
/// normalized geometry into pixel boxes sized to the uploaded image.
#[derive(Clone)]
pub struct OcrProvider {
    backend: OcrBackend,
    config: OcrConfig,
}

impl OcrProvider {
    /// Local Tesseract backend. Degrades to unavailable instead of failing
    /// when Tesseract or its language data cannot be loaded.
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let backend = match TesseractEngine::probe(config) {
            Ok(engine) => {
                info!(languages = %config.languages, "Tesseract OCR initialized");
                OcrBackend::Engine {
                    engine: Arc::new(engine),
                }
            }
            Err(e) => {
                let reason = format!("Tesseract not available: {e}");
                warn!("{}", reason);
                OcrBackend::Unavailable { reason }
            }
        };

        Ok(Self {
            backend,
            config: config.clone(),
        })
    }

    pub fn with_engine(engine: Arc<dyn RecognitionEngine>, config: &OcrConfig) -> Self {
        Self {
            backend: OcrBackend::Engine { engine },
            config: config.clone(),
        }
    }

    pub fn unavailable(reason: impl Into<String>, config: &OcrConfig) -> Self {
        Self {
            backend: OcrBackend::Unavailable {
                reason: reason.into(),
            },
            config: config.clone(),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, OcrBackend::Unavailable { .. })
    }

    pub fn engine_name(&self) -> &str {
        match &self.backend {
            OcrBackend::Engine { engine } => engine.name(),
            OcrBackend::Unavailable { .. } => "unavailable",
        }
    }

    /// Recognize the text in `image_bytes`.
    ///
    /// Decoding and preprocessing run on the blocking pool; the whole call,
    /// preparation included, is bounded by the configured timeout.
    /// Undecodable input fails with [`OcrServerError::Decode`]; an image with
    /// no text succeeds with an empty result.
    pub async fn recognize(
        &self,
        image_bytes: Bytes,
        options: &RecognitionOptions,
    ) -> Result<OcrResult> {
        let engine = match &self.backend {
            OcrBackend::Engine { engine } => Arc::clone(engine),
            OcrBackend::Unavailable { reason } => {
                return Err(OcrServerError::OcrUnavailable(reason.clone()))
            }
        };

        let config = self.config.clone();
        let options = *options;
        let work = async move {
            let prep_config = config.clone();
            let prepared = tokio::task::spawn_blocking(move || {
                prepare_image(&image_bytes, &prep_config, &options)
            })
            .await
            .map_err(|e| OcrServerError::Recognition(format!("Image preparation failed: {e}")))??;
            let (width, height) = (prepared.source_width, prepared.source_height);

            if width < config.min_image_dimension || height < config.min_image_dimension {
                return Ok(build_result(&[], width, height));
            }

            let observations = engine.observe(prepared, options).await?;
            Ok::<_, OcrServerError>(build_result(&observations, width, height))
        };

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        match tokio::time::timeout(timeout_duration, work).await {
            Ok(result) => result,
            Err(_) => Err(OcrServerError::Recognition(format!(
                "OCR operation timed out after {} seconds",
                self.config.timeout_secs
            ))),
        }
    }
}
