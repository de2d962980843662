//! OCR (Optical Character Recognition) Module
//!
//! Turns uploaded image bytes into recognized text lines with pixel geometry.
//!
//! # Architecture
//!
//! - [`RecognitionEngine`] is the engine seam. Engines report lines in
//!   normalized space (unit span per axis, origin bottom-left).
//! - [`TesseractEngine`] implements it locally via leptess.
//! - [`OcrProvider`] decodes and prepares the image, runs the engine under a
//!   timeout and converts geometry to pixels with a top-left origin.
//!
//! # Configuration
//!
//! Static behavior comes from `OcrConfig` (see `config.rs`): languages,
//! tessdata path, timeout and dimension limits. Per-request behavior comes from
//! `RecognitionOptions` (level, language correction, language auto-detection).
//!
//! # Usage
//!
//! ```rust,ignore
//! let ocr = OcrProvider::new(&config.ocr)?;
//! let result = ocr.recognize(image_bytes, &config.server.recognition).await?;
//! ```

mod engine;
pub mod geometry;
mod preprocessing;
mod provider;
mod tesseract;

pub use engine::{NormalizedPoint, NormalizedQuad, RecognitionEngine, TextObservation};
pub use preprocessing::{prepare_image, PreparedImage};
pub use provider::OcrProvider;
pub use tesseract::TesseractEngine;
