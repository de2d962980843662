use async_trait::async_trait;

use super::preprocessing::PreparedImage;
use crate::config::RecognitionOptions;
use crate::error::Result;

/// A point in normalized image space: both axes span `0.0..=1.0`, origin at
/// the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The four corners of a detected line. Corners are named as read, so a
/// rotated line keeps `top_left` at the start of its first glyph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedQuad {
    pub top_left: NormalizedPoint,
    pub top_right: NormalizedPoint,
    pub bottom_left: NormalizedPoint,
    pub bottom_right: NormalizedPoint,
}

impl NormalizedQuad {
    /// Axis-aligned quad from its normalized bounds.
    pub fn from_bounds(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            top_left: NormalizedPoint::new(min_x, max_y),
            top_right: NormalizedPoint::new(max_x, max_y),
            bottom_left: NormalizedPoint::new(min_x, min_y),
            bottom_right: NormalizedPoint::new(max_x, min_y),
        }
    }
}

/// One recognized line as reported by an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct TextObservation {
    pub text: String,
    pub quad: NormalizedQuad,
}

/// Text recognition capability.
///
/// Implementations report lines in detection order using normalized,
/// bottom-left origin geometry. They receive their options per call and must
/// not keep recognition state between calls.
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    fn name(&self) -> &str;

    async fn observe(
        &self,
        image: PreparedImage,
        options: RecognitionOptions,
    ) -> Result<Vec<TextObservation>>;
}
