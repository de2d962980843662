use serde::{Deserialize, Serialize};

/// Corner quadrilateral of a recognized line in pixel space, top-left origin.
///
/// Keeps the orientation that the axis-aligned box in [`OcrBoxItem`] loses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OcrRect {
    #[serde(rename = "topLeft_x")]
    pub top_left_x: f64,
    #[serde(rename = "topLeft_y")]
    pub top_left_y: f64,
    #[serde(rename = "topRight_x")]
    pub top_right_x: f64,
    #[serde(rename = "topRight_y")]
    pub top_right_y: f64,
    #[serde(rename = "bottomLeft_x")]
    pub bottom_left_x: f64,
    #[serde(rename = "bottomLeft_y")]
    pub bottom_left_y: f64,
    #[serde(rename = "bottomRight_x")]
    pub bottom_right_x: f64,
    #[serde(rename = "bottomRight_y")]
    pub bottom_right_y: f64,
}

impl OcrRect {
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.top_left_x, self.top_left_y),
            (self.top_right_x, self.top_right_y),
            (self.bottom_left_x, self.bottom_left_y),
            (self.bottom_right_x, self.bottom_right_y),
        ]
    }
}

/// One recognized text line and where it sits in the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrBoxItem {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    #[serde(default)]
    pub rect: Option<OcrRect>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    /// Every line followed by a newline, in engine order.
    pub text: String,
    pub image_width: u32,
    pub image_height: u32,
    pub boxes: Vec<OcrBoxItem>,
}

impl OcrResult {
    pub fn line_count(&self) -> usize {
        self.boxes.len()
    }
}
