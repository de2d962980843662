use serde::{Deserialize, Serialize};

use super::{OcrBoxItem, OcrResult};

pub const MSG_UPLOAD_OK: &str = "File uploaded successfully";
pub const MSG_MISSING_FILE: &str = "Missing or empty 'file' part";
pub const MSG_OCR_FAILED: &str = "OCR failed";
pub const MSG_OCR_UNAVAILABLE: &str = "OCR unavailable";
pub const MSG_PAYLOAD_TOO_LARGE: &str = "Payload too large";

/// JSON body returned by `POST /upload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub ocr_result: String,
    pub image_width: u32,
    pub image_height: u32,
    pub ocr_boxes: Vec<OcrBoxItem>,
}

impl UploadResponse {
    pub fn success(result: OcrResult) -> Self {
        Self {
            success: true,
            message: MSG_UPLOAD_OK.to_string(),
            ocr_result: result.text,
            image_width: result.image_width,
            image_height: result.image_height,
            ocr_boxes: result.boxes,
        }
    }

    /// Failure payload with every result field zeroed.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ocr_result: String::new(),
            image_width: 0,
            image_height: 0,
            ocr_boxes: Vec::new(),
        }
    }
}
