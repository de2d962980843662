use super::engine::{NormalizedPoint, TextObservation};
use crate::models::{OcrBoxItem, OcrRect, OcrResult};

/// Map a normalized bottom-left point into pixel space with a top-left origin.
pub fn to_pixel(point: NormalizedPoint, width: u32, height: u32) -> (f64, f64) {
    (
        point.x * width as f64,
        (1.0 - point.y) * height as f64,
    )
}

/// Convert one observation into a box item for an image of `width`x`height`.
///
/// The box is the tightest axis-aligned rectangle around the four converted
/// corners; `rect` carries the corners themselves.
pub fn box_item(observation: &TextObservation, width: u32, height: u32) -> OcrBoxItem {
    let quad = &observation.quad;
    let (tlx, tly) = to_pixel(quad.top_left, width, height);
    let (trx, try_) = to_pixel(quad.top_right, width, height);
    let (blx, bly) = to_pixel(quad.bottom_left, width, height);
    let (brx, bry) = to_pixel(quad.bottom_right, width, height);

    let min_x = tlx.min(trx).min(blx).min(brx);
    let max_x = tlx.max(trx).max(blx).max(brx);
    let min_y = tly.min(try_).min(bly).min(bry);
    let max_y = tly.max(try_).max(bly).max(bry);

    OcrBoxItem {
        text: observation.text.clone(),
        x: min_x,
        y: min_y,
        w: max_x - min_x,
        h: max_y - min_y,
        rect: Some(OcrRect {
            top_left_x: tlx,
            top_left_y: tly,
            top_right_x: trx,
            top_right_y: try_,
            bottom_left_x: blx,
            bottom_left_y: bly,
            bottom_right_x: brx,
            bottom_right_y: bry,
        }),
    }
}

/// Assemble the per-request result. Engine order is kept as is.
pub fn build_result(observations: &[TextObservation], width: u32, height: u32) -> OcrResult {
    let mut text = String::new();
    let mut boxes = Vec::with_capacity(observations.len());

    for observation in observations {
        text.push_str(&observation.text);
        text.push('\n');
        boxes.push(box_item(observation, width, height));
    }

    OcrResult {
        text,
        image_width: width,
        image_height: height,
        boxes,
    }
}
