//! `POST /upload` handler.
//!
//! Reads the first `file` part of a multipart body, runs OCR on it and answers
//! in the format the client asked for. Every outcome, including failures, uses
//! the [`UploadResponse`] shape.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::response::{ResponseFormat, UploadReply};
use crate::api::AppState;
use crate::error::OcrServerError;
use crate::models::{
    UploadResponse, MSG_MISSING_FILE, MSG_OCR_FAILED, MSG_OCR_UNAVAILABLE, MSG_PAYLOAD_TOO_LARGE,
};

const FILE_FIELD: &str = "file";

enum FileError {
    Missing,
    TooLarge,
}

impl FileError {
    fn from_multipart(e: &MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            FileError::TooLarge
        } else {
            FileError::Missing
        }
    }
}

async fn read_file_part(mut multipart: Multipart) -> Result<Bytes, FileError> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(FileError::Missing),
            Err(e) => {
                warn!(error = %e, "Failed to read multipart body");
                return Err(FileError::from_multipart(&e));
            }
        };

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        return match field.bytes().await {
            Ok(bytes) if bytes.is_empty() => Err(FileError::Missing),
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                warn!(error = %e, "Failed to read file part");
                Err(FileError::from_multipart(&e))
            }
        };
    }
}

/// `POST /upload`
///
/// Status codes: 200 on success, 400 for a missing or empty `file` part, 413
/// when the body exceeds the configured limit, 500 when the image cannot be
/// decoded or recognized and 503 when no OCR engine is loaded.
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> UploadReply {
    let request_id = Uuid::new_v4();
    let format = ResponseFormat::from_headers(&headers);
    let reply = |status, body| UploadReply::new(status, format, body);

    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            warn!(%request_id, error = %rejection, "Upload is not a multipart body");
            return reply(
                StatusCode::BAD_REQUEST,
                UploadResponse::failure(MSG_MISSING_FILE),
            );
        }
    };

    let bytes = match read_file_part(multipart).await {
        Ok(bytes) => bytes,
        Err(FileError::Missing) => {
            info!(%request_id, "Upload rejected: no file part");
            return reply(
                StatusCode::BAD_REQUEST,
                UploadResponse::failure(MSG_MISSING_FILE),
            );
        }
        Err(FileError::TooLarge) => {
            info!(
                %request_id,
                limit = state.config.max_body_bytes,
                "Upload rejected: body too large"
            );
            return reply(
                StatusCode::PAYLOAD_TOO_LARGE,
                UploadResponse::failure(MSG_PAYLOAD_TOO_LARGE),
            );
        }
    };

    let started = Instant::now();
    match state
        .ocr
        .recognize(bytes.clone(), &state.config.recognition)
        .await
    {
        Ok(result) => {
            info!(
                %request_id,
                bytes = bytes.len(),
                width = result.image_width,
                height = result.image_height,
                lines = result.line_count(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "OCR completed"
            );
            reply(StatusCode::OK, UploadResponse::success(result))
        }
        Err(OcrServerError::OcrUnavailable(reason)) => {
            warn!(%request_id, %reason, "OCR requested but no engine is loaded");
            reply(
                StatusCode::SERVICE_UNAVAILABLE,
                UploadResponse::failure(MSG_OCR_UNAVAILABLE),
            )
        }
        Err(e) => {
            warn!(%request_id, bytes = bytes.len(), error = %e, "OCR failed");
            reply(e.status(), UploadResponse::failure(MSG_OCR_FAILED))
        }
    }
}
