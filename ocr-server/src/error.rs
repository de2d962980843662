use std::net::SocketAddr;

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrServerError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Image decode error: {0}")]
    Decode(String),

    #[error("OCR error: {0}")]
    Recognition(String),

    #[error("OCR unavailable: {0}")]
    OcrUnavailable(String),

    #[error("Unable to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OcrServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            OcrServerError::Validation(_) => StatusCode::BAD_REQUEST,
            OcrServerError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OcrServerError::Recognition(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OcrServerError::OcrUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            OcrServerError::Bind { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            OcrServerError::Json(_) => StatusCode::BAD_REQUEST,
            OcrServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, OcrServerError>;
