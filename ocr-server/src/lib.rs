//! On-device OCR HTTP server.
//!
//! Accepts an image upload, runs OCR on it and answers with the recognized
//! text and line geometry as HTML or JSON. A [`server::ServerSupervisor`]
//! keeps the listener up and restarts it after a crash.

pub mod api;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod net;
pub mod ocr;
pub mod server;
pub mod settings;
