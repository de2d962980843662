// Shared helpers for the integration suites
#![allow(dead_code)]

use std::future::Future;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use ocr_server::config::{OcrConfig, RecognitionOptions, ServerConfig};
use ocr_server::error::Result;
use ocr_server::ocr::{
    NormalizedQuad, OcrProvider, PreparedImage, RecognitionEngine, TextObservation,
};
use ocr_server::server::ServerSupervisor;

pub use serial_test::serial;
pub use tempfile;

static INIT: Once = Once::new();

pub const BOUNDARY: &str = "ocr-server-test-boundary";

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind probe socket")
        .local_addr()
        .expect("Probe socket has no address")
        .port()
}

/// White PNG of the given size with a dark bar across the middle.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    for y in height / 3..(2 * height / 3).max(height / 3 + 1) {
        for x in width / 10..width - width / 10 {
            img.put_pixel(x, y, Rgb([0, 0, 0]));
        }
    }

    let mut out = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .expect("Failed to encode PNG fixture");
    out
}

/// `multipart/form-data` body with a single file part named `field`.
pub fn multipart_body(field: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// Engine that answers every call with the same lines, optionally after a
/// delay, and counts its calls.
pub struct ScriptedEngine {
    lines: Vec<TextObservation>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new(lines: Vec<TextObservation>) -> Self {
        Self {
            lines,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecognitionEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn observe(
        &self,
        _image: PreparedImage,
        _options: RecognitionOptions,
    ) -> Result<Vec<TextObservation>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.lines.clone())
    }
}

pub fn line(text: &str, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> TextObservation {
    TextObservation {
        text: text.to_string(),
        quad: NormalizedQuad::from_bounds(min_x, min_y, max_x, max_y),
    }
}

/// Provider backed by a [`ScriptedEngine`] reporting one `HELLO` line.
pub fn hello_provider() -> OcrProvider {
    OcrProvider::with_engine(
        Arc::new(ScriptedEngine::new(vec![line("HELLO", 0.1, 0.4, 0.6, 0.8)])),
        &OcrConfig::default(),
    )
}

pub fn local_config(port: u16) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port,
        restart_delay_ms: 100,
        ..ServerConfig::default()
    }
}

pub fn local_supervisor(port: u16) -> ServerSupervisor {
    ServerSupervisor::new(local_config(port), hello_provider())
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
