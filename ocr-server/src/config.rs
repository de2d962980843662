use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{OcrServerError, Result};

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MAX_BODY_BYTES: usize = 100 * 1024 * 1024;
pub const DEFAULT_RESTART_DELAY_MS: u64 = 1000;
pub const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_INTERFACES: &[&str] = &["en0", "en1", "en2", "en3", "en4", "en5"];

fn parse_env_or<T: FromStr>(var: &str, default: T) -> T
where
    T::Err: fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_port_env(var: &str) -> u16 {
    match parse_env_or(var, DEFAULT_PORT) {
        0 => {
            tracing::warn!("Port 0 is not allowed for {}. Using default.", var);
            DEFAULT_PORT
        }
        port => port,
    }
}

fn parse_list_env(var: &str, default: &[&str]) -> Vec<String> {
    match env::var(var) {
        Ok(val) if !val.trim().is_empty() => val
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => default.iter().map(|s| s.to_string()).collect(),
    }
}

/// How hard the OCR engine should work on an image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecognitionLevel {
    #[default]
    Accurate,
    Fast,
}

impl fmt::Display for RecognitionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accurate => write!(f, "Accurate"),
            Self::Fast => write!(f, "Fast"),
        }
    }
}

impl FromStr for RecognitionLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "accurate" => Ok(Self::Accurate),
            "fast" => Ok(Self::Fast),
            other => Err(format!("unknown recognition level '{other}'")),
        }
    }
}

/// Per-request recognition settings handed to the OCR engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionOptions {
    pub level: RecognitionLevel,
    pub language_correction: bool,
    pub auto_detect_language: bool,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            level: RecognitionLevel::Accurate,
            language_correction: true,
            auto_detect_language: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub ocr: OcrConfig,
    pub network: NetworkConfig,
}

/// Listener configuration snapshot.
///
/// A running listener keeps the snapshot it was bound with; changes only take
/// effect on the next (re)start.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub recognition: RecognitionOptions,
    pub max_body_bytes: usize,
    pub auto_restart: bool,
    pub restart_delay_ms: u64,
    /// How long a graceful stop waits for in-flight requests before aborting.
    pub drain_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            recognition: RecognitionOptions::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            auto_restart: true,
            restart_delay_ms: DEFAULT_RESTART_DELAY_MS,
            drain_timeout_ms: DEFAULT_DRAIN_TIMEOUT_MS,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| OcrServerError::Validation(format!("Invalid listen address: {e}")))
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

/// Partial update for [`ServerConfig`]. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerConfigPatch {
    pub port: Option<u16>,
    pub recognition_level: Option<RecognitionLevel>,
    pub language_correction: Option<bool>,
    pub auto_detect_language: Option<bool>,
}

impl ServerConfigPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Merge into `base`, producing a new snapshot.
    pub fn apply(&self, base: &ServerConfig) -> Result<ServerConfig> {
        let mut next = base.clone();
        if let Some(port) = self.port {
            if port == 0 {
                return Err(OcrServerError::Validation(
                    "Port must be between 1 and 65535".to_string(),
                ));
            }
            next.port = port;
        }
        if let Some(level) = self.recognition_level {
            next.recognition.level = level;
        }
        if let Some(v) = self.language_correction {
            next.recognition.language_correction = v;
        }
        if let Some(v) = self.auto_detect_language {
            next.recognition.auto_detect_language = v;
        }
        Ok(next)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Comma-separated Tesseract language codes; the first one is the primary language.
    pub languages: String,
    pub tessdata_path: Option<String>,
    pub timeout_secs: u64,
    pub max_image_dimension: u32,
    pub min_image_dimension: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: "eng".to_string(),
            tessdata_path: None,
            timeout_secs: 60,
            max_image_dimension: 4096,
            min_image_dimension: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub interfaces: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            interfaces: DEFAULT_INTERFACES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("OCR_SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_port_env("OCR_SERVER_PORT"),
                recognition: RecognitionOptions {
                    level: parse_env_or("OCR_RECOGNITION_LEVEL", RecognitionLevel::Accurate),
                    language_correction: parse_env_or("OCR_LANGUAGE_CORRECTION", true),
                    auto_detect_language: parse_env_or("OCR_AUTO_DETECT_LANGUAGE", true),
                },
                max_body_bytes: parse_env_or("OCR_SERVER_MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES),
                auto_restart: parse_env_or("OCR_SERVER_AUTO_RESTART", true),
                restart_delay_ms: parse_env_or(
                    "OCR_SERVER_RESTART_DELAY_MS",
                    DEFAULT_RESTART_DELAY_MS,
                ),
                drain_timeout_ms: parse_env_or(
                    "OCR_SERVER_DRAIN_TIMEOUT_MS",
                    DEFAULT_DRAIN_TIMEOUT_MS,
                ),
            },
            ocr: OcrConfig {
                languages: env::var("OCR_LANGUAGES").unwrap_or_else(|_| "eng".to_string()),
                tessdata_path: env::var("OCR_TESSDATA").ok(),
                timeout_secs: parse_env_or("OCR_TIMEOUT", 60),
                max_image_dimension: parse_env_or("OCR_MAX_DIMENSION", 4096),
                min_image_dimension: parse_env_or("OCR_MIN_DIMENSION", 8),
            },
            network: NetworkConfig {
                interfaces: parse_list_env("OCR_SERVER_INTERFACES", DEFAULT_INTERFACES),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Path of the persisted settings file, if one is configured.
    pub fn settings_path_from_env() -> Option<String> {
        env::var("OCR_SERVER_SETTINGS").ok().filter(|p| !p.is_empty())
    }
}
