//! User settings persisted as a small JSON file.
//!
//! ```json
//! {
//!   "httpPort": 8000,
//!   "recognitionLevel": "Accurate",
//!   "languageCorrection": true,
//!   "automaticallyDetectsLanguage": true
//! }
//! ```
//!
//! Missing keys take their defaults, and so does a missing file. The values
//! reach the supervisor as a [`ServerConfigPatch`] before every (re)start.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{RecognitionLevel, ServerConfigPatch, DEFAULT_PORT};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub http_port: u16,
    pub recognition_level: String,
    pub language_correction: bool,
    pub automatically_detects_language: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_PORT,
            recognition_level: RecognitionLevel::Accurate.to_string(),
            language_correction: true,
            automatically_detects_language: true,
        }
    }
}

impl Settings {
    /// Recognition level, falling back to `Accurate` for unknown names.
    pub fn recognition_level(&self) -> RecognitionLevel {
        self.recognition_level.parse().unwrap_or_else(|e| {
            warn!(error = %e, "Unknown recognition level in settings, using Accurate");
            RecognitionLevel::Accurate
        })
    }

    pub fn to_patch(&self) -> ServerConfigPatch {
        ServerConfigPatch {
            port: Some(self.http_port),
            recognition_level: Some(self.recognition_level()),
            language_correction: Some(self.language_correction),
            auto_detect_language: Some(self.automatically_detects_language),
        }
    }
}

/// Where settings live. Without a path the store only ever yields defaults.
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    path: Option<PathBuf>,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn load(&self) -> Result<Settings> {
        let Some(path) = &self.path else {
            return Ok(Settings::default());
        };

        if !path.exists() {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            return Ok(Settings::default());
        }

        let raw = std::fs::read_to_string(path)?;
        if raw.trim().is_empty() {
            return Ok(Settings::default());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load, or fall back to defaults with a warning when the file is
    /// unreadable.
    pub fn load_or_default(&self) -> Settings {
        self.load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read settings, using defaults");
            Settings::default()
        })
    }

    /// Patch to apply before a (re)start. Empty when no file is configured,
    /// so env and CLI values stay in effect.
    pub fn patch(&self) -> ServerConfigPatch {
        if self.path.is_none() {
            return ServerConfigPatch::default();
        }
        self.load_or_default().to_patch()
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
