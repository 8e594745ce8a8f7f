//! # Config: TOML Configuration Document
//!
//! Calibration values, pacing, ledger locations, debug capture and OCR
//! settings. Loaded from `handlescan.toml` by default; a missing file is
//! created with defaults, and any key missing from an existing file falls
//! back to its default.
//!
//! ```toml
//! [target]
//! window_title = "Pear Runtime"
//! input_click = [89, 231]
//! status_region = { left = 106, top = 275, width = 400, height = 40 }
//!
//! [timing]
//! classify_timeout_ms = 10000
//! poll_interval_ms = 350
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::ledger::LedgerPaths;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("status region {width}x{height} has no area")]
    DegenerateRegion { width: i64, height: i64 },
    #[error("invalid timing: {0}")]
    InvalidTiming(String),
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("config I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Screen rectangle in absolute pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Build a region from two opposite corners picked by the operator.
    pub fn from_corners(top_left: (i32, i32), bottom_right: (i32, i32)) -> Result<Self, ConfigError> {
        let width = i64::from(bottom_right.0) - i64::from(top_left.0);
        let height = i64::from(bottom_right.1) - i64::from(top_left.1);
        if width <= 0 || height <= 0 {
            return Err(ConfigError::DegenerateRegion { width, height });
        }
        Ok(Region {
            left: top_left.0,
            top: top_left.1,
            width: width as u32,
            height: height as u32,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// X11 window class; tried before the title when non-empty.
    pub window_class: String,
    /// Substring of the window title.
    pub window_title: String,
    pub input_click: (i32, i32),
    pub status_region: Region,
}

impl Default for TargetConfig {
    fn default() -> Self {
        TargetConfig {
            window_class: String::new(),
            window_title: "Pear Runtime".to_string(),
            input_click: (89, 231),
            status_region: Region {
                left: 106,
                top: 275,
                width: 400,
                height: 40,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub type_interval_ms: u64,
    pub settle_delay_ms: u64,
    pub classify_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub inter_probe_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            type_interval_ms: 30,
            settle_delay_ms: 400,
            classify_timeout_ms: 10_000,
            poll_interval_ms: 350,
            inter_probe_delay_ms: 120,
        }
    }
}

impl TimingConfig {
    pub fn type_interval(&self) -> Duration {
        Duration::from_millis(self.type_interval_ms)
    }
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
    pub fn classify_timeout(&self) -> Duration {
        Duration::from_millis(self.classify_timeout_ms)
    }
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
    pub fn inter_probe_delay(&self) -> Duration {
        Duration::from_millis(self.inter_probe_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Save every preprocessed status frame as PNG.
    pub screenshots: bool,
    pub folder: PathBuf,
}

impl Default for DebugConfig {
    fn default() -> Self {
        DebugConfig {
            screenshots: false,
            folder: PathBuf::from("ocr_debug"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Explicit tesseract binary; auto-detected on PATH when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tesseract_path: Option<PathBuf>,
    pub language: String,
    pub timeout_ms: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        OcrConfig {
            tesseract_path: None,
            language: "eng".to_string(),
            timeout_ms: 5_000,
        }
    }
}

/// The whole configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub target: TargetConfig,
    pub timing: TimingConfig,
    pub ledgers: LedgerPaths,
    pub debug: DebugConfig,
    pub ocr: OcrConfig,
}

impl Config {
    pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config = Config::from_toml(content, origin)?;
        config.validate()?;
        Ok(config)
    }

    fn from_toml(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let region = &self.target.status_region;
        if region.width == 0 || region.height == 0 {
            return Err(ConfigError::DegenerateRegion {
                width: i64::from(region.width),
                height: i64::from(region.height),
            });
        }
        self.validate_timing()
    }

    /// Timing checks alone; the target section may still be uncalibrated.
    pub fn validate_timing(&self) -> Result<(), ConfigError> {
        let t = &self.timing;
        if t.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidTiming(
                "poll_interval_ms must be positive".into(),
            ));
        }
        if t.poll_interval_ms > t.classify_timeout_ms {
            return Err(ConfigError::InvalidTiming(format!(
                "poll_interval_ms ({}) exceeds classify_timeout_ms ({})",
                t.poll_interval_ms, t.classify_timeout_ms
            )));
        }
        Ok(())
    }

    /// Load the document, writing defaults first if it does not exist.
    pub fn load_or_init(path: &Path) -> Result<Self, ConfigError> {
        let config = Config::read_or_init(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::load_or_init`], but a degenerate status region is
    /// accepted so calibration can replace it.
    pub fn load_for_calibration(path: &Path) -> Result<Self, ConfigError> {
        let config = Config::read_or_init(path)?;
        config.validate_timing()?;
        Ok(config)
    }

    fn read_or_init(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Config::default();
            config.save(path)?;
            info!(path = %path.display(), "wrote default configuration");
            return Ok(config);
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Config::from_toml(&content, path)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(io_err)
    }
}
