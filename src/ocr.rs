//! Tesseract subprocess integration for reading the status line.
//!
//! The engine is treated as a noisy oracle: it may return nothing, garbage,
//! or fail outright. [`OcrEngine::recognize`] reports failures as `Err`; the
//! observer decides what an error means (an empty read).

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use image::GrayImage;

use crate::config::OcrConfig;
use crate::subprocess;

/// Counter for unique temp file names within one process.
static OCR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Text recognition over a preprocessed frame.
pub trait OcrEngine {
    /// Raw recognized text, not normalized.
    fn recognize(&self, image: &GrayImage) -> Result<String>;
}

/// `tesseract <input.png> stdout -l <lang>`.
pub struct Tesseract {
    binary_override: Option<PathBuf>,
    language: String,
    timeout: Duration,
    binary: OnceLock<Option<PathBuf>>,
}

impl Tesseract {
    pub fn new(config: &OcrConfig) -> Self {
        Tesseract {
            binary_override: config.tesseract_path.clone(),
            language: config.language.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
            binary: OnceLock::new(),
        }
    }

    /// Configured path first, then `tesseract` on PATH. Cached.
    fn binary(&self) -> Option<&Path> {
        self.binary
            .get_or_init(|| {
                if let Some(ref path) = self.binary_override {
                    if path.exists() {
                        return Some(path.clone());
                    }
                }
                subprocess::find_in_path("tesseract")
            })
            .as_deref()
    }
}

impl OcrEngine for Tesseract {
    fn recognize(&self, image: &GrayImage) -> Result<String> {
        let binary = self
            .binary()
            .context("tesseract binary not found (install it or set ocr.tesseract_path)")?;

        let id = OCR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let input = std::env::temp_dir().join(format!(
            "handlescan_ocr_{}_{}.png",
            std::process::id(),
            id
        ));
        image
            .save(&input)
            .with_context(|| format!("failed to write OCR input {}", input.display()))?;

        let result = subprocess::run_checked(
            Command::new(binary)
                .arg(&input)
                .arg("stdout")
                .args(["-l", self.language.as_str()]),
            self.timeout,
        );
        let _ = std::fs::remove_file(&input);

        Ok(result.context("tesseract failed")?.stdout_text())
    }
}

/// Lower-case and trim raw OCR output; errors become the empty read.
pub fn normalize(raw: Result<String>) -> String {
    match raw {
        Ok(text) => text.trim().to_lowercase(),
        Err(e) => {
            tracing::debug!(error = %e, "OCR read failed, treating as empty");
            String::new()
        }
    }
}
