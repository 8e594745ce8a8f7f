//! # Observer: Noisy Status-Line Classifier
//!
//! Turns repeated OCR reads of the status region into one [`Verdict`].
//!
//! ## Poll Loop
//!
//! ```text
//!   ┌──────────── capture → preprocess → OCR → normalize ─────────────┐
//!   │                                                                  │
//!   │  Checking / Unrecognized ── sleep(poll) ──> next read            │
//!   │  Taken / Available ───────> commit verdict                       │
//!   │  deadline passed ─────────> Indeterminate (last text kept)       │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads are unreliable frame to frame, so only an explicit marker commits
//! a verdict. Capture and OCR failures are empty reads. The deadline is fixed
//! when classification starts; no signal extends it.
//!
//! "Still checking" and "nothing recognized" behave identically, but the
//! timeout log says which one was seen so a UI stuck mid-check can be told
//! apart from an unreadable region.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use image::GrayImage;
use tracing::{debug, info, warn};

use crate::cancel::{CancelToken, Cancelled};
use crate::config::Region;
use crate::locale::{MarkerTable, Signal, Step};
use crate::ocr::{self, OcrEngine};
use crate::preprocess;
use crate::screen::ScreenSource;
use crate::Verdict;

/// Outcome of one classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub verdict: Verdict,
    /// Last normalized OCR text, for diagnostics.
    pub text: String,
    /// Number of poll sleeps taken before the verdict.
    pub polls: u32,
    /// Whether the "still checking" marker was ever read.
    pub saw_checking: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

pub struct Observer<'a> {
    screen: &'a dyn ScreenSource,
    ocr: &'a dyn OcrEngine,
    markers: &'static MarkerTable,
    debug_folder: Option<PathBuf>,
}

impl<'a> Observer<'a> {
    pub fn new(
        screen: &'a dyn ScreenSource,
        ocr: &'a dyn OcrEngine,
        markers: &'static MarkerTable,
    ) -> Self {
        Observer {
            screen,
            ocr,
            markers,
            debug_folder: None,
        }
    }

    /// Save every preprocessed frame into `folder`.
    pub fn with_debug_frames(mut self, folder: PathBuf) -> Self {
        self.debug_folder = Some(folder);
        self
    }

    /// Capture, clean up and read the region once. Never fails: capture and
    /// OCR errors come back as the empty string.
    pub fn read_once(&self, region: &Region) -> String {
        let frame = match self.screen.capture(region) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(error = %e, "capture failed, treating as empty read");
                return String::new();
            }
        };
        let prepared = preprocess::prepare(&frame);
        self.save_debug_frame(&prepared);
        ocr::normalize(self.ocr.recognize(&prepared))
    }

    pub fn classify(
        &self,
        region: &Region,
        timing: PollTiming,
        cancel: &CancelToken,
    ) -> Result<Observation, Cancelled> {
        let start = Instant::now();
        let mut last_text = String::new();
        let mut polls = 0u32;
        let mut saw_checking = false;

        while start.elapsed() < timing.timeout {
            cancel.check()?;

            let text = self.read_once(region);
            if text != last_text {
                info!(ocr = ?text, "status text changed");
                last_text = text;
            }

            let signal = self.markers.signal(&last_text);
            saw_checking |= signal == Signal::Checking;
            match signal.step() {
                Step::Commit(verdict) => {
                    return Ok(Observation {
                        verdict,
                        text: last_text,
                        polls,
                        saw_checking,
                    });
                }
                Step::Poll => {
                    thread::sleep(timing.poll_interval);
                    polls += 1;
                }
            }
        }

        // The deadline may pass while a cancellation arrived mid-read or
        // mid-sleep; that candidate is abandoned, not indeterminate.
        cancel.check()?;

        if saw_checking {
            warn!(ocr = ?last_text, polls, "status stuck on checking until timeout");
        } else {
            warn!(ocr = ?last_text, polls, "no status marker recognized before timeout");
        }
        Ok(Observation {
            verdict: Verdict::Indeterminate,
            text: last_text,
            polls,
            saw_checking,
        })
    }

    fn save_debug_frame(&self, frame: &GrayImage) {
        let Some(ref folder) = self.debug_folder else {
            return;
        };
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S%.3f");
        let path = folder.join(format!("status-{}.png", stamp));
        let saved = std::fs::create_dir_all(folder)
            .map_err(anyhow::Error::from)
            .and_then(|_| frame.save(&path).map_err(anyhow::Error::from));
        if let Err(e) = saved {
            warn!(path = %path.display(), error = %e, "failed to save debug frame");
        }
    }
}
