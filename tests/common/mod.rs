//! Shared fakes for integration tests: a recording input driver, a blank
//! screen, and an OCR engine whose answers are keyed by the last typed
//! candidate.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use handlescan::cancel::CancelToken;
use handlescan::config::{Region, TargetConfig};
use handlescan::input::InputDriver;
use handlescan::ledger::LedgerPaths;
use handlescan::observer::PollTiming;
use handlescan::ocr::OcrEngine;
use handlescan::probe::ProbeTiming;
use handlescan::screen::ScreenSource;
use image::{DynamicImage, GrayImage, RgbaImage};

/// What the fake target has seen, shared between the input driver and OCR.
#[derive(Default)]
pub struct TargetState {
    pub typed: Vec<String>,
    pub clicks: Vec<(i32, i32)>,
    pub focus_attempts: u32,
    pub submits: u32,
}

pub type Shared = Rc<RefCell<TargetState>>;

pub struct FakeInput {
    pub state: Shared,
    pub window_found: bool,
    pub cursor: RefCell<VecDeque<(i32, i32)>>,
    /// Cancel this token as soon as the given candidate is typed.
    pub cancel_on: Option<(String, CancelToken)>,
}

impl FakeInput {
    pub fn new(state: Shared) -> Self {
        FakeInput {
            state,
            window_found: true,
            cursor: RefCell::new(VecDeque::new()),
            cancel_on: None,
        }
    }
}

impl InputDriver for FakeInput {
    fn focus_window(&self, _class: &str, _title: &str) -> Result<bool> {
        self.state.borrow_mut().focus_attempts += 1;
        Ok(self.window_found)
    }

    fn click(&self, x: i32, y: i32) -> Result<()> {
        self.state.borrow_mut().clicks.push((x, y));
        Ok(())
    }

    fn clear_field(&self) -> Result<()> {
        Ok(())
    }

    fn type_text(&self, text: &str, _per_char: Duration) -> Result<()> {
        self.state.borrow_mut().typed.push(text.to_owned());
        if let Some((ref trigger, ref token)) = self.cancel_on {
            if trigger == text {
                token.cancel();
            }
        }
        Ok(())
    }

    fn submit(&self) -> Result<()> {
        self.state.borrow_mut().submits += 1;
        Ok(())
    }

    fn cursor_position(&self) -> Result<(i32, i32)> {
        self.cursor
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted cursor position left"))
    }
}

pub struct BlankScreen;

impl ScreenSource for BlankScreen {
    fn capture(&self, region: &Region) -> Result<DynamicImage> {
        Ok(DynamicImage::ImageRgba8(RgbaImage::new(
            region.width.min(16),
            region.height.min(8),
        )))
    }
}

/// Answers with the status text scripted for the most recently typed
/// candidate; anything unscripted reads as `default`.
pub struct TargetOcr {
    pub state: Shared,
    pub answers: HashMap<String, String>,
    pub default: String,
}

impl TargetOcr {
    pub fn new(state: Shared, default: &str) -> Self {
        TargetOcr {
            state,
            answers: HashMap::new(),
            default: default.to_owned(),
        }
    }

    pub fn answer(mut self, candidate: &str, text: &str) -> Self {
        self.answers.insert(candidate.to_owned(), text.to_owned());
        self
    }
}

impl OcrEngine for TargetOcr {
    fn recognize(&self, _image: &GrayImage) -> Result<String> {
        let state = self.state.borrow();
        let last = state.typed.last().cloned().unwrap_or_default();
        Ok(self
            .answers
            .get(&last)
            .cloned()
            .unwrap_or_else(|| self.default.clone()))
    }
}

pub fn region() -> Region {
    Region {
        left: 0,
        top: 0,
        width: 16,
        height: 8,
    }
}

pub fn target() -> TargetConfig {
    TargetConfig {
        window_class: String::new(),
        window_title: "Fake".into(),
        input_click: (5, 5),
        status_region: region(),
    }
}

/// No pacing, short classification timeout.
pub fn fast_timing() -> ProbeTiming {
    ProbeTiming {
        type_interval: Duration::ZERO,
        settle_delay: Duration::ZERO,
        poll: PollTiming {
            timeout: Duration::from_millis(30),
            poll_interval: Duration::from_millis(2),
        },
    }
}

pub fn ledger_paths(dir: &Path) -> LedgerPaths {
    LedgerPaths {
        processed: dir.join("checked.txt"),
        available: dir.join("free.txt"),
        taken: dir.join("used.txt"),
    }
}

pub fn lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_owned)
        .collect()
}
