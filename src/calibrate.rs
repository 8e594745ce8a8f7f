//! # Calibrate: Interactive Capture of Click Point and Status Region
//!
//! The operator hovers the pointer over three spots (input field, status
//! top-left, status bottom-right), pressing Enter after each. A zero-area
//! region aborts before anything is written. Otherwise the configuration is
//! saved and one diagnostic sample is captured: the raw frame and its
//! preprocessed form go to the debug folder and the OCR text is printed.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::config::{Config, Region};
use crate::input::InputDriver;
use crate::locale::Messages;
use crate::ocr::OcrEngine;
use crate::preprocess;
use crate::screen::ScreenSource;

/// Capabilities calibration needs from the outside world.
pub struct Devices<'a> {
    pub input: &'a dyn InputDriver,
    pub screen: &'a dyn ScreenSource,
    pub ocr: &'a dyn OcrEngine,
}

#[derive(Debug)]
pub struct CalibrationReport {
    pub input_click: (i32, i32),
    pub status_region: Region,
    pub sample_path: PathBuf,
    pub ocr_text: String,
}

fn prompt_and_locate(
    devices: &Devices<'_>,
    console: &mut impl BufRead,
    out: &mut impl Write,
    prompt: &str,
) -> Result<(i32, i32)> {
    write!(out, "{}", prompt)?;
    out.flush()?;
    let mut line = String::new();
    console.read_line(&mut line)?;
    devices.input.cursor_position()
}

pub fn run(
    config_path: &Path,
    config: &mut Config,
    devices: &Devices<'_>,
    messages: &Messages,
    console: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<CalibrationReport> {
    writeln!(out, "\n{}\n", messages.calibrator_title)?;
    writeln!(out, "{}", messages.calibrator_step1)?;

    let input_click = prompt_and_locate(devices, console, out, messages.calibrator_step2)?;
    writeln!(out, "input_click = {:?}", input_click)?;
    let top_left = prompt_and_locate(devices, console, out, messages.calibrator_step3)?;
    let bottom_right = prompt_and_locate(devices, console, out, messages.calibrator_step4)?;

    let status_region = match Region::from_corners(top_left, bottom_right) {
        Ok(region) => region,
        Err(e) => {
            writeln!(out, "{}", messages.calibration_degenerate)?;
            return Err(e.into());
        }
    };

    config.target.input_click = input_click;
    config.target.status_region = status_region;
    config.save(config_path)?;
    writeln!(out, "\n{} {}", messages.calibration_saved, config_path.display())?;
    info!(
        x = input_click.0,
        y = input_click.1,
        region = ?status_region,
        "calibration saved"
    );

    let folder = &config.debug.folder;
    std::fs::create_dir_all(folder)
        .with_context(|| format!("cannot create debug folder {}", folder.display()))?;
    let sample = devices.screen.capture(&status_region)?;
    let sample_path = folder.join("ocr_sample.png");
    sample
        .save(&sample_path)
        .with_context(|| format!("cannot write {}", sample_path.display()))?;
    let prepared = preprocess::prepare(&sample);
    let prepared_path = folder.join("ocr_sample_processed.png");
    prepared
        .save(&prepared_path)
        .with_context(|| format!("cannot write {}", prepared_path.display()))?;
    writeln!(out, "Screenshot saved: {}", sample_path.display())?;

    let ocr_text = match devices.ocr.recognize(&prepared) {
        Ok(text) => text.trim().to_lowercase(),
        Err(e) => format!("(OCR error: {})", e),
    };
    writeln!(out, "{} {:?}", messages.ocr_sample, ocr_text)?;
    writeln!(out, "\n{}", messages.calibration_done)?;

    Ok(CalibrationReport {
        input_click,
        status_region,
        sample_path,
        ocr_text,
    })
}
