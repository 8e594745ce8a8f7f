//! # Locale: Console Messages and OCR Marker Tables
//!
//! The display language is a plain value chosen on the command line and
//! passed to whatever prints to the console or reads the status line. Each
//! locale resolves to a static message table and a static marker table.
//!
//! ## Marker Matching
//!
//! `MarkerTable::signal` maps lower-cased OCR text to a [`Signal`], checking
//! markers in a fixed priority order: checking, taken, available. The first
//! match wins. `Signal::step` is the classifier's transition table.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::Verdict;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ru,
}

impl Locale {
    pub fn messages(self) -> &'static Messages {
        match self {
            Locale::En => &EN_MESSAGES,
            Locale::Ru => &RU_MESSAGES,
        }
    }

    pub fn markers(self) -> &'static MarkerTable {
        // The target application renders its status line in English
        // regardless of the console language.
        match self {
            Locale::En | Locale::Ru => &ENGLISH_STATUS_MARKERS,
        }
    }
}

/// Operator-facing console strings.
#[derive(Debug)]
pub struct Messages {
    pub calibrator_title: &'static str,
    pub calibrator_step1: &'static str,
    pub calibrator_step2: &'static str,
    pub calibrator_step3: &'static str,
    pub calibrator_step4: &'static str,
    pub calibration_saved: &'static str,
    pub calibration_degenerate: &'static str,
    pub calibration_done: &'static str,
    pub ocr_sample: &'static str,
    pub focus_fail: &'static str,
    pub resume_summary: &'static str,
    pub checking: &'static str,
    pub taken: &'static str,
    pub available_saved: &'static str,
    pub available_already: &'static str,
    pub indeterminate: &'static str,
    pub interrupted: &'static str,
    pub cap_reached: &'static str,
    pub done: &'static str,
}

static EN_MESSAGES: Messages = Messages {
    calibrator_title: "=== Calibrator ===",
    calibrator_step1: "1) Make the input field visible in the app.",
    calibrator_step2: "2) Hover the mouse over the input field and press Enter in this console...",
    calibrator_step3:
        "3) Hover the mouse over the TOP LEFT corner of the status area and press Enter...",
    calibrator_step4:
        "4) Hover the mouse over the BOTTOM RIGHT corner of the status area and press Enter...",
    calibration_saved: "Configuration saved:",
    calibration_degenerate: "Status area has zero size, nothing saved.",
    calibration_done: "Calibration finished.",
    ocr_sample: "OCR result:",
    focus_fail: "Could not find window, focusing by clicking the input point:",
    resume_summary: "already checked / available on file:",
    checking: "Checking",
    taken: "Taken ❌",
    available_saved: "Available ✅ (saving)",
    available_already: "Available ✅ (already in file)",
    indeterminate: "Unknown",
    interrupted: "Interrupted by user (Ctrl+C).",
    cap_reached: "Probe limit for this run reached.",
    done: "Work finished.",
};

static RU_MESSAGES: Messages = Messages {
    calibrator_title: "=== Калибратор ===",
    calibrator_step1: "1) Сделай видимым поле ввода в приложении.",
    calibrator_step2: "2) Наведи курсор на поле ввода и нажми Enter в этой консоли...",
    calibrator_step3: "3) Наведи курсор на ЛЕВЫЙ ВЕРХНИЙ угол области статуса и нажми Enter...",
    calibrator_step4: "4) Наведи курсор на ПРАВЫЙ НИЖНИЙ угол области статуса и нажми Enter...",
    calibration_saved: "Конфигурация сохранена:",
    calibration_degenerate: "Область статуса нулевого размера, ничего не сохранено.",
    calibration_done: "Калибровка завершена.",
    ocr_sample: "OCR результат:",
    focus_fail: "Не удалось найти окно, фокус через клик в точку ввода:",
    resume_summary: "уже проверено / свободных в файле:",
    checking: "Проверяю",
    taken: "Занят ❌",
    available_saved: "Свободен ✅ (записываю)",
    available_already: "Свободен ✅ (уже в файле)",
    indeterminate: "Неопределённо",
    interrupted: "Прервано пользователем (Ctrl+C).",
    cap_reached: "Достигнут лимит проверок за запуск.",
    done: "Работа завершена.",
};

/// What one OCR read says about the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The target is still working on the request.
    Checking,
    Taken,
    Available,
    /// Empty, garbled, or some unrelated text.
    Unrecognized,
}

/// Next move of the classifier after a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Poll,
    Commit(Verdict),
}

impl Signal {
    pub fn step(self) -> Step {
        match self {
            Signal::Checking | Signal::Unrecognized => Step::Poll,
            Signal::Taken => Step::Commit(Verdict::Taken),
            Signal::Available => Step::Commit(Verdict::Available),
        }
    }
}

/// Lower-case phrases the status line shows in each state.
#[derive(Debug)]
pub struct MarkerTable {
    pub checking: &'static str,
    pub taken: &'static str,
    pub available: &'static str,
}

static ENGLISH_STATUS_MARKERS: MarkerTable = MarkerTable {
    checking: "checking",
    taken: "already in use",
    available: "available",
};

impl MarkerTable {
    /// Classify normalized (trimmed, lower-case) OCR text.
    pub fn signal(&self, text: &str) -> Signal {
        if text.is_empty() {
            Signal::Unrecognized
        } else if text.contains(self.checking) {
            Signal::Checking
        } else if text.contains(self.taken) {
            Signal::Taken
        } else if text.contains(self.available) {
            Signal::Available
        } else {
            Signal::Unrecognized
        }
    }
}
