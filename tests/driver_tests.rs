//! End-to-end scan loop tests against a scripted fake target.
//!
//! The fake input driver records every typed candidate, so "was this
//! candidate probed" is a lookup in `TargetState::typed`. The fake OCR
//! answers with the status text scripted for the last typed candidate.

mod common;

use std::cell::RefCell;
use std::fs;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use common::*;
use handlescan::cancel::CancelToken;
use handlescan::config::Region;
use handlescan::driver::{self, Session, StopReason};
use handlescan::ledger::StorageError;
use handlescan::locale::Locale;
use handlescan::observer::{Observer, PollTiming};
use handlescan::probe::ProbeController;
use handlescan::screen::ScreenSource;
use image::{DynamicImage, RgbaImage};

fn session(min_len: usize, max_len: usize, require_digit: bool) -> Session {
    Session {
        min_len,
        max_len,
        require_digit,
        resume: true,
        max_probes: None,
        inter_probe_delay: Duration::ZERO,
    }
}

// ── End-to-end ──────────────────────────────────────────────────

#[test]
fn available_candidate_lands_in_processed_and_available_once() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ledger_paths(dir.path());
    let state: Shared = Rc::new(RefCell::new(TargetState::default()));
    let input = FakeInput::new(state.clone());
    let ocr = TargetOcr::new(state.clone(), "already in use").answer("a1", "available");
    let observer = Observer::new(&BlankScreen, &ocr, Locale::En.markers());
    let controller = ProbeController::new(
        &input,
        observer,
        target(),
        fast_timing(),
        Locale::En.messages(),
    );

    let mut s = session(2, 2, true);
    s.max_probes = Some(2);
    let summary = driver::run(
        &s,
        &paths,
        &controller,
        &CancelToken::new(),
        Locale::En.messages(),
    )
    .unwrap();

    assert_eq!(summary.stop, StopReason::CapReached);
    assert_eq!(state.borrow().typed, vec!["a0", "a1"]);
    assert_eq!(lines(&paths.processed), vec!["a0", "a1"]);
    assert_eq!(lines(&paths.available), vec!["a1"]);
    assert_eq!(lines(&paths.taken), vec!["a0"]);
    assert_eq!(summary.available, 1);
    assert_eq!(summary.taken, 1);
}

#[test]
fn available_already_on_file_is_not_duplicated() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ledger_paths(dir.path());
    fs::write(&paths.available, "a1\n").unwrap();
    fs::write(&paths.processed, "a0\n").unwrap();
    let taken_before = "zz9\n";
    fs::write(&paths.taken, taken_before).unwrap();

    let state: Shared = Rc::new(RefCell::new(TargetState::default()));
    let input = FakeInput::new(state.clone());
    let ocr = TargetOcr::new(state.clone(), "available");
    let observer = Observer::new(&BlankScreen, &ocr, Locale::En.markers());
    let controller = ProbeController::new(
        &input,
        observer,
        target(),
        fast_timing(),
        Locale::En.messages(),
    );

    let mut s = session(2, 2, true);
    s.max_probes = Some(1);
    driver::run(
        &s,
        &paths,
        &controller,
        &CancelToken::new(),
        Locale::En.messages(),
    )
    .unwrap();

    assert_eq!(state.borrow().typed, vec!["a1"]);
    assert_eq!(lines(&paths.processed), vec!["a0", "a1"]);
    assert_eq!(lines(&paths.available), vec!["a1"]);
    assert_eq!(fs::read_to_string(&paths.taken).unwrap(), taken_before);
}

// ── Resume ──────────────────────────────────────────────────────

#[test]
fn processed_candidates_are_never_probed_again() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ledger_paths(dir.path());
    let done = ["a0", "a1", "a2", "b7", "z9"];
    fs::write(&paths.processed, done.join("\n")).unwrap();

    let state: Shared = Rc::new(RefCell::new(TargetState::default()));
    let input = FakeInput::new(state.clone());
    let ocr = TargetOcr::new(state.clone(), "already in use");
    let observer = Observer::new(&BlankScreen, &ocr, Locale::En.markers());
    let controller = ProbeController::new(
        &input,
        observer,
        target(),
        fast_timing(),
        Locale::En.messages(),
    );

    let mut s = session(2, 2, true);
    s.max_probes = Some(40);
    let summary = driver::run(
        &s,
        &paths,
        &controller,
        &CancelToken::new(),
        Locale::En.messages(),
    )
    .unwrap();

    let typed = state.borrow().typed.clone();
    assert_eq!(typed.len(), 40);
    assert_eq!(typed[0], "a3");
    for c in done {
        assert!(!typed.iter().any(|t| t == c), "{c} was probed again");
    }
    assert!(summary.skipped >= 3);
}

#[test]
fn no_resume_clears_processed_and_taken_keeps_history() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ledger_paths(dir.path());
    fs::write(&paths.processed, "a0\n").unwrap();
    fs::write(&paths.taken, "a0\n").unwrap();

    let state: Shared = Rc::new(RefCell::new(TargetState::default()));
    let input = FakeInput::new(state.clone());
    let ocr = TargetOcr::new(state.clone(), "already in use");
    let observer = Observer::new(&BlankScreen, &ocr, Locale::En.markers());
    let controller = ProbeController::new(
        &input,
        observer,
        target(),
        fast_timing(),
        Locale::En.messages(),
    );

    let mut s = session(2, 2, true);
    s.resume = false;
    s.max_probes = Some(1);
    driver::run(
        &s,
        &paths,
        &controller,
        &CancelToken::new(),
        Locale::En.messages(),
    )
    .unwrap();

    assert_eq!(state.borrow().typed, vec!["a0"]);
    assert_eq!(lines(&paths.processed), vec!["a0"]);
    assert_eq!(lines(&paths.taken), vec!["a0", "a0"]);
}

// ── Timeout and indeterminate ───────────────────────────────────

#[test]
fn garbled_status_is_indeterminate_but_processed() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ledger_paths(dir.path());
    let state: Shared = Rc::new(RefCell::new(TargetState::default()));
    let input = FakeInput::new(state.clone());
    let ocr = TargetOcr::new(state.clone(), "%%$ l1ll0 ~~");
    let observer = Observer::new(&BlankScreen, &ocr, Locale::En.markers());
    let controller = ProbeController::new(
        &input,
        observer,
        target(),
        fast_timing(),
        Locale::En.messages(),
    );

    let mut s = session(2, 2, true);
    s.max_probes = Some(1);
    let summary = driver::run(
        &s,
        &paths,
        &controller,
        &CancelToken::new(),
        Locale::En.messages(),
    )
    .unwrap();

    assert_eq!(summary.indeterminate, 1);
    assert_eq!(lines(&paths.processed), vec!["a0"]);
    assert!(lines(&paths.available).is_empty());
    assert!(lines(&paths.taken).is_empty());

    // A second run moves past the indeterminate candidate.
    state.borrow_mut().typed.clear();
    driver::run(
        &s,
        &paths,
        &controller,
        &CancelToken::new(),
        Locale::En.messages(),
    )
    .unwrap();
    assert_eq!(state.borrow().typed, vec!["a1"]);
}

// ── Cancellation ────────────────────────────────────────────────

#[test]
fn cancellation_mid_probe_writes_nothing_for_that_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ledger_paths(dir.path());
    let cancel = CancelToken::new();
    let state: Shared = Rc::new(RefCell::new(TargetState::default()));
    let mut input = FakeInput::new(state.clone());
    input.cancel_on = Some(("a2".into(), cancel.clone()));
    let ocr = TargetOcr::new(state.clone(), "available");
    let observer = Observer::new(&BlankScreen, &ocr, Locale::En.markers());
    let controller = ProbeController::new(
        &input,
        observer,
        target(),
        fast_timing(),
        Locale::En.messages(),
    );

    let summary = driver::run(
        &session(2, 2, true),
        &paths,
        &controller,
        &cancel,
        Locale::En.messages(),
    )
    .unwrap();

    assert_eq!(summary.stop, StopReason::Cancelled);
    assert_eq!(summary.probed, 2);
    assert_eq!(lines(&paths.processed), vec!["a0", "a1"]);
    assert_eq!(lines(&paths.available), vec!["a0", "a1"]);
}

/// Signals an interrupt while grabbing the status frame.
struct InterruptingScreen(CancelToken);

impl ScreenSource for InterruptingScreen {
    fn capture(&self, _region: &Region) -> Result<DynamicImage> {
        self.0.cancel();
        Ok(DynamicImage::ImageRgba8(RgbaImage::new(16, 8)))
    }
}

#[test]
fn interrupt_during_final_read_leaves_candidate_unprocessed() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ledger_paths(dir.path());
    let cancel = CancelToken::new();
    let screen = InterruptingScreen(cancel.clone());
    let state: Shared = Rc::new(RefCell::new(TargetState::default()));
    let input = FakeInput::new(state.clone());
    let ocr = TargetOcr::new(state.clone(), "#garbled#");
    let observer = Observer::new(&screen, &ocr, Locale::En.markers());
    let mut timing = fast_timing();
    timing.poll = PollTiming {
        timeout: Duration::from_millis(1),
        poll_interval: Duration::from_millis(5),
    };
    let controller = ProbeController::new(
        &input,
        observer,
        target(),
        timing,
        Locale::En.messages(),
    );

    let summary = driver::run(
        &session(2, 2, true),
        &paths,
        &controller,
        &cancel,
        Locale::En.messages(),
    )
    .unwrap();

    assert_eq!(summary.stop, StopReason::Cancelled);
    assert_eq!(summary.probed, 0);
    assert_eq!(summary.indeterminate, 0);
    assert_eq!(state.borrow().typed, vec!["a0"]);
    assert!(lines(&paths.processed).is_empty());
}

#[test]
fn cancelled_before_start_probes_nothing_but_still_compacts() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ledger_paths(dir.path());
    fs::write(&paths.available, "q1\nq1\nr2\n").unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();

    let state: Shared = Rc::new(RefCell::new(TargetState::default()));
    let input = FakeInput::new(state.clone());
    let ocr = TargetOcr::new(state.clone(), "available");
    let observer = Observer::new(&BlankScreen, &ocr, Locale::En.markers());
    let controller = ProbeController::new(
        &input,
        observer,
        target(),
        fast_timing(),
        Locale::En.messages(),
    );

    let summary = driver::run(
        &session(2, 2, true),
        &paths,
        &controller,
        &cancel,
        Locale::En.messages(),
    )
    .unwrap();

    assert_eq!(summary.stop, StopReason::Cancelled);
    assert!(state.borrow().typed.is_empty());
    assert_eq!(lines(&paths.available), vec!["q1", "r2"]);
}

// ── Exhaustion, cap and focus fallback ──────────────────────────

#[test]
fn small_space_runs_to_exhaustion() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ledger_paths(dir.path());
    let state: Shared = Rc::new(RefCell::new(TargetState::default()));
    let input = FakeInput::new(state.clone());
    let ocr = TargetOcr::new(state.clone(), "already in use");
    let observer = Observer::new(&BlankScreen, &ocr, Locale::En.markers());
    let controller = ProbeController::new(
        &input,
        observer,
        target(),
        fast_timing(),
        Locale::En.messages(),
    );

    let summary = driver::run(
        &session(1, 1, false),
        &paths,
        &controller,
        &CancelToken::new(),
        Locale::En.messages(),
    )
    .unwrap();

    assert_eq!(summary.stop, StopReason::Exhausted);
    assert_eq!(summary.probed, 26);
    assert_eq!(lines(&paths.taken).len(), 26);
}

#[test]
fn missing_window_falls_back_to_input_click() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ledger_paths(dir.path());
    let state: Shared = Rc::new(RefCell::new(TargetState::default()));
    let mut input = FakeInput::new(state.clone());
    input.window_found = false;
    let ocr = TargetOcr::new(state.clone(), "available");
    let observer = Observer::new(&BlankScreen, &ocr, Locale::En.markers());
    let controller = ProbeController::new(
        &input,
        observer,
        target(),
        fast_timing(),
        Locale::En.messages(),
    );

    let mut s = session(2, 2, true);
    s.max_probes = Some(1);
    let summary = driver::run(
        &s,
        &paths,
        &controller,
        &CancelToken::new(),
        Locale::En.messages(),
    )
    .unwrap();

    assert_eq!(summary.available, 1);
    let st = state.borrow();
    // Initial focus + per-probe focus, each followed by a fallback click,
    // plus the probe's own click on the input field.
    assert_eq!(st.focus_attempts, 2);
    assert_eq!(st.clicks, vec![(5, 5), (5, 5), (5, 5)]);
    assert_eq!(st.submits, 1);
}

// ── Storage failure ─────────────────────────────────────────────

#[cfg(target_os = "linux")]
#[test]
fn failed_ledger_write_stops_the_run_after_compaction() {
    let dir = tempfile::tempdir().unwrap();
    let mut paths = ledger_paths(dir.path());
    // Every write to /dev/full fails with ENOSPC once the store is open.
    paths.taken = "/dev/full".into();
    fs::write(&paths.available, "q1\nq1\n").unwrap();

    let state: Shared = Rc::new(RefCell::new(TargetState::default()));
    let input = FakeInput::new(state.clone());
    let ocr = TargetOcr::new(state.clone(), "already in use").answer("a0", "available");
    let observer = Observer::new(&BlankScreen, &ocr, Locale::En.markers());
    let controller = ProbeController::new(
        &input,
        observer,
        target(),
        fast_timing(),
        Locale::En.messages(),
    );

    let err = driver::run(
        &session(2, 2, true),
        &paths,
        &controller,
        &CancelToken::new(),
        Locale::En.messages(),
    )
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<StorageError>(),
        Some(StorageError::Write { .. })
    ));
    // a0 went through; a1 failed on the taken write; nothing after it ran.
    assert_eq!(state.borrow().typed, vec!["a0", "a1"]);
    assert_eq!(lines(&paths.processed), vec!["a0"]);
    assert_eq!(lines(&paths.available), vec!["q1", "a0"]);
}
