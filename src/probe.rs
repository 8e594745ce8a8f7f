//! # Probe: One Focus → Inject → Settle → Classify Cycle
//!
//! The controller only talks to the target application and the observer.
//! Ledger writes happen in the driver, right after [`ProbeController::probe`]
//! returns, so a cancelled probe leaves nothing behind.
//!
//! Input failures are logged and the probe carries on; a failed injection
//! usually ends up `Indeterminate`, which is still a completed probe.

use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cancel::{CancelToken, Cancelled};
use crate::config::{Region, TargetConfig, TimingConfig};
use crate::input::InputDriver;
use crate::locale::Messages;
use crate::observer::{Observation, Observer, PollTiming};

/// Per-probe pacing, fixed for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTiming {
    pub type_interval: Duration,
    pub settle_delay: Duration,
    pub poll: PollTiming,
}

impl From<&TimingConfig> for ProbeTiming {
    fn from(t: &TimingConfig) -> Self {
        ProbeTiming {
            type_interval: t.type_interval(),
            settle_delay: t.settle_delay(),
            poll: PollTiming {
                timeout: t.classify_timeout(),
                poll_interval: t.poll_interval(),
            },
        }
    }
}

pub struct ProbeController<'a> {
    input: &'a dyn InputDriver,
    observer: Observer<'a>,
    target: TargetConfig,
    timing: ProbeTiming,
    messages: &'static Messages,
}

impl<'a> ProbeController<'a> {
    pub fn new(
        input: &'a dyn InputDriver,
        observer: Observer<'a>,
        target: TargetConfig,
        timing: ProbeTiming,
        messages: &'static Messages,
    ) -> Self {
        ProbeController {
            input,
            observer,
            target,
            timing,
            messages,
        }
    }

    pub fn status_region(&self) -> &Region {
        &self.target.status_region
    }

    /// Bring the target to the front, clicking the input point when no
    /// window can be activated. Never fails.
    pub fn ensure_focus(&self) {
        let found = match self
            .input
            .focus_window(&self.target.window_class, &self.target.window_title)
        {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "window focus failed");
                false
            }
        };
        if found {
            return;
        }
        let (x, y) = self.target.input_click;
        println!("{} ({}, {})", self.messages.focus_fail, x, y);
        if let Err(e) = self.input.click(x, y) {
            warn!(error = %e, x, y, "fallback focus click failed");
        }
        thread::sleep(Duration::from_millis(300));
    }

    /// Type `candidate` into the target and classify its response.
    pub fn probe(&self, candidate: &str, cancel: &CancelToken) -> Result<Observation, Cancelled> {
        cancel.check()?;
        self.ensure_focus();
        self.inject(candidate);

        thread::sleep(self.timing.settle_delay);
        self.observer
            .classify(&self.target.status_region, self.timing.poll, cancel)
    }

    fn inject(&self, candidate: &str) {
        let log = |step: &str, result: anyhow::Result<()>| {
            if let Err(e) = result {
                warn!(step, candidate, error = %e, "input injection step failed");
            }
        };
        let (x, y) = self.target.input_click;
        log("click", self.input.click(x, y));
        log("clear", self.input.clear_field());
        log("type", self.input.type_text(candidate, self.timing.type_interval));
        log("submit", self.input.submit());
        debug!(candidate, "candidate submitted");
    }
}
