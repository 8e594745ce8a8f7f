//! # Driver: The Scan Loop
//!
//! Walks the candidate space in generation order and probes every candidate
//! not already in the processed ledger.
//!
//! ## Per-candidate step
//!
//! 1. Stop if cancellation was requested.
//! 2. Skip if processed (no probe, no I/O).
//! 3. Stop if this run's probe cap is reached.
//! 4. Probe. A cancelled probe is discarded: nothing is written for it.
//! 5. Write the verdict: taken/available ledger first, then processed, with
//!    no yield point in between. Indeterminate still counts as processed.
//! 6. Pace: sleep the inter-probe delay.
//!
//! Exhaustion, the cap, cancellation and storage failures all leave through
//! the same exit: compact the available ledger, print "done".

use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, info_span};

use crate::cancel::{CancelToken, Cancelled};
use crate::candidates;
use crate::ledger::{self, LedgerPaths, ResultStore, StorageError};
use crate::locale::Messages;
use crate::observer::Observation;
use crate::probe::ProbeController;
use crate::progress::Progress;
use crate::Verdict;

/// Parameters fixed for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub min_len: usize,
    pub max_len: usize,
    pub require_digit: bool,
    /// When false the processed ledger is deleted before opening.
    pub resume: bool,
    /// Probe cap for this run; `None` is unlimited.
    pub max_probes: Option<u64>,
    pub inter_probe_delay: Duration,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Exhausted,
    CapReached,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub probed: u64,
    pub taken: u64,
    pub available: u64,
    pub indeterminate: u64,
    pub skipped: u64,
    pub stop: StopReason,
}

/// Run the scan to exhaustion, cap, or cancellation.
pub fn run(
    session: &Session,
    paths: &LedgerPaths,
    controller: &ProbeController<'_>,
    cancel: &CancelToken,
    messages: &'static Messages,
) -> Result<RunSummary> {
    if !session.resume {
        ledger::clear_processed(paths)?;
    }
    let mut store = ResultStore::open(paths)?;
    println!(
        "{} {} / {}",
        messages.resume_summary,
        store.processed_count(),
        store.available_count()
    );

    let space = candidates::space_size(session.min_len, session.max_len, session.require_digit);
    info!(
        min_len = session.min_len,
        max_len = session.max_len,
        require_digit = session.require_digit,
        max_probes = ?session.max_probes,
        space = ?space,
        "scan starting"
    );

    let mut progress = Progress::new(space);
    controller.ensure_focus();

    let outcome = scan(session, controller, cancel, messages, &mut store, &mut progress);

    // Shared exit path: compaction runs whatever happened above.
    let compacted = store.compact_available();
    progress.print_status("-");
    match &outcome {
        Ok(StopReason::Cancelled) => println!("{}", messages.interrupted),
        Ok(StopReason::CapReached) => println!("{}", messages.cap_reached),
        Ok(StopReason::Exhausted) => {}
        Err(e) => error!(error = %e, "scan aborted by storage failure"),
    }
    println!("{}", messages.done);

    let stop = outcome?;
    compacted?;
    Ok(RunSummary {
        probed: progress.probed,
        taken: progress.taken,
        available: progress.available,
        indeterminate: progress.indeterminate,
        skipped: progress.skipped,
        stop,
    })
}

fn scan(
    session: &Session,
    controller: &ProbeController<'_>,
    cancel: &CancelToken,
    messages: &'static Messages,
    store: &mut ResultStore,
    progress: &mut Progress,
) -> Result<StopReason, StorageError> {
    for candidate in candidates::generate(session.min_len, session.max_len, session.require_digit)
    {
        if cancel.is_cancelled() {
            return Ok(StopReason::Cancelled);
        }
        if store.is_processed(&candidate) {
            progress.skipped += 1;
            continue;
        }
        if session.max_probes.is_some_and(|cap| progress.probed >= cap) {
            return Ok(StopReason::CapReached);
        }

        let span = info_span!("probe", candidate = %candidate);
        let _enter = span.enter();

        println!("{}: {} ...", messages.checking, candidate);
        let observation = match controller.probe(&candidate, cancel) {
            Ok(observation) => observation,
            Err(Cancelled) => return Ok(StopReason::Cancelled),
        };
        record(store, &candidate, &observation, messages)?;
        progress.record(observation.verdict);
        progress.maybe_report(&candidate);

        thread::sleep(session.inter_probe_delay);
    }
    Ok(StopReason::Exhausted)
}

/// Persist one verdict. The processed write always follows the
/// classification write directly.
fn record(
    store: &mut ResultStore,
    candidate: &str,
    observation: &Observation,
    messages: &Messages,
) -> Result<(), StorageError> {
    match observation.verdict {
        Verdict::Taken => {
            store.record_taken(candidate)?;
            println!("{}", messages.taken);
        }
        Verdict::Available => {
            if store.record_available(candidate)? {
                println!("{}", messages.available_saved);
            } else {
                println!("{}", messages.available_already);
            }
        }
        Verdict::Indeterminate => {
            println!("{} (OCR='{}')", messages.indeterminate, observation.text);
        }
    }
    store.record_processed(candidate)
}
