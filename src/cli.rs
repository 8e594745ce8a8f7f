//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim. Builds the real
//! devices (xdotool, ImageMagick, tesseract), the session, and hands off to
//! the library.

use anyhow::{Context, Result};
use handlescan::calibrate::{self, Devices};
use handlescan::cancel::CancelToken;
use handlescan::config::Config;
use handlescan::driver::{self, Session};
use handlescan::input::Xdotool;
use handlescan::ledger::{LedgerStats, ResultStore};
use handlescan::observer::Observer;
use handlescan::ocr::Tesseract;
use handlescan::probe::{ProbeController, ProbeTiming};
use handlescan::screen::ImportGrabber;
use tracing::info;

use super::{Cli, Commands};

fn load_config(cli: &Cli) -> Result<Config> {
    Config::load_or_init(&cli.config)
        .with_context(|| format!("loading configuration {}", cli.config.display()))
}

// ── Calibration ─────────────────────────────────────────────────

pub fn run_calibrate(cli: &Cli) -> Result<()> {
    let mut config = Config::load_for_calibration(&cli.config)
        .with_context(|| format!("loading configuration {}", cli.config.display()))?;
    let input = Xdotool::default();
    let screen = ImportGrabber::default();
    let ocr = Tesseract::new(&config.ocr);
    let devices = Devices {
        input: &input,
        screen: &screen,
        ocr: &ocr,
    };

    let stdin = std::io::stdin();
    let mut console = stdin.lock();
    let mut out = std::io::stdout();
    calibrate::run(
        &cli.config,
        &mut config,
        &devices,
        cli.lang.messages(),
        &mut console,
        &mut out,
    )?;
    Ok(())
}

// ── Scan ────────────────────────────────────────────────────────

pub fn run_scan(cli: &Cli) -> Result<()> {
    let Commands::Run {
        min_len,
        max_len,
        no_require_digit,
        no_resume,
        max,
    } = &cli.command
    else {
        unreachable!()
    };

    let config = load_config(cli)?;
    let session = Session {
        min_len: *min_len,
        max_len: *max_len,
        require_digit: !no_require_digit,
        resume: !no_resume,
        max_probes: (*max > 0).then_some(*max),
        inter_probe_delay: config.timing.inter_probe_delay(),
    };
    info!(config = %cli.config.display(), lang = ?cli.lang, "handlescan starting");

    let cancel = CancelToken::new();
    cancel.cancel_on_signal()?;

    let input = Xdotool::default();
    let screen = ImportGrabber::default();
    let ocr = Tesseract::new(&config.ocr);
    let mut observer = Observer::new(&screen, &ocr, cli.lang.markers());
    if config.debug.screenshots {
        observer = observer.with_debug_frames(config.debug.folder.clone());
    }
    let controller = ProbeController::new(
        &input,
        observer,
        config.target.clone(),
        ProbeTiming::from(&config.timing),
        cli.lang.messages(),
    );

    let summary = driver::run(
        &session,
        &config.ledgers,
        &controller,
        &cancel,
        cli.lang.messages(),
    )?;
    info!(
        probed = summary.probed,
        taken = summary.taken,
        available = summary.available,
        indeterminate = summary.indeterminate,
        skipped = summary.skipped,
        stop = ?summary.stop,
        "scan finished"
    );
    Ok(())
}

// ── Maintenance ─────────────────────────────────────────────────

pub fn run_compact(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let mut store = ResultStore::open(&config.ledgers)?;
    let available = store.compact_available()?;
    let taken = store.compact_taken()?;
    println!(
        "removed {} duplicate available and {} duplicate taken entries",
        available, taken
    );
    Ok(())
}

pub fn run_stats(cli: &Cli, json: bool) -> Result<()> {
    let config = load_config(cli)?;
    let stats = LedgerStats::read(&config.ledgers)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!(
            "processed: {} ({} unique)",
            stats.processed_lines, stats.processed_unique
        );
        println!(
            "available: {} ({} unique)",
            stats.available_lines, stats.available_unique
        );
        println!("taken:     {} ({} unique)", stats.taken_lines, stats.taken_unique);
    }
    Ok(())
}
