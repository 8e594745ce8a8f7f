//! Cooperative cancellation.
//!
//! A [`CancelToken`] is a shared flag checked at the top of every driver
//! iteration and before every status capture. The signal listener thread
//! only flips the flag; the engine thread decides where it is safe to stop,
//! so an interrupted probe never leaves a partial ledger write behind.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;
use tracing::warn;

/// The in-flight probe was abandoned because cancellation was requested.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("probe cancelled")]
pub struct Cancelled;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Spawn a thread that cancels this token on Ctrl+C or SIGTERM.
    pub fn cancel_on_signal(&self) -> Result<()> {
        let token = self.clone();
        let sig_rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        std::thread::spawn(move || {
            sig_rt.block_on(async {
                if let Err(e) = wait_for_interrupt().await {
                    warn!(error = %e, "interrupt handler unavailable, cancellation disabled");
                    return;
                }
                warn!("interrupt received, stopping after the current step");
                token.cancel();
            });
        });
        Ok(())
    }
}

/// Resolve on Ctrl+C or SIGTERM. `Err` only when no handler could be
/// installed at all.
async fn wait_for_interrupt() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                let ctrl_c = tokio::select! {
                    res = tokio::signal::ctrl_c() => Some(res),
                    _ = sigterm.recv() => None,
                };
                if let Some(Err(e)) = ctrl_c {
                    warn!(error = %e, "Ctrl+C handler unavailable, listening for SIGTERM only");
                    sigterm.recv().await;
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl+C only");
                tokio::signal::ctrl_c().await
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
