pub mod calibrate;
pub mod cancel;
pub mod candidates;
pub mod config;
pub mod driver;
pub mod input;
pub mod ledger;
pub mod locale;
pub mod observer;
pub mod ocr;
pub mod preprocess;
pub mod probe;
pub mod progress;
pub mod screen;
pub mod subprocess;

use serde::{Deserialize, Serialize};

/// Classification of one probe. Decides which ledgers receive the candidate;
/// never persisted itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Taken,
    Available,
    /// No marker was read before the classification timeout.
    Indeterminate,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Taken => write!(f, "taken"),
            Verdict::Available => write!(f, "available"),
            Verdict::Indeterminate => write!(f, "indeterminate"),
        }
    }
}
