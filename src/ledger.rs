//! # Ledger: Persistent, Resumable Result Store
//!
//! Three flat text ledgers, one candidate per line:
//!
//! | Ledger | Semantics |
//! |--------|-----------|
//! | processed | every candidate whose probe completed, whatever the verdict |
//! | available | candidates read as available; never written twice in a run |
//! | taken | append-only history; duplicates across `--no-resume` reruns are fine |
//!
//! ## Write-Through
//!
//! Every record call appends one newline-terminated line with a single
//! `write_all` on an unbuffered append handle, so an interruption loses at
//! most the in-flight probe. The processed and available ledgers are mirrored
//! in memory for O(1) membership checks.
//!
//! ## Compaction
//!
//! `compact_available` rewrites the available ledger deduplicated in
//! first-seen order. The rewrite goes to a `.tmp` sibling and is renamed over
//! the original, so a crash mid-compaction leaves the old file intact.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Ledger I/O failure. Always fatal for a run.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("cannot open ledger {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("cannot read ledger {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("cannot append to ledger {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("cannot compact ledger {path}: {source}")]
    Compact { path: PathBuf, source: io::Error },
}

/// Locations of the three ledgers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerPaths {
    pub processed: PathBuf,
    pub available: PathBuf,
    pub taken: PathBuf,
}

impl Default for LedgerPaths {
    fn default() -> Self {
        LedgerPaths {
            processed: PathBuf::from("checked_nicks.txt"),
            available: PathBuf::from("free_nicks.txt"),
            taken: PathBuf::from("used_nicks.txt"),
        }
    }
}

/// One append-only file plus its open handle.
struct Appender {
    path: PathBuf,
    file: File,
    /// The file was left without a trailing newline (hand edit, torn write).
    repair_newline: bool,
}

fn missing_final_newline(file: &mut File) -> io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

impl Appender {
    fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let open_err = |source| StorageError::Open {
            path: path.to_path_buf(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .map_err(open_err)?;
        let repair_newline = missing_final_newline(&mut file).map_err(open_err)?;
        Ok(Appender {
            path: path.to_path_buf(),
            file,
            repair_newline,
        })
    }

    fn append(&mut self, candidate: &str) -> Result<(), StorageError> {
        let line = if self.repair_newline {
            format!("\n{}\n", candidate)
        } else {
            format!("{}\n", candidate)
        };
        self.file
            .write_all(line.as_bytes())
            .map_err(|source| StorageError::Write {
                path: self.path.clone(),
                source,
            })?;
        self.repair_newline = false;
        Ok(())
    }
}

/// Read a ledger into its lines: trimmed, blanks dropped, file order kept.
pub fn read_entries(path: &Path) -> Result<Vec<String>, StorageError> {
    let raw = fs::read_to_string(path).map_err(|source| StorageError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect())
}

/// Rewrite a ledger deduplicated, first occurrence wins. Returns the number
/// of lines removed. A missing file is left missing.
pub fn compact(path: &Path) -> Result<usize, StorageError> {
    if !path.exists() {
        return Ok(0);
    }
    let entries = read_entries(path)?;
    let before = entries.len();
    let mut seen = HashSet::with_capacity(before);
    let mut out = String::new();
    for entry in entries {
        if seen.insert(entry.clone()) {
            out.push_str(&entry);
            out.push('\n');
        }
    }

    let compact_err = |source| StorageError::Compact {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, out).map_err(compact_err)?;
    fs::rename(&tmp, path).map_err(compact_err)?;

    Ok(before - seen.len())
}

/// Delete the processed ledger so the next run re-probes everything.
pub fn clear_processed(paths: &LedgerPaths) -> Result<(), StorageError> {
    match fs::remove_file(&paths.processed) {
        Ok(()) => {
            info!(path = %paths.processed.display(), "processed ledger cleared");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StorageError::Write {
            path: paths.processed.clone(),
            source,
        }),
    }
}

/// The run's view of all three ledgers.
pub struct ResultStore {
    processed: HashSet<String>,
    available: HashSet<String>,
    processed_log: Appender,
    available_log: Appender,
    taken_log: Appender,
}

impl ResultStore {
    /// Open (creating if absent) all three ledgers and load the processed and
    /// available sets.
    pub fn open(paths: &LedgerPaths) -> Result<Self, StorageError> {
        let processed_log = Appender::open(&paths.processed)?;
        let available_log = Appender::open(&paths.available)?;
        let taken_log = Appender::open(&paths.taken)?;

        let processed: HashSet<String> = read_entries(&paths.processed)?.into_iter().collect();
        let available: HashSet<String> = read_entries(&paths.available)?.into_iter().collect();
        debug!(
            processed = processed.len(),
            available = available.len(),
            "ledgers opened"
        );

        Ok(ResultStore {
            processed,
            available,
            processed_log,
            available_log,
            taken_log,
        })
    }

    pub fn is_processed(&self, candidate: &str) -> bool {
        self.processed.contains(candidate)
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn available_count(&self) -> usize {
        self.available.len()
    }

    pub fn is_available(&self, candidate: &str) -> bool {
        self.available.contains(candidate)
    }

    /// Mark a completed probe. Call once per probe, after the verdict.
    pub fn record_processed(&mut self, candidate: &str) -> Result<(), StorageError> {
        self.processed_log.append(candidate)?;
        self.processed.insert(candidate.to_owned());
        Ok(())
    }

    pub fn record_taken(&mut self, candidate: &str) -> Result<(), StorageError> {
        self.taken_log.append(candidate)
    }

    /// Append to the available ledger unless already present.
    ///
    /// Returns `true` when a line was written.
    pub fn record_available(&mut self, candidate: &str) -> Result<bool, StorageError> {
        let fresh = !self.available.contains(candidate);
        if fresh {
            self.available_log.append(candidate)?;
        }
        self.available.insert(candidate.to_owned());
        Ok(fresh)
    }

    /// Deduplicate the persisted available ledger. The append handle is
    /// reopened on the rewritten file.
    pub fn compact_available(&mut self) -> Result<usize, StorageError> {
        let path = self.available_log.path.clone();
        let removed = compact(&path)?;
        self.available_log = Appender::open(&path)?;
        if removed > 0 {
            info!(path = %path.display(), removed, "available ledger compacted");
        }
        Ok(removed)
    }

    /// Deduplicate the taken ledger. Maintenance only; never called mid-run.
    pub fn compact_taken(&mut self) -> Result<usize, StorageError> {
        let path = self.taken_log.path.clone();
        let removed = compact(&path)?;
        self.taken_log = Appender::open(&path)?;
        if removed > 0 {
            info!(path = %path.display(), removed, "taken ledger compacted");
        }
        Ok(removed)
    }
}

/// Line and unique counts per ledger, for `handlescan stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub processed_lines: usize,
    pub processed_unique: usize,
    pub available_lines: usize,
    pub available_unique: usize,
    pub taken_lines: usize,
    pub taken_unique: usize,
}

impl LedgerStats {
    /// Count entries without creating missing ledgers.
    pub fn read(paths: &LedgerPaths) -> Result<Self, StorageError> {
        fn counts(path: &Path) -> Result<(usize, usize), StorageError> {
            if !path.exists() {
                return Ok((0, 0));
            }
            let entries = read_entries(path)?;
            let unique = entries.iter().collect::<HashSet<_>>().len();
            Ok((entries.len(), unique))
        }
        let (processed_lines, processed_unique) = counts(&paths.processed)?;
        let (available_lines, available_unique) = counts(&paths.available)?;
        let (taken_lines, taken_unique) = counts(&paths.taken)?;
        Ok(LedgerStats {
            processed_lines,
            processed_unique,
            available_lines,
            available_unique,
            taken_lines,
            taken_unique,
        })
    }
}
