//! # Input: Window Focus and Keystroke Injection
//!
//! The target application is driven like a human would: bring its window to
//! the front, click the input field, select-all + delete, type the candidate,
//! press Return. `Xdotool` implements this on X11 by shelling out to
//! `xdotool`; tests substitute a recording fake.
//!
//! Focus is best effort. `focus_window` returns `Ok(false)` when no window
//! matches, and callers fall back to clicking the input point.

use std::process::Command;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::subprocess;

pub trait InputDriver {
    /// Activate the first window matching `class` (when non-empty), else the
    /// first whose title contains `title`. `Ok(false)` when nothing matched.
    fn focus_window(&self, class: &str, title: &str) -> Result<bool>;
    fn click(&self, x: i32, y: i32) -> Result<()>;
    /// Select everything in the focused field and delete it.
    fn clear_field(&self) -> Result<()>;
    fn type_text(&self, text: &str, per_char: Duration) -> Result<()>;
    fn submit(&self) -> Result<()>;
    /// Current pointer position, used by calibration.
    fn cursor_position(&self) -> Result<(i32, i32)>;
}

pub struct Xdotool {
    timeout: Duration,
}

impl Default for Xdotool {
    fn default() -> Self {
        Xdotool {
            timeout: Duration::from_secs(10),
        }
    }
}

impl Xdotool {
    fn run(&self, args: &[&str]) -> Result<String> {
        let out = subprocess::run_checked(Command::new("xdotool").args(args), self.timeout)
            .with_context(|| format!("xdotool {}", args.join(" ")))?;
        Ok(out.stdout_text())
    }

    /// `xdotool search` exits 1 when nothing matches; that is not an error.
    fn search(&self, flag: &str, pattern: &str) -> Result<Option<String>> {
        let out = subprocess::run_with_timeout(
            Command::new("xdotool").args(["search", "--onlyvisible", flag, pattern]),
            self.timeout,
        )
        .context("xdotool search")?;
        Ok(out
            .stdout_text()
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_owned))
    }
}

impl InputDriver for Xdotool {
    fn focus_window(&self, class: &str, title: &str) -> Result<bool> {
        let mut window = None;
        if !class.is_empty() {
            window = self.search("--class", class)?;
        }
        if window.is_none() && !title.is_empty() {
            // --name takes a regex; escape so the title is a plain substring.
            window = self.search("--name", &escape_regex(title))?;
        }
        let Some(id) = window else {
            return Ok(false);
        };
        self.run(&["windowactivate", "--sync", &id])?;
        thread::sleep(Duration::from_millis(200));
        Ok(true)
    }

    fn click(&self, x: i32, y: i32) -> Result<()> {
        self.run(&["mousemove", &x.to_string(), &y.to_string(), "click", "1"])?;
        thread::sleep(Duration::from_millis(50));
        Ok(())
    }

    fn clear_field(&self) -> Result<()> {
        self.run(&["key", "--clearmodifiers", "ctrl+a"])?;
        thread::sleep(Duration::from_millis(20));
        self.run(&["key", "--clearmodifiers", "BackSpace"])?;
        thread::sleep(Duration::from_millis(20));
        Ok(())
    }

    fn type_text(&self, text: &str, per_char: Duration) -> Result<()> {
        let delay = per_char.as_millis().to_string();
        self.run(&["type", "--delay", &delay, "--", text])?;
        Ok(())
    }

    fn submit(&self) -> Result<()> {
        self.run(&["key", "--clearmodifiers", "Return"])?;
        Ok(())
    }

    fn cursor_position(&self) -> Result<(i32, i32)> {
        parse_mouse_location(&self.run(&["getmouselocation", "--shell"])?)
    }
}

/// Parse `xdotool getmouselocation --shell` output (`X=..`, `Y=..` lines).
pub fn parse_mouse_location(output: &str) -> Result<(i32, i32)> {
    let mut x = None;
    let mut y = None;
    for line in output.lines() {
        if let Some(v) = line.trim().strip_prefix("X=") {
            x = v.parse().ok();
        } else if let Some(v) = line.trim().strip_prefix("Y=") {
            y = v.parse().ok();
        }
    }
    match (x, y) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => bail!("unrecognized getmouselocation output: {:?}", output),
    }
}

fn escape_regex(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
