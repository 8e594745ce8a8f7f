//! Helpers for the external tools the scanner drives: `tesseract`,
//! `xdotool` and ImageMagick `import`.
//!
//! Every invocation runs with a hard timeout. The child is polled with
//! `try_wait` and killed when the deadline passes, while stdout and stderr are
//! drained on helper threads so a chatty child can never block on a full pipe.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Captured result of a finished child process.
#[derive(Debug)]
pub struct Finished {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl Finished {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Search for a binary in PATH.
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    Command::new("which")
        .arg(name)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| PathBuf::from(s.trim()))
        .filter(|p| p.exists())
}

/// Run `cmd` to completion or kill it after `timeout`.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> io::Result<Finished> {
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    let mut child = cmd.spawn()?;

    let stdout_handle = child.stdout.take();
    let stdout_thread = thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout_handle {
            let _ = out.read_to_end(&mut buf);
        }
        buf
    });
    let stderr_handle = child.stderr.take();
    let stderr_thread = thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut err) = stderr_handle {
            let _ = err.read_to_string(&mut buf);
        }
        buf
    });

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            let stdout = stdout_thread.join().unwrap_or_default();
            let stderr = stderr_thread.join().unwrap_or_default();
            return Ok(Finished {
                status,
                stdout,
                stderr,
            });
        }
        if start.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            let _ = stdout_thread.join();
            let _ = stderr_thread.join();
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("timed out after {}ms", timeout.as_millis()),
            ));
        }
        thread::sleep(Duration::from_millis(10));
    }
}

/// Like [`run_with_timeout`], but a non-zero exit status is an error carrying
/// the child's stderr.
pub fn run_checked(cmd: &mut Command, timeout: Duration) -> io::Result<Finished> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let finished = run_with_timeout(cmd, timeout)?;
    if !finished.status.success() {
        return Err(io::Error::other(format!(
            "{} exited with {}: {}",
            program,
            finished.status,
            finished.stderr.trim()
        )));
    }
    Ok(finished)
}
