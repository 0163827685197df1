//! Opt-in debug logging for diagnosing slow or surprising runs.
//!
//! Enable by setting environment variable: GPTWRAPPED_DEBUG_LOG=1
//! Logs are written to `gptwrapped-debug.log` in the system temp directory.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

pub const ENV_VAR: &str = "GPTWRAPPED_DEBUG_LOG";

static ENABLED: AtomicBool = AtomicBool::new(false);
static START_TIME: OnceLock<Instant> = OnceLock::new();
static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();

pub fn log_path() -> PathBuf {
    std::env::temp_dir().join("gptwrapped-debug.log")
}

/// Initialize debug logging. Call once at startup.
pub fn init() {
    if std::env::var_os(ENV_VAR).is_none() {
        return;
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path());

    match file {
        Ok(file) => {
            START_TIME.get_or_init(Instant::now);
            LOG_FILE.get_or_init(|| Mutex::new(file));
            ENABLED.store(true, Ordering::SeqCst);
            log("DEBUG", "init", "Debug logging initialized");
        }
        Err(e) => {
            eprintln!("⚠️  Could not open {}: {e}", log_path().display());
        }
    }
}

#[inline]
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Append one line with elapsed time, category and action.
pub fn log(category: &str, action: &str, detail: &str) {
    if !is_enabled() {
        return;
    }

    let elapsed = START_TIME
        .get()
        .map(|s| s.elapsed().as_millis())
        .unwrap_or(0);

    let msg = format!("[{elapsed:>8}ms] [{category}] {action} - {detail}\n");

    if let Some(file_mutex) = LOG_FILE.get()
        && let Ok(mut file) = file_mutex.lock()
    {
        let _ = file.write_all(msg.as_bytes());
        let _ = file.flush();
    }
}

/// RAII guard that logs how long a phase took when dropped.
pub struct Timed {
    category: &'static str,
    phase: String,
    started: Instant,
}

impl Timed {
    pub fn new(category: &'static str, phase: impl Into<String>) -> Self {
        let phase = phase.into();
        log(category, "START", &phase);
        Self {
            category,
            phase,
            started: Instant::now(),
        }
    }
}

impl Drop for Timed {
    fn drop(&mut self) {
        if is_enabled() {
            let detail = format!("{} ({} ms)", self.phase, self.started.elapsed().as_millis());
            log(self.category, "DONE", &detail);
        }
    }
}
