//! Test support shared by integration tests.

#![allow(dead_code)]

use log::{Level, LevelFilter, Log, Metadata, Record};
use once_cell::sync::Lazy;
use std::sync::{Mutex, Once};

static CAPTURED: Lazy<Mutex<Vec<(Level, String)>>> = Lazy::new(|| Mutex::new(Vec::new()));
static INSTALL: Once = Once::new();

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        if let Ok(mut lines) = CAPTURED.lock() {
            lines.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

/// Routes the `log` facade into an in-memory buffer for this test binary.
pub fn capture_logs() {
    INSTALL.call_once(|| {
        log::set_logger(&LOGGER).expect("no other logger is installed in tests");
        log::set_max_level(LevelFilter::Trace);
    });
}

/// Error-level lines containing every needle.
pub fn error_lines_with(needles: &[&str]) -> Vec<String> {
    CAPTURED
        .lock()
        .expect("log buffer lock")
        .iter()
        .filter(|(level, line)| {
            *level == Level::Error && needles.iter().all(|needle| line.contains(needle))
        })
        .map(|(_, line)| line.clone())
        .collect()
}
