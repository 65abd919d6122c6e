//! Reporting sink used by the translation core.
//!
//! The pipeline never talks to a logger directly; it reports through a [`Reporter`] handed to
//! it by the caller. The binary installs a `tracing` subscriber and uses [`TracingReporter`];
//! tests use [`MemoryReporter`] to assert on what was reported.

use std::cell::RefCell;
use std::time::Instant;

use tracing::Level;

pub trait Reporter {
    fn report(&self, level: Level, message: &str);

    fn progress(&self, label: &str, current: usize, total: usize);

    fn debug(&self, message: &str) {
        self.report(Level::DEBUG, message);
    }

    fn info(&self, message: &str) {
        self.report(Level::INFO, message);
    }

    fn warn(&self, message: &str) {
        self.report(Level::WARN, message);
    }

    fn error(&self, message: &str) {
        self.report(Level::ERROR, message);
    }
}

pub struct TracingReporter {
    show_progress: bool,
    t0: Instant,
}

impl TracingReporter {
    pub fn new(show_progress: bool) -> Self {
        Self {
            show_progress,
            t0: Instant::now(),
        }
    }
}

impl Reporter for TracingReporter {
    fn report(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => tracing::error!("{message}"),
            Level::WARN => tracing::warn!("{message}"),
            Level::INFO => tracing::info!("{message}"),
            Level::DEBUG => tracing::debug!("{message}"),
            _ => tracing::trace!("{message}"),
        }
    }

    fn progress(&self, label: &str, current: usize, total: usize) {
        if !self.show_progress {
            return;
        }
        tracing::info!(
            "{}",
            progress_line(label, current, total, self.t0.elapsed().as_secs_f64())
        );
    }
}

/// Keeps every report in memory.
#[derive(Default)]
pub struct MemoryReporter {
    entries: RefCell<Vec<(Level, String)>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries.borrow().clone()
    }

    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries.borrow().iter().any(|(_, m)| m.contains(needle))
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, level: Level, message: &str) {
        self.entries.borrow_mut().push((level, message.to_string()));
    }

    fn progress(&self, label: &str, current: usize, total: usize) {
        self.entries
            .borrow_mut()
            .push((Level::TRACE, progress_line(label, current, total, 0.0)));
    }
}

impl<R: Reporter + ?Sized> Reporter for &R {
    fn report(&self, level: Level, message: &str) {
        (**self).report(level, message);
    }

    fn progress(&self, label: &str, current: usize, total: usize) {
        (**self).progress(label, current, total);
    }
}

fn progress_line(label: &str, current: usize, total: usize, elapsed: f64) -> String {
    let total = total.max(1);
    let current = current.min(total);
    let pct = (current as f64 / total as f64) * 100.0;
    let ts = fmt_elapsed(elapsed);
    format!("{label} {current}/{total} ({pct:5.1}%) [{ts}]")
}

fn fmt_elapsed(seconds: f64) -> String {
    let seconds = seconds.max(0.0) as u64;
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_reporter_records_levels() {
        let r = MemoryReporter::new();
        r.info("loaded 3 units");
        r.warn("missing reference for a.b");
        assert_eq!(r.messages_at(Level::WARN), vec!["missing reference for a.b"]);
        assert!(r.contains("loaded 3"));
        assert_eq!(r.entries().len(), 2);
    }

    #[test]
    fn progress_lines() {
        assert_eq!(
            progress_line("Translating", 3, 10, 75.0),
            "Translating 3/10 ( 30.0%) [01:15]"
        );
        assert_eq!(
            progress_line("Translating", 5, 0, 3700.0),
            "Translating 1/1 (100.0%) [01:01:40]"
        );
    }
}
