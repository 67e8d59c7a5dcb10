//! Scoped timing log, passed explicitly to the stages it measures
//!
//! ```rust
//! use mfq_core::perf::PerfLog;
//!
//! let mut perf = PerfLog::new();
//! {
//!     let _span = perf.span("compile");
//!     // work being timed
//! }
//! assert_eq!(perf.records().len(), 1);
//! assert_eq!(perf.records()[0].name, "compile");
//! ```

use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// One finished span
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingRecord {
    pub name: String,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct PerfLog {
    records: Vec<TimingRecord>,
}

impl PerfLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a span; its elapsed time is recorded when the guard drops
    pub fn span(&mut self, name: impl Into<String>) -> Span<'_> {
        Span {
            log: self,
            name: name.into(),
            started: Instant::now(),
        }
    }

    pub fn records(&self) -> &[TimingRecord] {
        &self.records
    }

    /// Total time recorded under `name`
    pub fn total(&self, name: &str) -> Duration {
        self.records
            .iter()
            .filter(|r| r.name == name)
            .map(|r| r.elapsed)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl fmt::Display for PerfLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.records {
            writeln!(
                f,
                "{:<10} {:>10.3} ms",
                record.name,
                record.elapsed.as_secs_f64() * 1000.0
            )?;
        }
        Ok(())
    }
}

/// Guard returned by [`PerfLog::span`]
pub struct Span<'a> {
    log: &'a mut PerfLog,
    name: String,
    started: Instant,
}

impl Drop for Span<'_> {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        debug!(span = %self.name, elapsed_ms = elapsed.as_millis() as u64, "Span finished");
        self.log.records.push(TimingRecord {
            name: std::mem::take(&mut self.name),
            elapsed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_record_in_order() {
        let mut perf = PerfLog::new();
        assert!(perf.is_empty());
        {
            let _compile = perf.span("compile");
        }
        {
            let _rank = perf.span("rank");
            std::thread::sleep(Duration::from_millis(2));
        }
        let names: Vec<&str> = perf.records().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["compile", "rank"]);
        assert!(perf.total("rank") >= Duration::from_millis(2));
        assert_eq!(perf.total("execute"), Duration::ZERO);
    }

    #[test]
    fn test_display_lists_every_span() {
        let mut perf = PerfLog::new();
        drop(perf.span("compile"));
        let text = perf.to_string();
        assert!(text.starts_with("compile"));
        assert!(text.trim_end().ends_with("ms"));
    }
}
