//! Bounded ring of recent non-fatal errors.
//!
//! Every absorbed error (policy failures, spawn failures, allocation failures during
//! window creation) is logged through `tracing` and also recorded here so a policy
//! engine or debugging tool can inspect what went wrong without scraping logs.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use tracing::warn;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticSource {
    Policy,
    Window,
    Output,
    Input,
    Process,
    Backend,
    Config,
    Refresh,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub source: DiagnosticSource,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Diagnostics {
    entries: VecDeque<Diagnostic>,
    capacity: usize,
    total: u64,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl Diagnostics {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            total: 0,
        }
    }

    /// Logs `message` at warn level and keeps it in the ring.
    pub fn record(&mut self, source: DiagnosticSource, message: impl Into<String>) {
        let message = message.into();
        warn!(?source, "{}", message);
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(Diagnostic {
            source,
            message,
            at: Utc::now(),
        });
        self.total += 1;
    }

    /// Oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&Diagnostic> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of diagnostics ever recorded, including evicted ones.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn count(&self, source: DiagnosticSource) -> usize {
        self.entries.iter().filter(|d| d.source == source).count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// All retained diagnostics, oldest first, one `HH:MM:SS [source] message` line each.
    pub fn text(&self) -> String {
        self.entries
            .iter()
            .map(|d| format!("{} [{:?}] {}", d.at.format("%H:%M:%S"), d.source, d.message))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_evicts_oldest() {
        let mut diag = Diagnostics::with_capacity(2);
        diag.record(DiagnosticSource::Policy, "first");
        diag.record(DiagnosticSource::Window, "second");
        diag.record(DiagnosticSource::Process, "third");

        let messages: Vec<_> = diag.entries().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["second", "third"]);
        assert_eq!(diag.total(), 3);
        assert_eq!(diag.count(DiagnosticSource::Policy), 0);
        assert_eq!(diag.latest().map(|d| d.source), Some(DiagnosticSource::Process));
    }

    #[test]
    fn test_zero_capacity_is_promoted() {
        let mut diag = Diagnostics::with_capacity(0);
        diag.record(DiagnosticSource::Config, "kept");
        assert_eq!(diag.len(), 1);
    }

    #[test]
    fn test_text_joins_messages() {
        let mut diag = Diagnostics::default();
        diag.record(DiagnosticSource::Policy, "rule failed");
        diag.record(DiagnosticSource::Window, "no scene");
        let text = diag.text();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[Policy] rule failed"));
        assert!(lines[1].ends_with("[Window] no scene"));
    }

    #[test]
    fn test_entries_are_timestamped_in_order() {
        let before = Utc::now();
        let mut diag = Diagnostics::default();
        diag.record(DiagnosticSource::Backend, "vt switch failed");
        diag.record(DiagnosticSource::Backend, "vt switch failed again");
        let stamps: Vec<_> = diag.entries().map(|d| d.at).collect();
        assert!(stamps[0] >= before);
        assert!(stamps[0] <= stamps[1]);
        let expected = stamps[0].format("%H:%M:%S").to_string();
        assert!(diag.text().starts_with(&expected));
    }
}
