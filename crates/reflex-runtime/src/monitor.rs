//! Per-tick timing history.
//!
//! The agent owns one monitor and appends a sample when each tick
//! completes. The history is append-only; in-scope workloads never need
//! pruning. Process-wide singletons are deliberately avoided: the
//! monitor is a service threaded through the agent constructor.

use reflex_types::Tick;
use std::time::Duration;

/// Timing of one completed tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSample {
    /// The tick this sample describes.
    pub tick: Tick,
    /// Wall time spent in the synchronization phase.
    pub synchronization: Duration,
    /// Wall time spent granting deliberation slices.
    pub deliberation: Duration,
}

/// Append-only history of tick timings.
#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    samples: Vec<TickSample>,
}

impl PerformanceMonitor {
    /// Creates an empty monitor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one completed tick.
    pub fn record(&mut self, sample: TickSample) {
        self.samples.push(sample);
    }

    /// Full history, oldest first.
    #[must_use]
    pub fn history(&self) -> &[TickSample] {
        &self.samples
    }

    /// Most recent sample, if any tick completed.
    #[must_use]
    pub fn last(&self) -> Option<&TickSample> {
        self.samples.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_preserves_order() {
        let mut monitor = PerformanceMonitor::new();
        for tick in 0..3 {
            monitor.record(TickSample {
                tick,
                synchronization: Duration::from_millis(tick),
                deliberation: Duration::ZERO,
            });
        }
        let ticks: Vec<_> = monitor.history().iter().map(|s| s.tick).collect();
        assert_eq!(ticks, vec![0, 1, 2]);
        assert_eq!(monitor.last().map(|s| s.tick), Some(2));
    }

    #[test]
    fn empty_monitor_has_no_last() {
        assert!(PerformanceMonitor::new().last().is_none());
    }
}
