//! CPU and wall time accounting.
//!
//! Two consumers share these primitives: the clock attributes process
//! consumption to ticks, and the agent attributes it to individual
//! reactor synchronize/resume calls. CPU time comes from
//! `getrusage(RUSAGE_SELF)`; wall time from monotonic [`Instant`]s.

use nix::sys::resource::{getrusage, UsageWho};
use nix::sys::time::TimeVal;
use std::time::{Duration, Instant};
use tracing::debug;

/// Point-in-time reading of process CPU use plus a wall timestamp.
#[derive(Debug, Clone, Copy)]
pub struct UsageSnapshot {
    user: Duration,
    system: Duration,
    wall: Instant,
}

impl UsageSnapshot {
    /// Reads the current process usage.
    ///
    /// A failing `getrusage` call (not observed on supported platforms)
    /// degrades to zero CPU readings rather than failing the caller.
    #[must_use]
    pub fn take() -> Self {
        let (user, system) = match getrusage(UsageWho::RUSAGE_SELF) {
            Ok(usage) => (
                timeval_to_duration(usage.user_time()),
                timeval_to_duration(usage.system_time()),
            ),
            Err(err) => {
                debug!(error = %err, "getrusage failed, reporting zero cpu time");
                (Duration::ZERO, Duration::ZERO)
            }
        };
        Self {
            user,
            system,
            wall: Instant::now(),
        }
    }

    /// Consumption between `earlier` and this snapshot.
    #[must_use]
    pub fn since(&self, earlier: &UsageSnapshot) -> UsageTotals {
        UsageTotals {
            user: self.user.saturating_sub(earlier.user),
            system: self.system.saturating_sub(earlier.system),
            wall: self.wall.duration_since(earlier.wall),
        }
    }
}

fn timeval_to_duration(tv: TimeVal) -> Duration {
    let secs = u64::try_from(tv.tv_sec()).unwrap_or(0);
    let micros = u32::try_from(tv.tv_usec()).unwrap_or(0);
    Duration::new(secs, micros.saturating_mul(1_000))
}

/// Accumulated CPU and wall time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageTotals {
    /// User-mode CPU time.
    pub user: Duration,
    /// Kernel-mode CPU time.
    pub system: Duration,
    /// Elapsed wall time.
    pub wall: Duration,
}

impl UsageTotals {
    /// Adds a delta into this accumulator.
    pub fn accrue(&mut self, delta: UsageTotals) {
        self.user += delta.user;
        self.system += delta.system;
        self.wall += delta.wall;
    }

    /// User plus system CPU time.
    #[must_use]
    pub fn cpu(&self) -> Duration {
        self.user + self.system
    }
}

/// Measures one bounded call, from [`start`](Self::start) to
/// [`stop`](Self::stop).
pub struct UsageLap {
    start: UsageSnapshot,
}

impl UsageLap {
    /// Begins a measurement.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: UsageSnapshot::take(),
        }
    }

    /// Ends the measurement and returns what the call consumed.
    #[must_use]
    pub fn stop(self) -> UsageTotals {
        UsageSnapshot::take().since(&self.start)
    }
}

/// Per-reactor instrumentation, reset at every tick start.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReactorStats {
    /// Synchronize calls this tick.
    pub sync_count: u32,
    /// CPU/wall consumed by synchronize this tick.
    pub sync_usage: UsageTotals,
    /// Resume slices granted this tick.
    pub search_count: u32,
    /// CPU/wall consumed by resume this tick.
    pub search_usage: UsageTotals,
}

impl ReactorStats {
    /// Clears all counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Process accounting held by a clock.
///
/// Advanced once per externally visible tick increase so the
/// orchestrator can attribute process consumption per tick.
#[derive(Debug, Clone, Copy)]
pub struct ProcessAccounting {
    origin: UsageSnapshot,
    last: UsageSnapshot,
    total: UsageTotals,
    last_tick: UsageTotals,
}

impl ProcessAccounting {
    /// Starts accounting from the current instant.
    #[must_use]
    pub fn start() -> Self {
        let now = UsageSnapshot::take();
        Self {
            origin: now,
            last: now,
            total: UsageTotals::default(),
            last_tick: UsageTotals::default(),
        }
    }

    /// Records a tick boundary.
    pub fn advance(&mut self) {
        let now = UsageSnapshot::take();
        self.last_tick = now.since(&self.last);
        self.total = now.since(&self.origin);
        self.last = now;
    }

    /// Consumption since accounting started.
    #[must_use]
    pub fn total(&self) -> UsageTotals {
        self.total
    }

    /// Consumption during the last completed tick.
    #[must_use]
    pub fn last_tick(&self) -> UsageTotals {
        self.last_tick
    }
}
