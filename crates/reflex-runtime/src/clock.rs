//! Tick sources.
//!
//! A clock produces the monotonically advancing tick index and paces the
//! main loop. Two variants share one interface:
//!
//! - [`StepClock`]: deterministic; the tick advances every
//!   `steps_per_tick` polls, giving tests and replays a fixed number of
//!   deliberation polls per tick regardless of wall time
//! - [`RealTimeClock`]: wall-clock driven; `start()` latches the epoch
//!   and the tick is `floor(elapsed / seconds_per_tick)`
//!
//! Both carry a [`ProcessAccounting`] block that advances on every
//! externally visible tick increase, so per-tick process consumption can
//! be attributed by the orchestrator.

use crate::stats::{ProcessAccounting, UsageTotals};
use reflex_types::Tick;
use std::cell::{Cell, RefCell};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::warn;

/// A source of ticks.
///
/// Methods take `&self`: the orchestrator polls the clock many times per
/// tick, interleaved with reactor slices, and implementations keep their
/// own interior state.
pub trait Clock: Send + std::fmt::Debug {
    /// Starts the clock counting. Polling before `start` reports tick 0.
    fn start(&self);

    /// Returns the current tick. Never decreases.
    fn next_tick(&self) -> Tick;

    /// Tick duration in seconds. Constant per clock instance.
    fn seconds_per_tick(&self) -> f64 {
        1.0
    }

    /// How long the main loop should sleep when idle.
    fn sleep_delay(&self) -> Duration;

    /// Process consumption since the clock started.
    fn total_stat(&self) -> UsageTotals;

    /// Process consumption during the last completed tick.
    fn last_tick_stat(&self) -> UsageTotals;
}

/// Deterministic clock stepping on the polling thread.
///
/// With `steps_per_tick = k`, the n-th poll (0-based) returns `n / k`:
///
/// ```
/// use reflex_runtime::clock::{Clock, StepClock};
///
/// let clock = StepClock::new(0.0, 2);
/// clock.start();
/// let ticks: Vec<_> = (0..6).map(|_| clock.next_tick()).collect();
/// assert_eq!(ticks, vec![0, 0, 1, 1, 2, 2]);
/// ```
#[derive(Debug)]
pub struct StepClock {
    sleep: Duration,
    steps_per_tick: u64,
    calls: Cell<u64>,
    tick: Cell<Tick>,
    accounting: RefCell<ProcessAccounting>,
}

impl StepClock {
    /// Creates a step clock.
    ///
    /// `sleep_seconds` is the idle sleep handed to the main loop.
    /// `steps_per_tick` below 1 is clamped to 1.
    #[must_use]
    pub fn new(sleep_seconds: f64, steps_per_tick: u64) -> Self {
        Self {
            sleep: Duration::from_secs_f64(sleep_seconds.max(0.0)),
            steps_per_tick: steps_per_tick.max(1),
            calls: Cell::new(0),
            tick: Cell::new(0),
            accounting: RefCell::new(ProcessAccounting::start()),
        }
    }
}

impl Clock for StepClock {
    fn start(&self) {
        *self.accounting.borrow_mut() = ProcessAccounting::start();
    }

    fn next_tick(&self) -> Tick {
        let n = self.calls.get();
        self.calls.set(n + 1);
        let tick = n / self.steps_per_tick;
        if tick > self.tick.get() {
            self.accounting.borrow_mut().advance();
            self.tick.set(tick);
        }
        tick
    }

    fn sleep_delay(&self) -> Duration {
        self.sleep
    }

    fn total_stat(&self) -> UsageTotals {
        self.accounting.borrow().total()
    }

    fn last_tick_stat(&self) -> UsageTotals {
        self.accounting.borrow().last_tick()
    }
}

#[derive(Debug)]
struct RtState {
    epoch: Option<Instant>,
    tick: Tick,
    accounting: ProcessAccounting,
}

/// Wall-clock driven tick source.
///
/// The tick/boundary state sits behind a lock so the orchestrator can
/// poll while a separate timer context, if one exists, adjusts the
/// target boundary.
#[derive(Debug)]
pub struct RealTimeClock {
    seconds_per_tick: f64,
    state: Mutex<RtState>,
}

impl RealTimeClock {
    /// Creates a real-time clock. Non-positive tick durations are
    /// clamped to one nanosecond.
    #[must_use]
    pub fn new(seconds_per_tick: f64) -> Self {
        let seconds_per_tick = if seconds_per_tick > 0.0 {
            seconds_per_tick
        } else {
            warn!(seconds_per_tick, "non-positive tick duration, clamping");
            1e-9
        };
        Self {
            seconds_per_tick,
            state: Mutex::new(RtState {
                epoch: None,
                tick: 0,
                accounting: ProcessAccounting::start(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RtState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for RealTimeClock {
    /// Latches the epoch. Subsequent calls are no-ops.
    fn start(&self) {
        let mut state = self.lock();
        if state.epoch.is_none() {
            state.epoch = Some(Instant::now());
            state.accounting = ProcessAccounting::start();
        }
    }

    fn next_tick(&self) -> Tick {
        let mut state = self.lock();
        let Some(epoch) = state.epoch else {
            return 0;
        };
        let tick = (epoch.elapsed().as_secs_f64() / self.seconds_per_tick) as Tick;
        if tick > state.tick {
            state.accounting.advance();
            state.tick = tick;
        }
        state.tick
    }

    fn seconds_per_tick(&self) -> f64 {
        self.seconds_per_tick
    }

    /// Time remaining to the next tick boundary, clamped to zero.
    fn sleep_delay(&self) -> Duration {
        let state = self.lock();
        let Some(epoch) = state.epoch else {
            return Duration::from_secs_f64(self.seconds_per_tick);
        };
        let boundary = (state.tick + 1) as f64 * self.seconds_per_tick;
        let remaining = boundary - epoch.elapsed().as_secs_f64();
        Duration::from_secs_f64(remaining.max(0.0))
    }

    fn total_stat(&self) -> UsageTotals {
        self.lock().accounting.total()
    }

    fn last_tick_stat(&self) -> UsageTotals {
        self.lock().accounting.last_tick()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_clock_two_steps_per_tick() {
        let clock = StepClock::new(0.0, 2);
        clock.start();
        let ticks: Vec<_> = (0..6).map(|_| clock.next_tick()).collect();
        assert_eq!(ticks, vec![0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn step_clock_three_steps_per_tick() {
        let clock = StepClock::new(0.0, 3);
        clock.start();
        let ticks: Vec<_> = (0..12).map(|_| clock.next_tick()).collect();
        assert_eq!(ticks, vec![0, 0, 0, 1, 1, 1, 2, 2, 2, 3, 3, 3]);
    }

    #[test]
    fn step_clock_clamps_zero_steps() {
        let clock = StepClock::new(0.0, 0);
        clock.start();
        assert_eq!(clock.next_tick(), 0);
        assert_eq!(clock.next_tick(), 1);
    }

    #[test]
    fn step_clock_sleep_delay_is_configured_value() {
        let clock = StepClock::new(0.25, 1);
        assert_eq!(clock.sleep_delay(), Duration::from_millis(250));
    }

    #[test]
    fn real_time_clock_idles_before_start() {
        let clock = RealTimeClock::new(0.1);
        assert_eq!(clock.next_tick(), 0);
        assert_eq!(clock.sleep_delay(), Duration::from_millis(100));
    }

    #[test]
    fn real_time_clock_crosses_boundaries() {
        let clock = RealTimeClock::new(0.05);
        clock.start();
        assert_eq!(clock.next_tick(), 0);

        std::thread::sleep(Duration::from_millis(75));
        let tick = clock.next_tick();
        // One boundary crossed for sure; allow scheduler jitter upward.
        assert!((1..=3).contains(&tick), "tick was {tick}");
    }

    #[test]
    fn real_time_sleep_delay_stays_within_tick() {
        let clock = RealTimeClock::new(0.05);
        clock.start();
        let _ = clock.next_tick();
        let delay = clock.sleep_delay();
        assert!(delay <= Duration::from_millis(50));
    }

    #[test]
    fn real_time_tick_is_monotone() {
        let clock = RealTimeClock::new(0.01);
        clock.start();
        let mut last = 0;
        for _ in 0..50 {
            let tick = clock.next_tick();
            assert!(tick >= last);
            last = tick;
        }
    }

    #[test]
    fn accounting_updates_on_tick_increase() {
        let clock = StepClock::new(0.0, 1);
        clock.start();
        let _ = clock.next_tick(); // 0
        std::thread::sleep(Duration::from_millis(2));
        let _ = clock.next_tick(); // 1, advances accounting
        assert!(clock.last_tick_stat().wall >= Duration::from_millis(2));
    }
}
