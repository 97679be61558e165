//! Reactor that owns nothing and does nothing.
//!
//! Useful as a scheduling placeholder and in tests that need a reactor
//! with no timeline footprint.

use reflex_reactor::{Reactor, ReactorError, TickContext, TimelineModes};
use reflex_types::{ReactorName, Tick};

/// Minimal reactor satisfying the contract.
#[derive(Debug)]
pub struct NoopReactor {
    name: ReactorName,
    latency: Tick,
    look_ahead: Tick,
}

impl NoopReactor {
    /// Creates a no-op reactor.
    #[must_use]
    pub fn new(name: ReactorName, latency: Tick, look_ahead: Tick) -> Self {
        Self {
            name,
            latency,
            look_ahead,
        }
    }
}

impl Reactor for NoopReactor {
    fn name(&self) -> &ReactorName {
        &self.name
    }

    fn timeline_modes(&self) -> TimelineModes {
        TimelineModes::default()
    }

    fn latency(&self) -> Tick {
        self.latency
    }

    fn look_ahead(&self) -> Tick {
        self.look_ahead
    }

    fn synchronize(&mut self, _ctx: &dyn TickContext) -> Result<(), ReactorError> {
        Ok(())
    }
}
