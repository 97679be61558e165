//! Reactor that publishes the current tick on its own timeline.
//!
//! The simplest possible producer: every synchronize emits
//! `Tick(value = <current tick>)` on the owned timeline. Downstream
//! reactors use it as a heartbeat.

use reflex_domain::Domain;
use reflex_reactor::{ObservationByValue, Reactor, ReactorError, TickContext, TimelineModes};
use reflex_types::{ReactorName, Tick, TimelineName};
use tracing::warn;

/// Heartbeat producer.
#[derive(Debug)]
pub struct PulseReactor {
    name: ReactorName,
    timeline: TimelineName,
    latency: Tick,
    look_ahead: Tick,
}

impl PulseReactor {
    /// Creates a pulse reactor owning `timeline`.
    #[must_use]
    pub fn new(name: ReactorName, timeline: TimelineName, latency: Tick, look_ahead: Tick) -> Self {
        Self {
            name,
            timeline,
            latency,
            look_ahead,
        }
    }
}

impl Reactor for PulseReactor {
    fn name(&self) -> &ReactorName {
        &self.name
    }

    fn timeline_modes(&self) -> TimelineModes {
        TimelineModes::new(Vec::new(), vec![self.timeline.clone()])
    }

    fn latency(&self) -> Tick {
        self.latency
    }

    fn look_ahead(&self) -> Tick {
        self.look_ahead
    }

    fn synchronize(&mut self, ctx: &dyn TickContext) -> Result<(), ReactorError> {
        let tick = ctx.tick();
        let observation = ObservationByValue::new(self.timeline.clone(), "Tick")
            .with("value", Domain::integer(i64::try_from(tick).unwrap_or(i64::MAX)));
        if let Err(err) = ctx.post(&observation) {
            // A dropped heartbeat is a bus anomaly, not a sync failure.
            warn!(reactor = %self.name, error = %err, "pulse publication dropped");
        }
        Ok(())
    }
}
