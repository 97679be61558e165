//! Reactor that mirrors an upstream timeline and accepts goals.
//!
//! The relay subscribes to one external timeline and republishes the
//! latest state it saw onto its own internal timeline each tick. Goals
//! submitted on the internal timeline queue for deliberation: each
//! `resume` slice examines one queued goal and commits it when its
//! window is still achievable within the relay's latency and
//! look-ahead. Recalled goals disappear from both the queue and the
//! committed set.

use reflex_domain::Domain;
use reflex_reactor::{
    GoalId, GoalRequest, GoalStore, Observation, ObservationByValue, Reactor, ReactorError,
    TickContext, TimelineModes,
};
use reflex_types::{ReactorName, Tick, TimelineName};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Mirror of one upstream timeline.
#[derive(Debug)]
pub struct RelayReactor {
    name: ReactorName,
    source: TimelineName,
    timeline: TimelineName,
    latency: Tick,
    look_ahead: Tick,
    latest: Option<ObservationByValue>,
    goals: GoalStore,
    backlog: VecDeque<GoalId>,
    committed: Vec<GoalId>,
}

impl RelayReactor {
    /// Creates a relay from `source` onto `timeline`.
    #[must_use]
    pub fn new(
        name: ReactorName,
        source: TimelineName,
        timeline: TimelineName,
        latency: Tick,
        look_ahead: Tick,
    ) -> Self {
        Self {
            name,
            source,
            timeline,
            latency,
            look_ahead,
            latest: None,
            goals: GoalStore::new(),
            backlog: VecDeque::new(),
            committed: Vec::new(),
        }
    }

    /// Goals committed into the relay's plan, in commitment order.
    #[must_use]
    pub fn committed(&self) -> &[GoalId] {
        &self.committed
    }
}

impl Reactor for RelayReactor {
    fn name(&self) -> &ReactorName {
        &self.name
    }

    fn timeline_modes(&self) -> TimelineModes {
        TimelineModes::new(vec![self.source.clone()], vec![self.timeline.clone()])
    }

    fn latency(&self) -> Tick {
        self.latency
    }

    fn look_ahead(&self) -> Tick {
        self.look_ahead
    }

    fn synchronize(&mut self, ctx: &dyn TickContext) -> Result<(), ReactorError> {
        let mut mirrored = match &self.latest {
            Some(seen) => {
                let mut obs =
                    ObservationByValue::new(self.timeline.clone(), seen.predicate().to_string());
                for index in 0..seen.parameter_count() {
                    if let Some(p) = seen.parameter(index) {
                        obs.push(p.name.into_owned(), p.domain.into_owned());
                    }
                }
                obs
            }
            None => ObservationByValue::new(self.timeline.clone(), "Undefined"),
        };
        mirrored.push("source_tick", Domain::integer(i64::try_from(ctx.tick()).unwrap_or(i64::MAX)));

        if let Err(err) = ctx.post(&mirrored) {
            warn!(reactor = %self.name, error = %err, "relay publication dropped");
        }
        Ok(())
    }

    fn has_work(&self) -> bool {
        !self.backlog.is_empty()
    }

    fn resume(&mut self, ctx: &dyn TickContext) -> Result<(), ReactorError> {
        let Some(id) = self.backlog.pop_front() else {
            return Ok(());
        };
        // The goal may have been recalled while queued.
        let Some(goal) = self.goals.get(&id) else {
            debug!(reactor = %self.name, goal = %id, "queued goal vanished before planning");
            return Ok(());
        };

        let tick = ctx.tick();
        let earliest_start = tick.saturating_add(self.latency);
        let horizon = tick.saturating_add(self.look_ahead);
        let window = goal.window();
        if window.latest >= earliest_start && window.earliest <= horizon {
            debug!(reactor = %self.name, goal = %id, "goal committed");
            self.committed.push(id);
        } else {
            debug!(reactor = %self.name, goal = %id, "goal window unachievable, dropped");
            self.goals.recall(&id);
        }
        Ok(())
    }

    fn notify(&mut self, observation: &dyn Observation) {
        if observation.timeline() == &self.source {
            self.latest = Some(observation.to_value());
        }
    }

    fn handle_request(&mut self, goal: GoalRequest) -> Result<(), ReactorError> {
        if goal.timeline() != &self.timeline {
            return Err(ReactorError::GoalRejected(format!(
                "timeline '{}' is not served here",
                goal.timeline()
            )));
        }
        let id = goal.id();
        self.goals.accept(goal);
        self.backlog.push_back(id);
        Ok(())
    }

    fn handle_recall(&mut self, goal: &GoalId) {
        self.goals.recall(goal);
        self.backlog.retain(|queued| queued != goal);
        self.committed.retain(|kept| kept != goal);
    }
}
