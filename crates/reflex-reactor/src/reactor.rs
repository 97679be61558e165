//! The [`Reactor`] trait and the contexts the agent hands it.

use crate::error::{DispatchError, ReactorError};
use crate::goal::{GoalId, GoalRequest};
use crate::observation::Observation;
use reflex_types::{ReactorName, Tick, TimelineName};
use std::collections::HashMap;

/// The timeline sets a reactor declares at construction.
///
/// Stable for the reactor's lifetime; the agent queries them once during
/// init to build the routing tables and the dependency order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineModes {
    /// Timelines owned elsewhere that this reactor observes.
    pub externals: Vec<TimelineName>,
    /// Timelines this reactor owns and publishes.
    pub internals: Vec<TimelineName>,
}

impl TimelineModes {
    /// Convenience constructor from name lists.
    #[must_use]
    pub fn new(
        externals: impl IntoIterator<Item = TimelineName>,
        internals: impl IntoIterator<Item = TimelineName>,
    ) -> Self {
        Self {
            externals: externals.into_iter().collect(),
            internals: internals.into_iter().collect(),
        }
    }
}

/// What a reactor learns about the owner of one of its externals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineOwner {
    /// Owning reactor.
    pub reactor: ReactorName,
    /// Owner's dispatch latency in ticks.
    pub latency: Tick,
    /// Owner's planning horizon in ticks.
    pub look_ahead: Tick,
}

/// Facts available to a reactor during `handle_init`.
pub struct InitContext {
    initial_tick: Tick,
    owners: HashMap<TimelineName, TimelineOwner>,
}

impl InitContext {
    /// Builds an init context. Called by the runtime.
    #[must_use]
    pub fn new(initial_tick: Tick, owners: HashMap<TimelineName, TimelineOwner>) -> Self {
        Self {
            initial_tick,
            owners,
        }
    }

    /// The tick at which execution will begin.
    #[must_use]
    pub fn initial_tick(&self) -> Tick {
        self.initial_tick
    }

    /// Owner descriptor for a timeline, when one exists.
    ///
    /// Reactors use the owner's latency and look-ahead to size the
    /// dispatch windows of the goals they will submit.
    #[must_use]
    pub fn owner_of(&self, timeline: &TimelineName) -> Option<&TimelineOwner> {
        self.owners.get(timeline)
    }
}

/// Capability set the agent lends a reactor while driving it.
///
/// One context is valid for exactly one `synchronize` or `resume` call.
/// All three operations dispatch synchronously on the caller's thread:
/// when `post` returns, every subscriber has been notified (or the
/// publication was buffered for the next tick, during deliberation);
/// when `request` returns, the owner's handler has run.
pub trait TickContext {
    /// The current tick.
    fn tick(&self) -> Tick;

    /// Publishes an observation on one of the caller's internal
    /// timelines.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the caller does not own the
    /// timeline, the timeline is unknown, or an observation for this
    /// (timeline, tick) was already published. The agent logs and
    /// discards such publications; they are never fatal.
    fn post(&self, observation: &dyn Observation) -> Result<(), DispatchError>;

    /// Submits a goal to the owner of the goal's timeline.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Rejected`] when the owner declines, or a
    /// routing error when the timeline has no owner.
    fn request(&self, goal: GoalRequest) -> Result<(), DispatchError>;

    /// Retracts a previously submitted goal from the owner of
    /// `timeline`.
    ///
    /// # Errors
    ///
    /// Returns a routing error when the timeline has no owner.
    fn recall(&self, timeline: &TimelineName, goal: GoalId) -> Result<(), DispatchError>;
}

/// A deliberative unit scheduled by the agent.
///
/// # Contract
///
/// | Operation | When | Obligation |
/// |-----------|------|------------|
/// | `timeline_modes` | init | stable answer for the whole lifetime |
/// | `handle_init` | once, before tick 0 | record owner info, set up engine |
/// | `handle_tick_start` | each tick, before sync | cheap bookkeeping only |
/// | `synchronize` | each tick, in dependency order | reconcile received observations, publish own state via [`TickContext::post`] |
/// | `has_work` | polled between slices | `true` while more deliberation is wanted this tick |
/// | `resume` | when `has_work` | one bounded slice of deliberation |
/// | `notify` | during an upstream sync | absorb an external observation |
/// | `handle_request` / `handle_recall` | any time | accept or retract goals on internal timelines |
///
/// The invariant `latency() <= look_ahead()` must hold for the reactor's
/// lifetime; the agent checks it at init and refuses to start otherwise.
pub trait Reactor: Send + std::fmt::Debug {
    /// Unique name within the agent.
    fn name(&self) -> &ReactorName;

    /// Declared external and internal timeline sets.
    fn timeline_modes(&self) -> TimelineModes;

    /// Ticks from goal receipt to earliest achievable start.
    fn latency(&self) -> Tick;

    /// Ticks past the current tick this reactor commits plans for.
    fn look_ahead(&self) -> Tick;

    /// One-time setup before the first tick.
    ///
    /// # Errors
    ///
    /// Returns [`ReactorError::InitFailed`]; fatal during agent init.
    fn handle_init(&mut self, initial_tick: Tick, ctx: &InitContext) -> Result<(), ReactorError> {
        let _ = (initial_tick, ctx);
        Ok(())
    }

    /// Start-of-tick hook, before any synchronization this tick.
    fn handle_tick_start(&mut self, tick: Tick) {
        let _ = tick;
    }

    /// Reconciles the reactor's model with the observations received so
    /// far for the current tick and publishes the state of each internal
    /// timeline.
    ///
    /// # Errors
    ///
    /// Returns [`ReactorError::SyncFailed`]; the agent logs it, marks
    /// the reactor inconsistent, and retries next tick.
    fn synchronize(&mut self, ctx: &dyn TickContext) -> Result<(), ReactorError>;

    /// Whether the reactor wants another deliberation slice this tick.
    fn has_work(&self) -> bool {
        false
    }

    /// One bounded deliberation slice.
    ///
    /// # Errors
    ///
    /// Returns [`ReactorError::ResumeFailed`]; handled like a
    /// synchronization failure.
    fn resume(&mut self, ctx: &dyn TickContext) -> Result<(), ReactorError> {
        let _ = ctx;
        Ok(())
    }

    /// Sink for observations on subscribed external timelines.
    fn notify(&mut self, observation: &dyn Observation) {
        let _ = observation;
    }

    /// Accepts a goal on one of this reactor's internal timelines.
    ///
    /// # Errors
    ///
    /// Returns [`ReactorError::GoalRejected`] to refuse; the rejection
    /// surfaces to the requester through the bus.
    fn handle_request(&mut self, goal: GoalRequest) -> Result<(), ReactorError> {
        let _ = goal;
        Ok(())
    }

    /// Retracts a previously accepted goal.
    fn handle_recall(&mut self, goal: &GoalId) {
        let _ = goal;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Minimal {
        name: ReactorName,
    }

    impl Reactor for Minimal {
        fn name(&self) -> &ReactorName {
            &self.name
        }

        fn timeline_modes(&self) -> TimelineModes {
            TimelineModes::default()
        }

        fn latency(&self) -> Tick {
            0
        }

        fn look_ahead(&self) -> Tick {
            0
        }

        fn synchronize(&mut self, _ctx: &dyn TickContext) -> Result<(), ReactorError> {
            Ok(())
        }
    }

    #[test]
    fn defaults_are_inert() {
        let mut r = Minimal {
            name: "min".into(),
        };
        let ctx = InitContext::new(0, HashMap::new());
        assert!(r.handle_init(0, &ctx).is_ok());
        r.handle_tick_start(0);
        assert!(!r.has_work());
        r.handle_recall(&GoalId::new());
        assert!(r
            .handle_request(GoalRequest::new(
                "t".into(),
                "P",
                crate::TickWindow::at(1)
            ))
            .is_ok());
    }

    #[test]
    fn init_context_owner_lookup() {
        let mut owners = HashMap::new();
        owners.insert(
            TimelineName::new("clock"),
            TimelineOwner {
                reactor: "ticker".into(),
                latency: 1,
                look_ahead: 10,
            },
        );
        let ctx = InitContext::new(3, owners);

        assert_eq!(ctx.initial_tick(), 3);
        let owner = ctx.owner_of(&"clock".into()).expect("known timeline");
        assert_eq!(owner.reactor.as_str(), "ticker");
        assert!(ctx.owner_of(&"other".into()).is_none());
    }

    #[test]
    fn modes_constructor_collects() {
        let modes = TimelineModes::new(
            [TimelineName::new("a")],
            [TimelineName::new("b"), TimelineName::new("c")],
        );
        assert_eq!(modes.externals.len(), 1);
        assert_eq!(modes.internals.len(), 2);
    }
}
