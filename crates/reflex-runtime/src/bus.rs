//! Observation and goal bus.
//!
//! The bus is direct per-timeline dispatch, not a queue. While the agent
//! drives a reactor it lends it a [`DispatchContext`]; the context
//! resolves the target through the routing tables and calls the peer's
//! handler on the spot. Three rules hold:
//!
//! - An observation published during the synchronization phase reaches
//!   every subscriber before `post` returns, which is before any of
//!   those subscribers synchronize this tick (owners sort earlier).
//! - An observation published during the deliberation phase is
//!   snapshotted and buffered; the agent delivers it at the start of the
//!   next tick, before the synchronization phase.
//! - Goal requests and recalls always dispatch synchronously; the
//!   owner's handler runs before control returns to the requester.
//!
//! Routing failures (unknown timeline, duplicate publication, non-owner
//! posts) are logged and the message discarded. External tools emit
//! stale names; that must never take the agent down.

use crate::stats::ReactorStats;
use crate::transcript::Transcript;
use reflex_reactor::{
    DispatchError, GoalId, GoalRequest, Observation, ObservationByValue, Reactor, TickContext,
};
use reflex_types::{Arena, Handle, ReactorName, Tick, TimelineName};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// One scheduled reactor plus its runtime bookkeeping.
///
/// The reactor itself sits in a `RefCell` so the bus can reach a peer
/// (notify, goal handlers) while the agent holds the currently driven
/// reactor borrowed. Distinct reactors never alias; a route that leads
/// back to the borrowed sender is rejected as [`DispatchError::SelfRouting`].
pub(crate) struct ReactorCell {
    pub(crate) name: ReactorName,
    pub(crate) reactor: RefCell<Box<dyn Reactor>>,
    pub(crate) log: bool,
    pub(crate) priority: u32,
    pub(crate) consecutive_failures: u32,
    pub(crate) stats: ReactorStats,
}

/// Timeline routing tables, built once at init.
#[derive(Default)]
pub(crate) struct Router {
    owners: HashMap<TimelineName, Handle>,
    subscribers: HashMap<TimelineName, Vec<Handle>>,
}

impl Router {
    /// Records `handle` as owner, returning a previous owner on conflict.
    pub(crate) fn insert_owner(&mut self, timeline: TimelineName, handle: Handle) -> Option<Handle> {
        self.owners.insert(timeline, handle)
    }

    pub(crate) fn insert_subscriber(&mut self, timeline: TimelineName, handle: Handle) {
        self.subscribers.entry(timeline).or_default().push(handle);
    }

    pub(crate) fn owner(&self, timeline: &TimelineName) -> Option<Handle> {
        self.owners.get(timeline).copied()
    }

    pub(crate) fn subscribers(&self, timeline: &TimelineName) -> &[Handle] {
        self.subscribers
            .get(timeline)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Owned timelines with their owners, for building init contexts.
    pub(crate) fn owners(&self) -> impl Iterator<Item = (&TimelineName, Handle)> {
        self.owners.iter().map(|(tl, &h)| (tl, h))
    }
}

/// Which sub-phase of the tick the driven reactor is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Synchronization,
    Deliberation,
}

/// An observation held over for the next tick.
pub(crate) struct BufferedObservation {
    pub(crate) owner: Handle,
    pub(crate) observation: ObservationByValue,
}

/// The capability set lent to the reactor currently being driven.
pub(crate) struct DispatchContext<'a> {
    pub(crate) tick: Tick,
    pub(crate) phase: Phase,
    pub(crate) source: Handle,
    pub(crate) reactors: &'a Arena<ReactorCell>,
    pub(crate) router: &'a Router,
    pub(crate) published: &'a RefCell<HashSet<TimelineName>>,
    pub(crate) pending: &'a RefCell<Vec<BufferedObservation>>,
    pub(crate) transcript: Option<&'a Transcript>,
}

impl TickContext for DispatchContext<'_> {
    fn tick(&self) -> Tick {
        self.tick
    }

    fn post(&self, observation: &dyn Observation) -> Result<(), DispatchError> {
        let timeline = observation.timeline();
        let source_name = &self.reactors[self.source].name;

        let Some(owner) = self.router.owner(timeline) else {
            warn!(timeline = %timeline, reactor = %source_name, "observation on unknown timeline, dropped");
            return Err(DispatchError::UnknownTimeline(timeline.clone()));
        };
        if owner != self.source {
            warn!(timeline = %timeline, reactor = %source_name, "observation from non-owner, dropped");
            return Err(DispatchError::NotOwner {
                reactor: source_name.clone(),
                timeline: timeline.clone(),
            });
        }

        match self.phase {
            Phase::Synchronization => {
                if !self.published.borrow_mut().insert(timeline.clone()) {
                    warn!(timeline = %timeline, tick = self.tick, "second observation this tick, dropped");
                    return Err(DispatchError::AlreadyPublished(timeline.clone()));
                }
                if self.reactors[self.source].log {
                    if let Some(transcript) = self.transcript {
                        transcript.record(self.tick, observation);
                    }
                }
                deliver(self.reactors, self.router, self.source, observation);
                Ok(())
            }
            Phase::Deliberation => {
                // Subscribers may already have synchronized this tick,
                // so the fact is held over and delivered at the start of
                // the next one.
                debug!(timeline = %timeline, tick = self.tick, "mid-tick observation buffered");
                self.pending.borrow_mut().push(BufferedObservation {
                    owner: self.source,
                    observation: observation.to_value(),
                });
                Ok(())
            }
        }
    }

    fn request(&self, goal: GoalRequest) -> Result<(), DispatchError> {
        let timeline = goal.timeline().clone();
        let requester = &self.reactors[self.source].name;

        let Some(owner) = self.router.owner(&timeline) else {
            warn!(timeline = %timeline, reactor = %requester, "goal request on unknown timeline, dropped");
            return Err(DispatchError::UnknownTimeline(timeline));
        };
        if owner == self.source {
            warn!(timeline = %timeline, reactor = %requester, "goal request routed to its sender, dropped");
            return Err(DispatchError::SelfRouting(timeline));
        }

        let owner_cell = &self.reactors[owner];
        info!(
            tick = self.tick,
            goal = %goal.id(),
            timeline = %timeline,
            from = %requester,
            to = %owner_cell.name,
            "goal request"
        );
        let mut owner_reactor = owner_cell.reactor.try_borrow_mut().map_err(|_| {
            warn!(timeline = %timeline, "goal request target busy, dropped");
            DispatchError::SelfRouting(timeline.clone())
        })?;
        owner_reactor
            .handle_request(goal)
            .map_err(|e| DispatchError::Rejected(e.to_string()))
    }

    fn recall(&self, timeline: &TimelineName, goal: GoalId) -> Result<(), DispatchError> {
        let requester = &self.reactors[self.source].name;

        let Some(owner) = self.router.owner(timeline) else {
            warn!(timeline = %timeline, reactor = %requester, "goal recall on unknown timeline, dropped");
            return Err(DispatchError::UnknownTimeline(timeline.clone()));
        };
        if owner == self.source {
            warn!(timeline = %timeline, reactor = %requester, "goal recall routed to its sender, dropped");
            return Err(DispatchError::SelfRouting(timeline.clone()));
        }

        let owner_cell = &self.reactors[owner];
        info!(
            tick = self.tick,
            goal = %goal,
            timeline = %timeline,
            from = %requester,
            to = %owner_cell.name,
            "goal recall"
        );
        let mut owner_reactor = owner_cell.reactor.try_borrow_mut().map_err(|_| {
            warn!(timeline = %timeline, "goal recall target busy, dropped");
            DispatchError::SelfRouting(timeline.clone())
        })?;
        owner_reactor.handle_recall(&goal);
        Ok(())
    }
}

/// Notifies every subscriber of the observation's timeline.
///
/// The sender stays borrowed by the agent while this runs; self-routing
/// is prevented structurally because a reactor never subscribes to its
/// own internals (checked at init).
pub(crate) fn deliver(
    reactors: &Arena<ReactorCell>,
    router: &Router,
    source: Handle,
    observation: &dyn Observation,
) {
    for &subscriber in router.subscribers(observation.timeline()) {
        if subscriber == source {
            continue;
        }
        match reactors[subscriber].reactor.try_borrow_mut() {
            Ok(mut reactor) => reactor.notify(observation),
            Err(_) => {
                warn!(
                    timeline = %observation.timeline(),
                    "subscriber busy, observation delivery dropped"
                );
            }
        }
    }
}
