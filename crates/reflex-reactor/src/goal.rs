//! Goal tokens: desired future states handed to a timeline's owner.
//!
//! A subscriber that wants a timeline to reach some state submits a
//! [`GoalRequest`] to the owning reactor. The owner either accepts it
//! into its plan or rejects it. The requester keeps the [`GoalId`] and
//! can retract the goal later with a recall.
//!
//! [`GoalStore`] is the bookkeeping helper owners use: accepted goals
//! live in a generation-indexed arena so a recalled goal can never be
//! resurrected through a stale reference.

use reflex_domain::Domain;
use reflex_types::{Arena, Handle, Tick, TimelineName};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Identity of a goal, shared by requester and owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GoalId(Uuid);

#[allow(clippy::new_without_default)] // ids must be minted explicitly
impl GoalId {
    /// Mints a fresh goal identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "goal:{}", self.0)
    }
}

/// Tick window in which a goal's start must fall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickWindow {
    /// Earliest admissible start tick.
    pub earliest: Tick,
    /// Latest admissible start tick.
    pub latest: Tick,
}

impl TickWindow {
    /// Window spanning `[earliest, latest]`.
    #[must_use]
    pub fn new(earliest: Tick, latest: Tick) -> Self {
        Self { earliest, latest }
    }

    /// Window pinned to a single tick.
    #[must_use]
    pub fn at(tick: Tick) -> Self {
        Self::new(tick, tick)
    }

    /// Returns `true` when `tick` falls inside the window.
    #[must_use]
    pub fn contains(&self, tick: Tick) -> bool {
        self.earliest <= tick && tick <= self.latest
    }
}

/// A desired future token on somebody else's timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalRequest {
    id: GoalId,
    timeline: TimelineName,
    predicate: String,
    window: TickWindow,
    parameters: Vec<(String, Domain)>,
}

impl GoalRequest {
    /// Creates a goal with a fresh identity.
    #[must_use]
    pub fn new(
        timeline: TimelineName,
        predicate: impl Into<String>,
        window: TickWindow,
    ) -> Self {
        Self {
            id: GoalId::new(),
            timeline,
            predicate: predicate.into(),
            window,
            parameters: Vec::new(),
        }
    }

    /// Builder-style parameter binding.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, domain: Domain) -> Self {
        self.parameters.push((name.into(), domain));
        self
    }

    /// The goal's identity.
    #[must_use]
    pub fn id(&self) -> GoalId {
        self.id
    }

    /// Target timeline.
    #[must_use]
    pub fn timeline(&self) -> &TimelineName {
        &self.timeline
    }

    /// Desired predicate.
    #[must_use]
    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    /// Admissible start window.
    #[must_use]
    pub fn window(&self) -> TickWindow {
        self.window
    }

    /// Bound parameters.
    #[must_use]
    pub fn parameters(&self) -> &[(String, Domain)] {
        &self.parameters
    }
}

/// Accepted-goal bookkeeping for a timeline owner.
///
/// # Example
///
/// ```
/// use reflex_reactor::{GoalRequest, GoalStore, TickWindow};
///
/// let mut store = GoalStore::new();
/// let goal = GoalRequest::new("nav".into(), "At", TickWindow::new(3, 9));
/// let id = goal.id();
///
/// store.accept(goal);
/// assert_eq!(store.len(), 1);
///
/// assert!(store.recall(&id).is_some());
/// assert!(store.recall(&id).is_none());
/// ```
#[derive(Debug, Default)]
pub struct GoalStore {
    goals: Arena<GoalRequest>,
    by_id: HashMap<GoalId, Handle>,
}

impl GoalStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live goals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.goals.len()
    }

    /// Returns `true` when no goals are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    /// Accepts a goal. A goal resubmitted under an identity already held
    /// replaces the previous token.
    pub fn accept(&mut self, goal: GoalRequest) {
        let id = goal.id();
        if let Some(stale) = self.by_id.remove(&id) {
            self.goals.remove(stale);
        }
        let handle = self.goals.insert(goal);
        self.by_id.insert(id, handle);
    }

    /// Retracts a goal by identity, returning it when it was held.
    pub fn recall(&mut self, id: &GoalId) -> Option<GoalRequest> {
        let handle = self.by_id.remove(id)?;
        self.goals.remove(handle)
    }

    /// Looks a goal up by identity.
    #[must_use]
    pub fn get(&self, id: &GoalId) -> Option<&GoalRequest> {
        self.by_id.get(id).and_then(|&h| self.goals.get(h))
    }

    /// Iterates live goals in acceptance order.
    pub fn iter(&self) -> impl Iterator<Item = &GoalRequest> {
        self.goals.iter().map(|(_, goal)| goal)
    }

    /// Live goals whose window still admits a start at or after `tick`.
    pub fn achievable_from(&self, tick: Tick) -> impl Iterator<Item = &GoalRequest> {
        self.iter().filter(move |g| g.window().latest >= tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal(predicate: &str, window: TickWindow) -> GoalRequest {
        GoalRequest::new("nav".into(), predicate, window)
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(GoalId::new(), GoalId::new());
    }

    #[test]
    fn window_containment() {
        let w = TickWindow::new(3, 9);
        assert!(!w.contains(2));
        assert!(w.contains(3));
        assert!(w.contains(9));
        assert!(!w.contains(10));
        assert!(TickWindow::at(5).contains(5));
    }

    #[test]
    fn accept_then_recall() {
        let mut store = GoalStore::new();
        let g = goal("At", TickWindow::new(3, 9));
        let id = g.id();
        store.accept(g.clone());

        assert_eq!(store.get(&id), Some(&g));
        assert_eq!(store.recall(&id), Some(g));
        assert!(store.get(&id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn recall_unknown_goal_is_none() {
        let mut store = GoalStore::new();
        assert!(store.recall(&GoalId::new()).is_none());
    }

    #[test]
    fn resubmission_replaces_previous_token() {
        let mut store = GoalStore::new();
        let first = goal("At", TickWindow::at(4));
        let id = first.id();
        store.accept(first);

        let mut replacement = goal("At", TickWindow::at(6));
        replacement.id = id;
        store.accept(replacement);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).map(|g| g.window()), Some(TickWindow::at(6)));
    }

    #[test]
    fn achievable_filter_drops_expired_windows() {
        let mut store = GoalStore::new();
        store.accept(goal("A", TickWindow::new(0, 4)));
        store.accept(goal("B", TickWindow::new(2, 10)));

        let live: Vec<_> = store.achievable_from(5).map(GoalRequest::predicate).collect();
        assert_eq!(live, vec!["B"]);
    }
}
