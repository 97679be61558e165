#![allow(dead_code)]
//! Shared harness for agent loop tests.
//!
//! [`Probe`] is a scriptable reactor that records everything that
//! happens to it into a shared [`Journal`]. Tests assert on the order
//! of journal entries, which is exactly the order the agent drove the
//! reactors in.

use reflex_domain::{Domain, Value};
use reflex_reactor::{
    GoalId, GoalRequest, GoalStore, Observation, ObservationByValue, Reactor, ReactorError,
    TickContext, TickWindow, TimelineModes,
};
use reflex_runtime::{AgentConfig, ClockConfig, FactoryError, ReactorConfig, ReactorFactory};
use reflex_types::{ReactorName, Tick, TimelineName};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Shared, ordered record of probe events.
#[derive(Clone, Debug, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self, entry: impl Into<String>) {
        self.0.lock().expect("journal lock").push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().expect("journal lock").clone()
    }

    /// Index of the first exact match.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }

    pub fn count_of(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| *e == entry).count()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.position(entry).is_some()
    }
}

/// Scriptable reactor recording into a [`Journal`].
#[derive(Debug)]
pub struct Probe {
    name: ReactorName,
    externals: Vec<TimelineName>,
    internals: Vec<TimelineName>,
    latency: Tick,
    look_ahead: Tick,
    journal: Journal,
    sync_publish: Option<TimelineName>,
    fail_sync: bool,
    request_at: Option<(Tick, TimelineName)>,
    recall_at: Option<Tick>,
    sent_goal: Arc<Mutex<Option<(TimelineName, GoalId)>>>,
    resume_publish: Option<(Tick, TimelineName)>,
    resume_armed: bool,
    goals: GoalStore,
}

impl Probe {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: ReactorName::new(name),
            externals: Vec::new(),
            internals: Vec::new(),
            latency: 0,
            look_ahead: 100,
            journal: journal.clone(),
            sync_publish: None,
            fail_sync: false,
            request_at: None,
            recall_at: None,
            sent_goal: Arc::new(Mutex::new(None)),
            resume_publish: None,
            resume_armed: false,
            goals: GoalStore::new(),
        }
    }

    /// Declares an owned timeline.
    pub fn owns(mut self, timeline: &str) -> Self {
        self.internals.push(TimelineName::new(timeline));
        self
    }

    /// Declares a subscription.
    pub fn observes(mut self, timeline: &str) -> Self {
        self.externals.push(TimelineName::new(timeline));
        self
    }

    /// Publish `Status(value = tick)` on `timeline` every synchronize.
    pub fn publishes(mut self, timeline: &str) -> Self {
        self.sync_publish = Some(TimelineName::new(timeline));
        self
    }

    /// Every synchronize fails.
    pub fn failing_sync(mut self) -> Self {
        self.fail_sync = true;
        self
    }

    /// Submit a goal on `target` during synchronize at `tick`.
    pub fn requests(mut self, target: &str, tick: Tick) -> Self {
        self.request_at = Some((tick, TimelineName::new(target)));
        self
    }

    /// Recall the submitted goal during synchronize at `tick`.
    pub fn recalls_at(mut self, tick: Tick) -> Self {
        self.recall_at = Some(tick);
        self
    }

    /// Ask for one resume slice at `tick` and publish `Burst` on
    /// `timeline` from inside it (mid-tick publication).
    pub fn bursts_at(mut self, tick: Tick, timeline: &str) -> Self {
        self.resume_publish = Some((tick, TimelineName::new(timeline)));
        self
    }
}

impl Reactor for Probe {
    fn name(&self) -> &ReactorName {
        &self.name
    }

    fn timeline_modes(&self) -> TimelineModes {
        TimelineModes::new(self.externals.clone(), self.internals.clone())
    }

    fn latency(&self) -> Tick {
        self.latency
    }

    fn look_ahead(&self) -> Tick {
        self.look_ahead
    }

    fn synchronize(&mut self, ctx: &dyn TickContext) -> Result<(), ReactorError> {
        let tick = ctx.tick();
        self.journal.log(format!("sync {}@{tick}", self.name));
        if !self.goals.is_empty() {
            self.journal
                .log(format!("pending {}@{tick}={}", self.name, self.goals.len()));
        }
        if self.fail_sync {
            return Err(ReactorError::SyncFailed("scripted failure".to_string()));
        }

        if let Some(timeline) = &self.sync_publish {
            let observation = ObservationByValue::new(timeline.clone(), "Status")
                .with("value", Domain::integer(tick as i64));
            if ctx.post(&observation).is_err() {
                self.journal.log(format!("post_failed {}@{tick}", self.name));
            }
        }

        if let Some((at, target)) = self.request_at.clone() {
            if at == tick {
                self.journal
                    .log(format!("request_attempt {}@{tick}", self.name));
                let goal =
                    GoalRequest::new(target.clone(), "Reach", TickWindow::new(tick + 1, tick + 20));
                let id = goal.id();
                match ctx.request(goal) {
                    Ok(()) => {
                        *self.sent_goal.lock().expect("goal slot") = Some((target, id));
                        self.journal.log(format!("request_sent {}@{tick}", self.name));
                    }
                    Err(_) => {
                        self.journal
                            .log(format!("request_failed {}@{tick}", self.name));
                    }
                }
            }
        }

        if self.recall_at == Some(tick) {
            let sent = self.sent_goal.lock().expect("goal slot").clone();
            if let Some((target, id)) = sent {
                let _ = ctx.recall(&target, id);
                self.journal.log(format!("recall_sent {}@{tick}", self.name));
            }
        }

        if let Some((at, _)) = self.resume_publish {
            if at == tick {
                self.resume_armed = true;
            }
        }
        Ok(())
    }

    fn has_work(&self) -> bool {
        self.resume_armed
    }

    fn resume(&mut self, ctx: &dyn TickContext) -> Result<(), ReactorError> {
        let tick = ctx.tick();
        self.journal.log(format!("resume {}@{tick}", self.name));
        self.resume_armed = false;
        if let Some((_, timeline)) = &self.resume_publish {
            let observation = ObservationByValue::new(timeline.clone(), "Burst")
                .with("value", Domain::integer(tick as i64));
            let _ = ctx.post(&observation);
        }
        Ok(())
    }

    fn notify(&mut self, observation: &dyn Observation) {
        let value = observation
            .parameter(0)
            .and_then(|p| match p.domain.singleton() {
                Some(Value::Int(i)) => Some(i.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| "-".to_string());
        self.journal.log(format!(
            "notify {} {}={}:{}",
            self.name,
            observation.timeline(),
            observation.predicate(),
            value
        ));
    }

    fn handle_request(&mut self, goal: GoalRequest) -> Result<(), ReactorError> {
        self.journal
            .log(format!("accept {} {}", self.name, goal.predicate()));
        self.goals.accept(goal);
        Ok(())
    }

    fn handle_recall(&mut self, goal: &GoalId) {
        self.goals.recall(goal);
        self.journal.log(format!("recall_received {}", self.name));
    }
}

/// Factory that hands out staged probes by reactor name under the
/// `probe` kind.
pub fn probe_factory(probes: Vec<Probe>) -> ReactorFactory {
    let staged: Mutex<HashMap<String, Probe>> = Mutex::new(
        probes
            .into_iter()
            .map(|p| (p.name.as_str().to_string(), p))
            .collect(),
    );
    let mut factory = ReactorFactory::new();
    factory
        .register("probe", move |spec| {
            staged
                .lock()
                .expect("staged probes lock")
                .remove(spec.name.as_str())
                .map(|p| Box::new(p) as Box<dyn Reactor>)
                .ok_or_else(|| FactoryError::Construction {
                    kind: "probe".to_string(),
                    message: format!("no probe staged for '{}'", spec.name),
                })
        })
        .expect("fresh factory has no duplicate kinds");
    factory
}

/// Step-clock config running ticks `0..=final_tick` over the named
/// probes, in the given configuration order.
pub fn probe_config(final_tick: Tick, names: &[&str]) -> AgentConfig {
    probe_config_with_limit(final_tick, names, 3)
}

pub fn probe_config_with_limit(
    final_tick: Tick,
    names: &[&str],
    sync_failure_limit: u32,
) -> AgentConfig {
    AgentConfig {
        name: "test-agent".to_string(),
        final_tick: Some(final_tick),
        // Two polls per tick: one opens the tick, one is left for a
        // deliberation slice.
        clock: ClockConfig::Step {
            sleep_seconds: 0.0,
            steps_per_tick: 2,
        },
        sync_failure_limit,
        log_dir: None,
        reactors: names
            .iter()
            .map(|name| ReactorConfig {
                name: (*name).to_string(),
                kind: "probe".to_string(),
                latency: 0,
                look_ahead: Some(100),
                log: false,
                params: toml::Table::new(),
            })
            .collect(),
    }
}
