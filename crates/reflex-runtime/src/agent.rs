//! The agent: owner of the clock, the reactors, and the bus.
//!
//! # Tick loop
//!
//! The loop polls the clock once per iteration:
//!
//! 1. Tick advanced: begin the new tick. Reset per-reactor counters,
//!    run `handle_tick_start` in priority order, deliver observations
//!    buffered during the previous deliberation phase, then run the
//!    synchronization phase in priority order.
//! 2. Tick unchanged: grant one `resume` slice to the first reactor in
//!    priority order reporting work, or sleep `clock.sleep_delay()`
//!    when everyone is idle.
//!
//! The tick boundary is enforced only between slices; a running slice
//! is never interrupted. Shutdown is likewise checked between slices
//! and between ticks.
//!
//! # Failure policy
//!
//! A failed `synchronize` or `resume` is logged and counted; the
//! reactor is retried next tick. A success clears the count. When the
//! count reaches the configured `sync_failure_limit`, the agent stops
//! with [`AgentError::ReactorEscalation`]. Failures never cross the
//! slice boundary in any other way.

use crate::bus::{self, BufferedObservation, DispatchContext, Phase, ReactorCell, Router};
use crate::clock::Clock;
use crate::config::{AgentConfig, ConfigError};
use crate::factory::ReactorFactory;
use crate::monitor::{PerformanceMonitor, TickSample};
use crate::priority;
use crate::stats::{ReactorStats, UsageLap, UsageTotals};
use crate::transcript::Transcript;
use reflex_reactor::{InitContext, ReactorError, TimelineModes, TimelineOwner};
use reflex_types::{Arena, ErrorCode, Handle, ReactorName, Tick, TimelineName};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Fatal runtime errors. Everything else is contained per reactor.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    /// A reactor kept failing past the configured tolerance.
    #[error("reactor '{reactor}' stopped the agent after {failures} consecutive failures")]
    ReactorEscalation {
        /// The reactor that escalated.
        reactor: ReactorName,
        /// Consecutive failures at the moment of escalation.
        failures: u32,
    },
}

impl ErrorCode for AgentError {
    fn code(&self) -> &'static str {
        match self {
            Self::ReactorEscalation { .. } => "AGENT_REACTOR_ESCALATION",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Cooperative shutdown request, shared between the agent and whoever
/// listens for signals.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    /// Creates an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown. Honored between slices, never mid-slice.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown was requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

enum SliceKind {
    Synchronize,
    Resume,
}

/// The orchestrator.
pub struct Agent {
    name: String,
    reactors: Arena<ReactorCell>,
    order: Vec<Handle>,
    router: Router,
    clock: Box<dyn Clock>,
    monitor: PerformanceMonitor,
    current_tick: Option<Tick>,
    final_tick: Option<Tick>,
    sync_failure_limit: u32,
    published: RefCell<HashSet<TimelineName>>,
    pending: RefCell<Vec<BufferedObservation>>,
    transcript: Option<Transcript>,
    shutdown: ShutdownFlag,
    sync_wall: Duration,
    deliberation_wall: Duration,
}

impl Agent {
    /// Builds an agent with the clock named in the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for any structural defect; no tick runs
    /// when construction fails.
    pub fn new(config: &AgentConfig, factory: &ReactorFactory) -> Result<Self, ConfigError> {
        let clock = config.clock.build()?;
        Self::with_clock(config, factory, clock)
    }

    /// Builds an agent around an injected clock. Tests and replay
    /// harnesses use this to drive deterministic schedules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for any structural defect.
    pub fn with_clock(
        config: &AgentConfig,
        factory: &ReactorFactory,
        clock: Box<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let mut reactors: Arena<ReactorCell> = Arena::new();
        let mut seen: HashSet<ReactorName> = HashSet::new();

        for entry in &config.reactors {
            let spec = entry.resolve(config.final_tick);
            if !seen.insert(spec.name.clone()) {
                return Err(ConfigError::DuplicateReactor(spec.name));
            }
            if spec.latency > spec.look_ahead {
                return Err(ConfigError::LatencyExceedsLookAhead {
                    reactor: spec.name,
                    latency: spec.latency,
                    look_ahead: spec.look_ahead,
                });
            }
            let reactor = factory.build(&entry.kind, &spec)?;
            if reactor.latency() > reactor.look_ahead() {
                return Err(ConfigError::LatencyExceedsLookAhead {
                    reactor: spec.name,
                    latency: reactor.latency(),
                    look_ahead: reactor.look_ahead(),
                });
            }
            debug!(reactor = %spec.name, latency = spec.latency, look_ahead = spec.look_ahead, "reactor constructed");
            reactors.insert(ReactorCell {
                name: spec.name,
                reactor: RefCell::new(reactor),
                log: spec.log,
                priority: 0,
                consecutive_failures: 0,
                stats: ReactorStats::default(),
            });
        }

        let modes: Vec<(Handle, TimelineModes)> = reactors
            .iter()
            .map(|(handle, cell)| (handle, cell.reactor.borrow().timeline_modes()))
            .collect();

        let mut router = Router::default();
        for (handle, m) in &modes {
            for timeline in &m.internals {
                if let Some(previous) = router.insert_owner(timeline.clone(), *handle) {
                    return Err(ConfigError::DuplicateOwner {
                        timeline: timeline.clone(),
                        first: reactors[previous].name.clone(),
                        second: reactors[*handle].name.clone(),
                    });
                }
            }
        }
        for (handle, m) in &modes {
            for timeline in &m.externals {
                if m.internals.contains(timeline) {
                    return Err(ConfigError::SelfSubscription {
                        reactor: reactors[*handle].name.clone(),
                        timeline: timeline.clone(),
                    });
                }
                if router.owner(timeline).is_none() {
                    return Err(ConfigError::UnownedTimeline {
                        reactor: reactors[*handle].name.clone(),
                        timeline: timeline.clone(),
                    });
                }
                router.insert_subscriber(timeline.clone(), *handle);
            }
        }

        let order = priority::order_by_priority(&mut reactors, &router)?;

        let transcript = if config.reactors.iter().any(|r| r.log) {
            let dir = config
                .log_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from("reflex-logs"));
            match Transcript::create(&dir) {
                Ok(transcript) => {
                    info!(path = %transcript.path().display(), "observation transcript open");
                    Some(transcript)
                }
                Err(err) => {
                    return Err(ConfigError::LogDir {
                        path: dir,
                        message: err.to_string(),
                    })
                }
            }
        } else {
            None
        };

        let owners_map: HashMap<TimelineName, TimelineOwner> = router
            .owners()
            .map(|(timeline, handle)| {
                let cell = &reactors[handle];
                let reactor = cell.reactor.borrow();
                (
                    timeline.clone(),
                    TimelineOwner {
                        reactor: cell.name.clone(),
                        latency: reactor.latency(),
                        look_ahead: reactor.look_ahead(),
                    },
                )
            })
            .collect();

        for &handle in &order {
            let ctx = InitContext::new(0, owners_map.clone());
            let result = reactors[handle].reactor.borrow_mut().handle_init(0, &ctx);
            if let Err(source) = result {
                return Err(ConfigError::ReactorInit {
                    reactor: reactors[handle].name.clone(),
                    source,
                });
            }
        }

        Ok(Self {
            name: config.name.clone(),
            reactors,
            order,
            router,
            clock,
            monitor: PerformanceMonitor::new(),
            current_tick: None,
            final_tick: config.final_tick,
            sync_failure_limit: config.sync_failure_limit.max(1),
            published: RefCell::new(HashSet::new()),
            pending: RefCell::new(Vec::new()),
            transcript,
            shutdown: ShutdownFlag::new(),
            sync_wall: Duration::ZERO,
            deliberation_wall: Duration::ZERO,
        })
    }

    /// Agent name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tick currently being executed, `None` before the first.
    #[must_use]
    pub fn current_tick(&self) -> Option<Tick> {
        self.current_tick
    }

    /// Per-tick timing history.
    #[must_use]
    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    /// Handle for requesting shutdown from outside the loop.
    #[must_use]
    pub fn shutdown_flag(&self) -> ShutdownFlag {
        self.shutdown.clone()
    }

    /// Reactor names in synchronization order.
    #[must_use]
    pub fn priority_order(&self) -> Vec<ReactorName> {
        self.order
            .iter()
            .map(|&handle| self.reactors[handle].name.clone())
            .collect()
    }

    /// Current-tick instrumentation for one reactor.
    #[must_use]
    pub fn stats_of(&self, name: &str) -> Option<ReactorStats> {
        self.reactors
            .iter()
            .find(|(_, cell)| cell.name.as_str() == name)
            .map(|(_, cell)| cell.stats)
    }

    /// Runs the tick loop until the final tick passes, shutdown is
    /// requested, or a reactor escalates.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on escalation. The loop has already
    /// recorded the partial tick when this returns.
    pub async fn run(&mut self) -> Result<(), AgentError> {
        self.clock.start();
        info!(agent = %self.name, reactors = self.order.len(), "agent started");
        let result = self.drive().await;
        self.finish();
        info!(
            agent = %self.name,
            ticks = self.monitor.history().len(),
            "agent stopped"
        );
        result
    }

    async fn drive(&mut self) -> Result<(), AgentError> {
        loop {
            if self.shutdown.is_requested() {
                info!(agent = %self.name, "shutdown requested");
                return Ok(());
            }
            let tick = self.clock.next_tick();
            if self.final_tick.is_some_and(|final_tick| tick > final_tick) {
                debug!(agent = %self.name, tick, "final tick passed");
                return Ok(());
            }
            if self.current_tick != Some(tick) {
                self.begin_tick(tick)?;
                continue;
            }
            if self.deliberate_once(tick)? {
                continue;
            }
            tokio::time::sleep(self.clock.sleep_delay()).await;
        }
    }

    fn begin_tick(&mut self, tick: Tick) -> Result<(), AgentError> {
        debug!(agent = %self.name, tick, "tick start");

        if let Some(previous) = self.current_tick {
            self.monitor.record(TickSample {
                tick: previous,
                synchronization: self.sync_wall,
                deliberation: self.deliberation_wall,
            });
        }
        self.sync_wall = Duration::ZERO;
        self.deliberation_wall = Duration::ZERO;
        self.current_tick = Some(tick);
        self.published.borrow_mut().clear();

        for index in 0..self.order.len() {
            let handle = self.order[index];
            self.reactors[handle].stats.reset();
        }
        for index in 0..self.order.len() {
            let handle = self.order[index];
            self.reactors[handle]
                .reactor
                .borrow_mut()
                .handle_tick_start(tick);
        }

        self.flush_buffered(tick);
        self.synchronization_phase(tick)?;

        if let Some(transcript) = &self.transcript {
            transcript.flush();
        }
        Ok(())
    }

    /// Delivers observations held over from the previous deliberation
    /// phase. They occupy the new tick's publication slot for their
    /// timeline.
    fn flush_buffered(&mut self, tick: Tick) {
        let buffered: Vec<BufferedObservation> = self.pending.borrow_mut().drain(..).collect();
        for item in buffered {
            let timeline = reflex_reactor::Observation::timeline(&item.observation).clone();
            if !self.published.borrow_mut().insert(timeline.clone()) {
                warn!(timeline = %timeline, tick, "buffered observation collides, dropped");
                continue;
            }
            if self.reactors[item.owner].log {
                if let Some(transcript) = &self.transcript {
                    transcript.record(tick, &item.observation);
                }
            }
            bus::deliver(&self.reactors, &self.router, item.owner, &item.observation);
        }
    }

    fn synchronization_phase(&mut self, tick: Tick) -> Result<(), AgentError> {
        let phase_start = Instant::now();
        for index in 0..self.order.len() {
            let handle = self.order[index];
            let lap = UsageLap::start();
            let result = {
                let ctx = DispatchContext {
                    tick,
                    phase: Phase::Synchronization,
                    source: handle,
                    reactors: &self.reactors,
                    router: &self.router,
                    published: &self.published,
                    pending: &self.pending,
                    transcript: self.transcript.as_ref(),
                };
                let mut reactor = self.reactors[handle].reactor.borrow_mut();
                reactor.synchronize(&ctx)
            };
            let usage = lap.stop();
            self.settle_slice(handle, SliceKind::Synchronize, usage, result)?;
        }
        self.sync_wall += phase_start.elapsed();
        Ok(())
    }

    fn deliberate_once(&mut self, tick: Tick) -> Result<bool, AgentError> {
        let next = self
            .order
            .iter()
            .copied()
            .find(|&handle| self.reactors[handle].reactor.borrow().has_work());
        let Some(handle) = next else {
            return Ok(false);
        };

        let slice_start = Instant::now();
        let lap = UsageLap::start();
        let result = {
            let ctx = DispatchContext {
                tick,
                phase: Phase::Deliberation,
                source: handle,
                reactors: &self.reactors,
                router: &self.router,
                published: &self.published,
                pending: &self.pending,
                transcript: self.transcript.as_ref(),
            };
            let mut reactor = self.reactors[handle].reactor.borrow_mut();
            reactor.resume(&ctx)
        };
        let usage = lap.stop();
        self.deliberation_wall += slice_start.elapsed();
        self.settle_slice(handle, SliceKind::Resume, usage, result)?;
        Ok(true)
    }

    fn settle_slice(
        &mut self,
        handle: Handle,
        kind: SliceKind,
        usage: UsageTotals,
        result: Result<(), ReactorError>,
    ) -> Result<(), AgentError> {
        let limit = self.sync_failure_limit;
        let cell = &mut self.reactors[handle];
        match kind {
            SliceKind::Synchronize => {
                cell.stats.sync_count += 1;
                cell.stats.sync_usage.accrue(usage);
            }
            SliceKind::Resume => {
                cell.stats.search_count += 1;
                cell.stats.search_usage.accrue(usage);
            }
        }
        match result {
            Ok(()) => {
                cell.consecutive_failures = 0;
                Ok(())
            }
            Err(err) => {
                cell.consecutive_failures += 1;
                warn!(
                    reactor = %cell.name,
                    error = %err,
                    failures = cell.consecutive_failures,
                    "reactor slice failed"
                );
                if cell.consecutive_failures >= limit {
                    error!(reactor = %cell.name, "failure limit reached, stopping agent");
                    Err(AgentError::ReactorEscalation {
                        reactor: cell.name.clone(),
                        failures: cell.consecutive_failures,
                    })
                } else {
                    Ok(())
                }
            }
        }
    }

    fn finish(&mut self) {
        if let Some(tick) = self.current_tick {
            self.monitor.record(TickSample {
                tick,
                synchronization: self.sync_wall,
                deliberation: self.deliberation_wall,
            });
        }
        if let Some(transcript) = &self.transcript {
            transcript.flush();
        }
    }
}
