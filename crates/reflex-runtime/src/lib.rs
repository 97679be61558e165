//! REFLEX runtime: the machinery that drives reactors.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Agent (tick loop)                      │
//! │                                                             │
//! │  clock ──► new tick? ──► tick start ──► flush buffered obs  │
//! │                          synchronize (dependency order)     │
//! │            otherwise ──► one deliberation slice, or sleep   │
//! └─────────────────────────────────────────────────────────────┘
//!         │                    │                      │
//!         ▼                    ▼                      ▼
//!   clock (Step /        bus (direct            stats + monitor
//!   RealTime)            per-timeline           (cpu, wall, per
//!                        dispatch)              tick history)
//! ```
//!
//! # Modules
//!
//! - [`clock`]: the tick sources, deterministic and wall-clock driven
//! - [`stats`]: CPU/wall accounting primitives shared by clock and agent
//! - [`bus`]: timeline routing and the capability context lent to reactors
//! - [`priority`]: dependency-ordered scheduling with cycle detection
//! - [`agent`]: the orchestrator itself
//! - [`monitor`]: per-tick timing history
//! - [`config`]: TOML configuration and validation errors
//! - [`factory`]: name-keyed reactor construction
//! - [`transcript`]: XML observation log for replay tooling
//! - [`reactors`]: builtin reactor kinds (`noop`, `pulse`, `relay`)
//!
//! # Scheduling model
//!
//! Everything runs on one orchestrator thread, cooperatively. A
//! reactor's `resume` is the only suspension point; the agent enforces
//! the tick budget by polling the clock between slices, never by
//! interrupting one. The only awaits in the loop are the idle sleep and
//! the shutdown listener.

pub mod agent;
pub mod bus;
pub mod clock;
pub mod config;
pub mod factory;
pub mod monitor;
pub mod priority;
pub mod reactors;
pub mod stats;
pub mod transcript;

pub use agent::{Agent, AgentError, ShutdownFlag};
pub use clock::{Clock, RealTimeClock, StepClock};
pub use config::{AgentConfig, ClockConfig, ConfigError, ReactorConfig, ReactorSpec};
pub use factory::{FactoryError, ReactorFactory};
pub use monitor::{PerformanceMonitor, TickSample};
pub use reactors::builtin_factory;
pub use stats::{ReactorStats, UsageLap, UsageSnapshot, UsageTotals};
pub use transcript::Transcript;
