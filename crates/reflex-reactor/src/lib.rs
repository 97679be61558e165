//! Reactor contract for the REFLEX executive.
//!
//! A reactor is the unit of deliberation: it owns a set of internal
//! timelines, subscribes to external ones, and is driven by the agent
//! through a fixed per-tick protocol:
//!
//! ```text
//!            ┌──────────────────────────────────────────────┐
//!            │                  one tick                    │
//!            │                                              │
//! tick start │ handle_tick_start  (every reactor, in order) │
//!            │ synchronize        (every reactor, in order) │
//!            │   └─ post / request / recall via TickContext │
//!            │ has_work? -> resume  (bounded slices, until  │
//!            │                       the next tick arrives) │
//!            └──────────────────────────────────────────────┘
//! ```
//!
//! This crate defines the contract only. The scheduler, the bus, and the
//! clock live in `reflex-runtime`; concrete deliberation engines are
//! external collaborators reached through the [`plan`] traits.

mod error;
mod goal;
mod observation;
pub mod plan;
mod reactor;

pub use error::{DispatchError, ReactorError};
pub use goal::{GoalId, GoalRequest, GoalStore, TickWindow};
pub use observation::{
    Observation, ObservationByReference, ObservationByValue, Parameter, TokenView,
};
pub use reactor::{InitContext, Reactor, TickContext, TimelineModes, TimelineOwner};
