//! Shared vocabulary for the REFLEX executive.
//!
//! This crate is the bottom layer of the workspace. It defines the types
//! every other crate speaks:
//!
//! - [`Tick`]: the discrete logical time index advanced by the clock
//! - [`TimelineName`] / [`ReactorName`]: interned-by-convention string names
//! - [`ErrorCode`]: the unified error code contract for all REFLEX errors
//! - [`Arena`] / [`Handle`]: generation-indexed storage for safe references
//!
//! # Layering
//!
//! ```text
//! reflex-types          <- this crate (no REFLEX dependencies)
//!   reflex-domain       <- parameter domains + XML wire format
//!   reflex-reactor      <- Reactor contract, observations, goals
//!     reflex-runtime    <- clocks, bus, agent orchestrator
//!       reflex-cli      <- the reflex binary
//! ```

mod arena;
mod error;
mod name;

pub use arena::{Arena, Handle};
pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use name::{ReactorName, TimelineName};

/// Logical time index.
///
/// Ticks are non-negative and monotonically non-decreasing at every
/// observation point in the system. Tick 0 is the first tick an agent
/// executes.
pub type Tick = u64;
