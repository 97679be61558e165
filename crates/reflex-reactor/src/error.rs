//! Reactor and dispatch errors.
//!
//! Failures inside a reactor never escape its slice boundary: the agent
//! logs them, counts them, and keeps the tick loop running. The error
//! types here are the explicit result values reactors return instead of
//! throwing.
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`ReactorError::SyncFailed`] | `REACTOR_SYNC_FAILED` | Yes |
//! | [`ReactorError::ResumeFailed`] | `REACTOR_RESUME_FAILED` | Yes |
//! | [`ReactorError::GoalRejected`] | `REACTOR_GOAL_REJECTED` | No |
//! | [`ReactorError::InitFailed`] | `REACTOR_INIT_FAILED` | No |
//! | [`DispatchError::UnknownTimeline`] | `DISPATCH_UNKNOWN_TIMELINE` | No |
//! | [`DispatchError::NotOwner`] | `DISPATCH_NOT_OWNER` | No |
//! | [`DispatchError::AlreadyPublished`] | `DISPATCH_ALREADY_PUBLISHED` | No |
//! | [`DispatchError::SelfRouting`] | `DISPATCH_SELF_ROUTING` | No |
//! | [`DispatchError::Rejected`] | `DISPATCH_REJECTED` | No |

use reflex_types::{ErrorCode, ReactorName, TimelineName};
use thiserror::Error;

/// Failure surfaced by a reactor to the agent.
#[derive(Debug, Clone, Error)]
pub enum ReactorError {
    /// `synchronize` could not reconcile the reactor's model with the
    /// current tick. The agent retries at the next tick.
    #[error("synchronization failed: {0}")]
    SyncFailed(String),

    /// A deliberation slice failed. Treated exactly like a
    /// synchronization failure for the escalation policy.
    #[error("deliberation failed: {0}")]
    ResumeFailed(String),

    /// The reactor declined a goal on one of its internal timelines.
    #[error("goal rejected: {0}")]
    GoalRejected(String),

    /// `handle_init` failed; fatal during agent construction.
    #[error("initialization failed: {0}")]
    InitFailed(String),
}

impl ErrorCode for ReactorError {
    fn code(&self) -> &'static str {
        match self {
            Self::SyncFailed(_) => "REACTOR_SYNC_FAILED",
            Self::ResumeFailed(_) => "REACTOR_RESUME_FAILED",
            Self::GoalRejected(_) => "REACTOR_GOAL_REJECTED",
            Self::InitFailed(_) => "REACTOR_INIT_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::SyncFailed(_) | Self::ResumeFailed(_))
    }
}

/// Failure routing a message through the observation and goal bus.
///
/// Dispatch failures are logged and discarded by the runtime; external
/// tools may emit stale timeline names and must not take the agent down.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// No reactor owns the target timeline.
    #[error("no owner for timeline '{0}'")]
    UnknownTimeline(TimelineName),

    /// A reactor posted an observation on a timeline it does not own.
    #[error("reactor '{reactor}' does not own timeline '{timeline}'")]
    NotOwner {
        /// The offending reactor.
        reactor: ReactorName,
        /// The timeline it tried to publish on.
        timeline: TimelineName,
    },

    /// A second observation for the same (timeline, tick) pair.
    #[error("timeline '{0}' already has an observation this tick")]
    AlreadyPublished(TimelineName),

    /// A message whose route leads back to its sender.
    #[error("message on timeline '{0}' routes back to its sender")]
    SelfRouting(TimelineName),

    /// The owning reactor refused the goal.
    #[error("goal rejected by owner: {0}")]
    Rejected(String),
}

impl ErrorCode for DispatchError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownTimeline(_) => "DISPATCH_UNKNOWN_TIMELINE",
            Self::NotOwner { .. } => "DISPATCH_NOT_OWNER",
            Self::AlreadyPublished(_) => "DISPATCH_ALREADY_PUBLISHED",
            Self::SelfRouting(_) => "DISPATCH_SELF_ROUTING",
            Self::Rejected(_) => "DISPATCH_REJECTED",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
