//! Builtin reactor kinds.
//!
//! | Kind | Timelines | Purpose |
//! |------|-----------|---------|
//! | `noop` | none | placeholder that satisfies scheduling |
//! | `pulse` | one internal | publishes the current tick every tick |
//! | `relay` | one external, one internal | mirrors an upstream timeline and accepts goals |
//!
//! These are deliberately small: they exercise every path of the
//! executive (publication, subscription, goals, deliberation slices)
//! without embedding a planner. Deliberative reactors plug in the same
//! way through [`ReactorFactory::register`].

mod noop;
mod pulse;
mod relay;

pub use noop::NoopReactor;
pub use pulse::PulseReactor;
pub use relay::RelayReactor;

use crate::factory::{FactoryError, ReactorFactory};
use reflex_types::TimelineName;

/// Factory pre-loaded with the builtin kinds.
#[must_use]
pub fn builtin_factory() -> ReactorFactory {
    let mut factory = ReactorFactory::new();
    factory
        .register("noop", |spec| {
            Ok(Box::new(NoopReactor::new(
                spec.name.clone(),
                spec.latency,
                spec.look_ahead,
            )))
        })
        .expect("fresh factory has no duplicate kinds");
    factory
        .register("pulse", |spec| {
            let timeline = spec
                .param_str("timeline")
                .map_or_else(|| TimelineName::new(spec.name.as_str()), TimelineName::new);
            Ok(Box::new(PulseReactor::new(
                spec.name.clone(),
                timeline,
                spec.latency,
                spec.look_ahead,
            )))
        })
        .expect("fresh factory has no duplicate kinds");
    factory
        .register("relay", |spec| {
            let source = spec.param_str("source").map(TimelineName::new).ok_or_else(|| {
                FactoryError::Construction {
                    kind: "relay".to_string(),
                    message: "missing required param 'source'".to_string(),
                }
            })?;
            let timeline = spec
                .param_str("timeline")
                .map_or_else(|| TimelineName::new(spec.name.as_str()), TimelineName::new);
            Ok(Box::new(RelayReactor::new(
                spec.name.clone(),
                source,
                timeline,
                spec.latency,
                spec.look_ahead,
            )))
        })
        .expect("fresh factory has no duplicate kinds");
    factory
}
