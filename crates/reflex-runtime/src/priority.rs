//! Dependency-ordered reactor scheduling.
//!
//! A reactor's priority is 0 when it observes nothing, otherwise one
//! more than the highest priority among the owners of its external
//! timelines. Sorting ascending by priority therefore puts every owner
//! before all of its subscribers; that order is the synchronization
//! order, and the same order grants deliberation slices.
//!
//! The recursion carries a depth guard equal to the reactor count: any
//! deeper chain can only mean the ownership graph has a cycle, which is
//! a fatal configuration error.

use crate::bus::{ReactorCell, Router};
use crate::config::ConfigError;
use reflex_types::{Arena, Handle, TimelineName};
use std::collections::HashMap;

/// Assigns priorities and returns handles sorted ascending by priority.
///
/// The sort is stable, so reactors of equal priority keep configuration
/// order and the schedule is identical across runs of one configuration.
pub(crate) fn order_by_priority(
    reactors: &mut Arena<ReactorCell>,
    router: &Router,
) -> Result<Vec<Handle>, ConfigError> {
    let externals: HashMap<Handle, Vec<TimelineName>> = reactors
        .iter()
        .map(|(handle, cell)| (handle, cell.reactor.borrow().timeline_modes().externals))
        .collect();

    let handles: Vec<Handle> = reactors.iter().map(|(handle, _)| handle).collect();
    let count = handles.len();
    let mut memo: HashMap<Handle, u32> = HashMap::new();

    for &handle in &handles {
        priority_of(handle, reactors, router, &externals, &mut memo, 0, count)?;
    }
    for &handle in &handles {
        reactors[handle].priority = memo[&handle];
    }

    let mut order = handles;
    order.sort_by_key(|&handle| reactors[handle].priority);
    Ok(order)
}

fn priority_of(
    handle: Handle,
    reactors: &Arena<ReactorCell>,
    router: &Router,
    externals: &HashMap<Handle, Vec<TimelineName>>,
    memo: &mut HashMap<Handle, u32>,
    depth: usize,
    count: usize,
) -> Result<u32, ConfigError> {
    if let Some(&priority) = memo.get(&handle) {
        return Ok(priority);
    }
    if depth >= count {
        return Err(ConfigError::DependencyCycle {
            reactor: reactors[handle].name.clone(),
        });
    }

    let mut priority = 0;
    for timeline in &externals[&handle] {
        let owner = router
            .owner(timeline)
            .ok_or_else(|| ConfigError::UnownedTimeline {
                reactor: reactors[handle].name.clone(),
                timeline: timeline.clone(),
            })?;
        let owner_priority =
            priority_of(owner, reactors, router, externals, memo, depth + 1, count)?;
        priority = priority.max(1 + owner_priority);
    }

    memo.insert(handle, priority);
    Ok(priority)
}
