//! Generation-indexed arena.
//!
//! The executive refers to long-lived objects (reactor cells, accepted
//! goal tokens) through copyable [`Handle`]s instead of references or
//! reference-counted pointers. Each handle carries the generation of the
//! slot it was minted for, so a handle that outlives its object is
//! detected rather than silently resolving to a recycled slot.
//!
//! Iteration order is slot order, which for an arena that never removes
//! (the reactor table) equals insertion order. That property is what makes
//! agent scheduling deterministic for a fixed configuration.

use std::fmt;
use std::ops::{Index, IndexMut};

/// Copyable reference into an [`Arena`].
///
/// A handle is only meaningful for the arena that produced it. Resolving
/// a handle after its slot was removed (and possibly reused) yields
/// `None` because the generation no longer matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slotted storage handing out generation-checked [`Handle`]s.
///
/// # Example
///
/// ```
/// use reflex_types::Arena;
///
/// let mut arena = Arena::new();
/// let h = arena.insert("alpha");
/// assert_eq!(arena.get(h), Some(&"alpha"));
///
/// arena.remove(h);
/// assert_eq!(arena.get(h), None);
/// ```
#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Arena<T> {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of live values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when no live values are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stores a value and returns its handle.
    pub fn insert(&mut self, value: T) -> Handle {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            Handle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = u32::try_from(self.slots.len()).expect("arena capacity exceeded");
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            Handle {
                index,
                generation: 0,
            }
        }
    }

    /// Resolves a handle, returning `None` for stale or foreign handles.
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// Mutable variant of [`get`](Self::get).
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Removes a value, invalidating every copy of its handle.
    ///
    /// Returns the value, or `None` when the handle is already stale.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        Some(value)
    }

    /// Iterates live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let value = slot.value.as_ref()?;
            let handle = Handle {
                index: index as u32,
                generation: slot.generation,
            };
            Some((handle, value))
        })
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<Handle> for Arena<T> {
    type Output = T;

    /// # Panics
    ///
    /// Panics on a stale handle. Use [`Arena::get`] when staleness is a
    /// legal outcome.
    fn index(&self, handle: Handle) -> &T {
        self.get(handle).expect("stale arena handle")
    }
}

impl<T> IndexMut<Handle> for Arena<T> {
    fn index_mut(&mut self, handle: Handle) -> &mut T {
        self.get_mut(handle).expect("stale arena handle")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut arena = Arena::new();
        let a = arena.insert(10);
        let b = arena.insert(20);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(a), Some(&10));
        assert_eq!(arena.get(b), Some(&20));
    }

    #[test]
    fn remove_invalidates_handle() {
        let mut arena = Arena::new();
        let h = arena.insert("x");
        assert_eq!(arena.remove(h), Some("x"));
        assert_eq!(arena.get(h), None);
        assert_eq!(arena.remove(h), None);
        assert!(arena.is_empty());
    }

    #[test]
    fn reused_slot_gets_new_generation() {
        let mut arena = Arena::new();
        let first = arena.insert(1);
        arena.remove(first);
        let second = arena.insert(2);

        // Same physical slot, different generation.
        assert_ne!(first, second);
        assert_eq!(arena.get(first), None);
        assert_eq!(arena.get(second), Some(&2));
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let mut arena = Arena::new();
        arena.insert("a");
        arena.insert("b");
        arena.insert("c");

        let values: Vec<_> = arena.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec!["a", "b", "c"]);
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut arena = Arena::new();
        let h = arena.insert(vec![1]);
        arena.get_mut(h).expect("live handle").push(2);
        assert_eq!(arena.get(h), Some(&vec![1, 2]));
    }

    #[test]
    #[should_panic(expected = "stale arena handle")]
    fn index_panics_on_stale_handle() {
        let mut arena = Arena::new();
        let h = arena.insert(0);
        arena.remove(h);
        let _ = arena[h];
    }
}
