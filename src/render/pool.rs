//! Grow-only object pool keyed by viewport-relative slot.
//!
//! Entries live in an arena that never shrinks. A render pass marks every
//! slot it touches; at the end of the pass untouched entries are reset and
//! pushed onto the free list, and a later `acquire` for an unknown slot
//! rebinds a free entry before allocating a new one.

use std::collections::HashMap;

use crate::types::Pane;

/// Position of a visual relative to its pane's first visible row/col.
/// Negative when a merge's top-left lies before the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub pane: Pane,
    pub row: i64,
    pub col: i64,
}

/// A value that can be returned to the pool.
pub trait Poolable: Default {
    /// Restore default attributes before the entry is reused.
    fn reset(&mut self);
}

#[derive(Debug)]
struct PoolEntry<T> {
    value: T,
    slot: Option<SlotKey>,
    /// Pass in which the entry was last acquired
    pass: u64,
}

#[derive(Debug)]
pub struct ObjectPool<T> {
    entries: Vec<PoolEntry<T>>,
    slots: HashMap<SlotKey, usize>,
    free: Vec<usize>,
    pass: u64,
}

impl<T: Poolable> Default for ObjectPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Poolable> ObjectPool<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            slots: HashMap::new(),
            free: Vec::new(),
            pass: 0,
        }
    }

    /// Start a render pass.
    pub fn begin_pass(&mut self) {
        self.pass += 1;
    }

    /// Entry bound to `slot`, rebinding a free entry or allocating one if the
    /// slot is new.
    #[allow(clippy::indexing_slicing)]
    pub fn acquire(&mut self, slot: SlotKey) -> &mut T {
        let index = match self.slots.get(&slot) {
            Some(&index) => index,
            None => {
                let index = match self.free.pop() {
                    Some(index) => index,
                    None => {
                        self.entries.push(PoolEntry {
                            value: T::default(),
                            slot: None,
                            pass: 0,
                        });
                        log::debug!("visual pool grew to {}", self.entries.len());
                        self.entries.len() - 1
                    }
                };
                self.slots.insert(slot, index);
                index
            }
        };
        // Indices in `slots` and `free` always point into `entries`.
        let entry = &mut self.entries[index];
        entry.slot = Some(slot);
        entry.pass = self.pass;
        &mut entry.value
    }

    /// Release every bound entry not acquired during the current pass.
    /// Returns how many were released.
    pub fn end_pass(&mut self) -> usize {
        let pass = self.pass;
        let mut released = 0;
        for (index, entry) in self.entries.iter_mut().enumerate() {
            let Some(slot) = entry.slot else {
                continue;
            };
            if entry.pass == pass {
                continue;
            }
            entry.value.reset();
            entry.slot = None;
            self.slots.remove(&slot);
            self.free.push(index);
            released += 1;
        }
        released
    }

    /// Entries currently bound to a slot.
    pub fn live_count(&self) -> usize {
        self.slots.len()
    }

    /// Arena size; only ever grows.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn get(&self, slot: &SlotKey) -> Option<&T> {
        self.slots
            .get(slot)
            .and_then(|index| self.entries.get(*index))
            .map(|entry| &entry.value)
    }

    /// Bound entries with their slots.
    pub fn live(&self) -> impl Iterator<Item = (SlotKey, &T)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.slot.map(|slot| (slot, &entry.value)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Dummy {
        label: Option<String>,
        resets: u32,
    }

    impl Poolable for Dummy {
        fn reset(&mut self) {
            self.label = None;
            self.resets += 1;
        }
    }

    fn key(row: i64, col: i64) -> SlotKey {
        SlotKey {
            pane: Pane::Main,
            row,
            col,
        }
    }

    #[test]
    fn same_slot_reuses_entry() {
        let mut pool: ObjectPool<Dummy> = ObjectPool::new();
        pool.begin_pass();
        pool.acquire(key(0, 0)).label = Some("a".into());
        pool.end_pass();
        pool.begin_pass();
        assert_eq!(pool.acquire(key(0, 0)).label.as_deref(), Some("a"));
        pool.end_pass();
        assert_eq!(pool.capacity(), 1);
    }

    #[test]
    fn untouched_entries_are_reset_and_reused() {
        let mut pool: ObjectPool<Dummy> = ObjectPool::new();
        pool.begin_pass();
        pool.acquire(key(0, 0)).label = Some("a".into());
        pool.acquire(key(0, 1)).label = Some("b".into());
        assert_eq!(pool.end_pass(), 0);

        pool.begin_pass();
        pool.acquire(key(0, 0));
        assert_eq!(pool.end_pass(), 1);
        assert_eq!(pool.live_count(), 1);
        assert_eq!(pool.free_count(), 1);

        pool.begin_pass();
        pool.acquire(key(0, 0));
        let reused = pool.acquire(key(5, 5));
        assert!(reused.label.is_none());
        assert_eq!(reused.resets, 1);
        pool.end_pass();
        assert_eq!(pool.capacity(), 2);
        assert_eq!(pool.live_count(), 2);
    }
}
