//! Portals: counted handles to locations inside the buffer
//!
//! A [`Portal`] is a slot index plus a generation. The registry maps each
//! live slot to a [`PortalKey`] and holds at most one slot per key, so two
//! lookups of the same location hand out the same portal. Evicting a slot
//! bumps its generation, which turns every outstanding copy stale in O(1).
//!
//! Keys are buffer offsets, not addresses. Reallocating the buffer never
//! touches them; only byte shifts inside the buffer rekey or evict them.

use ahash::AHashMap;
use std::fmt;

/// Location a portal refers to
///
/// `index: None` names an item, `index: Some(i)` element `i` of the array at
/// `item_offset`, and `index: Some(row), column: Some(c)` a table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortalKey {
    pub item_offset: usize,
    pub index: Option<usize>,
    pub column: Option<usize>,
}

impl PortalKey {
    pub fn item(item_offset: usize) -> Self {
        PortalKey {
            item_offset,
            index: None,
            column: None,
        }
    }

    pub fn element(array_offset: usize, index: usize) -> Self {
        PortalKey {
            item_offset: array_offset,
            index: Some(index),
            column: None,
        }
    }

    pub fn cell(table_offset: usize, row: usize, column: usize) -> Self {
        PortalKey {
            item_offset: table_offset,
            index: Some(row),
            column: Some(column),
        }
    }
}

/// Counted handle into an [`ItemManager`](crate::ItemManager)
///
/// Not `Clone`: another counted reference is obtained with
/// [`ItemManager::retain`](crate::ItemManager::retain) and every reference
/// should be handed back with [`ItemManager::release`](crate::ItemManager::release).
#[derive(Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct Portal {
    slot: u32,
    generation: u32,
}

impl fmt::Display for Portal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Portal(slot={}, gen={})", self.slot, self.generation)
    }
}

#[derive(Debug)]
struct Slot {
    key: Option<PortalKey>,
    generation: u32,
    ref_count: u32,
}

/// Edit applied to a key by [`PortalRegistry::rekey`]
enum Rekey {
    Keep,
    Evict,
    Move(PortalKey),
}

#[derive(Debug, Default)]
pub(crate) struct PortalRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    index: AHashMap<PortalKey, u32>,
}

impl PortalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live portals
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Canonical portal for `key`, registering it on first use
    pub fn get(&mut self, key: PortalKey) -> Portal {
        if let Some(&slot) = self.index.get(&key) {
            let entry = &mut self.slots[slot as usize];
            entry.ref_count += 1;
            return Portal {
                slot,
                generation: entry.generation,
            };
        }

        let slot = match self.free.pop() {
            Some(slot) => {
                let entry = &mut self.slots[slot as usize];
                entry.key = Some(key);
                entry.ref_count = 1;
                slot
            }
            None => {
                self.slots.push(Slot {
                    key: Some(key),
                    generation: 0,
                    ref_count: 1,
                });
                (self.slots.len() - 1) as u32
            }
        };
        self.index.insert(key, slot);
        Portal {
            slot,
            generation: self.slots[slot as usize].generation,
        }
    }

    fn live_slot(&self, portal: &Portal) -> Option<&Slot> {
        self.slots
            .get(portal.slot as usize)
            .filter(|s| s.generation == portal.generation && s.key.is_some())
    }

    pub fn key(&self, portal: &Portal) -> Option<PortalKey> {
        self.live_slot(portal).and_then(|s| s.key)
    }

    pub fn is_valid(&self, portal: &Portal) -> bool {
        self.live_slot(portal).is_some()
    }

    /// Another counted reference to the same location
    pub fn retain(&mut self, portal: &Portal) -> Option<Portal> {
        self.live_slot(portal)?;
        let entry = &mut self.slots[portal.slot as usize];
        entry.ref_count += 1;
        Some(Portal {
            slot: portal.slot,
            generation: entry.generation,
        })
    }

    /// Drop one reference; the portal is evicted when none remain
    pub fn release(&mut self, portal: Portal) {
        if self.live_slot(&portal).is_none() {
            return;
        }
        let entry = &mut self.slots[portal.slot as usize];
        entry.ref_count -= 1;
        if entry.ref_count == 0 {
            self.evict(portal.slot);
        }
    }

    fn evict(&mut self, slot: u32) {
        let entry = &mut self.slots[slot as usize];
        if let Some(key) = entry.key.take() {
            self.index.remove(&key);
        }
        entry.generation = entry.generation.wrapping_add(1);
        entry.ref_count = 0;
        self.free.push(slot);
    }

    /// Apply `edit` to every live key
    ///
    /// Affected keys are removed from the index before any is reinserted, so
    /// a shift may move one key onto another key's old position.
    fn rekey(&mut self, edit: impl Fn(&PortalKey) -> Rekey) {
        let mut moved = Vec::new();
        let mut evicted = Vec::new();
        for (key, &slot) in &self.index {
            match edit(key) {
                Rekey::Keep => {}
                Rekey::Evict => evicted.push(slot),
                Rekey::Move(new_key) => moved.push((*key, new_key, slot)),
            }
        }
        for slot in evicted {
            self.evict(slot);
        }
        for (old, _, _) in &moved {
            self.index.remove(old);
        }
        for (_, new_key, slot) in moved {
            if let Some(previous) = self.index.insert(new_key, slot) {
                // a stale occupant can only be left behind by a missed invalidation
                self.slots[previous as usize].key = None;
                self.evict_detached(previous);
            }
            self.slots[slot as usize].key = Some(new_key);
        }
    }

    fn evict_detached(&mut self, slot: u32) {
        let entry = &mut self.slots[slot as usize];
        entry.generation = entry.generation.wrapping_add(1);
        entry.ref_count = 0;
        self.free.push(slot);
    }

    /// Evict every portal whose item offset lies in `[start, end)`
    pub fn invalidate_range(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        self.rekey(|key| {
            if (start..end).contains(&key.item_offset) {
                Rekey::Evict
            } else {
                Rekey::Keep
            }
        });
    }

    /// Move every portal whose item offset lies in `[src, src + count)` to `dst + (offset - src)`
    pub fn rebase_range(&mut self, src: usize, dst: usize, count: usize) {
        if count == 0 || src == dst {
            return;
        }
        self.rekey(|key| {
            if (src..src + count).contains(&key.item_offset) {
                Rekey::Move(PortalKey {
                    item_offset: key.item_offset - src + dst,
                    ..*key
                })
            } else {
                Rekey::Keep
            }
        });
    }

    /// Evict the element/row portals of `item_offset` at `index` and shift higher indices by `delta`
    ///
    /// A positive delta opens a gap (insertion), a negative one closes it (removal).
    pub fn shift_indices(&mut self, item_offset: usize, index: usize, delta: isize) {
        self.rekey(|key| match key.index {
            Some(i) if key.item_offset == item_offset => {
                if delta < 0 && i >= index && i < index + delta.unsigned_abs() {
                    Rekey::Evict
                } else if i >= index {
                    Rekey::Move(PortalKey {
                        index: Some(i.wrapping_add_signed(delta)),
                        ..*key
                    })
                } else {
                    Rekey::Keep
                }
            }
            _ => Rekey::Keep,
        });
    }

    /// Evict the cell portals of `column` in the table at `item_offset` and renumber the rest
    pub fn remove_column(&mut self, item_offset: usize, column: usize) {
        self.rekey(|key| match key.column {
            Some(c) if key.item_offset == item_offset => {
                if c == column {
                    Rekey::Evict
                } else if c > column {
                    Rekey::Move(PortalKey {
                        column: Some(c - 1),
                        ..*key
                    })
                } else {
                    Rekey::Keep
                }
            }
            _ => Rekey::Keep,
        });
    }

    /// Evict every element or cell portal of the container at `item_offset`
    pub fn invalidate_indexed(&mut self, item_offset: usize) {
        self.rekey(|key| {
            if key.item_offset == item_offset && key.index.is_some() {
                Rekey::Evict
            } else {
                Rekey::Keep
            }
        });
    }
}
