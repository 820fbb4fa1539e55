//! Slab of pending consumers keyed by generation-checked indices.
//!
//! A [`RunOnce`](crate::sync::RunOnce) parks each waiting consumer here and
//! hands the consumer's cancel handle the [`ArenaIndex`] of its entry. When
//! the run settles every entry is drained, so a handle cancelled afterwards
//! holds a stale index; bumping the entry's generation on every removal makes
//! that late `remove` miss even if the slot was reused by a newer consumer.

use std::fmt;

/// Key of one arena entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ArenaIndex {
    slot: u32,
    generation: u32,
}

impl fmt::Debug for ArenaIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArenaIndex({}@{})", self.slot, self.generation)
    }
}

#[derive(Debug)]
struct Entry<T> {
    generation: u32,
    value: Option<T>,
}

#[derive(Debug)]
pub(crate) struct Arena<T> {
    entries: Vec<Entry<T>>,
    vacant: Vec<u32>,
    len: usize,
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Self {
        Self {
            entries: Vec::new(),
            vacant: Vec::new(),
            len: 0,
        }
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn insert(&mut self, value: T) -> ArenaIndex {
        self.len += 1;
        if let Some(slot) = self.vacant.pop() {
            let entry = &mut self.entries[slot as usize];
            entry.value = Some(value);
            return ArenaIndex {
                slot,
                generation: entry.generation,
            };
        }
        let slot = u32::try_from(self.entries.len()).expect("arena overflow");
        self.entries.push(Entry {
            generation: 0,
            value: Some(value),
        });
        ArenaIndex {
            slot,
            generation: 0,
        }
    }

    /// Takes the entry at `index`; `None` if it was already removed.
    pub(crate) fn remove(&mut self, index: ArenaIndex) -> Option<T> {
        let entry = self.entries.get_mut(index.slot as usize)?;
        if entry.generation != index.generation {
            return None;
        }
        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.vacant.push(index.slot);
        self.len -= 1;
        Some(value)
    }

    /// Takes every entry, in slot order. Outstanding indices go stale.
    pub(crate) fn drain(&mut self) -> Vec<T> {
        let mut values = Vec::with_capacity(self.len);
        self.vacant.clear();
        for (slot, entry) in self.entries.iter_mut().enumerate().rev() {
            if let Some(value) = entry.value.take() {
                entry.generation = entry.generation.wrapping_add(1);
                values.push(value);
            }
            if let Ok(slot) = u32::try_from(slot) {
                self.vacant.push(slot);
            }
        }
        values.reverse();
        self.len = 0;
        values
    }
}
