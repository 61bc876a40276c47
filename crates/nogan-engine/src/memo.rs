//! Reentrant memoization cache for behaviour dispatch.
//!
//! The propagation engine reserves a key before evaluating it and stores the
//! final peak afterwards. A lookup therefore has three outcomes:
//!
//! - [`Lookup::Final`]: the value was computed earlier in this run.
//! - [`Lookup::InProgress`]: the key is reserved but not finished. Seeing this
//!   means the graph looped back onto a dispatch that is still pending.
//! - [`Lookup::Absent`]: the key was never seen.
//!
//! A cache lives for exactly one propagation run.

use std::collections::HashMap;
use std::hash::Hash;

use nogan_core::{CellId, Channel, Pulse};

/// The result of querying the cache.
#[derive(Debug, PartialEq)]
pub enum Lookup<'a, V> {
    Final(&'a V),
    InProgress,
    Absent,
}

#[derive(Debug, Clone)]
enum Entry<V> {
    Reserved,
    Final(V),
}

/// A memo table keyed by encoded dispatch arguments.
#[derive(Debug, Clone)]
pub struct Memo<K, V> {
    entries: HashMap<K, Entry<V>>,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Memo {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> Memo<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self, key: &K) -> Lookup<'_, V> {
        match self.entries.get(key) {
            Some(Entry::Final(value)) => Lookup::Final(value),
            Some(Entry::Reserved) => Lookup::InProgress,
            None => Lookup::Absent,
        }
    }

    /// Marks `key` as being computed. Returns `false` if the key already has
    /// an entry, which is left untouched.
    pub fn reserve(&mut self, key: K) -> bool {
        match self.entries.entry(key) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(Entry::Reserved);
                true
            }
        }
    }

    /// Finalizes `key`, replacing a reservation or an earlier value.
    pub fn store(&mut self, key: K, value: V) {
        self.entries.insert(key, Entry::Final(value));
    }

    /// Number of keys seen, reserved or final.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of keys still reserved.
    pub fn pending(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| matches!(entry, Entry::Reserved))
            .count()
    }
}

/// Encoded `(source, target, channel, pulse)` dispatch arguments.
///
/// The pulse is encoded as its JSON text, which is stable for a given pulse
/// and distinguishes creation pulses by template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DispatchKey {
    pub source: CellId,
    pub target: CellId,
    pub channel: Channel,
    pub pulse: String,
}

impl DispatchKey {
    pub fn encode(
        source: CellId,
        target: CellId,
        channel: Channel,
        pulse: &Pulse,
    ) -> Result<Self, serde_json::Error> {
        Ok(DispatchKey {
            source,
            target,
            channel,
            pulse: serde_json::to_string(pulse)?,
        })
    }
}
