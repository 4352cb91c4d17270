use crate::clock::Clock;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

/// A map whose entries expire a fixed time after they were stored. Expiry is checked on read
/// against an injected `Clock`; nothing is evicted in the background.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: HashMap<K, Entry<V>>,
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    stored_at: DateTime<Utc>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The value stored under `key` if it is younger than the TTL.
    pub fn get(&self, key: &K) -> Option<V> {
        let entry = self.entries.get(key)?;
        let age = self.clock.now() - entry.stored_at;
        // A clock that went backwards reads as age zero.
        let age = age.to_std().unwrap_or_default();
        if age < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Stores `value`, replacing any previous entry and restarting its TTL.
    pub fn set(&mut self, key: K, value: V) {
        let stored_at = self.clock.now();
        self.entries.insert(key, Entry { value, stored_at });
    }

    pub fn remove(&mut self, key: &K) {
        self.entries.remove(key);
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drops the entries that have expired.
    pub fn purge_expired(&mut self) {
        let now = self.clock.now();
        let ttl = self.ttl;
        self.entries
            .retain(|_, e| (now - e.stored_at).to_std().unwrap_or_default() < ttl);
    }

    /// Number of entries held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
