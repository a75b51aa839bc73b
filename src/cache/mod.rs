use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::time::Instant;
use tracing::debug;

/// In-memory result cache shared by all tools.
///
/// Entries are keyed by tool name plus normalized arguments and carry a
/// per-entry TTL. Values are immutable once written; a refresh overwrites
/// the entry wholesale. Total entries are bounded: when the cache is full,
/// expired entries are purged first and then the entry closest to expiry
/// is dropped.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    max_entries: usize,
}

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            key_locks: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Returns the cached value for `key`, or `None` on a miss.
    /// Never returns an entry past its expiry.
    pub async fn get(&self, key: &str) -> Option<Value> {
        {
            let entries = self.entries.read().await;
            let entry = entries.get(key)?;
            if entry.expires_at > Instant::now() {
                return Some(entry.value.clone());
            }
        }

        // Expired: remove it so the map does not carry dead payloads.
        // Re-check under the write lock in case a refresh got there first.
        let mut entries = self.entries.write().await;
        let still_expired = entries
            .get(key)
            .is_some_and(|entry| entry.expires_at <= Instant::now());
        if still_expired {
            entries.remove(key);
        }
        None
    }

    pub async fn set(&self, key: &str, value: Value, ttl: Duration) {
        let mut entries = self.entries.write().await;

        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            let now = Instant::now();
            entries.retain(|_, entry| entry.expires_at > now);

            if entries.len() >= self.max_entries {
                // Still full: drop the entry closest to expiry
                if let Some(victim) = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(k, _)| k.clone())
                {
                    debug!("Cache full, evicting '{}'", victim);
                    entries.remove(&victim);
                }
            }
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Acquires the per-key guard serializing miss-then-populate sequences,
    /// so concurrent misses on the same key issue at most one external query.
    pub async fn key_lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.key_locks.lock().await;
            // A count of 1 means only the registry holds the lock: no guard
            // out and nobody waiting, so the entry can go. Clones are only
            // taken under this map lock, so the check cannot race.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Builds a deterministic cache key from a tool-specific prefix and the
/// normalized (trimmed, lowercased) query arguments.
pub fn cache_key(prefix: &str, parts: &[&str]) -> String {
    let mut key = String::from(prefix);
    for part in parts {
        key.push('_');
        key.push_str(&part.trim().to_lowercase());
    }
    key
}
