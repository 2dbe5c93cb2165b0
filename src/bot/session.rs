//! Expiring keyed store for short-lived interaction state.
//!
//! Nothing financial lives here; losing the store only loses the link between
//! a game and the message that announced it.

use std::{
    collections::HashMap,
    hash::Hash,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use tracing::debug;

/// Keyed values that disappear `ttl` after insertion.
#[derive(Debug)]
pub struct SessionStore<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, (Instant, V)>>,
}

impl<K, V> SessionStore<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Creates an empty store.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Stores `value`, replacing any previous entry and restarting its clock.
    pub async fn insert(&self, key: K, value: V) {
        self.entries
            .write()
            .await
            .insert(key, (Instant::now() + self.ttl, value));
    }

    /// Returns the value if present and not expired.
    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|(deadline, _)| *deadline > Instant::now())
            .map(|(_, value)| value.clone())
    }

    /// Removes and returns the value; expired values are dropped and not returned.
    pub async fn remove(&self, key: &K) -> Option<V> {
        let (deadline, value) = self.entries.write().await.remove(key)?;
        (deadline > Instant::now()).then_some(value)
    }

    /// Drops every expired entry and returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, (deadline, _)| *deadline > now);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "expired sessions swept");
        }
        removed
    }

    /// Number of stored entries, expired ones included until the next sweep.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no entries at all.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_get_remove() {
        let store = SessionStore::new(Duration::from_secs(60));
        store.insert("game-1".to_string(), 42_u64).await;

        assert_eq!(store.get(&"game-1".to_string()).await, Some(42));
        assert_eq!(store.get(&"game-2".to_string()).await, None);
        assert_eq!(store.remove(&"game-1".to_string()).await, Some(42));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let store = SessionStore::new(Duration::from_millis(20));
        store.insert(1, "stale").await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        store.insert(2, "fresh").await;

        assert_eq!(store.get(&1).await, None);
        assert_eq!(store.get(&2).await, Some("fresh"));
        assert_eq!(store.len().await, 2);

        assert_eq!(store.sweep().await, 1);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.remove(&2).await, Some("fresh"));
    }

    #[tokio::test]
    async fn test_reinsert_restarts_clock() {
        let store = SessionStore::new(Duration::from_millis(50));
        store.insert("k", 1).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        store.insert("k", 2).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(store.get(&"k").await, Some(2));
    }
}
