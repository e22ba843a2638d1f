//! In-memory key-value storage backing the KV command surface, `DUMP`/`LOADDB` and `FLUSHALL`.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::errors::StorageError;
use crate::value_entry::ValueEntry;

pub type Db = HashMap<String, ValueEntry>;

pub struct Storage {
    db: RwLock<Db>,
}

impl Storage {
    pub fn new() -> Self {
        Storage { db: RwLock::new(HashMap::new()) }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let mut guard = self.db.write().await;
        match guard.get(key) {
            Some(entry) if entry.is_expired() => {
                guard.remove(key);
                None
            }
            Some(entry) => Some(entry.value().to_string()),
            None => None,
        }
    }

    pub async fn set(&self, key: String, value: String, ex: Option<u64>, px: Option<u64>) {
        let mut guard = self.db.write().await;
        guard.insert(key, ValueEntry::new(value, ex, px));
    }

    pub async fn getset(&self, key: String, value: String) -> Option<String> {
        let mut guard = self.db.write().await;
        let previous = guard.get(&key).filter(|e| !e.is_expired()).map(|e| e.value().to_string());
        guard.insert(key, ValueEntry::no_expire(value));
        previous
    }

    pub async fn del(&self, keys: &[String]) -> i64 {
        let mut guard = self.db.write().await;
        keys.iter().filter(|k| guard.remove(k.as_str()).is_some()).count() as i64
    }

    pub async fn mget(&self, keys: &[String]) -> Vec<Option<String>> {
        let mut guard = self.db.write().await;
        keys.iter()
            .map(|k| match guard.get(k) {
                Some(e) if e.is_expired() => {
                    guard.remove(k);
                    None
                }
                Some(e) => Some(e.value().to_string()),
                None => None,
            })
            .collect()
    }

    pub async fn append(&self, key: &str, suffix: &str) -> usize {
        let mut guard = self.db.write().await;
        match guard.get_mut(key) {
            Some(entry) if !entry.is_expired() => entry.append(suffix),
            _ => {
                guard.insert(key.to_string(), ValueEntry::no_expire(suffix.to_string()));
                suffix.len()
            }
        }
    }

    /// Shared integer increment/decrement for `INCR`/`INCRBY`/`DECR`/`DECRBY`.
    pub async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, StorageError> {
        let mut guard = self.db.write().await;
        let current: i64 = match guard.get(key) {
            Some(entry) if !entry.is_expired() => {
                entry.value().parse().map_err(|_| StorageError::NotAnInteger)?
            }
            _ => 0,
        };
        let next = current.checked_add(delta).ok_or(StorageError::NotAnInteger)?;
        guard.insert(key.to_string(), ValueEntry::no_expire(next.to_string()));
        Ok(next)
    }

    pub async fn incr_by_float(&self, key: &str, delta: f64) -> Result<f64, StorageError> {
        let mut guard = self.db.write().await;
        let current: f64 = match guard.get(key) {
            Some(entry) if !entry.is_expired() => {
                entry.value().parse().map_err(|_| StorageError::NotAFloat)?
            }
            _ => 0.0,
        };
        let next = current + delta;
        guard.insert(key.to_string(), ValueEntry::no_expire(format!("{}", next)));
        Ok(next)
    }

    pub async fn flushall(&self) {
        self.db.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.db.read().await.len()
    }

    /// Snapshot of every live (non-expired) key for `DUMP`.
    pub async fn snapshot(&self) -> Vec<(String, String, Option<u64>)> {
        let guard = self.db.read().await;
        guard
            .iter()
            .filter(|(_, e)| !e.is_expired())
            .map(|(k, e)| (k.clone(), e.value().to_string(), e.expires_at_ms()))
            .collect()
    }

    /// Replaces the whole keyspace, used by `LOADDB` once a snapshot file has been parsed.
    pub async fn load(&self, entries: Vec<(String, String, Option<u64>)>) {
        let mut guard = self.db.write().await;
        guard.clear();
        for (k, v, expire_at_ms) in entries {
            guard.insert(k, ValueEntry::new_absolute(v, expire_at_ms));
        }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let s = Storage::new();
        s.set("k".into(), "v".into(), None, None).await;
        assert_eq!(s.get("k").await, Some("v".into()));
    }

    #[tokio::test]
    async fn expired_key_reads_as_missing() {
        let s = Storage::new();
        s.set("k".into(), "v".into(), None, Some(0)).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert_eq!(s.get("k").await, None);
    }

    #[tokio::test]
    async fn incr_by_on_missing_key_starts_at_zero() {
        let s = Storage::new();
        assert_eq!(s.incr_by("counter", 5).await.unwrap(), 5);
        assert_eq!(s.incr_by("counter", -2).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn incr_by_on_non_integer_errors() {
        let s = Storage::new();
        s.set("k".into(), "not a number".into(), None, None).await;
        assert!(s.incr_by("k", 1).await.is_err());
    }

    #[tokio::test]
    async fn append_on_missing_key_creates_it() {
        let s = Storage::new();
        let len = s.append("k", "hello").await;
        assert_eq!(len, 5);
        assert_eq!(s.get("k").await, Some("hello".into()));
    }

    #[tokio::test]
    async fn del_counts_only_existing_keys() {
        let s = Storage::new();
        s.set("a".into(), "1".into(), None, None).await;
        let removed = s.del(&["a".to_string(), "b".to_string()]).await;
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn flushall_empties_keyspace() {
        let s = Storage::new();
        s.set("a".into(), "1".into(), None, None).await;
        s.flushall().await;
        assert_eq!(s.len().await, 0);
    }
}
