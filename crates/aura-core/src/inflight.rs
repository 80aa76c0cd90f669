//! Re-entrancy guards for per-target actions, and a token that lets late
//! responses recognise they are stale.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Set of keys with an action in flight. Different keys run concurrently;
/// the same key is refused until its guard drops.
#[derive(Debug)]
pub struct InFlight<K: Eq + Hash + Clone> {
    active: Arc<Mutex<HashSet<K>>>,
}

impl<K: Eq + Hash + Clone> Default for InFlight<K> {
    fn default() -> Self {
        Self {
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

impl<K: Eq + Hash + Clone> Clone for InFlight<K> {
    fn clone(&self) -> Self {
        Self {
            active: self.active.clone(),
        }
    }
}

impl<K: Eq + Hash + Clone> InFlight<K> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<K>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn try_begin(&self, key: K) -> Option<InFlightGuard<K>> {
        if !self.lock().insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard {
            active: self.active.clone(),
            key,
        })
    }

    pub fn is_active(&self, key: &K) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Releases its key on drop.
#[derive(Debug)]
pub struct InFlightGuard<K: Eq + Hash + Clone> {
    active: Arc<Mutex<HashSet<K>>>,
    key: K,
}

impl<K: Eq + Hash + Clone> InFlightGuard<K> {
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K: Eq + Hash + Clone> Drop for InFlightGuard<K> {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}

/// Request tokens issued per target. A token stays current until a newer
/// one is issued for the same target; other targets never invalidate it.
#[derive(Debug, Default)]
pub struct RequestGeneration {
    next: AtomicU64,
    latest: Mutex<HashMap<String, u64>>,
}

impl RequestGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self, key: &str) -> u64 {
        let token = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), token);
        token
    }

    pub fn is_current(&self, key: &str, token: u64) -> bool {
        self.latest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .is_some_and(|latest| *latest == token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_refused_until_guard_drops() {
        let flights: InFlight<String> = InFlight::new();
        let guard = flights.try_begin("B1".into()).unwrap();
        assert!(flights.try_begin("B1".into()).is_none());
        assert!(flights.is_active(&"B1".to_string()));
        drop(guard);
        assert!(flights.is_empty());
        assert!(flights.try_begin("B1".into()).is_some());
    }

    #[test]
    fn different_keys_run_together() {
        let flights: InFlight<&str> = InFlight::new();
        let a = flights.try_begin("B1").unwrap();
        let b = flights.try_begin("B2").unwrap();
        assert_eq!(flights.len(), 2);
        assert_eq!(*a.key(), "B1");
        drop(b);
        assert_eq!(flights.len(), 1);
    }

    #[test]
    fn clones_share_the_set() {
        let flights: InFlight<u32> = InFlight::new();
        let other = flights.clone();
        let _g = flights.try_begin(1).unwrap();
        assert!(other.try_begin(1).is_none());
    }

    #[test]
    fn reissue_for_same_target_makes_token_stale() {
        let requests = RequestGeneration::new();
        let first = requests.issue("F1");
        let second = requests.issue("F1");
        assert!(!requests.is_current("F1", first));
        assert!(requests.is_current("F1", second));
    }

    #[test]
    fn other_targets_do_not_invalidate_token() {
        let requests = RequestGeneration::new();
        let a = requests.issue("F1");
        let b = requests.issue("E1");
        assert!(requests.is_current("F1", a));
        assert!(requests.is_current("E1", b));
        assert!(!requests.is_current("S9", a));
    }
}
