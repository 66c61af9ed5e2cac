//! Cache Store Module
//!
//! The synchronous cache core: typed command semantics on top of the LRU
//! index, with lazy TTL expiry and an eviction callback fired exactly once
//! per removed entry.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::lru::LruIndex;
use crate::cache::{CacheEntry, CacheStats, Value, ValueRecord};
use crate::error::{CacheError, Result};

// == Evict Callback ==
/// Called with the key and its last stored value on every removal path:
/// explicit delete, capacity eviction, TTL removal and overwrite.
///
/// The callback runs while the cache lock is held, so it observes a
/// consistent cache but must not call back into the cache.
pub type EvictCallback = Arc<dyn Fn(&str, &Value) + Send + Sync>;

// == Cache Store ==
/// Cache core combining the LRU index with the typed command set.
///
/// Not thread-safe on its own; the shared [`Cache`](crate::cache::Cache)
/// handle wraps it in the single exclusive lock.
pub struct CacheStore {
    /// Key map plus recency order
    index: LruIndex,
    /// Performance counters
    stats: CacheStats,
    /// Removal callback, invoked once per removed entry
    on_evict: Option<EvictCallback>,
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("capacity", &self.index.capacity())
            .field("len", &self.index.len())
            .field("has_evict_callback", &self.on_evict.is_some())
            .finish()
    }
}

impl CacheStore {
    // == Constructors ==
    /// Creates a store with the given capacity and no eviction callback.
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        Self::with_callback(capacity, None)
    }

    /// Creates a store with an optional eviction callback.
    pub(crate) fn with_callback(capacity: usize, on_evict: Option<EvictCallback>) -> Self {
        Self {
            index: LruIndex::new(capacity),
            stats: CacheStats::new(),
            on_evict,
        }
    }

    // == Set ==
    /// Stores `value` under `key`, expiring `ttl` from now.
    ///
    /// Overwrites any existing entry (the callback sees the old value) and
    /// evicts the recency tail when a new key pushes the cache over
    /// capacity. A zero `ttl` inserts an entry that is already expired:
    /// every later read misses and `delete` counts the key as absent.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>, ttl: Duration) {
        self.insert_entry(key.into(), CacheEntry::new(value.into(), Some(ttl)));
    }

    // == SetNX ==
    /// Inserts only when no slot exists for `key`, returning whether the
    /// insert happened.
    ///
    /// Any still-present slot blocks the insert, even an expired one. An
    /// expired blocker is removed on the way (its callback fires) so the
    /// space is reclaimed, but this call still returns false.
    pub fn set_nx(&mut self, key: impl Into<String>, value: impl Into<Value>, ttl: Duration) -> bool {
        let key = key.into();
        if self.index.lookup(&key).is_some() {
            self.expire_if_stale(&key);
            return false;
        }
        self.insert_entry(key, CacheEntry::new(value.into(), Some(ttl)));
        true
    }

    // == Get ==
    /// Retrieves the value under `key`, touching its recency.
    ///
    /// An expired entry is removed in-line and reported as a miss.
    pub fn get(&mut self, key: &str) -> Result<Value> {
        if self.expire_if_stale(key) {
            self.stats.record_miss();
            return Err(CacheError::KeyNotExist);
        }
        match self.index.lookup(key) {
            Some(entry) => {
                let value = entry.value.clone();
                self.index.touch(key);
                self.stats.record_hit();
                Ok(value)
            }
            None => {
                self.stats.record_miss();
                Err(CacheError::KeyNotExist)
            }
        }
    }

    // == GetSet ==
    /// Swaps in `value`, stored as a string with no expiry, and returns the
    /// previous value.
    ///
    /// The write happens even when the key was absent; the previous value
    /// is then reported as `KeyNotExist`. The previous value comes back
    /// as-is regardless of its variant.
    pub fn get_set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<Value> {
        let key = key.into();
        let previous = if self.expire_if_stale(&key) {
            Err(CacheError::KeyNotExist)
        } else {
            match self.index.lookup(&key) {
                Some(entry) => Ok(entry.value.clone()),
                None => Err(CacheError::KeyNotExist),
            }
        };
        self.insert_entry(key, CacheEntry::new(Value::Str(value.into()), None));
        previous
    }

    // == Delete ==
    /// Removes the given keys, returning how many were live at removal.
    ///
    /// Expired-but-present slots are removed (their callbacks fire) without
    /// being counted.
    pub fn delete(&mut self, keys: &[&str]) -> i64 {
        let mut removed = 0;
        for &key in keys {
            if self.remove(key) {
                removed += 1;
            }
        }
        removed
    }

    // == LPush ==
    /// Pushes each value at the head of the list under `key`, in argument
    /// order, creating the list when the key is absent. Returns the new
    /// length.
    pub fn l_push(&mut self, key: impl Into<String>, values: Vec<Value>) -> Result<i64> {
        let key = key.into();
        self.expire_if_stale(&key);
        match self.index.lookup_mut(&key) {
            Some(entry) => {
                let list = match &mut entry.value {
                    Value::List(list) => list,
                    _ => return Err(CacheError::TypeMismatch("a list")),
                };
                for value in values {
                    list.push_front(ValueRecord::new(value));
                }
                let len = list.len() as i64;
                self.index.touch(&key);
                Ok(len)
            }
            None => {
                let mut list = VecDeque::with_capacity(values.len());
                for value in values {
                    list.push_front(ValueRecord::new(value));
                }
                let len = list.len() as i64;
                self.insert_entry(key, CacheEntry::new(Value::List(list), None));
                Ok(len)
            }
        }
    }

    // == LPop ==
    /// Removes and returns the head record of the list under `key`.
    ///
    /// An emptied list stays in the cache under its key; popping it again
    /// reports `KeyNotExist`.
    pub fn l_pop(&mut self, key: &str) -> Result<ValueRecord> {
        self.expire_if_stale(key);
        match self.index.lookup_mut(key) {
            Some(entry) => {
                let list = match &mut entry.value {
                    Value::List(list) => list,
                    _ => return Err(CacheError::TypeMismatch("a list")),
                };
                let record = list.pop_front().ok_or(CacheError::KeyNotExist)?;
                self.index.touch(key);
                Ok(record)
            }
            None => Err(CacheError::KeyNotExist),
        }
    }

    // == SAdd ==
    /// Adds the values to the set under `key`, creating the set when the
    /// key is absent. Duplicates collapse; returns the new cardinality.
    pub fn s_add(&mut self, key: impl Into<String>, values: Vec<Value>) -> Result<i64> {
        let key = key.into();
        self.expire_if_stale(&key);
        match self.index.lookup_mut(&key) {
            Some(entry) => {
                let set = match &mut entry.value {
                    Value::Set(set) => set,
                    _ => return Err(CacheError::TypeMismatch("a set")),
                };
                for value in values {
                    set.insert(value);
                }
                let cardinality = set.len() as i64;
                self.index.touch(&key);
                Ok(cardinality)
            }
            None => {
                let set: HashSet<Value> = values.into_iter().collect();
                let cardinality = set.len() as i64;
                self.insert_entry(key, CacheEntry::new(Value::Set(set), None));
                Ok(cardinality)
            }
        }
    }

    // == SRem ==
    /// Removes the values from the set under `key`, returning how many
    /// were actually members. An emptied set stays in the cache.
    pub fn s_rem(&mut self, key: &str, values: Vec<Value>) -> Result<i64> {
        self.expire_if_stale(key);
        match self.index.lookup_mut(key) {
            Some(entry) => {
                let set = match &mut entry.value {
                    Value::Set(set) => set,
                    _ => return Err(CacheError::TypeMismatch("a set")),
                };
                let mut removed = 0;
                for value in &values {
                    if set.remove(value) {
                        removed += 1;
                    }
                }
                self.index.touch(key);
                Ok(removed)
            }
            None => Err(CacheError::KeyNotExist),
        }
    }

    // == IncrBy ==
    /// Adds `delta` to the integer counter under `key`, creating it at
    /// `delta` when absent. Wraps on overflow.
    pub fn incr_by(&mut self, key: impl Into<String>, delta: i64) -> Result<i64> {
        let key = key.into();
        self.expire_if_stale(&key);
        match self.index.lookup_mut(&key) {
            Some(entry) => {
                let current = match entry.value {
                    Value::Int(v) => v,
                    _ => return Err(CacheError::TypeMismatch("int64")),
                };
                let next = current.wrapping_add(delta);
                entry.value = Value::Int(next);
                self.index.touch(&key);
                Ok(next)
            }
            None => {
                self.insert_entry(key, CacheEntry::new(Value::Int(delta), None));
                Ok(delta)
            }
        }
    }

    // == DecrBy ==
    /// Subtracts `delta` from the integer counter under `key`, creating it
    /// at `-delta` when absent.
    pub fn decr_by(&mut self, key: impl Into<String>, delta: i64) -> Result<i64> {
        self.incr_by(key, delta.wrapping_neg())
    }

    // == IncrByFloat ==
    /// Adds `delta` to the float counter under `key`, creating it at
    /// `delta` when absent. NaN and infinities propagate.
    pub fn incr_by_float(&mut self, key: impl Into<String>, delta: f64) -> Result<f64> {
        let key = key.into();
        self.expire_if_stale(&key);
        match self.index.lookup_mut(&key) {
            Some(entry) => {
                let current = match entry.value {
                    Value::Float(v) => v,
                    _ => return Err(CacheError::TypeMismatch("float64")),
                };
                let next = current + delta;
                entry.value = Value::Float(next);
                self.index.touch(&key);
                Ok(next)
            }
            None => {
                self.insert_entry(key, CacheEntry::new(Value::Float(delta), None));
                Ok(delta)
            }
        }
    }

    // == Raw Insertion Path ==
    /// Places a value with no expiry, bypassing the command surface.
    /// Returns whether the key was newly created.
    ///
    /// This is the only way to produce an entry that never expires; the
    /// commands themselves always attach expiry metadata on `set`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        self.insert_entry(key.into(), CacheEntry::new(value.into(), None))
    }

    /// Places a value with an expiry through the raw path. Returns whether
    /// the key was newly created.
    pub fn add_ttl(&mut self, key: impl Into<String>, value: impl Into<Value>, ttl: Duration) -> bool {
        self.insert_entry(key.into(), CacheEntry::new(value.into(), Some(ttl)))
    }

    /// Reads the value under `key` without touching recency.
    ///
    /// Expired entries are dropped on the way, exactly as the commands do.
    pub fn peek(&mut self, key: &str) -> Option<Value> {
        if self.expire_if_stale(key) {
            return None;
        }
        self.index.lookup(key).map(|entry| entry.value.clone())
    }

    /// Removes `key`, returning whether a live entry was dropped.
    ///
    /// An expired slot is removed as well (callback fires) but reads as
    /// absent, so the return is false.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.index.remove(key) {
            Some(entry) => {
                self.emit_evict(key, &entry.value);
                let live = !entry.is_expired();
                if !live {
                    self.stats.record_expiration();
                }
                self.sync_len();
                live
            }
            None => false,
        }
    }

    // == Expiry Sweep ==
    /// Removes expired entries from the recency tail, stopping at the
    /// first live tail entry. Returns how many entries were dropped.
    ///
    /// The tail region is where expired entries accumulate under LRU
    /// traffic, which keeps each tick cheap compared to a full scan.
    pub fn sweep_expired_tail(&mut self) -> usize {
        let mut removed = 0;
        while let Some((_, entry)) = self.index.peek_tail() {
            if !entry.is_expired() {
                break;
            }
            if let Some((key, entry)) = self.index.pop_tail() {
                self.emit_evict(&key, &entry.value);
                self.stats.record_expiration();
                removed += 1;
            }
        }
        self.sync_len();
        removed
    }

    // == Accessors ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.index.len());
        stats
    }

    /// Returns the current number of entries, live or awaiting removal.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.index.len() == 0
    }

    /// Returns the maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.index.capacity()
    }

    // == Internal Helpers ==

    /// Inserts an entry at the front, firing the callback for whatever the
    /// insert displaced. Returns whether the key was newly created.
    fn insert_entry(&mut self, key: String, entry: CacheEntry) -> bool {
        let outcome = self.index.insert(key.clone(), entry);
        if let Some(replaced) = &outcome.replaced {
            self.emit_evict(&key, &replaced.value);
        }
        if let Some((evicted_key, evicted)) = &outcome.evicted {
            self.emit_evict(evicted_key, &evicted.value);
            self.stats.record_eviction();
        }
        self.sync_len();
        outcome.created
    }

    /// Drops the entry under `key` when it is present but expired.
    ///
    /// Returns true when a stale entry was removed; its callback fires and
    /// the removal counts as an expiration.
    fn expire_if_stale(&mut self, key: &str) -> bool {
        let stale = matches!(self.index.lookup(key), Some(entry) if entry.is_expired());
        if stale {
            if let Some(entry) = self.index.remove(key) {
                self.emit_evict(key, &entry.value);
                self.stats.record_expiration();
                self.sync_len();
            }
        }
        stale
    }

    /// Invokes the eviction callback, when one is registered.
    fn emit_evict(&self, key: &str, value: &Value) {
        if let Some(callback) = &self.on_evict {
            callback(key, value);
        }
    }

    fn sync_len(&mut self) {
        self.stats.set_total_entries(self.index.len());
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread::sleep;

    const LONG_TTL: Duration = Duration::from_secs(60);
    const SHORT_TTL: Duration = Duration::from_millis(20);

    /// Store whose callback counts every removal.
    fn counting_store(capacity: usize) -> (CacheStore, Arc<AtomicUsize>) {
        let counter = Arc::new(AtomicUsize::new(0));
        let hits = counter.clone();
        let store = CacheStore::with_callback(
            capacity,
            Some(Arc::new(move |_key: &str, _value: &Value| {
                hits.fetch_add(1, Ordering::SeqCst);
            })),
        );
        (store, counter)
    }

    #[test]
    fn test_set_and_get() {
        let mut store = CacheStore::new(5);

        store.set("test", "hello cache", LONG_TTL);
        assert_eq!(store.get("test").unwrap(), Value::from("hello cache"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_missing() {
        let mut store = CacheStore::new(5);
        assert_eq!(store.get("missing"), Err(CacheError::KeyNotExist));
    }

    #[test]
    fn test_set_overwrite_fires_callback() {
        let (mut store, counter) = counting_store(5);

        store.set("test", "old", LONG_TTL);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        store.set("test", "new", LONG_TTL);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(store.get("test").unwrap(), Value::from("new"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_lazy_expiry_on_get() {
        let (mut store, counter) = counting_store(5);

        store.set("test", "value", SHORT_TTL);
        assert!(store.get("test").is_ok());

        sleep(Duration::from_millis(40));

        assert_eq!(store.get("test"), Err(CacheError::KeyNotExist));
        assert_eq!(store.len(), 0, "expired entry must leave the index");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_ttl_expired_at_insert() {
        let mut store = CacheStore::new(5);

        store.set("name", "Alex", Duration::ZERO);
        assert_eq!(store.get("name"), Err(CacheError::KeyNotExist));
    }

    #[test]
    fn test_capacity_eviction_lru_order() {
        let (mut store, counter) = counting_store(1);

        store.set("a", "1", LONG_TTL);
        store.set("b", "2", LONG_TTL);

        assert_eq!(store.get("a"), Err(CacheError::KeyNotExist));
        assert_eq!(store.get("b").unwrap(), Value::from("2"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_get_touch_protects_from_eviction() {
        let mut store = CacheStore::new(3);

        store.set("a", "1", LONG_TTL);
        store.set("b", "2", LONG_TTL);
        store.set("c", "3", LONG_TTL);

        store.get("a").unwrap();
        store.set("d", "4", LONG_TTL);

        assert!(store.get("a").is_ok());
        assert_eq!(store.get("b"), Err(CacheError::KeyNotExist));
    }

    #[test]
    fn test_set_nx() {
        let mut store = CacheStore::new(5);

        assert!(store.set_nx("test", "hello cache", LONG_TTL));
        assert!(!store.set_nx("test", "hello world", LONG_TTL));
        assert_eq!(store.get("test").unwrap(), Value::from("hello cache"));
    }

    #[test]
    fn test_set_nx_expired_slot_blocks_and_clears() {
        let (mut store, counter) = counting_store(5);

        store.set("test", "stale", SHORT_TTL);
        sleep(Duration::from_millis(40));

        // the expired slot still blocks the insert, but gets reclaimed
        assert!(!store.set_nx("test", "fresh", LONG_TTL));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(store.len(), 0);

        // with the slot gone, the next attempt succeeds
        assert!(store.set_nx("test", "fresh", LONG_TTL));
        assert_eq!(store.get("test").unwrap(), Value::from("fresh"));
    }

    #[test]
    fn test_get_set() {
        let mut store = CacheStore::new(5);

        store.add("test", "hello cache");
        let previous = store.get_set("test", "hello world").unwrap();
        assert_eq!(previous, Value::from("hello cache"));
        assert_eq!(store.peek("test").unwrap(), Value::from("hello world"));
    }

    #[test]
    fn test_get_set_writes_on_miss() {
        let mut store = CacheStore::new(5);

        assert_eq!(
            store.get_set("test", "hello world"),
            Err(CacheError::KeyNotExist)
        );
        assert_eq!(store.peek("test").unwrap(), Value::from("hello world"));
    }

    #[test]
    fn test_delete_counts_only_live() {
        let mut store = CacheStore::new(5);

        store.set("name", "Alex", Duration::ZERO);
        store.set("age", 18i64, Duration::ZERO);
        assert_eq!(store.delete(&["name", "age"]), 0);
        assert_eq!(store.len(), 0, "expired slots are still reclaimed");

        store.set("name", "Alex", Duration::from_secs(10));
        store.set("age", 18i64, Duration::from_secs(10));
        assert_eq!(store.delete(&["name", "age"]), 2);

        assert_eq!(store.delete(&["missing"]), 0);
    }

    #[test]
    fn test_delete_mixed_live_and_missing() {
        let mut store = CacheStore::new(5);

        store.set("name", "Alex", Duration::from_secs(10));
        store.set("age", 18i64, Duration::from_secs(10));
        store.set("gender", "male", Duration::from_secs(10));

        assert_eq!(store.delete(&["name", "age", "gender", "addr"]), 3);
    }

    #[test]
    fn test_l_push_and_pop_head_order() {
        let mut store = CacheStore::new(5);

        let len = store
            .l_push("t", vec![Value::from("a"), Value::from("b")])
            .unwrap();
        assert_eq!(len, 2);

        // each argument was pushed at the head, so "b" pops first
        assert_eq!(store.l_pop("t").unwrap().value, Value::from("b"));
        assert_eq!(store.l_pop("t").unwrap().value, Value::from("a"));
    }

    #[test]
    fn test_l_push_onto_existing_list() {
        let mut store = CacheStore::new(5);

        store.l_push("test", vec![Value::from("hello cache")]).unwrap();
        let len = store
            .l_push("test", vec![Value::from("hello world")])
            .unwrap();
        assert_eq!(len, 2);
    }

    #[test]
    fn test_l_push_type_mismatch_leaves_entry() {
        let mut store = CacheStore::new(5);

        store.add("test", "string");
        assert_eq!(
            store.l_push("test", vec![Value::from("x")]),
            Err(CacheError::TypeMismatch("a list"))
        );
        assert_eq!(store.get("test").unwrap(), Value::from("string"));
    }

    #[test]
    fn test_l_pop_missing_and_mismatch() {
        let mut store = CacheStore::new(5);

        assert_eq!(store.l_pop("test"), Err(CacheError::KeyNotExist));

        store.add("test", "hello world");
        assert_eq!(store.l_pop("test"), Err(CacheError::TypeMismatch("a list")));
    }

    #[test]
    fn test_emptied_list_is_retained() {
        let mut store = CacheStore::new(5);

        store.l_push("t", vec![Value::from("only")]).unwrap();
        store.l_pop("t").unwrap();

        match store.peek("t") {
            Some(Value::List(list)) => assert!(list.is_empty()),
            other => panic!("expected an empty list, got {other:?}"),
        }
        assert_eq!(store.l_pop("t"), Err(CacheError::KeyNotExist));
    }

    #[test]
    fn test_s_add_collapses_duplicates() {
        let mut store = CacheStore::new(5);

        let n = store
            .s_add("test", vec![Value::from("a"), Value::from("b"), Value::from("a")])
            .unwrap();
        assert_eq!(n, 2);

        let n = store.s_add("test", vec![Value::from("b")]).unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn test_s_add_type_mismatch() {
        let mut store = CacheStore::new(5);

        store.add("test", "string");
        assert_eq!(
            store.s_add("test", vec![Value::from("x")]),
            Err(CacheError::TypeMismatch("a set"))
        );
    }

    #[test]
    fn test_s_rem_counts_members() {
        let mut store = CacheStore::new(5);

        store
            .s_add("test", vec![Value::from("hello world"), Value::from("hello cache")])
            .unwrap();

        assert_eq!(store.s_rem("test", vec![Value::from("hello world")]).unwrap(), 1);
        assert_eq!(store.s_rem("test", vec![Value::from("absent")]).unwrap(), 0);
        assert_eq!(
            store.s_rem("missing", vec![Value::from("x")]),
            Err(CacheError::KeyNotExist)
        );
    }

    #[test]
    fn test_s_rem_type_mismatch() {
        let mut store = CacheStore::new(5);

        store.add("test", 1i64);
        assert_eq!(
            store.s_rem("test", vec![Value::from("x")]),
            Err(CacheError::TypeMismatch("a set"))
        );
    }

    #[test]
    fn test_incr_by() {
        let mut store = CacheStore::new(5);

        assert_eq!(store.incr_by("k", 1).unwrap(), 1);
        assert_eq!(store.incr_by("k", 1).unwrap(), 2);
    }

    #[test]
    fn test_incr_by_type_mismatch_leaves_entry() {
        let mut store = CacheStore::new(5);

        store.add("k", 12.62f64);
        assert_eq!(store.incr_by("k", 1), Err(CacheError::TypeMismatch("int64")));
        assert_eq!(store.peek("k").unwrap(), Value::from(12.62f64));
    }

    #[test]
    fn test_incr_by_wraps_on_overflow() {
        let mut store = CacheStore::new(5);

        store.add("k", i64::MAX);
        assert_eq!(store.incr_by("k", 1).unwrap(), i64::MIN);
    }

    #[test]
    fn test_decr_by() {
        let mut store = CacheStore::new(5);

        assert_eq!(store.decr_by("test", 1).unwrap(), -1);

        store.add("old", 3i64);
        assert_eq!(store.decr_by("old", 2).unwrap(), 1);

        store.add("f", 3.156f64);
        assert_eq!(store.decr_by("f", 1), Err(CacheError::TypeMismatch("int64")));
    }

    #[test]
    fn test_incr_by_float() {
        let mut store = CacheStore::new(5);

        assert_eq!(store.incr_by_float("test", 2.0).unwrap(), 2.0);

        store.add("v", 3.1f64);
        let next = store.incr_by_float("v", -2.0).unwrap();
        assert!((next - 1.1).abs() < 1e-9);

        store.add("s", "hello");
        assert_eq!(
            store.incr_by_float("s", 10.0),
            Err(CacheError::TypeMismatch("float64"))
        );
    }

    #[test]
    fn test_incr_by_float_propagates_nan() {
        let mut store = CacheStore::new(5);

        store.add("v", 1.0f64);
        assert!(store.incr_by_float("v", f64::NAN).unwrap().is_nan());
    }

    #[test]
    fn test_mismatch_does_not_touch_recency() {
        let mut store = CacheStore::new(2);

        store.add("victim", 1i64);
        store.add("other", "x");

        // failed commands on "victim" must not refresh its recency
        assert!(store.l_push("victim", vec![Value::from("x")]).is_err());
        assert!(store.incr_by_float("victim", 1.0).is_err());

        store.add("new", "y");
        assert!(store.peek("victim").is_none(), "victim stayed at the tail");
        assert!(store.peek("other").is_some());
    }

    #[test]
    fn test_remove_returns_liveness() {
        let (mut store, counter) = counting_store(5);

        store.add("test", "hello cache");
        assert!(store.remove("test"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        store.add_ttl("test", "hello cache", SHORT_TTL);
        sleep(Duration::from_millis(40));
        assert!(!store.remove("test"), "expired slot reads as absent");
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        assert!(!store.remove("test"));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_peek_lazy_expires() {
        let (mut store, counter) = counting_store(5);

        store.add_ttl("test", "hello cache", SHORT_TTL);
        assert!(store.peek("test").is_some());

        sleep(Duration::from_millis(40));
        assert!(store.peek("test").is_none());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_sweep_removes_expired_tail_run() {
        let (mut store, counter) = counting_store(5);

        store.set("old1", "1", SHORT_TTL);
        store.set("old2", "2", SHORT_TTL);
        store.set("fresh", "3", LONG_TTL);

        sleep(Duration::from_millis(40));

        assert_eq!(store.sweep_expired_tail(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(store.len(), 1);
        assert!(store.get("fresh").is_ok());
    }

    #[test]
    fn test_sweep_stops_at_live_tail() {
        let mut store = CacheStore::new(5);

        store.set("live", "2", LONG_TTL);
        store.set("expired", "1", SHORT_TTL);

        sleep(Duration::from_millis(40));

        // the expired entry sits at the front, so the sweep sees the live
        // tail and stops without removing anything
        assert_eq!(store.sweep_expired_tail(), 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_callback_exactly_once_across_paths() {
        let (mut store, counter) = counting_store(2);

        store.set("a", "1", LONG_TTL); // created
        store.set("a", "2", LONG_TTL); // overwrite      -> 1
        store.set("b", "3", LONG_TTL); // created
        store.set("c", "4", LONG_TTL); // evicts "a"     -> 2
        store.delete(&["b"]); // explicit delete          -> 3
        store.set("d", "5", SHORT_TTL);
        sleep(Duration::from_millis(40));
        let _ = store.get("d"); // lazy expiry            -> 4
        store.set("e", "6", SHORT_TTL);
        store.get("c").unwrap(); // leaves "e" at the tail
        sleep(Duration::from_millis(40));
        store.sweep_expired_tail(); // sweep "e"          -> 5, "c" live

        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_capacity_bound_holds() {
        let mut store = CacheStore::new(3);

        for i in 0..50 {
            store.set(format!("key_{i}"), "v", LONG_TTL);
            assert!(store.len() <= 3);
        }
    }

    #[test]
    fn test_stats_accounting() {
        let mut store = CacheStore::new(5);

        store.set("k", "v", LONG_TTL);
        store.get("k").unwrap();
        let _ = store.get("missing");

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_opaque_payload_roundtrip() {
        let mut store = CacheStore::new(5);

        store.add("blob", Value::opaque(vec![1u8, 2, 3]));
        let value = store.peek("blob").unwrap();
        assert_eq!(value.type_name(), "opaque");
        assert_eq!(value.downcast_ref::<Vec<u8>>().unwrap(), &vec![1u8, 2, 3]);

        // typed commands reject the opaque payload without corrupting it
        assert_eq!(store.incr_by("blob", 1), Err(CacheError::TypeMismatch("int64")));
        assert!(store.peek("blob").unwrap().downcast_ref::<Vec<u8>>().is_some());
    }
}
