//! Cache Handle Module
//!
//! The shared, cloneable cache handle. Every command checks the caller's
//! context once at entry, then takes the single exclusive lock around the
//! store; commands never suspend while holding the lock.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::cache::store::EvictCallback;
use crate::cache::{CacheStats, CacheStore, Value, ValueRecord};
use crate::config::Config;
use crate::context::Context;
use crate::error::Result;
use crate::tasks::Cleaner;

// == Cache ==
/// Shared handle to one cache instance.
///
/// Clones share the same store, sweeper and eviction callback, so the
/// handle can be passed freely between tasks.
#[derive(Clone)]
pub struct Cache {
    /// The single exclusive lock guarding index, recency order and payloads
    store: Arc<Mutex<CacheStore>>,
    /// Background sweeper, present until [`Cache::close`]
    cleaner: Arc<Mutex<Option<Cleaner>>>,
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache").finish_non_exhaustive()
    }
}

impl Cache {
    // == Constructors ==
    /// Creates a cache with no sweeper and no eviction callback.
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        Self::builder(capacity).build()
    }

    /// Starts configuring a cache of the given capacity.
    pub fn builder(capacity: usize) -> CacheBuilder {
        CacheBuilder::new(capacity)
    }

    // == Commands ==
    /// Stores `value` under `key`, expiring `ttl` from now.
    ///
    /// A zero `ttl` inserts an already-expired entry: later reads miss and
    /// `delete` counts the key as absent.
    pub async fn set(
        &self,
        ctx: &Context,
        key: impl Into<String>,
        value: impl Into<Value>,
        ttl: Duration,
    ) -> Result<()> {
        ctx.check()?;
        self.store.lock().await.set(key, value, ttl);
        Ok(())
    }

    /// Inserts only when no slot exists for `key`; see
    /// [`CacheStore::set_nx`] for the expired-slot carve-out.
    pub async fn set_nx(
        &self,
        ctx: &Context,
        key: impl Into<String>,
        value: impl Into<Value>,
        ttl: Duration,
    ) -> Result<bool> {
        ctx.check()?;
        Ok(self.store.lock().await.set_nx(key, value, ttl))
    }

    /// Retrieves the value under `key`, touching its recency.
    pub async fn get(&self, ctx: &Context, key: &str) -> Result<Value> {
        ctx.check()?;
        self.store.lock().await.get(key)
    }

    /// Swaps in `value` and returns the previous value; the write happens
    /// even when the key was absent.
    pub async fn get_set(
        &self,
        ctx: &Context,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Value> {
        ctx.check()?;
        self.store.lock().await.get_set(key, value)
    }

    /// Removes the given keys, returning how many were live at removal.
    pub async fn delete(&self, ctx: &Context, keys: &[&str]) -> Result<i64> {
        ctx.check()?;
        Ok(self.store.lock().await.delete(keys))
    }

    /// Pushes each value at the head of the list under `key`, returning
    /// the new length.
    pub async fn l_push(
        &self,
        ctx: &Context,
        key: impl Into<String>,
        values: Vec<Value>,
    ) -> Result<i64> {
        ctx.check()?;
        self.store.lock().await.l_push(key, values)
    }

    /// Removes and returns the head record of the list under `key`.
    pub async fn l_pop(&self, ctx: &Context, key: &str) -> Result<ValueRecord> {
        ctx.check()?;
        self.store.lock().await.l_pop(key)
    }

    /// Adds the values to the set under `key`, returning the new
    /// cardinality.
    pub async fn s_add(
        &self,
        ctx: &Context,
        key: impl Into<String>,
        values: Vec<Value>,
    ) -> Result<i64> {
        ctx.check()?;
        self.store.lock().await.s_add(key, values)
    }

    /// Removes the values from the set under `key`, returning how many
    /// were members.
    pub async fn s_rem(&self, ctx: &Context, key: &str, values: Vec<Value>) -> Result<i64> {
        ctx.check()?;
        self.store.lock().await.s_rem(key, values)
    }

    /// Adds `delta` to the integer counter under `key`.
    pub async fn incr_by(&self, ctx: &Context, key: impl Into<String>, delta: i64) -> Result<i64> {
        ctx.check()?;
        self.store.lock().await.incr_by(key, delta)
    }

    /// Subtracts `delta` from the integer counter under `key`.
    pub async fn decr_by(&self, ctx: &Context, key: impl Into<String>, delta: i64) -> Result<i64> {
        ctx.check()?;
        self.store.lock().await.decr_by(key, delta)
    }

    /// Adds `delta` to the float counter under `key`.
    pub async fn incr_by_float(
        &self,
        ctx: &Context,
        key: impl Into<String>,
        delta: f64,
    ) -> Result<f64> {
        ctx.check()?;
        self.store.lock().await.incr_by_float(key, delta)
    }

    // == Raw Insertion Path ==
    /// Places a value with no expiry, bypassing the command surface.
    /// Returns whether the key was newly created.
    pub async fn add(&self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        self.store.lock().await.add(key, value)
    }

    /// Places a value with an expiry through the raw path.
    pub async fn add_ttl(
        &self,
        key: impl Into<String>,
        value: impl Into<Value>,
        ttl: Duration,
    ) -> bool {
        self.store.lock().await.add_ttl(key, value, ttl)
    }

    /// Reads the value under `key` without touching recency.
    pub async fn peek(&self, key: &str) -> Option<Value> {
        self.store.lock().await.peek(key)
    }

    /// Removes `key`, returning whether a live entry was dropped.
    pub async fn remove(&self, key: &str) -> bool {
        self.store.lock().await.remove(key)
    }

    // == Observability ==
    /// Returns current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        self.store.lock().await.stats()
    }

    /// Returns the current number of entries, live or awaiting removal.
    pub async fn len(&self) -> usize {
        self.store.lock().await.len()
    }

    /// Returns true if the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.store.lock().await.is_empty()
    }

    // == Shutdown ==
    /// Stops the background sweeper and waits for it to finish.
    ///
    /// Lazy expiry keeps working afterwards; behavior of further commands
    /// is otherwise unspecified. Calling close twice is a no-op.
    pub async fn close(&self) {
        if let Some(cleaner) = self.cleaner.lock().await.take() {
            cleaner.stop().await;
        }
    }
}

// == Cache Builder ==
/// Configures and constructs a [`Cache`].
pub struct CacheBuilder {
    capacity: usize,
    cycle_interval: Option<Duration>,
    evict_callback: Option<EvictCallback>,
}

impl fmt::Debug for CacheBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("capacity", &self.capacity)
            .field("cycle_interval", &self.cycle_interval)
            .field("has_evict_callback", &self.evict_callback.is_some())
            .finish()
    }
}

impl CacheBuilder {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            cycle_interval: None,
            evict_callback: None,
        }
    }

    /// Applies capacity and sweep period from a [`Config`].
    pub fn from_config(config: &Config) -> Self {
        let mut builder = Self::new(config.capacity);
        builder.cycle_interval = config.cycle_interval;
        builder
    }

    /// Enables the background expiry sweeper at the given period.
    pub fn cycle_interval(mut self, period: Duration) -> Self {
        self.cycle_interval = Some(period);
        self
    }

    /// Registers a callback invoked exactly once per removed entry, on
    /// every removal path: delete, capacity eviction, TTL removal and
    /// overwrite.
    ///
    /// The callback runs while the cache lock is held and must not call
    /// back into the cache.
    pub fn evict_callback(
        mut self,
        callback: impl Fn(&str, &Value) + Send + Sync + 'static,
    ) -> Self {
        self.evict_callback = Some(Arc::new(callback));
        self
    }

    /// Builds the cache, spawning the sweeper when a cycle interval was
    /// set.
    ///
    /// Must be called inside a Tokio runtime when a cycle interval is
    /// configured.
    ///
    /// # Panics
    /// Panics if the capacity is 0.
    pub fn build(self) -> Cache {
        let store = Arc::new(Mutex::new(CacheStore::with_callback(
            self.capacity,
            self.evict_callback,
        )));
        let cleaner = self
            .cycle_interval
            .map(|period| Cleaner::spawn(store.clone(), period));
        Cache {
            store,
            cleaner: Arc::new(Mutex::new(cleaner)),
        }
    }
}
