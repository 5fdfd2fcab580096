use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use log::{debug, trace};
use parking_lot::RwLock;

use crate::bucket::Bucket;
use crate::config::Config;
use crate::error::HashMapError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    Resizing,
}

/// The primary/secondary bucket arrays and the resize state, bundled under one lock so a state
/// transition (`Normal` <-> `Resizing`, or swapping which `Vec` is primary) is a single
/// linearization point.
struct Inner<K, V> {
    state: State,
    primary: Vec<Bucket<K, V>>,
    secondary: Vec<Bucket<K, V>>,
}

/// A concurrent hash map that resizes incrementally.
///
/// Growth is never a single stop-the-world rehash: once the load factor is exceeded, a second
/// ("secondary") table is allocated and every subsequent operation migrates a small, bounded
/// number of entries from the old ("primary") table into it, in addition to doing its own work.
/// Once the primary table is empty the tables are swapped and the map returns to normal operation.
/// Every entry lives behind its own bucket-level lock, so unrelated keys never contend.
pub struct HashMap<K, V, S = RandomState> {
    inner: RwLock<Inner<K, V>>,
    primary_size: AtomicU64,
    secondary_size: AtomicU64,
    move_quota: AtomicU64,
    next_bucket_to_drain: AtomicUsize,
    max_load_factor: f64,
    increase_rate: f64,
    hash_builder: S,
}

impl<K, V> HashMap<K, V, RandomState>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::with_capacity(crate::config::DEFAULT_INITIAL_BUCKETS)
    }

    pub fn with_capacity(buckets: usize) -> Self {
        Config::new()
            .initial_buckets(buckets.max(1))
            .build()
            .expect("default configuration is always valid")
    }

    pub fn try_with_capacity(buckets: usize) -> Result<Self, HashMapError> {
        Config::new().initial_buckets(buckets).build()
    }
}

impl<K, V> Default for HashMap<K, V, RandomState>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    pub(crate) fn from_config(
        initial_buckets: usize,
        max_load_factor: f64,
        increase_rate: f64,
        hasher: S,
    ) -> Result<Self, HashMapError> {
        if initial_buckets == 0 {
            return Err(HashMapError::CapacityOverflow { requested: 0 });
        }
        let mut primary = Vec::with_capacity(initial_buckets);
        primary.resize_with(initial_buckets, Bucket::new);

        Ok(HashMap {
            inner: RwLock::new(Inner {
                state: State::Normal,
                primary,
                secondary: Vec::new(),
            }),
            primary_size: AtomicU64::new(0),
            secondary_size: AtomicU64::new(0),
            move_quota: AtomicU64::new(1),
            next_bucket_to_drain: AtomicUsize::new(0),
            max_load_factor,
            increase_rate,
            hash_builder: hasher,
        })
    }

    fn hash(&self, key: &K) -> u64 {
        let mut hasher = self.hash_builder.build_hasher();
        key.hash(&mut hasher);
        hasher.finish()
    }

    fn fold(h: u64) -> u64 {
        h ^ (h >> 32)
    }

    fn primary_index(&self, key: &K, primary_count: usize) -> usize {
        (Self::fold(self.hash(key)) % primary_count as u64) as usize
    }

    fn secondary_index(&self, key: &K, secondary_count: usize) -> usize {
        (Self::fold(self.hash(key)) % secondary_count as u64) as usize
    }

    fn load_factor(&self, size: u64, bucket_count: usize) -> f64 {
        if bucket_count == 0 {
            return f64::INFINITY;
        }
        size as f64 / bucket_count as f64
    }

    /// Inserts `key`/`value`, returning the previous value if `key` was already present.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let inner = self.inner.read();
        let (prev, should_begin_resize) = match inner.state {
            State::Normal => {
                let idx = self.primary_index(&key, inner.primary.len());
                let prev = inner.primary[idx].insert(key, value);
                if prev.is_none() {
                    self.primary_size.fetch_add(1, Ordering::Release);
                }
                let size = self.primary_size.load(Ordering::Acquire);
                let begin = self.load_factor(size, inner.primary.len()) > self.max_load_factor;
                (prev, begin)
            }
            State::Resizing => {
                let pidx = self.primary_index(&key, inner.primary.len());
                let removed_from_primary = inner.primary[pidx].remove(&key);
                if removed_from_primary.is_some() {
                    self.primary_size.fetch_sub(1, Ordering::Release);
                }

                let sidx = self.secondary_index(&key, inner.secondary.len());
                let prev_secondary = inner.secondary[sidx].insert(key, value);
                if prev_secondary.is_none() {
                    self.secondary_size.fetch_add(1, Ordering::Release);
                }

                self.migrate_quantum(&inner);
                (removed_from_primary.or(prev_secondary), false)
            }
        };

        if should_begin_resize {
            drop(inner);
            self.resizing_begin();
        } else if self.primary_size.load(Ordering::Acquire) == 0 && inner.state == State::Resizing
        {
            drop(inner);
            self.resizing_done();
        }

        prev
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let inner = self.inner.read();
        match inner.state {
            State::Normal => {
                let idx = self.primary_index(key, inner.primary.len());
                inner.primary[idx].lookup(key)
            }
            State::Resizing => {
                let pidx = self.primary_index(key, inner.primary.len());
                if let Some(v) = inner.primary[pidx].lookup(key) {
                    return Some(v);
                }
                let sidx = self.secondary_index(key, inner.secondary.len());
                inner.secondary[sidx].lookup(key)
            }
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        let inner = self.inner.read();
        match inner.state {
            State::Normal => {
                let idx = self.primary_index(key, inner.primary.len());
                inner.primary[idx].contains_key(key)
            }
            State::Resizing => {
                let pidx = self.primary_index(key, inner.primary.len());
                if inner.primary[pidx].contains_key(key) {
                    return true;
                }
                let sidx = self.secondary_index(key, inner.secondary.len());
                inner.secondary[sidx].contains_key(key)
            }
        }
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let inner = self.inner.read();
        let mut result = inner.primary[self.primary_index(key, inner.primary.len())].remove(key);
        if result.is_some() {
            self.primary_size.fetch_sub(1, Ordering::Release);
        }

        if inner.state == State::Normal {
            return result;
        }

        if result.is_none() {
            let sidx = self.secondary_index(key, inner.secondary.len());
            let removed = inner.secondary[sidx].remove(key);
            if removed.is_some() {
                self.secondary_size.fetch_sub(1, Ordering::Release);
            }
            result = removed;
        }

        self.migrate_quantum(&inner);

        if self.primary_size.load(Ordering::Acquire) == 0 {
            drop(inner);
            self.resizing_done();
        }

        result
    }

    pub fn len(&self) -> u64 {
        self.primary_size.load(Ordering::Acquire) + self.secondary_size.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        for bucket in inner.primary.iter() {
            bucket.clear();
        }
        for bucket in inner.secondary.iter() {
            bucket.clear();
        }
        inner.state = State::Normal;
        inner.secondary = Vec::new();
        drop(inner);

        self.primary_size.store(0, Ordering::Release);
        self.secondary_size.store(0, Ordering::Release);
        self.next_bucket_to_drain.store(0, Ordering::Relaxed);
    }

    /// Migrates a bounded, amortized-cost number of entries from primary into secondary.
    ///
    /// `quota` counts entries moved, not buckets visited: a bucket is drained until empty (or
    /// until the quota runs out) before the scan advances to the next one, matching the
    /// per-entry migration bound the resize episode's amortized cost relies on.
    fn migrate_quantum(&self, inner: &Inner<K, V>) {
        let quota = self.move_quota.load(Ordering::Acquire);
        let primary_count = inner.primary.len();
        let secondary_count = inner.secondary.len();
        if primary_count == 0 || secondary_count == 0 {
            return;
        }

        let start = self.next_bucket_to_drain.load(Ordering::Relaxed) % primary_count;
        let mut moved = 0u64;
        let mut idx = start;
        let mut visited = 0usize;
        while moved < quota && visited < primary_count {
            while moved < quota {
                let Some((key, value)) = inner.primary[idx].pop_front() else {
                    break;
                };
                self.primary_size.fetch_sub(1, Ordering::Release);
                let sidx = self.secondary_index(&key, secondary_count);
                let created = inner.secondary[sidx].insert(key, value).is_none();
                if created {
                    self.secondary_size.fetch_add(1, Ordering::Release);
                }
                moved += 1;
            }
            idx = (idx + 1) % primary_count;
            visited += 1;
        }
        self.next_bucket_to_drain.store(idx, Ordering::Relaxed);
        trace!("migrated {} entries this quantum", moved);
    }

    fn resizing_begin(&self) {
        let mut inner = self.inner.write();
        if inner.state != State::Normal {
            return;
        }
        let size = self.primary_size.load(Ordering::Acquire);
        if self.load_factor(size, inner.primary.len()) <= self.max_load_factor {
            return;
        }

        let new_count = ((inner.primary.len() as f64) * self.increase_rate).ceil() as usize;
        let new_count = new_count.max(inner.primary.len() + 1);
        let mut secondary = Vec::with_capacity(new_count);
        secondary.resize_with(new_count, Bucket::new);
        inner.secondary = secondary;
        inner.state = State::Resizing;

        let quota = (inner.primary.len() as f64).sqrt().floor() as u64;
        self.move_quota.store(quota.max(1), Ordering::Release);
        self.next_bucket_to_drain.store(0, Ordering::Relaxed);

        debug!(
            "resize begin: {} -> {} buckets, quota {}",
            inner.primary.len(),
            new_count,
            quota.max(1)
        );
    }

    fn resizing_done(&self) {
        let mut inner = self.inner.write();
        if inner.state != State::Resizing {
            return;
        }
        if self.primary_size.load(Ordering::Acquire) != 0 {
            return;
        }

        let old_count = inner.primary.len();
        inner.primary = std::mem::take(&mut inner.secondary);
        inner.state = State::Normal;
        self.next_bucket_to_drain.store(0, Ordering::Relaxed);

        debug!(
            "resize done: {} -> {} buckets",
            old_count,
            inner.primary.len()
        );
    }

    /// Drains the rest of an in-progress resize unconditionally, used only by `Clone`. Unlike
    /// `migrate_quantum`, this is unbounded: it fully empties `primary` into `secondary` in one
    /// call, because `Clone` needs a single consistent table to copy, not amortized progress.
    fn finish_resize_for_clone(&self, inner: &mut Inner<K, V>) {
        let secondary_count = inner.secondary.len();
        let mut secondary_size = self.secondary_size.load(Ordering::Acquire);

        let Inner {
            primary, secondary, ..
        } = &*inner;
        for bucket in primary.iter() {
            bucket.migrate_to(|key, value| {
                let sidx = self.secondary_index(&key, secondary_count);
                if secondary[sidx].insert(key, value).is_none() {
                    secondary_size += 1;
                }
            });
        }

        inner.primary = std::mem::take(&mut inner.secondary);
        self.primary_size.store(secondary_size, Ordering::Release);
        self.secondary_size.store(0, Ordering::Release);
        self.next_bucket_to_drain.store(0, Ordering::Relaxed);
        inner.state = State::Normal;
    }
}

impl<K, V, S> Clone for HashMap<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    /// Clones the map as a point-in-time snapshot.
    ///
    /// If a resize is in progress, it is finished on `self` first (as a side effect of cloning),
    /// so the result is always a single-table `Normal` map, never a half-migrated one.
    fn clone(&self) -> Self {
        let mut inner = self.inner.write();
        if inner.state == State::Resizing {
            self.finish_resize_for_clone(&mut inner);
        }

        let mut primary = Vec::with_capacity(inner.primary.len());
        for bucket in inner.primary.iter() {
            let copy = Bucket::new();
            // SAFETY: `inner`'s write guard is held for the whole copy, so no other thread can
            // mutate `bucket` concurrently.
            for (key, value) in unsafe { bucket.iter_unguarded() } {
                copy.insert(key.clone(), value.clone());
            }
            primary.push(copy);
        }

        HashMap {
            inner: RwLock::new(Inner {
                state: State::Normal,
                primary,
                secondary: Vec::new(),
            }),
            primary_size: AtomicU64::new(self.primary_size.load(Ordering::Acquire)),
            secondary_size: AtomicU64::new(0),
            move_quota: AtomicU64::new(1),
            next_bucket_to_drain: AtomicUsize::new(0),
            max_load_factor: self.max_load_factor,
            increase_rate: self.increase_rate,
            hash_builder: self.hash_builder.clone(),
        }
    }
}
