//! Capacity-bounded read-through cache with per-key single flight.
//!
//! Each key owns a slot. Readers of the same key serialize on the slot, so
//! only the first runs the loader and the rest see its value. Invalidation
//! detaches the slot; a load still running on a detached slot can no longer
//! be observed by later readers.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Slot<V> = Arc<Mutex<Option<V>>>;

struct Entry<V> {
    slot: Slot<V>,
    generation: u64,
}

struct Entries<K, V> {
    slots: HashMap<K, Entry<V>>,
    /// Keys by last use; the lowest generation is the least recently used.
    recency: BTreeMap<u64, K>,
    next_generation: u64,
}

impl<K: Eq + Hash + Clone, V> Entries<K, V> {
    fn bump(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }

    fn touch(&mut self, key: &K) -> Option<Slot<V>> {
        let generation = self.bump();
        let entry = self.slots.get_mut(key)?;
        self.recency.remove(&entry.generation);
        entry.generation = generation;
        self.recency.insert(generation, key.clone());
        Some(Arc::clone(&entry.slot))
    }

    fn insert(&mut self, key: K, slot: Slot<V>) {
        let generation = self.bump();
        self.recency.insert(generation, key.clone());
        self.slots.insert(key, Entry { slot, generation });
    }

    fn remove(&mut self, key: &K) -> bool {
        match self.slots.remove(key) {
            Some(entry) => {
                self.recency.remove(&entry.generation);
                true
            }
            None => false,
        }
    }

    fn evict_oldest(&mut self) -> Option<K> {
        let (_, oldest) = self.recency.pop_first()?;
        self.slots.remove(&oldest);
        Some(oldest)
    }
}

pub struct ReadThroughCache<K, V> {
    name: &'static str,
    capacity: usize,
    entries: Mutex<Entries<K, V>>,
}

impl<K, V> ReadThroughCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    /// A cache holding at most `capacity` keys. Capacity 0 disables caching.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            capacity,
            entries: Mutex::new(Entries {
                slots: HashMap::new(),
                recency: BTreeMap::new(),
                next_generation: 0,
            }),
        }
    }

    // The cache is advisory; a poisoned lock still holds usable data.
    fn entries(&self) -> MutexGuard<'_, Entries<K, V>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, key: &K) -> Slot<V> {
        let mut entries = self.entries();
        if let Some(slot) = entries.touch(key) {
            return slot;
        }

        let slot: Slot<V> = Arc::new(Mutex::new(None));
        entries.insert(key.clone(), Arc::clone(&slot));

        while entries.slots.len() > self.capacity {
            let Some(oldest) = entries.evict_oldest() else {
                break;
            };
            tracing::trace!(cache = self.name, key = ?oldest, "evicted");
        }
        slot
    }

    /// Returns the cached value or runs `load` to fill it.
    ///
    /// Errors are returned to the caller and nothing is cached.
    pub fn get_or_load<E>(&self, key: &K, load: impl FnOnce() -> Result<V, E>) -> Result<V, E> {
        if self.capacity == 0 {
            return load();
        }

        let slot = self.slot(key);
        let mut value = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = value.as_ref() {
            tracing::trace!(cache = self.name, key = ?key, "hit");
            return Ok(cached.clone());
        }

        tracing::trace!(cache = self.name, key = ?key, "miss");
        let loaded = load()?;
        *value = Some(loaded.clone());
        Ok(loaded)
    }

    /// Drops the entry for `key`. Returns whether one was present.
    pub fn invalidate(&self, key: &K) -> bool {
        let removed = self.entries().remove(key);
        if removed {
            tracing::trace!(cache = self.name, key = ?key, "invalidated");
        }
        removed
    }

    pub fn clear(&self) {
        let mut entries = self.entries();
        entries.slots.clear();
        entries.recency.clear();
    }

    pub fn len(&self) -> usize {
        self.entries().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn second_read_is_served_from_cache() {
        let cache = ReadThroughCache::new("test", 4);
        let loads = AtomicUsize::new(0);
        let load = || {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(7)
        };

        assert_eq!(cache.get_or_load(&"a", load), Ok(7));
        assert_eq!(cache.get_or_load(&"a", load), Ok(7));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalidate_forces_a_reload() {
        let cache = ReadThroughCache::new("test", 4);
        cache.get_or_load(&"a", || Ok::<_, ()>(1)).unwrap();

        assert!(cache.invalidate(&"a"));
        assert_eq!(cache.get_or_load(&"a", || Ok::<_, ()>(2)), Ok(2));
    }

    #[test]
    fn failed_loads_are_not_cached() {
        let cache = ReadThroughCache::new("test", 4);
        assert_eq!(cache.get_or_load(&"a", || Err::<i32, _>("down")), Err("down"));
        assert_eq!(cache.get_or_load(&"a", || Ok::<_, &str>(3)), Ok(3));
    }

    #[test]
    fn least_recently_used_key_is_evicted() {
        let cache = ReadThroughCache::new("test", 2);
        cache.get_or_load(&"a", || Ok::<_, ()>(1)).unwrap();
        cache.get_or_load(&"b", || Ok::<_, ()>(2)).unwrap();
        // Touch "a" so "b" becomes the oldest.
        cache.get_or_load(&"a", || Ok::<_, ()>(0)).unwrap();
        cache.get_or_load(&"c", || Ok::<_, ()>(3)).unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_or_load(&"a", || Ok::<_, ()>(0)), Ok(1));
        assert_eq!(cache.get_or_load(&"b", || Ok::<_, ()>(20)), Ok(20));
    }

    #[test]
    fn invalidated_keys_do_not_count_toward_eviction() {
        let cache = ReadThroughCache::new("test", 2);
        cache.get_or_load(&"a", || Ok::<_, ()>(1)).unwrap();
        cache.get_or_load(&"b", || Ok::<_, ()>(2)).unwrap();
        assert!(cache.invalidate(&"a"));

        cache.get_or_load(&"c", || Ok::<_, ()>(3)).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_or_load(&"b", || Ok::<_, ()>(20)), Ok(2));
        assert_eq!(cache.get_or_load(&"c", || Ok::<_, ()>(30)), Ok(3));
    }

    #[test]
    fn repeated_hits_keep_one_recency_entry_per_key() {
        let cache = ReadThroughCache::new("test", 2);
        for _ in 0..16 {
            cache.get_or_load(&"a", || Ok::<_, ()>(1)).unwrap();
        }
        cache.get_or_load(&"b", || Ok::<_, ()>(2)).unwrap();
        cache.get_or_load(&"c", || Ok::<_, ()>(3)).unwrap();

        // "a" was used before "b", so it goes first.
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_or_load(&"a", || Ok::<_, ()>(10)), Ok(10));
    }

    #[test]
    fn zero_capacity_always_loads() {
        let cache = ReadThroughCache::new("test", 0);
        cache.get_or_load(&"a", || Ok::<_, ()>(1)).unwrap();
        assert_eq!(cache.get_or_load(&"a", || Ok::<_, ()>(2)), Ok(2));
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_readers_share_one_load() {
        let cache = Arc::new(ReadThroughCache::new("test", 8));
        let loads = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let loads = Arc::clone(&loads);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get_or_load(&"shared", || {
                        loads.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(20));
                        Ok::<_, ()>(42)
                    })
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(42));
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }
}
