//! Type-erased keyed map with per-key locking.
//!
//! `FieldSetTable` and the cluster-identity cache are both "map a typed key
//! to a typed value, but different keys hold different concrete types";
//! this module is the shared primitive backing both. Concurrency policy:
//! `get` is lock-free relative to other keys (a `DashMap`-style shard lock
//! would be the production choice; here a single `RwLock<HashMap>` plus a
//! per-key `Mutex` for read-modify-write keeps the contract without pulling
//! in another crate).

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::error::{KhiError, KhiResult};

type BoxedValue = Box<dyn Any + Send + Sync>;

/// A map from string keys to values of arbitrary (but per-key fixed) type,
/// with a per-key mutex so `get_or_set_with` can run its initializer
/// exactly once even under concurrent callers.
pub struct TypedKeyMap {
    values: RwLock<HashMap<String, BoxedValue>>,
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

/// RAII guard for a single key's lock. Held for the duration of a
/// read-modify-write on that key.
struct KeyGuard {
    lock: Arc<Mutex<()>>,
}

impl KeyGuard {
    fn held(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().expect("typed map per-key lock poisoned")
    }
}

impl TypedKeyMap {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            locks: RwLock::new(HashMap::new()),
        }
    }

    fn key_guard(&self, key: &str) -> KeyGuard {
        {
            let locks = self.locks.read().expect("typed map locks poisoned");
            if let Some(lock) = locks.get(key) {
                return KeyGuard { lock: lock.clone() };
            }
        }
        let mut locks = self.locks.write().expect("typed map locks poisoned");
        let lock = locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        KeyGuard { lock }
    }

    /// Lock-free read of an existing value.
    pub fn get<T: Clone + Send + Sync + 'static>(&self, key: &str) -> KhiResult<T> {
        let values = self.values.read().expect("typed map values poisoned");
        match values.get(key) {
            Some(boxed) => boxed
                .downcast_ref::<T>()
                .cloned()
                .ok_or_else(|| KhiError::TypeConversionFailed(key.to_string())),
            None => Err(KhiError::NotFound(key.to_string())),
        }
    }

    /// Unconditionally sets `key`, serialized against concurrent writers of
    /// the same key.
    pub fn set<T: Send + Sync + 'static>(&self, key: &str, value: T) {
        let guard = self.key_guard(key);
        let _held = guard.held();
        let mut values = self.values.write().expect("typed map values poisoned");
        values.insert(key.to_string(), Box::new(value));
    }

    /// Removes and returns the value at `key`, if any.
    pub fn delete<T: Clone + Send + Sync + 'static>(&self, key: &str) -> KhiResult<T> {
        let guard = self.key_guard(key);
        let _held = guard.held();
        let mut values = self.values.write().expect("typed map values poisoned");
        match values.remove(key) {
            Some(boxed) => boxed
                .downcast_ref::<T>()
                .cloned()
                .ok_or_else(|| KhiError::TypeConversionFailed(key.to_string())),
            None => Err(KhiError::NotFound(key.to_string())),
        }
    }

    /// Read-modify-write: runs `init` to produce a value exactly once per
    /// key if absent, serialized against other callers racing on the same
    /// key, then returns the (possibly just-created) value.
    pub fn get_or_set_with<T, F>(&self, key: &str, init: F) -> KhiResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let guard = self.key_guard(key);
        let _held = guard.held();
        {
            let values = self.values.read().expect("typed map values poisoned");
            if let Some(boxed) = values.get(key) {
                return boxed
                    .downcast_ref::<T>()
                    .cloned()
                    .ok_or_else(|| KhiError::TypeConversionFailed(key.to_string()));
            }
        }
        let value = init();
        let mut values = self.values.write().expect("typed map values poisoned");
        values.insert(key.to_string(), Box::new(value.clone()));
        Ok(value)
    }

    /// As [`Self::get_or_set_with`], but `init` may fail. A failure is never
    /// cached: the next caller for the same key re-runs `init`. This is what
    /// backs `Log::field_set`, where a reader failure degrades to a warning
    /// and must stay retryable, never poisoning the slot.
    pub fn get_or_try_set_with<T, F>(&self, key: &str, init: F) -> KhiResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> KhiResult<T>,
    {
        let guard = self.key_guard(key);
        let _held = guard.held();
        {
            let values = self.values.read().expect("typed map values poisoned");
            if let Some(boxed) = values.get(key) {
                return boxed
                    .downcast_ref::<T>()
                    .cloned()
                    .ok_or_else(|| KhiError::TypeConversionFailed(key.to_string()));
            }
        }
        let value = init()?;
        let mut values = self.values.write().expect("typed map values poisoned");
        values.insert(key.to_string(), Box::new(value.clone()));
        Ok(value)
    }
}

impl Default for TypedKeyMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn set_then_get_roundtrips() {
        let map = TypedKeyMap::new();
        map.set("a", 42i32);
        assert_eq!(map.get::<i32>("a").unwrap(), 42);
    }

    #[test]
    fn get_missing_key_is_not_found() {
        let map = TypedKeyMap::new();
        assert!(matches!(map.get::<i32>("missing"), Err(KhiError::NotFound(_))));
    }

    #[test]
    fn get_wrong_type_is_type_conversion_failed() {
        let map = TypedKeyMap::new();
        map.set("a", 42i32);
        assert!(matches!(
            map.get::<String>("a"),
            Err(KhiError::TypeConversionFailed(_))
        ));
    }

    #[test]
    fn get_or_set_with_runs_initializer_once() {
        let map = Arc::new(TypedKeyMap::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let map = map.clone();
            let calls = calls.clone();
            handles.push(std::thread::spawn(move || {
                map.get_or_set_with("shared", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    7i32
                })
                .unwrap()
            }));
        }
        for h in handles {
            assert_eq!(h.join().unwrap(), 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn get_or_try_set_with_does_not_cache_failures() {
        let map = TypedKeyMap::new();
        let attempts = std::cell::Cell::new(0);
        let first: KhiResult<i32> = map.get_or_try_set_with("k", || {
            attempts.set(attempts.get() + 1);
            Err(KhiError::InvalidInput("boom".into()))
        });
        assert!(first.is_err());
        let second = map.get_or_try_set_with("k", || {
            attempts.set(attempts.get() + 1);
            Ok(5i32)
        });
        assert_eq!(second.unwrap(), 5);
        assert_eq!(attempts.get(), 2);
    }

    #[test]
    fn delete_removes_value() {
        let map = TypedKeyMap::new();
        map.set("a", "hello".to_string());
        assert_eq!(map.delete::<String>("a").unwrap(), "hello");
        assert!(map.get::<String>("a").is_err());
    }
}
