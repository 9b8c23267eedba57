use std::collections::BTreeMap;

use parking_lot::Mutex;

/// Keyed store that can be written from independent model-processing tasks.
///
/// Setting an existing key replaces its value. Reads return clones so the
/// lock is never held by callers.
#[derive(Debug)]
pub struct ThreadSafeStore<T> {
    entries: Mutex<BTreeMap<String, T>>,
}

impl<T> ThreadSafeStore<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn set(&self, key: impl Into<String>, value: T) {
        self.entries.lock().insert(key.into(), value);
    }
}

impl<T> Default for ThreadSafeStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> ThreadSafeStore<T> {
    pub fn get(&self, key: &str) -> Option<T> {
        self.entries.lock().get(key).cloned()
    }

    /// Snapshot of all pairs sorted by key.
    pub fn get_all_pairs(&self) -> Vec<(String, T)> {
        self.entries
            .lock()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}
