//! Keyed cache of shared resources

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Thread-safe map from key to shared resource
///
/// A key is filled at most once. The cache holds one `Arc` of every entry,
/// so resources outlive any consumer that drops its handle.
pub struct ResourceCache<T> {
    entries: RwLock<HashMap<String, Arc<T>>>,
}

impl<T> ResourceCache<T> {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a resource
    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        self.entries.read().get(key).map(Arc::clone)
    }

    /// Return the cached resource for `key`, or build and store it
    ///
    /// `load` runs with the write lock held, so two callers racing on the same
    /// key never both build it. A failed load leaves the cache untouched.
    pub fn get_or_try_insert<E>(
        &self,
        key: &str,
        load: impl FnOnce() -> Result<T, E>,
    ) -> Result<Arc<T>, E> {
        if let Some(existing) = self.get(key) {
            log::debug!("Cache hit: '{}'", key);
            return Ok(existing);
        }

        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(key) {
            return Ok(Arc::clone(existing));
        }

        let resource = Arc::new(load()?);
        entries.insert(key.to_string(), Arc::clone(&resource));
        Ok(resource)
    }

    /// Whether `key` has been loaded
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Number of cached resources
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Keys of every cached resource, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl<T> Default for ResourceCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ResourceCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("keys", &self.keys())
            .finish()
    }
}
