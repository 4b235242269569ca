use std::collections::HashMap;

use super::Handle;

/// Index-backed resource storage with an optional name index.  Named inserts
/// are memoized: registering the same key twice returns the original handle
/// without invoking the constructor again.
pub struct AssetCache<T> {
    items: Vec<T>,
    by_name: HashMap<String, Handle<T>>,
}

impl<T> AssetCache<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn insert(&mut self, item: T) -> Handle<T> {
        let index = self.items.len();
        self.items.push(item);
        Handle::new(index)
    }

    /// Insert under a stable key, returning the existing handle when the key
    /// is already registered.  `build` runs only on a cache miss.
    pub fn insert_named<F>(&mut self, name: &str, build: F) -> Handle<T>
    where
        F: FnOnce() -> T,
    {
        if let Some(&handle) = self.by_name.get(name) {
            return handle;
        }
        let handle = self.insert(build());
        self.by_name.insert(name.to_owned(), handle);
        handle
    }

    /// Fallible variant of [`insert_named`]; a miss whose constructor fails
    /// registers nothing.
    pub fn try_insert_named<F, E>(&mut self, name: &str, build: F) -> Result<Handle<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(&handle) = self.by_name.get(name) {
            return Ok(handle);
        }
        let handle = self.insert(build()?);
        self.by_name.insert(name.to_owned(), handle);
        Ok(handle)
    }

    pub fn lookup(&self, name: &str) -> Option<Handle<T>> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.items.get(handle.index())
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.items.get_mut(handle.index())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.by_name.clear();
    }
}

impl<T> Default for AssetCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_insert_is_memoized() {
        let mut cache = AssetCache::new();
        let mut builds = 0;
        let first = cache.insert_named("a.png", || {
            builds += 1;
            42u32
        });
        let second = cache.insert_named("a.png", || {
            builds += 1;
            99u32
        });
        assert_eq!(first, second);
        assert_eq!(builds, 1);
        assert_eq!(cache.get(first), Some(&42));
    }

    #[test]
    fn failed_named_insert_registers_nothing() {
        let mut cache: AssetCache<u32> = AssetCache::new();
        let result: Result<_, ()> = cache.try_insert_named("bad", || Err(()));
        assert!(result.is_err());
        assert!(cache.lookup("bad").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn anonymous_inserts_get_fresh_handles() {
        let mut cache = AssetCache::new();
        let a = cache.insert(1u8);
        let b = cache.insert(2u8);
        assert_ne!(a, b);
        assert_eq!(cache.len(), 2);
    }
}
