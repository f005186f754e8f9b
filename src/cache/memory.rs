//! In-memory cache store

use std::collections::HashMap;

use super::{CacheKey, CacheLookup, CacheResult, CacheStore};

/// Cache store that lives only as long as the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<CacheKey, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for MemoryStore {
    fn get(&mut self, key: &CacheKey) -> CacheLookup {
        match self.entries.get(key) {
            Some(suffix) => CacheLookup::Hit(suffix.clone()),
            None => CacheLookup::Absent,
        }
    }

    fn put(&mut self, key: CacheKey, suffix: String) {
        self.entries.insert(key, suffix);
    }

    fn flush(&mut self) -> CacheResult<()> {
        Ok(())
    }
}
