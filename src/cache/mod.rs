//! Mangle cache
//!
//! Maps a (compiler, signature) pair to the suffix that compiler produced.
//! Entries are inserted only: there is no eviction, expiry or size bound, and
//! a stored suffix stays valid for the life of the cache file even if the
//! compiler behind the key is upgraded.
//!
//! ## Storage
//!
//! Storage is injected through [`CacheStore`]:
//! - [`MemoryStore`] keeps everything in a `HashMap` and never persists
//! - [`FileStore`] keeps one JSON document per user, rewritten in full on flush
//!
//! ## Lookups
//!
//! A lookup distinguishes a missing key from a cache that could not be read at
//! all. Callers treat both the same way (recompute), but the difference is
//! visible in logs.
//!
//! ## Concurrency
//!
//! The file store does a read-modify-write without locking. Two processes
//! flushing at the same time can lose one of the insertions; the last writer
//! wins.

mod file;
mod key;
mod memory;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use file::{CacheFile, CacheRecord, FileStore, CACHE_FORMAT_VERSION};
pub use key::CacheKey;
pub use memory::MemoryStore;

/// Cache result type
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors from cache storage.
///
/// These never reach the caller of a resolution; the resolver logs them and
/// carries on.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt cache file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported cache format version {found} in {path} (expected {expected})")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// The key is present; holds the stored suffix
    Hit(String),
    /// The cache was readable but has no entry for the key
    Absent,
    /// The cache could not be read; holds a description of why
    Unavailable(String),
}

/// Storage backend for the mangle cache.
pub trait CacheStore {
    /// Look up a key.
    fn get(&mut self, key: &CacheKey) -> CacheLookup;

    /// Record a new entry. It becomes visible to `get` immediately, and is
    /// persisted by the next `flush`.
    fn put(&mut self, key: CacheKey, suffix: String);

    /// Persist entries recorded since the last flush.
    fn flush(&mut self) -> CacheResult<()>;
}

impl<S: CacheStore + ?Sized> CacheStore for Box<S> {
    fn get(&mut self, key: &CacheKey) -> CacheLookup {
        (**self).get(key)
    }

    fn put(&mut self, key: CacheKey, suffix: String) {
        (**self).put(key, suffix)
    }

    fn flush(&mut self) -> CacheResult<()> {
        (**self).flush()
    }
}
