//! cxx-mangle - Itanium mangled-name resolver
//!
//! This crate asks a C++ compiler how it mangles a function taking a given
//! parameter list, and remembers the answer in a per-user cache so the
//! compiler only runs once per (compiler, signature) pair.

pub mod cache;
pub mod compiler;
pub mod config;
pub mod logging;
pub mod resolver;
pub mod symbol;

pub use cache::{CacheKey, CacheLookup, CacheStore, FileStore, MemoryStore};
pub use compiler::{Assembly, CompilerRunner, ProcessRunner};
pub use config::{ConfigError, ResolverConfig};
pub use resolver::{ResolutionError, Resolver};
