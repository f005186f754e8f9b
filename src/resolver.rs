//! Mangled-name resolution
//!
//! Resolution of a (compiler, signature) pair:
//! 1. Look the key up in the cache; a hit returns without running anything
//! 2. On a miss (or an unreadable cache) compile the probe translation unit
//! 3. Pull the probe label out of the assembly and strip the function name
//! 4. Record the suffix and flush the cache, ignoring persistence failures
//!
//! Only step 2 and 3 can fail the resolution.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CacheLookup, CacheStore};
use crate::compiler::{probe_source, CompilerError, CompilerRunner, DEFAULT_PRELUDE};
use crate::symbol::extract_suffix;

/// Number of compiler stderr lines kept in a resolution error
const DIAGNOSTIC_TAIL_LINES: usize = 10;

/// Resolution errors
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The compiler ran but its output has no definition of the probe function.
    /// Usually the signature is not valid C++.
    #[error(
        "compiler `{compiler}` did not define foo({signature}) (exit status {}){}",
        display_exit_code(.exit_code),
        display_diagnostics(.diagnostics)
    )]
    SymbolNotFound {
        compiler: String,
        signature: String,
        exit_code: Option<i32>,
        /// Last lines of the compiler's stderr
        diagnostics: String,
    },

    /// The compiler could not be run at all
    #[error(transparent)]
    Compiler(#[from] CompilerError),
}

fn display_exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

fn display_diagnostics(diagnostics: &str) -> String {
    if diagnostics.is_empty() {
        String::new()
    } else {
        format!(":\n{}", diagnostics)
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim_end().lines().collect();
    let start = lines.len().saturating_sub(DIAGNOSTIC_TAIL_LINES);
    lines[start..].join("\n")
}

/// Resolves parameter lists to mangled suffixes, backed by a cache.
pub struct Resolver<R, S> {
    runner: R,
    store: S,
    prelude: Vec<String>,
}

impl<R: CompilerRunner, S: CacheStore> Resolver<R, S> {
    /// Create a resolver that includes the default prelude headers.
    pub fn new(runner: R, store: S) -> Self {
        Self {
            runner,
            store,
            prelude: DEFAULT_PRELUDE.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the headers included ahead of the probe function.
    pub fn with_prelude(mut self, prelude: Vec<String>) -> Self {
        self.prelude = prelude;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mangled suffix for `void foo(<signature>)` as compiled by `compiler`.
    ///
    /// The signature is trimmed before use; an empty signature denotes a
    /// function without parameters. Cache failures never surface here.
    pub fn resolve(&mut self, compiler: &str, signature: &str) -> Result<String, ResolutionError> {
        let key = CacheKey::new(compiler, signature);

        match self.store.get(&key) {
            CacheLookup::Hit(suffix) => {
                debug!(%key, %suffix, "cache hit");
                return Ok(suffix);
            }
            CacheLookup::Absent => debug!(%key, "cache miss"),
            CacheLookup::Unavailable(reason) => {
                info!(%key, %reason, "cache unavailable, recomputing");
            }
        }

        let source = probe_source(&self.prelude, &key.signature);
        let assembly = self.runner.emit_assembly(compiler, &source)?;
        if !assembly.success() {
            debug!(%key, exit_code = ?assembly.exit_code, "compiler exited unsuccessfully");
        }

        let suffix = extract_suffix(&assembly.stdout).ok_or_else(|| {
            ResolutionError::SymbolNotFound {
                compiler: key.compiler.clone(),
                signature: key.signature.clone(),
                exit_code: assembly.exit_code,
                diagnostics: stderr_tail(&assembly.stderr),
            }
        })?;

        debug!(%key, %suffix, "resolved");
        self.store.put(key.clone(), suffix.clone());
        if let Err(e) = self.store.flush() {
            warn!(%key, error = %e, "could not persist mangle cache");
        }

        Ok(suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheResult, MemoryStore};
    use crate::compiler::Assembly;
    use std::cell::{Cell, RefCell};

    /// Pretends to be g++: defines the probe for a few known signatures.
    struct FakeCompiler {
        calls: Cell<usize>,
        sources: RefCell<Vec<String>>,
    }

    impl FakeCompiler {
        fn new() -> Self {
            Self {
                calls: Cell::new(0),
                sources: RefCell::new(Vec::new()),
            }
        }
    }

    impl CompilerRunner for FakeCompiler {
        fn emit_assembly(&self, _compiler: &str, source: &str) -> Result<Assembly, CompilerError> {
            self.calls.set(self.calls.get() + 1);
            self.sources.borrow_mut().push(source.to_string());

            let label = if source.contains("void foo() {}") {
                Some("_Z3foov")
            } else if source.contains("void foo(int) {}") {
                Some("_Z3fooi")
            } else if source.contains("void foo(int, char) {}") {
                Some("_Z3fooic")
            } else {
                None
            };

            Ok(match label {
                Some(label) => Assembly {
                    stdout: format!("\t.globl\t{label}\n{label}:\n\tret\n"),
                    stderr: String::new(),
                    exit_code: Some(0),
                },
                None => Assembly {
                    stdout: String::new(),
                    stderr: "<stdin>:3:10: error: expected ')'\n".to_string(),
                    exit_code: Some(1),
                },
            })
        }
    }

    /// Store whose flush always fails.
    #[derive(Default)]
    struct ReadOnlyStore {
        inner: MemoryStore,
    }

    impl CacheStore for ReadOnlyStore {
        fn get(&mut self, key: &CacheKey) -> CacheLookup {
            self.inner.get(key)
        }

        fn put(&mut self, key: CacheKey, suffix: String) {
            self.inner.put(key, suffix)
        }

        fn flush(&mut self) -> CacheResult<()> {
            Err(crate::cache::CacheError::io(
                "/read-only/mangle.cache",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            ))
        }
    }

    #[test]
    fn test_miss_then_hit() {
        let compiler = FakeCompiler::new();
        let mut resolver = Resolver::new(&compiler, MemoryStore::new());

        assert_eq!(resolver.resolve("g++", "int").unwrap(), "_Zi");
        assert_eq!(compiler.calls.get(), 1);

        assert_eq!(resolver.resolve("g++", "int").unwrap(), "_Zi");
        assert_eq!(compiler.calls.get(), 1);
    }

    #[test]
    fn test_whitespace_shares_key() {
        let compiler = FakeCompiler::new();
        let mut resolver = Resolver::new(&compiler, MemoryStore::new());

        let a = resolver.resolve("g++", "int, char").unwrap();
        let b = resolver.resolve("g++", "  int, char  ").unwrap();
        assert_eq!(a, "_Zic");
        assert_eq!(a, b);
        assert_eq!(compiler.calls.get(), 1);
    }

    #[test]
    fn test_empty_signature() {
        let compiler = FakeCompiler::new();
        let mut resolver = Resolver::new(&compiler, MemoryStore::new());

        assert_eq!(resolver.resolve("g++", "   ").unwrap(), "_Zv");
        assert!(compiler.sources.borrow()[0].contains("void foo() {}"));
    }

    #[test]
    fn test_different_compilers_do_not_share_entries() {
        let compiler = FakeCompiler::new();
        let mut resolver = Resolver::new(&compiler, MemoryStore::new());

        resolver.resolve("g++", "int").unwrap();
        resolver.resolve("clang++", "int").unwrap();
        assert_eq!(compiler.calls.get(), 2);
    }

    #[test]
    fn test_malformed_signature_is_error() {
        let compiler = FakeCompiler::new();
        let mut resolver = Resolver::new(&compiler, MemoryStore::new());

        let err = resolver.resolve("g++", "int,,").unwrap_err();
        match &err {
            ResolutionError::SymbolNotFound {
                compiler,
                signature,
                exit_code,
                diagnostics,
            } => {
                assert_eq!(compiler, "g++");
                assert_eq!(signature, "int,,");
                assert_eq!(*exit_code, Some(1));
                assert!(diagnostics.contains("expected ')'"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("foo(int,,)"));
        assert!(resolver.store().is_empty());
    }

    #[test]
    fn test_failed_resolution_is_not_cached() {
        let compiler = FakeCompiler::new();
        let mut resolver = Resolver::new(&compiler, MemoryStore::new());

        assert!(resolver.resolve("g++", "nonsense type").is_err());
        assert!(resolver.resolve("g++", "nonsense type").is_err());
        assert_eq!(compiler.calls.get(), 2);
    }

    #[test]
    fn test_flush_failure_is_swallowed() {
        let compiler = FakeCompiler::new();
        let mut resolver = Resolver::new(&compiler, ReadOnlyStore::default());

        assert_eq!(resolver.resolve("g++", "int").unwrap(), "_Zi");
    }

    #[test]
    fn test_prelude_is_configurable() {
        let compiler = FakeCompiler::new();
        let mut resolver = Resolver::new(&compiler, MemoryStore::new())
            .with_prelude(vec!["cstddef".to_string(), "string".to_string()]);

        resolver.resolve("g++", "int").unwrap();
        let sources = compiler.sources.borrow();
        assert!(sources[0].starts_with("#include <cstddef>\n#include <string>\n"));
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let stderr: String = (0..25).map(|i| format!("line {i}\n")).collect();
        let tail = stderr_tail(&stderr);
        assert_eq!(tail.lines().count(), DIAGNOSTIC_TAIL_LINES);
        assert!(tail.starts_with("line 15"));
        assert!(tail.ends_with("line 24"));
    }

    #[test]
    fn test_error_message_without_diagnostics() {
        let err = ResolutionError::SymbolNotFound {
            compiler: "g++".to_string(),
            signature: "int".to_string(),
            exit_code: None,
            diagnostics: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "compiler `g++` did not define foo(int) (exit status signal)"
        );
    }
}
