//! Cache key

use std::fmt;

/// Identifies one resolution: which compiler, and which parameter list.
///
/// The signature is trimmed of surrounding whitespace on construction. No
/// other normalization happens, so `"int,char"` and `"int, char"` are
/// different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    /// Compiler executable as given (e.g. "g++", "/usr/bin/clang++")
    pub compiler: String,

    /// Trimmed parameter-type list (e.g. "int, char")
    pub signature: String,
}

impl CacheKey {
    pub fn new(compiler: impl Into<String>, signature: &str) -> Self {
        Self {
            compiler: compiler.into(),
            signature: signature.trim().to_string(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: void foo({})", self.compiler, self.signature)
    }
}
