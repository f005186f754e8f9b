//! Compiler invocation
//!
//! Builds the probe translation unit and runs a C++ compiler over it to get
//! textual assembly. The compiler is a black box: source goes in on stdin,
//! assembly comes out on stdout.

mod process;

use std::io;

use thiserror::Error;

pub use process::ProcessRunner;

/// Compiler used when neither config nor `CXX` names one
pub const DEFAULT_COMPILER: &str = "g++";

/// Arguments asking for assembly of a C++ source read from stdin, written to stdout
pub const DEFAULT_COMPILER_ARGS: &[&str] = &["-x", "c++", "-", "-o", "-", "-S"];

/// Headers included ahead of the probe function
pub const DEFAULT_PRELUDE: &[&str] = &["bits/stdc++.h"];

/// Name of the probe function. Its mangled form is `_Z3foo<params>`.
pub const PROBE_FUNCTION: &str = "foo";

/// Build the probe translation unit for a parameter list.
///
/// ```
/// let source = cxx_mangle::compiler::probe_source(&["vector".to_string()], "std::vector<int>");
/// assert!(source.contains("#include <vector>"));
/// assert!(source.ends_with("void foo(std::vector<int>) {}\n"));
/// ```
pub fn probe_source(prelude: &[String], signature: &str) -> String {
    let mut source = String::new();
    for header in prelude {
        source.push_str(&format!("#include <{}>\n", header));
    }
    source.push('\n');
    source.push_str(&format!("void {}({}) {{}}\n", PROBE_FUNCTION, signature));
    source
}

/// Captured output of one compiler run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    /// Assembly text (lossy UTF-8)
    pub stdout: String,

    /// Diagnostics (lossy UTF-8)
    pub stderr: String,

    /// Exit code, `None` if the compiler was killed by a signal
    pub exit_code: Option<i32>,
}

impl Assembly {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Errors running the compiler process itself.
///
/// A compiler that runs and rejects the source is not an error here; its
/// output simply lacks the probe symbol.
#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("failed to spawn compiler `{compiler}`: {source}")]
    Spawn {
        compiler: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write source to compiler `{compiler}`: {source}")]
    Stdin {
        compiler: String,
        #[source]
        source: io::Error,
    },

    #[error("failed waiting for compiler `{compiler}`: {source}")]
    Wait {
        compiler: String,
        #[source]
        source: io::Error,
    },
}

/// Runs a compiler over a source file and returns its assembly.
pub trait CompilerRunner {
    fn emit_assembly(&self, compiler: &str, source: &str) -> Result<Assembly, CompilerError>;
}

impl<R: CompilerRunner + ?Sized> CompilerRunner for &R {
    fn emit_assembly(&self, compiler: &str, source: &str) -> Result<Assembly, CompilerError> {
        (**self).emit_assembly(compiler, source)
    }
}
