//! Test fixtures: a scripted stand-in for the C++ compiler
//!
//! The fake compiler is a shell script run through `sh`, so tests never
//! execute a freshly written file. It reads the probe source from stdin,
//! appends one line to an invocation log, and prints a definition label for
//! the few signatures it knows. Anything else is "rejected" with a
//! diagnostic on stderr and exit status 1.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Signatures the fake compiler accepts and the label it prints for each
pub const KNOWN_LABELS: &[(&str, &str)] = &[
    ("", "_Z3foov"),
    ("int", "_Z3fooi"),
    ("int, char", "_Z3fooic"),
    ("const char*", "_Z3fooPKc"),
];

pub struct FakeCompiler {
    _dir: TempDir,
    script: PathBuf,
    log: PathBuf,
}

impl FakeCompiler {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("fake-cxx.sh");
        let log = dir.path().join("invocations.log");

        let mut cases = String::new();
        for (signature, label) in KNOWN_LABELS {
            cases.push_str(&format!(
                "  *'void foo({signature}) {{}}'*) printf '\\t.globl\\t{label}\\n{label}:\\n\\tret\\n' ;;\n"
            ));
        }

        let body = format!(
            "src=$(cat)\n\
             echo invoked >> '{log}'\n\
             case \"$src\" in\n\
             {cases}\
             \x20 *) echo \"<stdin>:3:10: error: expected ')' before ',' token\" >&2; exit 1 ;;\n\
             esac\n",
            log = log.display(),
        );
        fs::write(&script, body).unwrap();

        Self { _dir: dir, script, log }
    }

    /// Compiler executable to pass to the resolver
    pub fn program(&self) -> &str {
        "sh"
    }

    /// Compiler arguments that run the script
    pub fn args(&self) -> Vec<String> {
        vec![self.script.display().to_string()]
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Number of times the script has run
    pub fn invocations(&self) -> usize {
        fs::read_to_string(&self.log)
            .map(|log| log.lines().count())
            .unwrap_or(0)
    }
}
