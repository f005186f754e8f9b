//! Compiler runner backed by a child process

use std::io::{self, Write};
use std::process::{Command, Stdio};

use tracing::debug;

use super::{Assembly, CompilerError, CompilerRunner, DEFAULT_COMPILER_ARGS};

/// Spawns the compiler as a subprocess.
///
/// There is no timeout: a hung compiler hangs the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRunner {
    args: Vec<String>,
}

impl ProcessRunner {
    pub fn new(args: Vec<String>) -> Self {
        Self { args }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_COMPILER_ARGS.iter().map(|s| s.to_string()).collect())
    }
}

impl CompilerRunner for ProcessRunner {
    fn emit_assembly(&self, compiler: &str, source: &str) -> Result<Assembly, CompilerError> {
        debug!(compiler, args = ?self.args, "invoking compiler");

        let mut child = Command::new(compiler)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CompilerError::Spawn {
                compiler: compiler.to_string(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A compiler that bails out before reading everything closes the
            // pipe; its output still says what went wrong.
            if let Err(e) = stdin.write_all(source.as_bytes()) {
                if e.kind() != io::ErrorKind::BrokenPipe {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(CompilerError::Stdin {
                        compiler: compiler.to_string(),
                        source: e,
                    });
                }
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|source| CompilerError::Wait {
                compiler: compiler.to_string(),
                source,
            })?;

        debug!(compiler, status = ?output.status.code(), stdout_bytes = output.stdout.len(), "compiler finished");

        Ok(Assembly {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }
}
