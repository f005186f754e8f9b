//! Resolver configuration
//!
//! Configuration is layered, later layers winning:
//! 1. Built-in defaults (`g++`, `-x c++ - -o - -S`, `<bits/stdc++.h>`)
//! 2. User config (~/.config/c++mangle/config.toml), optional
//! 3. Environment (`CXX`, `CXX_MANGLE_CACHE`)
//!
//! The cache lives at `~/.cache/c++mangle/mangle.cache` unless overridden.

mod file;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::cache::FileStore;
use crate::compiler::{ProcessRunner, DEFAULT_COMPILER, DEFAULT_COMPILER_ARGS, DEFAULT_PRELUDE};
use crate::resolver::Resolver;

pub use file::FileConfig;

/// Cache file location relative to the home directory
pub const DEFAULT_CACHE_PATH: &str = ".cache/c++mangle/mangle.cache";

/// User config location relative to the home directory
pub const USER_CONFIG_PATH: &str = ".config/c++mangle/config.toml";

/// Environment variable selecting the compiler
pub const ENV_COMPILER: &str = "CXX";

/// Environment variable overriding the cache file path
pub const ENV_CACHE_PATH: &str = "CXX_MANGLE_CACHE";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot locate the cache: HOME is not set and CXX_MANGLE_CACHE is not given")]
    NoHome,

    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// The environment variables configuration depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    /// `HOME`
    pub home: Option<PathBuf>,

    /// `CXX`
    pub compiler: Option<String>,

    /// `CXX_MANGLE_CACHE`
    pub cache_path: Option<PathBuf>,
}

impl Environment {
    /// Capture the current process environment. Empty values count as unset.
    pub fn from_process() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            home: var("HOME").map(PathBuf::from),
            compiler: var(ENV_COMPILER),
            cache_path: var(ENV_CACHE_PATH).map(PathBuf::from),
        }
    }
}

/// Effective resolver configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Compiler executable
    pub compiler: String,

    /// Arguments making the compiler read C++ on stdin and write assembly to stdout
    pub compiler_args: Vec<String>,

    /// Headers included ahead of the probe function
    pub prelude: Vec<String>,

    /// Cache file
    pub cache_path: PathBuf,
}

impl ResolverConfig {
    /// Built-in defaults with the cache under `home`.
    pub fn builtin(home: &Path) -> Self {
        Self {
            compiler: DEFAULT_COMPILER.to_string(),
            compiler_args: DEFAULT_COMPILER_ARGS.iter().map(|s| s.to_string()).collect(),
            prelude: DEFAULT_PRELUDE.iter().map(|s| s.to_string()).collect(),
            cache_path: home.join(DEFAULT_CACHE_PATH),
        }
    }

    /// Load from the process environment and the user config file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Environment::from_process())
    }

    /// Load using an explicit environment.
    pub fn load_from(env: &Environment) -> Result<Self, ConfigError> {
        let home = match (&env.home, &env.cache_path) {
            (Some(home), _) => home.clone(),
            // Without HOME there is no user config; the cache override is all we need.
            (None, Some(_)) => PathBuf::new(),
            (None, None) => return Err(ConfigError::NoHome),
        };

        let mut config = Self::builtin(&home);

        if env.home.is_some() {
            if let Some(file) = FileConfig::load(&home.join(USER_CONFIG_PATH))? {
                config.apply_file(file, &home);
            }
        }

        config.apply_env(env);
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig, home: &Path) {
        if let Some(compiler) = file.compiler {
            self.compiler = compiler;
        }
        if let Some(args) = file.compiler_args {
            self.compiler_args = args;
        }
        if let Some(prelude) = file.prelude {
            self.prelude = prelude;
        }
        if let Some(path) = file.cache_path {
            self.cache_path = expand_home(&path, home);
        }
    }

    fn apply_env(&mut self, env: &Environment) {
        if let Some(ref compiler) = env.compiler {
            self.compiler = compiler.clone();
        }
        if let Some(ref path) = env.cache_path {
            self.cache_path = path.clone();
        }
    }

    pub fn runner(&self) -> ProcessRunner {
        ProcessRunner::new(self.compiler_args.clone())
    }

    pub fn file_store(&self) -> FileStore {
        FileStore::new(&self.cache_path)
    }

    /// Resolver running the configured compiler over the configured cache.
    pub fn resolver(&self) -> Resolver<ProcessRunner, FileStore> {
        Resolver::new(self.runner(), self.file_store()).with_prelude(self.prelude.clone())
    }
}

/// Expand a leading `~/` against the home directory.
fn expand_home(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) if !home.as_os_str().is_empty() => home.join(rest),
        _ => path.to_path_buf(),
    }
}
