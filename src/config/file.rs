//! User config file (~/.config/c++mangle/config.toml)

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::ConfigError;

/// Keys accepted in the user config file. All are optional.
///
/// ```toml
/// compiler = "clang++"
/// compiler_args = ["-x", "c++", "-", "-o", "-", "-S"]
/// prelude = ["bits/stdc++.h"]
/// cache_path = "~/.cache/c++mangle/mangle.cache"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub compiler: Option<String>,

    #[serde(default)]
    pub compiler_args: Option<Vec<String>>,

    #[serde(default)]
    pub prelude: Option<Vec<String>>,

    /// A leading `~/` is expanded against the home directory
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
}

impl FileConfig {
    /// Load a config file; `Ok(None)` if it does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::parse(&content)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
