//! File-backed cache store
//!
//! The whole cache is one JSON document:
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": [
//!     { "compiler": "g++", "signature": "int", "suffix": "_Zi", "created_at": "..." }
//!   ]
//! }
//! ```
//!
//! A missing file is an empty cache. A file that cannot be read, does not
//! parse, or carries another format version makes the cache unavailable for
//! lookups and is replaced on the next flush.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{CacheError, CacheKey, CacheLookup, CacheResult, CacheStore};

/// On-disk format version
pub const CACHE_FORMAT_VERSION: u32 = 1;

type Entries = BTreeMap<CacheKey, CacheRecord>;

/// One persisted cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Compiler executable the suffix was produced by
    pub compiler: String,

    /// Trimmed parameter-type list
    pub signature: String,

    /// Resolved suffix (e.g. "_Zi")
    pub suffix: String,

    /// When the entry was first resolved (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl CacheRecord {
    fn new(key: &CacheKey, suffix: String) -> Self {
        Self {
            compiler: key.compiler.clone(),
            signature: key.signature.clone(),
            suffix,
            created_at: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    fn key(&self) -> CacheKey {
        CacheKey {
            compiler: self.compiler.clone(),
            signature: self.signature.clone(),
        }
    }
}

/// The serialized cache document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheFile {
    pub version: u32,

    #[serde(default)]
    pub entries: Vec<CacheRecord>,
}

impl CacheFile {
    /// Read and validate a cache file.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    pub fn read(path: &Path) -> CacheResult<Option<Self>> {
        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io(path, e)),
        };

        let file: CacheFile =
            serde_json::from_slice(&content).map_err(|source| CacheError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;

        if file.version != CACHE_FORMAT_VERSION {
            return Err(CacheError::UnsupportedVersion {
                path: path.to_path_buf(),
                found: file.version,
                expected: CACHE_FORMAT_VERSION,
            });
        }

        Ok(Some(file))
    }

    /// Write the document, replacing any existing file.
    ///
    /// The content goes to a sibling temporary file first and is renamed into
    /// place, so readers never observe a half-written document. Creates the
    /// parent directory if needed.
    pub fn write(&self, path: &Path) -> CacheResult<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| CacheError::io(dir, e))?;
        }

        let serialized = serde_json::to_vec_pretty(self)?;
        let temp_path = temp_path_for(path);

        if let Err(e) = write_file(&temp_path, &serialized) {
            let _ = fs::remove_file(&temp_path);
            return Err(CacheError::io(temp_path, e));
        }

        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(CacheError::io(path, e));
        }

        Ok(())
    }

    fn into_entries(self) -> Entries {
        self.entries
            .into_iter()
            .map(|record| (record.key(), record))
            .collect()
    }

    fn from_entries(entries: &Entries) -> Self {
        Self {
            version: CACHE_FORMAT_VERSION,
            entries: entries.values().cloned().collect(),
        }
    }
}

/// Cache store persisted to a single JSON file.
///
/// Every lookup that is not answered by an unflushed entry reads the file
/// again, so entries flushed by other processes are seen right away. New
/// entries are held in memory until [`CacheStore::flush`], which re-reads
/// the file, merges the new entries over whatever is there now, and
/// rewrites it in full.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    /// Entries not yet flushed
    pending: Entries,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pending: Entries::new(),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheStore for FileStore {
    fn get(&mut self, key: &CacheKey) -> CacheLookup {
        if let Some(record) = self.pending.get(key) {
            return CacheLookup::Hit(record.suffix.clone());
        }

        match load_entries(&self.path) {
            Ok(mut entries) => match entries.remove(key) {
                Some(record) => CacheLookup::Hit(record.suffix),
                None => CacheLookup::Absent,
            },
            Err(e) => CacheLookup::Unavailable(e.to_string()),
        }
    }

    fn put(&mut self, key: CacheKey, suffix: String) {
        let record = CacheRecord::new(&key, suffix);
        self.pending.insert(key, record);
    }

    fn flush(&mut self) -> CacheResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        // Re-read so entries written by other processes since our last lookup
        // survive. Anything flushed between this read and the rename is lost.
        let mut entries = match load_entries(&self.path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "replacing unreadable cache file");
                Entries::new()
            }
        };
        entries.extend(
            self.pending
                .iter()
                .map(|(key, record)| (key.clone(), record.clone())),
        );

        CacheFile::from_entries(&entries).write(&self.path)?;

        debug!(
            path = %self.path.display(),
            added = self.pending.len(),
            total = entries.len(),
            "cache flushed"
        );
        self.pending.clear();
        Ok(())
    }
}

fn load_entries(path: &Path) -> CacheResult<Entries> {
    Ok(CacheFile::read(path)?
        .map(CacheFile::into_entries)
        .unwrap_or_default())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("mangle.cache"));
    name.push(format!(".tmp.{}", std::process::id()));
    path.with_file_name(name)
}

fn write_file(path: &Path, data: &[u8]) -> io::Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    let mut writer = BufWriter::new(file);
    writer.write_all(data)?;
    writer.flush()?;
    writer.get_ref().sync_all()
}
