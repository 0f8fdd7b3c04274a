//! Local binary cache.
//!
//! A flat directory of executables, one per installed [`VersionPair`]:
//!
//! ```text
//! <cache_dir>/
//! ├── zkvyper-1.1.1_0.3.3        # installed binaries
//! ├── zkvyper-1.1.0_0.3.3
//! ├── .partial-XXXXXX            # in-flight writes, never listed
//! └── .locks/
//!     └── zkvyper-1.1.1_0.3.3.lock
//! ```
//!
//! There is no index file; the directory listing is the index. Binaries are
//! written to a temp file in the same directory and renamed into place, so
//! a name matching the scheme always refers to a complete file.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs4::FileExt;
use semver::Version;
use tempfile::{NamedTempFile, TempPath};

use crate::core::VersionPair;
use crate::util::errors::{Error, Result};
use crate::util::fs::{ensure_dir, set_executable};

/// File name prefix of installed binaries.
pub const BINARY_PREFIX: &str = "zkvyper-";

/// Joins the two versions in a file name. Not legal in a semver string.
const SEPARATOR: char = '_';

const PARTIAL_PREFIX: &str = ".partial-";
const LOCKS_DIR: &str = ".locks";

/// File name for a pair.
pub fn file_name(pair: &VersionPair) -> String {
    format!(
        "{}{}{}{}{}",
        BINARY_PREFIX,
        pair.compiler,
        SEPARATOR,
        pair.backend,
        std::env::consts::EXE_SUFFIX
    )
}

/// Inverse of [`file_name`]. Returns `None` for names outside the scheme.
pub fn parse_file_name(name: &str) -> Option<VersionPair> {
    let stem = name.strip_suffix(std::env::consts::EXE_SUFFIX)?;
    let rest = stem.strip_prefix(BINARY_PREFIX)?;
    let (compiler, backend) = rest.split_once(SEPARATOR)?;

    Some(VersionPair::new(
        Version::parse(compiler).ok()?,
        Version::parse(backend).ok()?,
    ))
}

/// An installed binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub pair: VersionPair,
    pub path: PathBuf,
}

/// The on-disk store of installed binaries.
#[derive(Debug, Clone)]
pub struct BinaryCache {
    root: PathBuf,
}

impl BinaryCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        BinaryCache { root: root.into() }
    }

    /// The cache directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the binary for `pair` lives. Does not touch the disk.
    pub fn path_for(&self, pair: &VersionPair) -> PathBuf {
        self.root.join(file_name(pair))
    }

    pub fn exists(&self, pair: &VersionPair) -> bool {
        self.path_for(pair).is_file()
    }

    /// The entry for `pair`, if installed.
    pub fn get(&self, pair: &VersionPair) -> Option<CacheEntry> {
        self.exists(pair).then(|| CacheEntry {
            pair: pair.clone(),
            path: self.path_for(pair),
        })
    }

    /// Installed pairs. A missing cache directory lists as empty.
    pub fn list_installed(&self) -> Result<BTreeSet<VersionPair>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(Error::io(&self.root, e)),
        };

        let mut pairs = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&self.root, e))?;
            let name = entry.file_name();
            let Some(pair) = name.to_str().and_then(parse_file_name) else {
                tracing::trace!("skipping {:?} in cache dir", name);
                continue;
            };
            if entry.path().is_file() {
                pairs.insert(pair);
            }
        }
        Ok(pairs)
    }

    /// Start writing the binary for `pair`.
    ///
    /// Bytes go to a temp file inside the cache directory. Nothing becomes
    /// visible under [`path_for`](Self::path_for) until the entry is
    /// committed; dropping it deletes the temp file.
    pub fn begin_write(&self, pair: &VersionPair) -> Result<PendingEntry> {
        ensure_dir(&self.root)?;
        let file = tempfile::Builder::new()
            .prefix(PARTIAL_PREFIX)
            .tempfile_in(&self.root)
            .map_err(|e| Error::io(&self.root, e))?;

        Ok(PendingEntry {
            pair: pair.clone(),
            dest: self.path_for(pair),
            file,
        })
    }

    /// Write `bytes` as the binary for `pair`, replacing any existing entry.
    pub fn store(&self, pair: &VersionPair, bytes: &[u8]) -> Result<CacheEntry> {
        let mut pending = self.begin_write(pair)?;
        pending.write_all(bytes).map_err(|e| Error::io(pending.path(), e))?;
        pending.commit()
    }

    /// Delete the binary for `pair`. Absence is an error.
    pub fn remove(&self, pair: &VersionPair) -> Result<()> {
        let path = self.path_for(pair);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(Error::NotFound { pair: pair.clone() })
            }
            Err(e) => Err(Error::io(path, e)),
        }
    }

    /// Take the exclusive install lock for `pair`, blocking until it is free.
    pub fn lock(&self, pair: &VersionPair) -> Result<CacheLock> {
        let dir = self.root.join(LOCKS_DIR);
        ensure_dir(&dir)?;

        let path = dir.join(format!("{}.lock", file_name(pair)));
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| Error::io(&path, e))?;
        file.lock_exclusive().map_err(|e| Error::io(&path, e))?;

        tracing::trace!("acquired {}", path.display());
        Ok(CacheLock { _file: file })
    }
}

/// Held install lock. Released on drop.
#[derive(Debug)]
pub struct CacheLock {
    _file: File,
}

/// A binary being written into the cache.
#[derive(Debug)]
pub struct PendingEntry {
    pair: VersionPair,
    dest: PathBuf,
    file: NamedTempFile,
}

impl PendingEntry {
    /// Path of the temp file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Close the temp file and mark it executable, without publishing it.
    pub fn stage(mut self) -> Result<StagedEntry> {
        self.file.flush().map_err(|e| Error::io(self.file.path(), e))?;
        self.file
            .as_file()
            .sync_all()
            .map_err(|e| Error::io(self.file.path(), e))?;

        let path = self.file.into_temp_path();
        set_executable(&path)?;

        Ok(StagedEntry {
            pair: self.pair,
            dest: self.dest,
            path,
        })
    }

    /// Publish the binary under its cache name.
    pub fn commit(self) -> Result<CacheEntry> {
        self.stage()?.commit()
    }
}

impl Write for PendingEntry {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// A complete, closed, executable temp file awaiting publication.
///
/// It can be run for verification before [`commit`](Self::commit). Dropping
/// it deletes the file.
#[derive(Debug)]
pub struct StagedEntry {
    pair: VersionPair,
    dest: PathBuf,
    path: TempPath,
}

impl StagedEntry {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically rename into place, replacing any existing entry.
    pub fn commit(self) -> Result<CacheEntry> {
        let dest = self.dest;
        self.path
            .persist(&dest)
            .map_err(|e| Error::io(&dest, e.error))?;

        tracing::debug!("published {}", dest.display());
        Ok(CacheEntry {
            pair: self.pair,
            path: dest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pair(c: &str, b: &str) -> VersionPair {
        VersionPair::parse(c, b).unwrap()
    }

    fn cache_files(cache: &BinaryCache) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(cache.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n != LOCKS_DIR)
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_file_name_roundtrip() {
        for (c, b) in [
            ("1.1.1", "0.3.3"),
            ("1.2.0-beta.1", "0.3.10"),
            ("2.0.0+build.7", "0.4.0-rc.2"),
        ] {
            let p = pair(c, b);
            assert_eq!(parse_file_name(&file_name(&p)), Some(p));
        }
    }

    #[test]
    fn test_file_names_are_distinct() {
        // Hyphens in prerelease tags must not make two pairs collide.
        let a = pair("1.0.0-1", "0.3.3");
        let b = pair("1.0.0", "1.0.3");
        assert_ne!(file_name(&a), file_name(&b));
    }

    #[test]
    fn test_parse_file_name_rejects_foreign_names() {
        for name in [
            "zkvyper",
            "zkvyper-1.1.1",
            "zkvyper-1.1.1_",
            "zkvyper-1.1_0.3.3",
            "vyper-1.1.1_0.3.3",
            ".partial-abc123",
            "README.md",
        ] {
            assert_eq!(parse_file_name(name), None, "{}", name);
        }
    }

    #[test]
    fn test_path_for_is_pure() {
        let tmp = TempDir::new().unwrap();
        let cache = BinaryCache::new(tmp.path().join("does-not-exist"));
        let path = cache.path_for(&pair("1.1.1", "0.3.3"));
        assert!(path.starts_with(cache.root()));
        assert!(!cache.root().exists());
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let cache = BinaryCache::new(tmp.path().join("missing"));
        assert!(cache.list_installed().unwrap().is_empty());
    }

    #[test]
    fn test_store_and_list() {
        let tmp = TempDir::new().unwrap();
        let cache = BinaryCache::new(tmp.path());
        let p = pair("1.1.1", "0.3.3");

        let entry = cache.store(&p, b"binary").unwrap();
        assert_eq!(entry.path, cache.path_for(&p));
        assert!(cache.exists(&p));
        assert!(crate::util::fs::is_executable(&entry.path));

        fs::write(tmp.path().join("notes.txt"), "ignore me").unwrap();
        fs::create_dir(tmp.path().join(file_name(&pair("9.9.9", "0.1.0")))).unwrap();

        let installed = cache.list_installed().unwrap();
        assert_eq!(installed.into_iter().collect::<Vec<_>>(), vec![p]);
    }

    #[test]
    fn test_store_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let cache = BinaryCache::new(tmp.path());
        let p = pair("1.1.1", "0.3.3");

        cache.store(&p, b"same bytes").unwrap();
        cache.store(&p, b"same bytes").unwrap();

        assert_eq!(cache_files(&cache), vec![file_name(&p)]);
        assert_eq!(fs::read(cache.path_for(&p)).unwrap(), b"same bytes");
    }

    #[test]
    fn test_store_overwrites() {
        let tmp = TempDir::new().unwrap();
        let cache = BinaryCache::new(tmp.path());
        let p = pair("1.1.1", "0.3.3");

        cache.store(&p, b"old").unwrap();
        cache.store(&p, b"new").unwrap();
        assert_eq!(fs::read(cache.path_for(&p)).unwrap(), b"new");
    }

    #[test]
    fn test_dropped_pending_entry_leaves_nothing() {
        let tmp = TempDir::new().unwrap();
        let cache = BinaryCache::new(tmp.path());
        let p = pair("1.1.1", "0.3.3");

        {
            let mut pending = cache.begin_write(&p).unwrap();
            pending.write_all(b"half a bin").unwrap();
            assert!(pending.path().exists());
            assert!(!cache.exists(&p));
        }

        assert!(!cache.exists(&p));
        assert!(cache_files(&cache).is_empty());
        assert!(cache.list_installed().unwrap().is_empty());
    }

    #[test]
    fn test_staged_entry_is_executable_before_commit() {
        let tmp = TempDir::new().unwrap();
        let cache = BinaryCache::new(tmp.path());
        let p = pair("1.1.1", "0.3.3");

        let mut pending = cache.begin_write(&p).unwrap();
        pending.write_all(b"#!/bin/sh\n").unwrap();
        let staged = pending.stage().unwrap();
        assert!(crate::util::fs::is_executable(staged.path()));
        assert!(!cache.exists(&p));

        drop(staged);
        assert!(cache_files(&cache).is_empty());
    }

    #[test]
    fn test_remove() {
        let tmp = TempDir::new().unwrap();
        let cache = BinaryCache::new(tmp.path());
        let p = pair("1.1.1", "0.3.3");

        cache.store(&p, b"bin").unwrap();
        cache.remove(&p).unwrap();
        assert!(!cache.list_installed().unwrap().contains(&p));

        let err = cache.remove(&p).unwrap_err();
        assert!(matches!(err, Error::NotFound { pair } if pair == p));
    }

    #[test]
    fn test_lock_is_reacquirable_after_drop() {
        let tmp = TempDir::new().unwrap();
        let cache = BinaryCache::new(tmp.path());
        let p = pair("1.1.1", "0.3.3");

        let lock = cache.lock(&p).unwrap();
        drop(lock);
        let _again = cache.lock(&p).unwrap();

        // The lock directory is not mistaken for an installed binary.
        assert!(cache.list_installed().unwrap().is_empty());
    }
}
