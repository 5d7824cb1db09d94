//! Enumeration of the entries below a root directory

use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use filetime::FileTime;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// One directory or regular file found under a root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Path relative to the root it was found under
    pub rel_path: PathBuf,
    /// Full path on disk
    pub path: PathBuf,
    /// Base name
    pub name: OsString,
    /// Whether this is a directory
    pub is_dir: bool,
    /// File size in bytes, 0 for directories
    pub size: u64,
    /// Permission bits
    pub mode: u32,
    /// Last modification time
    pub mtime: FileTime,
}

impl Entry {
    /// Builds an entry from already fetched metadata
    pub fn from_metadata(root: &Path, path: &Path, metadata: &Metadata) -> Result<Self> {
        let rel_path = path
            .strip_prefix(root)
            .map_err(|_| Error::InvalidPath(format!("{:?} is not below {:?}", path, root)))?
            .to_path_buf();
        let is_dir = metadata.is_dir();

        Ok(Self {
            name: path.file_name().map(OsString::from).unwrap_or_default(),
            rel_path,
            path: path.to_path_buf(),
            is_dir,
            size: if is_dir { 0 } else { metadata.len() },
            mode: file_mode(metadata),
            mtime: FileTime::from_last_modification_time(metadata),
        })
    }

    /// Reads the whole file
    pub fn read_content(&self) -> Result<Vec<u8>> {
        fs::read(&self.path).map_err(|e| Error::fs(&self.path, e))
    }

    /// Modification time as a UTC timestamp
    pub fn modified(&self) -> DateTime<Utc> {
        filetime_to_utc(self.mtime)
    }

    /// "directory" or "file", for messages
    pub fn kind(&self) -> &'static str {
        if self.is_dir {
            "directory"
        } else {
            "file"
        }
    }
}

/// Converts a `FileTime` to a chrono UTC timestamp
pub fn filetime_to_utc(time: FileTime) -> DateTime<Utc> {
    DateTime::from_timestamp(time.unix_seconds(), time.nanoseconds()).unwrap_or_default()
}

/// Formats a `FileTime` as RFC3339 with as many fractional digits as needed
pub fn format_filetime(time: FileTime) -> String {
    filetime_to_utc(time).to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Collects every directory and regular file below `root`, keyed by relative path
///
/// The root itself is not included. Symlinks and special files are skipped.
pub fn collect_entries<P: AsRef<Path>>(root: P) -> Result<BTreeMap<PathBuf, Entry>> {
    let root = root.as_ref();
    let mut entries = BTreeMap::new();

    for dir_entry in WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let dir_entry = dir_entry?;
        let file_type = dir_entry.file_type();
        if !file_type.is_dir() && !file_type.is_file() {
            warn!(
                path = ?dir_entry.path(),
                "Skipping entry that is neither a file nor a directory"
            );
            continue;
        }

        let metadata = dir_entry.metadata()?;
        let entry = Entry::from_metadata(root, dir_entry.path(), &metadata)?;
        entries.insert(entry.rel_path.clone(), entry);
    }

    debug!("Collected {} entries under {:?}", entries.len(), root);
    Ok(entries)
}

#[cfg(unix)]
fn file_mode(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(metadata: &Metadata) -> u32 {
    let base = if metadata.is_dir() { 0o755 } else { 0o644 };
    if metadata.permissions().readonly() {
        base & !0o222
    } else {
        base
    }
}
