//! Testing utilities and fixtures for fstree
//!
//! This crate provides scoped temporary directories that can be populated
//! from tree descriptors or cloned from existing trees, plus assertions that
//! compare trees with a rank chain and fail with a readable report.

use anyhow::{Context, Result};
use filetime::FileTime;
use fstree_core::{create_tree_from_str, Materializer, Node};
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;
use walkdir::WalkDir;

pub mod assertions;
pub mod fixtures;

/// Creates a temporary test directory with cleanup on drop
///
/// Directories inside are made writable again before removal, so fixtures
/// with restrictive modes do not leak.
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    /// Creates a new temporary test directory
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    /// Creates a temporary directory holding the tree a descriptor describes
    pub fn from_descriptor(text: &str) -> Result<Self> {
        let test_dir = Self::new()?;
        create_tree_from_str(test_dir.path(), text).context("Failed to create fixture tree")?;
        Ok(test_dir)
    }

    /// Creates a temporary directory holding the given nodes
    pub fn from_nodes(nodes: &[Node]) -> Result<Self> {
        let test_dir = Self::new()?;
        test_dir.create_tree(nodes)?;
        Ok(test_dir)
    }

    /// Creates a temporary copy of `src`, keeping content, modes and timestamps
    pub fn clone_from<P: AsRef<Path>>(src: P) -> Result<Self> {
        let test_dir = Self::new()?;
        copy_tree(src.as_ref(), test_dir.path())?;
        Ok(test_dir)
    }

    /// Returns the path to the temporary directory
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Creates a file with the given name and content in the test directory
    pub fn create_file(&self, name: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Creates a directory with the given name in the test directory
    pub fn create_dir(&self, name: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Materializes nodes inside the test directory
    pub fn create_tree(&self, nodes: &[Node]) -> Result<()> {
        Materializer::new(self.path())
            .materialize(nodes)
            .context("Failed to materialize nodes")?;
        Ok(())
    }

    /// Deletes every file whose base name matches a glob pattern
    ///
    /// Returns how many files were removed.
    pub fn remove_matching(&self, pattern: &str) -> Result<usize> {
        remove_matching(self.path(), pattern)
    }
}

impl Drop for TestDir {
    fn drop(&mut self) {
        make_removable(self.dir.path());
    }
}

/// Deletes every file below `root` whose base name matches `pattern`
pub fn remove_matching(root: &Path, pattern: &str) -> Result<usize> {
    let pattern =
        Pattern::new(pattern).with_context(|| format!("Invalid pattern {:?}", pattern))?;

    let matches: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| !e.file_type().is_dir())
        .filter(|e| {
            e.file_name()
                .to_str()
                .is_some_and(|name| pattern.matches(name))
        })
        .map(|e| e.into_path())
        .collect();

    for path in &matches {
        fs::remove_file(path).with_context(|| format!("Failed to remove {:?}", path))?;
        debug!(path = ?path, "Removed file");
    }
    Ok(matches.len())
}

/// Copies the tree under `src` into the existing directory `dst`
///
/// Entries are created first; modes and timestamps are copied afterwards,
/// deepest first, so that creating children does not disturb the copied
/// directory times.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let target = dst.join(entry.path().strip_prefix(src)?);
        if entry.file_type().is_dir() {
            fs::create_dir(&target).with_context(|| format!("Failed to create {:?}", target))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {:?}", entry.path()))?;
        }
    }

    for entry in WalkDir::new(src).min_depth(1).contents_first(true) {
        let entry = entry?;
        if !entry.file_type().is_dir() && !entry.file_type().is_file() {
            continue;
        }
        let target = dst.join(entry.path().strip_prefix(src)?);
        let metadata = entry.metadata()?;
        fs::set_permissions(&target, metadata.permissions())?;
        filetime::set_file_times(
            &target,
            FileTime::from_last_access_time(&metadata),
            FileTime::from_last_modification_time(&metadata),
        )?;
    }

    debug!("Copied tree {:?} to {:?}", src, dst);
    Ok(())
}

#[cfg(unix)]
fn make_removable(dir: &Path) {
    use std::os::unix::fs::PermissionsExt;

    // Unlock before listing; a directory without read access cannot be walked.
    if fs::set_permissions(dir, fs::Permissions::from_mode(0o700)).is_err() {
        return;
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            make_removable(&entry.path());
        }
    }
}

#[cfg(not(unix))]
fn make_removable(_root: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_dir() {
        let test_dir = TestDir::new().unwrap();
        assert!(test_dir.path().exists());
    }

    #[test]
    fn test_create_file() {
        let test_dir = TestDir::new().unwrap();
        let file_path = test_dir.create_file("test.txt", b"Hello, World!").unwrap();
        assert!(file_path.exists());
        assert_eq!(fs::read(&file_path).unwrap(), b"Hello, World!");
    }

    #[test]
    fn test_remove_matching() {
        let test_dir = TestDir::new().unwrap();
        test_dir.create_file("delete.me", b"").unwrap();
        test_dir.create_file("a/delete.me", b"").unwrap();
        test_dir.create_file("a/keep.me", b"").unwrap();

        assert_eq!(test_dir.remove_matching("delete.me").unwrap(), 2);
        assert!(!test_dir.path().join("a/delete.me").exists());
        assert!(test_dir.path().join("a/keep.me").exists());
    }

    #[test]
    fn test_invalid_pattern() {
        let test_dir = TestDir::new().unwrap();
        assert!(test_dir.remove_matching("[").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_drop_removes_locked_directories() {
        let test_dir = TestDir::from_descriptor(
            "
            2001-01-01T01:01:01Z 0100 locked/
            2001-01-01T01:01:01Z 0600 locked/inner.txt x
            ",
        )
        .unwrap();
        let path = test_dir.path().to_path_buf();

        drop(test_dir);
        assert!(!path.exists());
    }
}
