//! Validation of node paths before they touch the filesystem

use crate::{Error, Result};
use std::path::{Component, Path, PathBuf};
use tracing::error;

/// Turns an untrusted relative path into a normalized one that stays below the root
///
/// `.` components are dropped. Parent references, absolute paths and drive
/// prefixes are rejected, as is a path that normalizes to nothing.
pub fn sanitize_relative(untrusted: &Path) -> Result<PathBuf> {
    let mut result = PathBuf::new();

    for component in untrusted.components() {
        match component {
            Component::Normal(name) => result.push(name),
            Component::CurDir => {}
            Component::ParentDir => {
                error!(path = ?untrusted, "Path contains parent directory component");
                return Err(Error::InvalidPath(format!(
                    "Parent directory reference not allowed: {:?}",
                    untrusted
                )));
            }
            Component::RootDir => {
                error!(path = ?untrusted, "Path is absolute");
                return Err(Error::InvalidPath(format!(
                    "Absolute path not allowed: {:?}",
                    untrusted
                )));
            }
            Component::Prefix(_) => {
                error!(path = ?untrusted, "Path contains Windows prefix");
                return Err(Error::InvalidPath(format!(
                    "Windows path prefix not allowed: {:?}",
                    untrusted
                )));
            }
        }
    }

    if result.as_os_str().is_empty() {
        return Err(Error::InvalidPath(format!("Empty path: {:?}", untrusted)));
    }

    Ok(result)
}

/// Every proper ancestor of a relative path, shallowest first
pub fn ancestors(rel: &Path) -> Vec<&Path> {
    let mut list: Vec<&Path> = rel
        .ancestors()
        .skip(1)
        .filter(|p| !p.as_os_str().is_empty())
        .collect();
    list.reverse();
    list
}
