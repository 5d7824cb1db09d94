//! Node descriptors: one declared filesystem entry each

use crate::descriptor;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::path::{Path, MAIN_SEPARATOR};

/// A single filesystem entry to be materialized
///
/// A trailing path separator marks the node as a directory. Directory nodes
/// never carry content; anything set on `content` is ignored when the node is
/// created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Relative path, `/`-terminated for directories
    pub path: String,
    /// Permission bits, applied verbatim
    pub mode: u32,
    /// Access and modification time applied after the content is written
    pub time: DateTime<Utc>,
    /// File payload, empty for directories and zero-byte files
    pub content: Vec<u8>,
}

impl Node {
    /// Describes a directory. A trailing separator is appended when missing.
    pub fn dir(path: impl Into<String>, mode: u32, time: DateTime<Utc>) -> Self {
        let mut path = path.into();
        if !ends_with_separator(&path) {
            path.push('/');
        }
        Self {
            path,
            mode,
            time,
            content: Vec::new(),
        }
    }

    /// Describes a regular file with the given content
    pub fn file(
        path: impl Into<String>,
        mode: u32,
        time: DateTime<Utc>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            path: path.into(),
            mode,
            time,
            content: content.into(),
        }
    }

    /// Whether the node describes a directory
    pub fn is_dir(&self) -> bool {
        ends_with_separator(&self.path)
    }

    /// The path with any trailing separators removed
    pub fn rel_path(&self) -> &Path {
        Path::new(self.path.trim_end_matches(is_separator))
    }

    /// Content to write, or `None` for directories
    pub fn body(&self) -> Option<&[u8]> {
        if self.is_dir() {
            None
        } else {
            Some(&self.content)
        }
    }
}

/// Renders the node back into a descriptor line
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{:04o}\t{}",
            self.time.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            self.mode,
            descriptor::render_path(&self.path)
        )?;
        match self.body() {
            Some(content) if !content.is_empty() => {
                write!(f, "\t{}", descriptor::render_content(content))
            }
            _ => Ok(()),
        }
    }
}

pub(crate) fn is_separator(c: char) -> bool {
    c == '/' || c == MAIN_SEPARATOR
}

fn ends_with_separator(path: &str) -> bool {
    path.ends_with(is_separator)
}
