//! Creating directory trees from node descriptors
//!
//! Materialization runs in two passes. The first pass creates every
//! directory and writes every file, creating missing ancestors along the way.
//! The second pass applies permission bits and timestamps, deepest paths
//! first, so that creating a child never disturbs a parent's modification
//! time and a restrictive parent mode never blocks work on its children.

use crate::config::CreateConfig;
use crate::descriptor;
use crate::node::Node;
use crate::path::{ancestors, sanitize_relative};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use filetime::FileTime;
use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Mode given to ancestor directories that have no descriptor of their own
pub const DEFAULT_DIR_MODE: u32 = 0o700;

/// Creates nodes below a fixed root directory
#[derive(Debug, Clone)]
pub struct Materializer {
    root: PathBuf,
    default_dir_mode: u32,
}

/// Mode and time to apply to one path in the second pass
struct StatUpdate<'a> {
    rel: PathBuf,
    mode: u32,
    time: Option<&'a DateTime<Utc>>,
}

impl Materializer {
    /// Creates a materializer rooted at `root`, which must already exist
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            default_dir_mode: DEFAULT_DIR_MODE,
        }
    }

    /// Creates a materializer using the settings from a `[create]` config section
    pub fn with_config<P: Into<PathBuf>>(root: P, config: &CreateConfig) -> Self {
        Self::new(root).default_dir_mode(config.default_dir_mode)
    }

    /// Overrides the mode of implicitly created ancestor directories
    pub fn default_dir_mode(mut self, mode: u32) -> Self {
        self.default_dir_mode = mode;
        self
    }

    /// The directory nodes are created under
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates every node on disk
    ///
    /// Fails on the first error. Nothing already created is rolled back.
    pub fn materialize(&self, nodes: &[Node]) -> Result<()> {
        let rels = nodes
            .iter()
            .map(|node| sanitize_relative(node.rel_path()))
            .collect::<Result<Vec<_>>>()?;
        let explicit: BTreeSet<&Path> = rels.iter().map(PathBuf::as_path).collect();

        let mut updates = Vec::with_capacity(nodes.len());
        for (node, rel) in nodes.iter().zip(&rels) {
            for ancestor in ancestors(rel) {
                if self.create_dir(ancestor)? && !explicit.contains(ancestor) {
                    debug!(path = ?ancestor, "Created implicit directory");
                    updates.push(StatUpdate {
                        rel: ancestor.to_path_buf(),
                        mode: self.default_dir_mode,
                        time: None,
                    });
                }
            }

            match node.body() {
                None => {
                    self.create_dir(rel)?;
                    debug!(path = ?rel, "Created directory");
                }
                Some(content) => {
                    let full = self.root.join(rel);
                    fs::write(&full, content).map_err(|e| Error::fs(&full, e))?;
                    debug!(path = ?rel, size = content.len(), "Wrote file");
                }
            }

            updates.push(StatUpdate {
                rel: rel.clone(),
                mode: node.mode,
                time: Some(&node.time),
            });
        }

        // Stable sort keeps later descriptors for the same path after earlier ones.
        updates.sort_by_key(|update| Reverse(update.rel.components().count()));
        for update in &updates {
            self.apply_stat(update)?;
        }

        info!("Materialized {} nodes under {:?}", nodes.len(), self.root);
        Ok(())
    }

    /// Creates a directory, returning whether it was newly created
    fn create_dir(&self, rel: &Path) -> Result<bool> {
        let full = self.root.join(rel);
        match fs::create_dir(&full) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && full.is_dir() => Ok(false),
            Err(e) => Err(Error::fs(full, e)),
        }
    }

    fn apply_stat(&self, update: &StatUpdate<'_>) -> Result<()> {
        let full = self.root.join(&update.rel);
        if let Some(time) = update.time {
            let stamp = FileTime::from_unix_time(time.timestamp(), time.timestamp_subsec_nanos());
            filetime::set_file_times(&full, stamp, stamp).map_err(|e| Error::fs(&full, e))?;
        }
        set_mode(&full, update.mode)
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| Error::fs(path, e))
}

#[cfg(not(unix))]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    let mut permissions = fs::metadata(path)
        .map_err(|e| Error::fs(path, e))?
        .permissions();
    permissions.set_readonly(mode & 0o200 == 0);
    fs::set_permissions(path, permissions).map_err(|e| Error::fs(path, e))
}

/// Creates `nodes` below `root`
pub fn materialize<P: AsRef<Path>>(root: P, nodes: &[Node]) -> Result<()> {
    Materializer::new(root.as_ref()).materialize(nodes)
}

/// Parses a descriptor and creates the tree it describes below `root`
pub fn create_tree_from_str<P: AsRef<Path>>(root: P, text: &str) -> Result<Vec<Node>> {
    let nodes = descriptor::parse_str(text)?;
    materialize(root, &nodes)?;
    Ok(nodes)
}
