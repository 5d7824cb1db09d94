//! fstree - directory tree fixtures and ranked tree comparison for tests
//!
//! This library builds directory trees from a compact line-oriented
//! descriptor and compares two trees along a caller-chosen, ordered set of
//! dimensions (name, kind, size, permissions, modification time, content).
//!
//! ```no_run
//! use fstree_core::{create_tree_from_str, diff_trees, rank::{ByName, ByContent, Rank}};
//!
//! # fn main() -> fstree_core::Result<()> {
//! create_tree_from_str("/tmp/left", "2001-01-01T01:01:01Z 0644 a.txt hello")?;
//! create_tree_from_str("/tmp/right", "2001-01-01T01:01:01Z 0644 a.txt hello")?;
//!
//! let chain: Vec<Box<dyn Rank>> = vec![Box::new(ByName), Box::new(ByContent)];
//! assert!(diff_trees("/tmp/left", "/tmp/right", &chain)?.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod descriptor;
pub mod diff;
pub mod error;
pub mod materialize;
pub mod node;
pub mod path;
pub mod rank;
pub mod walk;

pub use error::{Error, ParseError, ParseErrorKind, Result};

// Re-export commonly used types
pub use config::Config;
pub use descriptor::{parse_file, parse_reader, parse_str};
pub use diff::{diff_trees, DiffReport, Discrepancy, DiscrepancyKind};
pub use materialize::{create_tree_from_str, materialize, Materializer, DEFAULT_DIR_MODE};
pub use node::Node;
pub use rank::{
    build_chain, default_chain, ByContent, ByDir, ByName, ByPerm, BySize, ByTime, Comparison,
    Rank, RankChain, RankKind,
};
pub use walk::{collect_entries, Entry};
