//! Rank functions: the pluggable comparison dimensions used while diffing
//!
//! A rank chain is an ordered slice of ranks. For each path present on both
//! sides the chain is evaluated left to right and stops at the first rank
//! that reports a difference, so cheap checks belong in front of expensive
//! ones and dimensions that do not matter are simply left out.

use crate::walk::{format_filetime, Entry};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of comparing two entries along one dimension
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    /// The entries differ; the string says how
    Unequal(String),
}

impl Comparison {
    pub fn is_equal(&self) -> bool {
        matches!(self, Comparison::Equal)
    }
}

/// One comparison dimension
///
/// Returning `Err` aborts the whole diff; use it for failures such as an
/// unreadable file, never for an ordinary difference.
pub trait Rank {
    /// Name shown in diff reports
    fn name(&self) -> &'static str;

    /// Compares two entries matched by relative path
    fn compare(&self, left: &Entry, right: &Entry) -> Result<Comparison>;
}

/// An ordered list of ranks
pub type RankChain = Vec<Box<dyn Rank>>;

/// Compares base names
///
/// The differ pairs entries by relative path and reports one-sided entries on
/// its own, so in practice this rank only guards the chain's first slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByName;

impl Rank for ByName {
    fn name(&self) -> &'static str {
        "ByName"
    }

    fn compare(&self, left: &Entry, right: &Entry) -> Result<Comparison> {
        if left.name == right.name {
            Ok(Comparison::Equal)
        } else {
            Ok(Comparison::Unequal(format!(
                "name {:?} != {:?}",
                left.name, right.name
            )))
        }
    }
}

/// Directory on one side, file on the other
#[derive(Debug, Clone, Copy, Default)]
pub struct ByDir;

impl Rank for ByDir {
    fn name(&self) -> &'static str {
        "ByDir"
    }

    fn compare(&self, left: &Entry, right: &Entry) -> Result<Comparison> {
        if left.is_dir == right.is_dir {
            Ok(Comparison::Equal)
        } else {
            Ok(Comparison::Unequal(format!(
                "left is a {}, right is a {}",
                left.kind(),
                right.kind()
            )))
        }
    }
}

/// File length; directories always compare equal
#[derive(Debug, Clone, Copy, Default)]
pub struct BySize;

impl Rank for BySize {
    fn name(&self) -> &'static str {
        "BySize"
    }

    fn compare(&self, left: &Entry, right: &Entry) -> Result<Comparison> {
        if left.is_dir || right.is_dir || left.size == right.size {
            Ok(Comparison::Equal)
        } else {
            Ok(Comparison::Unequal(format!(
                "size {} != {}",
                left.size, right.size
            )))
        }
    }
}

/// Permission bits
#[derive(Debug, Clone, Copy, Default)]
pub struct ByPerm;

impl Rank for ByPerm {
    fn name(&self) -> &'static str {
        "ByPerm"
    }

    fn compare(&self, left: &Entry, right: &Entry) -> Result<Comparison> {
        if left.mode == right.mode {
            Ok(Comparison::Equal)
        } else {
            Ok(Comparison::Unequal(format!(
                "mode {:04o} != {:04o}",
                left.mode, right.mode
            )))
        }
    }
}

/// Exact modification time, no tolerance
#[derive(Debug, Clone, Copy, Default)]
pub struct ByTime;

impl Rank for ByTime {
    fn name(&self) -> &'static str {
        "ByTime"
    }

    fn compare(&self, left: &Entry, right: &Entry) -> Result<Comparison> {
        if left.mtime == right.mtime {
            Ok(Comparison::Equal)
        } else {
            Ok(Comparison::Unequal(format!(
                "modified {} != {}",
                format_filetime(left.mtime),
                format_filetime(right.mtime)
            )))
        }
    }
}

/// Full byte content; directories always compare equal
///
/// Both files are read into memory. A read failure aborts the diff.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByContent;

impl Rank for ByContent {
    fn name(&self) -> &'static str {
        "ByContent"
    }

    fn compare(&self, left: &Entry, right: &Entry) -> Result<Comparison> {
        if left.is_dir || right.is_dir {
            return Ok(Comparison::Equal);
        }

        let left_content = left.read_content()?;
        let right_content = right.read_content()?;
        if left_content == right_content {
            return Ok(Comparison::Equal);
        }

        Ok(Comparison::Unequal(format!(
            "content differs (blake3 {} != {})",
            short_digest(&left_content),
            short_digest(&right_content)
        )))
    }
}

fn short_digest(content: &[u8]) -> String {
    let mut hex = blake3::hash(content).to_hex().to_string();
    hex.truncate(16);
    hex
}

/// Names for the built-in ranks, used by configuration files and the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankKind {
    Name,
    Dir,
    Size,
    Perm,
    Time,
    Content,
}

impl RankKind {
    pub const ALL: [RankKind; 6] = [
        RankKind::Name,
        RankKind::Dir,
        RankKind::Size,
        RankKind::Perm,
        RankKind::Time,
        RankKind::Content,
    ];

    /// Instantiates the rank this name stands for
    pub fn to_rank(self) -> Box<dyn Rank> {
        match self {
            RankKind::Name => Box::new(ByName),
            RankKind::Dir => Box::new(ByDir),
            RankKind::Size => Box::new(BySize),
            RankKind::Perm => Box::new(ByPerm),
            RankKind::Time => Box::new(ByTime),
            RankKind::Content => Box::new(ByContent),
        }
    }
}

impl FromStr for RankKind {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" | "byname" => Ok(RankKind::Name),
            "dir" | "bydir" => Ok(RankKind::Dir),
            "size" | "bysize" => Ok(RankKind::Size),
            "perm" | "mode" | "byperm" => Ok(RankKind::Perm),
            "time" | "mtime" | "bytime" => Ok(RankKind::Time),
            "content" | "bycontent" => Ok(RankKind::Content),
            _ => Err(Error::UnknownRank(s.to_string())),
        }
    }
}

impl fmt::Display for RankKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankKind::Name => write!(f, "name"),
            RankKind::Dir => write!(f, "dir"),
            RankKind::Size => write!(f, "size"),
            RankKind::Perm => write!(f, "perm"),
            RankKind::Time => write!(f, "time"),
            RankKind::Content => write!(f, "content"),
        }
    }
}

/// Parses a comma-separated list of rank names such as `"name,dir,size"`
pub fn parse_kinds(list: &str) -> Result<Vec<RankKind>> {
    list.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(RankKind::from_str)
        .collect()
}

/// Builds a chain from rank names, preserving their order
pub fn build_chain(kinds: &[RankKind]) -> RankChain {
    kinds.iter().map(|kind| kind.to_rank()).collect()
}

/// `ByName`, `ByDir`, `BySize`, `ByContent`
pub fn default_chain() -> RankChain {
    build_chain(&[
        RankKind::Name,
        RankKind::Dir,
        RankKind::Size,
        RankKind::Content,
    ])
}
