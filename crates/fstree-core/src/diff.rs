//! Ranked comparison of two directory trees

use crate::rank::{Comparison, Rank};
use crate::walk::{collect_entries, Entry};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How a path differs between the two trees
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscrepancyKind {
    /// Present only under the left root
    LeftOnly,
    /// Present only under the right root
    RightOnly,
    /// Present on both sides but flagged by a rank
    Unequal { rank: &'static str, reason: String },
}

/// A single path-level difference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    /// Path relative to both roots
    pub path: PathBuf,
    #[serde(flatten)]
    pub kind: DiscrepancyKind,
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiscrepancyKind::LeftOnly => write!(f, "{}: left only", self.path.display()),
            DiscrepancyKind::RightOnly => write!(f, "{}: right only", self.path.display()),
            DiscrepancyKind::Unequal { rank, reason } => {
                write!(f, "{}: {}: {}", self.path.display(), rank, reason)
            }
        }
    }
}

/// Every discrepancy found by one diff, ordered by path
///
/// An empty report means the trees are equivalent under the rank chain used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DiffReport {
    discrepancies: Vec<Discrepancy>,
}

impl DiffReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, discrepancy: Discrepancy) {
        self.discrepancies.push(discrepancy);
    }

    /// Whether the trees matched
    pub fn is_empty(&self) -> bool {
        self.discrepancies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.discrepancies.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Discrepancy> {
        self.discrepancies.iter()
    }

    /// The discrepancy recorded for `path`, if any
    pub fn get<P: AsRef<Path>>(&self, path: P) -> Option<&Discrepancy> {
        let path = path.as_ref();
        self.discrepancies.iter().find(|d| d.path == path)
    }

    pub fn into_vec(self) -> Vec<Discrepancy> {
        self.discrepancies
    }
}

impl fmt::Display for DiffReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for discrepancy in &self.discrepancies {
            writeln!(f, "{}", discrepancy)?;
        }
        Ok(())
    }
}

impl IntoIterator for DiffReport {
    type Item = Discrepancy;
    type IntoIter = std::vec::IntoIter<Discrepancy>;

    fn into_iter(self) -> Self::IntoIter {
        self.discrepancies.into_iter()
    }
}

impl<'a> IntoIterator for &'a DiffReport {
    type Item = &'a Discrepancy;
    type IntoIter = std::slice::Iter<'a, Discrepancy>;

    fn into_iter(self) -> Self::IntoIter {
        self.discrepancies.iter()
    }
}

/// Compares the trees under `left` and `right` using `chain`
///
/// Paths found on one side only are always reported. For paths on both sides
/// the first rank that disagrees is recorded and the rest are skipped.
/// Missing roots, an empty chain and rank failures are errors.
pub fn diff_trees<L, R>(left: L, right: R, chain: &[Box<dyn Rank>]) -> Result<DiffReport>
where
    L: AsRef<Path>,
    R: AsRef<Path>,
{
    let left = left.as_ref();
    let right = right.as_ref();

    if chain.is_empty() {
        return Err(Error::EmptyRankChain);
    }
    check_root(left)?;
    check_root(right)?;

    let left_entries = collect_entries(left)?;
    let right_entries = collect_entries(right)?;
    let paths: BTreeSet<&PathBuf> = left_entries.keys().chain(right_entries.keys()).collect();

    let mut report = DiffReport::new();
    for path in &paths {
        let kind = match (left_entries.get(*path), right_entries.get(*path)) {
            (Some(_), None) => Some(DiscrepancyKind::LeftOnly),
            (None, Some(_)) => Some(DiscrepancyKind::RightOnly),
            (Some(l), Some(r)) => rank_pair(l, r, chain)?,
            (None, None) => None,
        };

        if let Some(kind) = kind {
            debug!(path = ?path, kind = ?kind, "Discrepancy");
            report.push(Discrepancy {
                path: (*path).clone(),
                kind,
            });
        }
    }

    info!(
        "Compared {} paths between {:?} and {:?}: {} discrepancies",
        paths.len(),
        left,
        right,
        report.len()
    );
    Ok(report)
}

fn rank_pair(
    left: &Entry,
    right: &Entry,
    chain: &[Box<dyn Rank>],
) -> Result<Option<DiscrepancyKind>> {
    for rank in chain {
        if let Comparison::Unequal(reason) = rank.compare(left, right)? {
            return Ok(Some(DiscrepancyKind::Unequal {
                rank: rank.name(),
                reason,
            }));
        }
    }
    Ok(None)
}

fn check_root(root: &Path) -> Result<()> {
    let metadata = fs::metadata(root).map_err(|e| Error::RootAccess {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !metadata.is_dir() {
        return Err(Error::RootAccess {
            path: root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }
    Ok(())
}
