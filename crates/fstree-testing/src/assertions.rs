//! Common assertions for fstree testing

use anyhow::Result;
use chrono::{DateTime, Utc};
use filetime::FileTime;
use fstree_core::{diff_trees, DiffReport, Node, Rank};
use std::path::Path;

/// Asserts that two trees are equivalent under `chain`
///
/// Panics with the rendered report when they are not. Errors from the diff
/// itself, such as a missing root, are returned rather than turned into
/// panics.
pub fn assert_trees_match(left: &Path, right: &Path, chain: &[Box<dyn Rank>]) -> Result<()> {
    let report = diff_trees(left, right, chain)?;
    assert!(
        report.is_empty(),
        "Trees {:?} and {:?} differ:\n{}",
        left,
        right,
        report
    );
    Ok(())
}

/// Asserts that two trees differ under `chain` and returns the report
pub fn assert_trees_differ(
    left: &Path,
    right: &Path,
    chain: &[Box<dyn Rank>],
) -> Result<DiffReport> {
    let report = diff_trees(left, right, chain)?;
    assert!(
        !report.is_empty(),
        "Trees {:?} and {:?} unexpectedly match",
        left,
        right
    );
    Ok(report)
}

/// Asserts that a file has specific permissions (Unix only)
#[cfg(unix)]
pub fn assert_file_mode(path: &Path, expected: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path)?.permissions().mode() & 0o7777;

    assert_eq!(
        mode, expected,
        "Permission mismatch for {:?}: expected {:o}, got {:o}",
        path, expected, mode
    );

    Ok(())
}

/// Asserts an exact modification time
pub fn assert_mtime(path: &Path, expected: DateTime<Utc>) -> Result<()> {
    let actual = FileTime::from_last_modification_time(&std::fs::metadata(path)?);
    let expected_ft =
        FileTime::from_unix_time(expected.timestamp(), expected.timestamp_subsec_nanos());

    assert_eq!(
        actual, expected_ft,
        "Modification time mismatch for {:?}: expected {}",
        path, expected
    );

    Ok(())
}

/// Asserts that `node` exists under `root` with its kind, mode, time and content
pub fn assert_node_materialized(root: &Path, node: &Node) -> Result<()> {
    let path = root.join(node.rel_path());
    let metadata = std::fs::metadata(&path)?;

    assert_eq!(
        metadata.is_dir(),
        node.is_dir(),
        "Kind mismatch for {:?}",
        node.path
    );
    #[cfg(unix)]
    assert_file_mode(&path, node.mode)?;
    assert_mtime(&path, node.time)?;

    if let Some(content) = node.body() {
        let actual = std::fs::read(&path)?;
        assert_eq!(actual, content, "Content mismatch for {:?}", node.path);
    }

    Ok(())
}
