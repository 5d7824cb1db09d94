//! Common test fixtures for fstree testing

use crate::TestDir;
use anyhow::Result;
use fstree_core::{parse_str, Node};

/// A small tree touching every descriptor feature: restrictive and
/// out-of-order directory modes, quoted and unquoted content, escaped names.
pub const SAMPLE_TREE: &str = r##"
    2001-01-01T01:01:01Z	0150	aaa/
    2099-01-01T01:01:01Z	0700	aaa/bbb/

    2001-01-01T01:01:01Z	0700	c.txt	"This is a two line\nfile with\ta tab\n"
    2001-01-01T01:01:01Z	0700	d.txt	No need to quote a single line without tabs

    2002-01-01T01:01:01Z	0700	"has\ttab/"
    2002-01-01T01:01:01Z	0700	"has\ttab/e.mb"	"# Markdown...\n\n... also ***possible***\n"

    2002-01-01T01:01:01Z	0700	"\u10077heavy quoted\u10078/"
"##;

/// Pairs of trees for timestamp comparisons; each case has `a` and `b` roots
pub const TIME_DIFF_MOCKS: &str = "
    2001-01-01T01:01:01Z 0700 a_same_times/a/sub/
    2001-01-01T01:01:01Z 0700 a_same_times/a/sub/f.txt same
    2001-01-01T01:01:01Z 0700 a_same_times/b/sub/
    2001-01-01T01:01:01Z 0700 a_same_times/b/sub/f.txt same

    2001-01-01T01:01:01Z 0700 b_diff_time_file/a/f.txt same
    2002-01-01T01:01:01Z 0700 b_diff_time_file/b/f.txt same

    2001-01-01T01:01:01Z 0700 c_diff_time_dir/a/sub/
    2002-01-01T01:01:01Z 0700 c_diff_time_dir/b/sub/
";

/// Nodes of [`SAMPLE_TREE`]
pub fn sample_nodes() -> Result<Vec<Node>> {
    Ok(parse_str(SAMPLE_TREE)?)
}

/// A temporary directory holding [`SAMPLE_TREE`]
pub fn sample_tree() -> Result<TestDir> {
    TestDir::from_descriptor(SAMPLE_TREE)
}

/// A temporary directory holding [`TIME_DIFF_MOCKS`]
pub fn time_diff_mocks() -> Result<TestDir> {
    TestDir::from_descriptor(TIME_DIFF_MOCKS)
}
