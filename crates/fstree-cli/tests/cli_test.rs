//! Integration tests for the fstree binary and its exit codes

#![cfg(unix)]

use assert_cmd::Command;
use fstree_testing::assertions::{assert_file_mode, assert_mtime};
use fstree_testing::TestDir;
use predicates::prelude::*;
use std::fs;

const DESCRIPTOR: &str = "\
2001-01-01T01:01:01Z\t0750\tdocs/
2002-02-02T02:02:02.5Z\t0640\tdocs/readme.txt\t\"hello\\nworld\\n\"
2003-03-03T03:03:03Z\t0600\tdeep/nested/leaf.txt\tleaf
";

fn fstree() -> Command {
    Command::cargo_bin("fstree").unwrap()
}

#[test]
fn test_create_from_file() {
    let workspace = TestDir::new().unwrap();
    let descriptor = workspace.create_file("tree.txt", DESCRIPTOR.as_bytes()).unwrap();
    let root = workspace.path().join("out");

    fstree()
        .arg("create")
        .arg(&descriptor)
        .arg("--root")
        .arg(&root)
        .assert()
        .success();

    assert_eq!(
        fs::read(root.join("docs/readme.txt")).unwrap(),
        b"hello\nworld\n"
    );
    assert_mtime(
        &root.join("docs/readme.txt"),
        "2002-02-02T02:02:02.5Z".parse().unwrap(),
    )
    .unwrap();
    assert_mtime(&root.join("docs"), "2001-01-01T01:01:01Z".parse().unwrap()).unwrap();
    assert_file_mode(&root.join("docs"), 0o750).unwrap();
    assert_file_mode(&root.join("deep"), 0o700).unwrap();
}

#[test]
fn test_create_from_stdin_with_dir_mode() {
    let workspace = TestDir::new().unwrap();

    fstree()
        .arg("create")
        .arg("-")
        .arg("--root")
        .arg(workspace.path())
        .arg("--dir-mode")
        .arg("755")
        .write_stdin(DESCRIPTOR)
        .assert()
        .success();

    assert_eq!(fs::read(workspace.path().join("deep/nested/leaf.txt")).unwrap(), b"leaf");
    assert_file_mode(&workspace.path().join("deep/nested"), 0o755).unwrap();
}

#[test]
fn test_create_uses_config_dir_mode() {
    let workspace = TestDir::new().unwrap();
    let config = workspace
        .create_file("fstree.toml", b"[create]\ndefault_dir_mode = \"711\"\n")
        .unwrap();
    let root = workspace.path().join("out");

    fstree()
        .arg("--config")
        .arg(&config)
        .arg("create")
        .arg("-")
        .arg("--root")
        .arg(&root)
        .write_stdin("2001-01-01T01:01:01Z 0644 a/b/c.txt x\n")
        .assert()
        .success();

    assert_file_mode(&root.join("a/b"), 0o711).unwrap();
}

#[test]
fn test_parse_prints_normalized_lines() {
    fstree()
        .arg("parse")
        .arg("-")
        .write_stdin("  2001-01-01T01:01:01Z   644   a.txt   \"two\\tparts\"\n\n")
        .assert()
        .success()
        .stdout("2001-01-01T01:01:01Z\t0644\ta.txt\t\"two\\tparts\"\n");
}

#[test]
fn test_parse_error_exit_code() {
    fstree()
        .arg("parse")
        .arg("-")
        .write_stdin("2001-01-01T01:01:01Z 0644 ok.txt fine\nnot-a-time 0644 bad.txt\n")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn test_missing_descriptor_exit_code() {
    let workspace = TestDir::new().unwrap();

    fstree()
        .arg("parse")
        .arg(workspace.path().join("missing.txt"))
        .assert()
        .code(2);
}

#[test]
fn test_diff_equivalent_trees() {
    let left = TestDir::from_descriptor(DESCRIPTOR).unwrap();
    let right = TestDir::clone_from(left.path()).unwrap();

    fstree()
        .arg("diff")
        .arg(left.path())
        .arg(right.path())
        .arg("--ranks")
        .arg("name,dir,size,perm,time,content")
        .assert()
        .success()
        .stdout("");
}

#[test]
fn test_diff_reports_discrepancies() {
    let left = TestDir::from_descriptor(DESCRIPTOR).unwrap();
    let right = TestDir::clone_from(left.path()).unwrap();
    right.create_file("docs/readme.txt", b"HELLO\nWORLD\n").unwrap();
    right.remove_matching("leaf.txt").unwrap();

    fstree()
        .arg("diff")
        .arg(left.path())
        .arg(right.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("deep/nested/leaf.txt: left only"))
        .stdout(predicate::str::contains("docs/readme.txt: ByContent"));
}

#[test]
fn test_diff_json_output() {
    let left = TestDir::from_descriptor("2001-01-01T01:01:01Z 0644 only-left.txt x").unwrap();
    let right = TestDir::new().unwrap();

    let output = fstree()
        .arg("diff")
        .arg(left.path())
        .arg(right.path())
        .arg("--json")
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report[0]["path"], "only-left.txt");
    assert_eq!(report[0]["kind"], "left_only");
}

#[test]
fn test_diff_unknown_rank_exit_code() {
    let left = TestDir::new().unwrap();
    let right = TestDir::new().unwrap();

    fstree()
        .arg("diff")
        .arg(left.path())
        .arg(right.path())
        .arg("--ranks")
        .arg("name,colour")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("colour"));
}

#[test]
fn test_diff_missing_root_exit_code() {
    let left = TestDir::new().unwrap();

    fstree()
        .arg("diff")
        .arg(left.path())
        .arg(left.path().join("absent"))
        .assert()
        .code(2);
}

#[test]
fn test_invalid_config_exit_code() {
    let workspace = TestDir::new().unwrap();
    let config = workspace
        .create_file("fstree.toml", b"[diff]\nranks = []\n")
        .unwrap();

    fstree()
        .arg("--config")
        .arg(&config)
        .arg("config")
        .assert()
        .code(3);
}

#[test]
fn test_default_config_output() {
    fstree()
        .arg("config")
        .arg("--default")
        .assert()
        .success()
        .stdout(predicate::str::contains("[create]"))
        .stdout(predicate::str::contains("ranks = [\"name\", \"dir\", \"size\", \"content\"]"));
}

#[test]
fn test_usage_error_exit_code() {
    fstree()
        .arg("diff")
        .arg("only-one")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("<RIGHT>"));

    fstree().assert().code(3);
}

#[test]
fn test_help_and_version_succeed() {
    fstree()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("diff"));

    fstree().arg("--version").assert().success();
}

#[test]
fn test_signed_dir_mode_rejected() {
    let workspace = TestDir::new().unwrap();

    fstree()
        .arg("create")
        .arg("-")
        .arg("--root")
        .arg(workspace.path())
        .arg("--dir-mode")
        .arg("+755")
        .write_stdin("2001-01-01T01:01:01Z 0644 a/b.txt x\n")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("not an octal number"));
    assert!(!workspace.path().join("a").exists());
}
