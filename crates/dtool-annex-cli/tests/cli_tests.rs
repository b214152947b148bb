// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! Integration tests for the dtool-annex binaries

use dtool_annex_test_utils::{dtool_annex, git_annex_remote_dtool, TestDatasetBuilder};
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn fake_repo() -> TempDir {
    let repo = TempDir::new().unwrap();
    fs::create_dir(repo.path().join(".git")).unwrap();
    repo
}

#[test]
fn test_ls_lists_items_with_urls() {
    let dataset = TestDatasetBuilder::new("ds")
        .file("dir/file1.txt", b"hello")
        .file("dir/file2.txt", b"world")
        .build_frozen();

    dtool_annex()
        .arg("ls")
        .arg(dataset.uri())
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "dir/file1.txt\t{}",
            dataset.retrieval_url("dir/file1.txt")
        )))
        .stdout(predicate::str::contains(format!(
            "dir/file2.txt\t{}",
            dataset.retrieval_url("dir/file2.txt")
        )));
}

#[test]
fn test_ls_json() {
    let dataset = TestDatasetBuilder::new("ds")
        .file("a.txt", b"a")
        .build_frozen();

    let output = dtool_annex()
        .args(["-q", "ls", "--json"])
        .arg(dataset.uri())
        .output()
        .unwrap();
    assert!(output.status.success());

    let items: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 1);
    let item = dataset.item("a.txt");
    assert_eq!(items[0]["relpath"], "a.txt");
    assert_eq!(items[0]["identifier"], item.identifier.as_str());
    assert_eq!(items[0]["hash"], item.md5.as_str());
    assert_eq!(items[0]["size_in_bytes"], 1);
    assert_eq!(items[0]["url"], dataset.retrieval_url("a.txt").as_str());
}

#[test]
fn test_ls_proto_dataset_does_not_freeze() {
    let dataset = TestDatasetBuilder::new("proto")
        .file("a.txt", b"a")
        .build_proto();

    dtool_annex()
        .arg("ls")
        .arg(dataset.uri())
        .assert()
        .success()
        .stdout(predicate::str::contains("a.txt\t"));
    assert_eq!(dataset.admin_type(), "protodataset");
}

#[test]
fn test_ls_missing_dataset() {
    let temp = TempDir::new().unwrap();
    dtool_annex()
        .arg("ls")
        .arg(temp.path().join("nothing-here"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open dataset"));
}

#[test]
fn test_import_requires_git_repository() {
    let dataset = TestDatasetBuilder::new("ds").file("a.txt", b"a").build_frozen();
    let not_a_repo = TempDir::new().unwrap();

    dtool_annex()
        .arg("import")
        .arg(dataset.uri())
        .arg("-C")
        .arg(not_a_repo.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a git repository"));
}

#[test]
fn test_import_dry_run() {
    let dataset = TestDatasetBuilder::new("ds")
        .file("dir/file1.txt", b"one")
        .build_frozen();
    let repo = fake_repo();

    dtool_annex()
        .args(["import", "--dry-run", "--fast", "--prefix", "raw"])
        .arg(dataset.uri())
        .arg("-C")
        .arg(repo.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with(format!(
            "git annex initremote dtool type=external externaltype=dtool encryption=none autoenable=true uri={}\n",
            dataset.uri()
        )))
        .stdout(predicate::str::contains(format!(
            "git annex addurl --fast --file=raw/dir/file1.txt {}",
            dataset.retrieval_url("dir/file1.txt")
        )))
        .stdout(predicate::str::contains(format!(
            "git commit -m 'Import dtool dataset ds ({})' -- raw/dir/file1.txt\n",
            dataset.uri()
        )));
}

#[test]
fn test_import_dry_run_no_save() {
    let dataset = TestDatasetBuilder::new("ds").file("a.txt", b"a").build_frozen();
    let repo = fake_repo();

    dtool_annex()
        .args(["import", "--dry-run", "--no-save"])
        .arg(dataset.uri())
        .arg("-C")
        .arg(repo.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("git annex addurl --file=a.txt"))
        .stdout(predicate::str::contains("git commit").not());
}

#[test]
fn test_init_remote_dry_run() {
    let repo = fake_repo();

    dtool_annex()
        .args(["init-remote", "file:///data/ds", "--name", "archive", "--claim-mode", "scheme", "--dry-run"])
        .arg("-C")
        .arg(repo.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("annex initremote archive type=external externaltype=dtool"))
        .stdout(predicate::str::contains("uri=file:///data/ds claim-mode=scheme"));
}

#[test]
fn test_init_remote_rejects_unknown_claim_mode() {
    let repo = fake_repo();
    dtool_annex()
        .args(["init-remote", "/data/ds", "--claim-mode", "everything"])
        .arg("-C")
        .arg(repo.path())
        .assert()
        .failure();
}

#[test]
fn test_version_and_completions() {
    dtool_annex()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dtool-annex"))
        .stdout(predicate::str::contains("protocol: 1"));

    dtool_annex()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dtool-annex"));
}

#[test]
fn test_remote_program_answers_git_annex() {
    let dataset = TestDatasetBuilder::new("ds")
        .file("dir/file1.txt", b"hello")
        .build_frozen();
    let key = dataset.item("dir/file1.txt").annex_key();
    let out = TempDir::new().unwrap();
    let dest = out.path().join("retrieved");

    let script = format!(
        "PREPARE\nVALUE {uri}\nVALUE\nVALUE\nCHECKPRESENT {key}\nTRANSFER RETRIEVE {key} {dest}\n",
        uri = dataset.uri(),
        key = key,
        dest = dest.display()
    );

    git_annex_remote_dtool()
        .write_stdin(script)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("VERSION 1\n"))
        .stdout(predicate::str::contains("PREPARE-SUCCESS"))
        .stdout(predicate::str::contains(format!("CHECKPRESENT-SUCCESS {}", key)))
        .stdout(predicate::str::contains(format!("TRANSFER-SUCCESS RETRIEVE {}", key)));
    assert_eq!(fs::read(&dest).unwrap(), b"hello");
}

#[test]
fn test_remote_program_fails_on_git_annex_error() {
    git_annex_remote_dtool()
        .write_stdin("ERROR giving up\n")
        .assert()
        .failure()
        .stdout(predicate::str::starts_with("VERSION 1"));
}

#[test]
fn test_remote_program_logs_without_ansi_colors() {
    git_annex_remote_dtool()
        .env("DTOOL_ANNEX_LOG", "debug")
        .env_remove("DTOOL_ANNEX_LOG_FORMAT")
        .write_stdin("ERROR giving up\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Starting git-annex-remote-dtool"))
        .stderr(predicate::str::contains("\u{1b}[").not());
}
