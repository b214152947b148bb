// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! Integration tests reading datasets written in dtool's disk layout.

use dtool_annex_dataset::{DatasetLibrary, DatasetState, DiskLibrary};
use dtool_annex_test_utils::TestDatasetBuilder;
use std::fs;

#[test]
fn test_frozen_manifest_matches_fixture() {
    let dataset = TestDatasetBuilder::new("frozen")
        .file("dir/file1.txt", b"")
        .file("dir/file2.csv", b"a,b\n1,2\n")
        .build_frozen();

    let handle = DiskLibrary::new().open_dataset(dataset.uri()).unwrap();
    assert_eq!(handle.name(), "frozen");
    assert_eq!(handle.state(), DatasetState::Frozen);

    let manifest = handle.generate_manifest().unwrap();
    assert_eq!(manifest.hash_function, "md5sum_hexdigest");
    assert_eq!(manifest.len(), 2);
    for fixture in dataset.items() {
        let item = manifest.get(&fixture.identifier).unwrap();
        assert_eq!(item.relpath, fixture.relpath);
        assert_eq!(item.hash, fixture.md5);
    }

    let order: Vec<_> = manifest.entries().map(|e| e.item.relpath.as_str()).collect();
    assert_eq!(order, vec!["dir/file1.txt", "dir/file2.csv"]);
}

#[test]
fn test_content_path_reads_item_bytes() {
    let dataset = TestDatasetBuilder::new("content")
        .file("nested/deeper/data.bin", &[0u8, 1, 2, 3, 255])
        .build_frozen();
    let fixture = dataset.item("nested/deeper/data.bin");

    let handle = DiskLibrary::new().open_dataset(dataset.uri()).unwrap();
    let path = handle.item_content_abspath(&fixture.identifier).unwrap();
    assert_eq!(fs::read(path).unwrap(), fixture.content);

    let missing = handle.item_content_abspath("0000").unwrap_err();
    assert!(missing.is_item_not_found());
}

#[test]
fn test_plain_path_and_file_uri_open_the_same_dataset() {
    let dataset = TestDatasetBuilder::new("paths").file("a", b"a").build_frozen();
    let library = DiskLibrary::new();

    let by_uri = library.open_dataset(dataset.uri()).unwrap();
    let by_path = library
        .open_dataset(&dataset.root().to_string_lossy())
        .unwrap();
    let by_uri = by_uri.generate_manifest().unwrap();
    let by_path = by_path.generate_manifest().unwrap();
    assert!(by_uri.entries().eq(by_path.entries()));
}

#[test]
fn test_proto_dataset_is_incompatible_as_frozen() {
    let dataset = TestDatasetBuilder::new("proto").file("x.txt", b"x").build_proto();
    let library = DiskLibrary::new();

    let err = library.open_dataset(dataset.uri()).unwrap_err();
    assert!(err.is_incompatible());

    let handle = library.open_proto_dataset(dataset.uri()).unwrap();
    assert_eq!(handle.state(), DatasetState::InProgress);
}

#[test]
fn test_proto_manifest_sees_late_items() {
    let mut dataset = TestDatasetBuilder::new("growing").file("first", b"1").build_proto();
    let handle = DiskLibrary::new().open_proto_dataset(dataset.uri()).unwrap();
    assert_eq!(handle.generate_manifest().unwrap().len(), 1);

    let late = dataset.add_file("second", b"2");
    let manifest = handle.generate_manifest().unwrap();
    assert_eq!(manifest.len(), 2);
    assert_eq!(manifest.get(&late.identifier).unwrap().hash, late.md5);
}

#[test]
fn test_freeze_writes_dtool_compatible_manifest() {
    let dataset = TestDatasetBuilder::new("to-freeze")
        .file("dir/file1", b"")
        .file("dir/file2", b"two")
        .build_proto();
    let library = DiskLibrary::new();

    let mut handle = library.open_proto_dataset(dataset.uri()).unwrap();
    handle.freeze().unwrap();
    assert_eq!(handle.state(), DatasetState::Frozen);
    assert_eq!(dataset.admin_type(), "dataset");

    let frozen = library.open_dataset(dataset.uri()).unwrap();
    let manifest = frozen.generate_manifest().unwrap();
    for fixture in dataset.items() {
        assert_eq!(manifest.get(&fixture.identifier).unwrap().hash, fixture.md5);
    }

    // Freezing again leaves the stored manifest untouched
    let before = fs::read(dataset.root().join(".dtool/manifest.json")).unwrap();
    handle.freeze().unwrap();
    let after = fs::read(dataset.root().join(".dtool/manifest.json")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_reload_state_observes_external_freeze() {
    let dataset = TestDatasetBuilder::new("external").file("a", b"a").build_proto();
    let mut handle = DiskLibrary::new().open_proto_dataset(dataset.uri()).unwrap();

    dataset.freeze();
    assert_eq!(handle.state(), DatasetState::InProgress);
    assert_eq!(handle.reload_state().unwrap(), DatasetState::Frozen);
}

#[test]
fn test_missing_dataset_is_not_found() {
    let temp = tempfile::TempDir::new().unwrap();
    let err = DiskLibrary::new()
        .open_dataset(&temp.path().join("nothing-here").to_string_lossy())
        .unwrap_err();
    assert!(err.is_not_found());
}
