//! Frame store tests: both layouts, duplicate detection, idempotent
//! finalization, and read-back by index.

use std::path::Path;

use framepack::{
    ContainerStore, DirectoryStore, FramepackError, FrameStore, StorageLayout,
};
use tempfile::TempDir;

fn payload_for(index: u64) -> Vec<u8> {
    format!("frame-{index}").into_bytes()
}

// ── DirectoryStore ─────────────────────────────────────────────────

#[test]
fn directory_store_writes_zero_padded_files() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("clip");

    let mut store = DirectoryStore::create(&root).expect("create failed");
    store.write_frame(0, &payload_for(0)).unwrap();
    store.write_frame(42, &payload_for(42)).unwrap();
    store.write_frame(123_456, &payload_for(123_456)).unwrap();
    store.finish().unwrap();

    assert!(root.join("000000.jpg").is_file());
    assert!(root.join("000042.jpg").is_file());
    assert!(root.join("123456.jpg").is_file());
    assert_eq!(store.frames_written(), 3);
}

#[test]
fn directory_store_round_trip() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("clip");

    let mut store = DirectoryStore::create(&root).expect("create failed");
    for index in 0..5 {
        store.write_frame(index, &payload_for(index)).unwrap();
    }
    store.finish().unwrap();

    for index in 0..5 {
        let bytes = DirectoryStore::read_frame(&root, index).expect("read failed");
        assert_eq!(bytes, payload_for(index));
    }
}

#[test]
fn directory_store_rejects_duplicate_index() {
    let temp = TempDir::new().unwrap();
    let mut store = DirectoryStore::create(temp.path().join("clip")).unwrap();

    store.write_frame(7, &payload_for(7)).unwrap();
    let error = store.write_frame(7, &payload_for(7)).unwrap_err();
    assert!(matches!(
        error,
        FramepackError::DuplicateIndex { index: 7, .. }
    ));
}

#[test]
fn directory_store_create_replaces_previous_contents() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("clip");

    let mut store = DirectoryStore::create(&root).unwrap();
    store.write_frame(0, &payload_for(0)).unwrap();
    store.finish().unwrap();

    // Re-creating wipes the old store.
    let store = DirectoryStore::create(&root).unwrap();
    assert!(!root.join("000000.jpg").exists());
    drop(store);
}

#[test]
fn directory_store_attach_allows_disjoint_writers() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("clip");
    DirectoryStore::create(&root).unwrap();

    let mut first = DirectoryStore::attach(&root).unwrap();
    let mut second = DirectoryStore::attach(&root).unwrap();

    first.write_frame(0, &payload_for(0)).unwrap();
    second.write_frame(1, &payload_for(1)).unwrap();
    first.finish().unwrap();
    second.finish().unwrap();

    assert_eq!(DirectoryStore::read_frame(&root, 0).unwrap(), payload_for(0));
    assert_eq!(DirectoryStore::read_frame(&root, 1).unwrap(), payload_for(1));
}

#[test]
fn directory_store_attach_requires_existing_store() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("nope");
    assert!(matches!(
        DirectoryStore::attach(&missing),
        Err(FramepackError::Storage { .. }),
    ));
}

#[test]
fn directory_store_missing_frame() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("clip");
    DirectoryStore::create(&root).unwrap();

    assert!(matches!(
        DirectoryStore::read_frame(&root, 9),
        Err(FramepackError::MissingFrame { index: 9, .. }),
    ));
}

// ── ContainerStore ─────────────────────────────────────────────────

#[test]
fn container_store_round_trip() {
    let temp = TempDir::new().unwrap();
    let container = temp.path().join("clip.zip");

    let mut store = ContainerStore::create(&container).expect("create failed");
    for index in [0_u64, 1, 2, 99, 100_000] {
        store.write_frame(index, &payload_for(index)).unwrap();
    }
    store.finish().unwrap();

    for index in [0_u64, 1, 2, 99, 100_000] {
        let bytes = ContainerStore::read_frame(&container, index).expect("read failed");
        assert_eq!(bytes, payload_for(index));
    }
}

#[test]
fn container_store_rejects_duplicate_index() {
    let temp = TempDir::new().unwrap();
    let mut store = ContainerStore::create(temp.path().join("clip.zip")).unwrap();

    store.write_frame(3, &payload_for(3)).unwrap();
    let error = store.write_frame(3, &payload_for(3)).unwrap_err();
    assert!(matches!(
        error,
        FramepackError::DuplicateIndex { index: 3, .. }
    ));
}

#[test]
fn container_store_finish_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let container = temp.path().join("clip.zip");

    let mut store = ContainerStore::create(&container).unwrap();
    store.write_frame(0, &payload_for(0)).unwrap();
    store.finish().unwrap();
    store.finish().unwrap();

    assert_eq!(
        ContainerStore::read_frame(&container, 0).unwrap(),
        payload_for(0),
    );
}

#[test]
fn container_store_write_after_finish_fails() {
    let temp = TempDir::new().unwrap();
    let mut store = ContainerStore::create(temp.path().join("clip.zip")).unwrap();
    store.finish().unwrap();

    assert!(matches!(
        store.write_frame(0, &payload_for(0)),
        Err(FramepackError::Storage { .. }),
    ));
}

#[test]
fn container_store_empty_is_valid() {
    let temp = TempDir::new().unwrap();
    let container = temp.path().join("empty.zip");

    let mut store = ContainerStore::create(&container).unwrap();
    store.finish().unwrap();

    assert!(container.is_file());
    assert!(matches!(
        ContainerStore::read_frame(&container, 0),
        Err(FramepackError::MissingFrame { index: 0, .. }),
    ));
}

#[test]
fn container_store_finalizes_on_drop() {
    let temp = TempDir::new().unwrap();
    let container = temp.path().join("clip.zip");

    {
        let mut store = ContainerStore::create(&container).unwrap();
        store.write_frame(5, &payload_for(5)).unwrap();
        // Dropped without an explicit finish.
    }

    assert_eq!(
        ContainerStore::read_frame(&container, 5).unwrap(),
        payload_for(5),
    );
}

#[test]
fn container_store_create_overwrites() {
    let temp = TempDir::new().unwrap();
    let container = temp.path().join("clip.zip");

    let mut store = ContainerStore::create(&container).unwrap();
    store.write_frame(0, &payload_for(0)).unwrap();
    store.finish().unwrap();

    let mut store = ContainerStore::create(&container).unwrap();
    store.write_frame(1, &payload_for(1)).unwrap();
    store.finish().unwrap();

    assert!(matches!(
        ContainerStore::read_frame(&container, 0),
        Err(FramepackError::MissingFrame { .. }),
    ));
    assert_eq!(
        ContainerStore::read_frame(&container, 1).unwrap(),
        payload_for(1),
    );
}

// ── StorageLayout ──────────────────────────────────────────────────

#[test]
fn layout_store_paths() {
    let root = Path::new("/data/out");
    assert_eq!(
        StorageLayout::Container.store_path(root, "clip-001"),
        root.join("clip-001.zip"),
    );
    assert_eq!(
        StorageLayout::ImageDirectory.store_path(root, "clip-001"),
        root.join("clip-001"),
    );
}

#[test]
fn layout_polymorphic_round_trip() {
    let temp = TempDir::new().unwrap();

    for layout in [StorageLayout::Container, StorageLayout::ImageDirectory] {
        let path = layout.store_path(temp.path(), "clip");
        let mut store = layout.create_store(&path).expect("create failed");
        store.write_frame(11, &payload_for(11)).unwrap();
        store.finish().unwrap();

        assert_eq!(
            layout.read_frame(&path, 11).expect("read failed"),
            payload_for(11),
        );
    }
}
