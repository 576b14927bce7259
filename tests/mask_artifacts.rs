//! Mask artifacts follow object positions across deletes, reloads and saves.

use std::fs;
use std::path::Path;

use xrant::model::io_mask_png::DEFAULT_BRUSH;
use xrant::model::{MaskSaveSummary, ObjectId};
use xrant::AnnotationStore;

mod common;

/// A store with one image `bag.png` holding three 4x4 objects whose masks
/// are filled with 10, 20 and 30, already saved.
fn saved_store(root: &Path) -> AnnotationStore {
    common::make_collection(root, &["bag.png"]);
    let mut store = AnnotationStore::new();
    store.load_directory(root, "bags", "*.png").expect("scan");
    store.set_class_name("gun", "none").expect("set class");

    for (id, value) in [10u8, 20, 30].into_iter().enumerate() {
        let mask = common::filled_mask(4, 4, value);
        assert!(store.add_object(Some(mask), None, id as i32 * 10, 0, ObjectId(id as u64)));
    }
    let summary = store.save_current_object_masks().expect("save masks");
    assert_eq!(
        summary,
        Some(MaskSaveSummary {
            written: 3,
            ..Default::default()
        })
    );
    store
}

fn artifact(store: &AnnotationStore, position: usize) -> std::path::PathBuf {
    store.mask_path(0, position).expect("image exists")
}

#[test]
fn artifacts_are_named_by_position() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let store = saved_store(temp.path());

    assert_eq!(
        common::png_files(store.annotation_dir()),
        vec!["bag.0.png", "bag.1.png", "bag.2.png"]
    );
    assert_eq!(common::mask_value(&artifact(&store, 2)), 30);
}

#[test]
fn deleting_an_object_renumbers_artifacts() {
    xrant::logging::init_for_tests();
    let temp = tempfile::tempdir().expect("create temp dir");
    let mut store = saved_store(temp.path());

    assert_eq!(store.delete_objects(&[ObjectId(1)]), 1);
    let summary = store
        .save_current_object_masks()
        .expect("save masks")
        .expect("image has objects");
    assert_eq!(summary.written, 2);
    assert_eq!(summary.swept, 1);

    assert_eq!(
        common::png_files(store.annotation_dir()),
        vec!["bag.0.png", "bag.1.png"]
    );
    assert_eq!(common::mask_value(&artifact(&store, 0)), 10);
    assert_eq!(common::mask_value(&artifact(&store, 1)), 30);

    let ids: Vec<ObjectId> = store.current_image().unwrap().objects().iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![ObjectId(0), ObjectId(2)]);
}

#[test]
fn deleting_after_masks_were_dropped_still_renumbers() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let mut store = saved_store(temp.path());
    store.drop_object_masks();
    assert!(store.current_image().unwrap().objects().iter().all(|o| !o.has_mask()));

    store.delete_objects(&[ObjectId(0)]);
    store.save_current_object_masks().expect("save masks");

    assert_eq!(
        common::png_files(store.annotation_dir()),
        vec!["bag.0.png", "bag.1.png"]
    );
    assert_eq!(common::mask_value(&artifact(&store, 0)), 20);
    assert_eq!(common::mask_value(&artifact(&store, 1)), 30);
}

#[test]
fn deleting_every_object_leaves_artifacts_until_next_save() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let mut store = saved_store(temp.path());

    store.delete_all_objects();
    assert_eq!(store.object_count(0), 0);
    // An image without objects is not saved, so nothing is swept.
    assert_eq!(store.save_current_object_masks().expect("no-op"), None);
    assert_eq!(common::png_files(store.annotation_dir()).len(), 3);
}

#[test]
fn missing_artifact_removes_object_after_full_pass() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let mut store = saved_store(temp.path());
    store.drop_object_masks();
    fs::remove_file(artifact(&store, 1)).expect("remove artifact");

    let removed = store.load_object_images(0, DEFAULT_BRUSH, false);
    assert_eq!(removed, vec![ObjectId(1)]);

    let image = store.current_image().expect("current image");
    assert_eq!(image.object_count(), 2);
    // Object 2 was loaded from position 2 before object 1 was removed.
    let last = image.object_by_id(ObjectId(2)).expect("object 2 kept");
    assert_eq!(last.mask().map(|m| m.get_pixel(0, 0)[0]), Some(30));
    assert!(last.has_region());

    store.save_current_object_masks().expect("save masks");
    assert_eq!(
        common::png_files(store.annotation_dir()),
        vec!["bag.0.png", "bag.1.png"]
    );
    assert_eq!(common::mask_value(&artifact(&store, 1)), 30);
}

#[test]
fn repeated_save_keeps_files_byte_identical() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let mut store = saved_store(temp.path());
    let before: Vec<Vec<u8>> = (0..3)
        .map(|p| fs::read(artifact(&store, p)).expect("read artifact"))
        .collect();

    let summary = store
        .save_current_object_masks()
        .expect("save masks")
        .expect("image has objects");
    assert_eq!(summary.written, 0);
    assert_eq!(summary.unchanged, 3);

    // A reload marks masks dirty; writing them again produces the same bytes.
    assert_eq!(store.load_object_masks(0, true), 3);
    let summary = store.save_object_masks(0).expect("save masks").expect("objects");
    assert_eq!(summary.written, 3);

    let after: Vec<Vec<u8>> = (0..3)
        .map(|p| fs::read(artifact(&store, p)).expect("read artifact"))
        .collect();
    assert_eq!(before, after);
}

#[test]
fn forced_reload_keeps_unsaved_mask() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let mut store = saved_store(temp.path());

    store
        .current_image_mut()
        .and_then(|i| i.object_by_id_mut(ObjectId(0)))
        .expect("object 0")
        .set_mask(common::filled_mask(4, 4, 99));
    store.load_object_masks(0, true);

    let object = store.current_image().unwrap().object(0).expect("object 0");
    assert_eq!(object.mask().map(|m| m.get_pixel(0, 0)[0]), Some(99));
}

#[test]
fn save_creates_missing_annotation_dir() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let mut store = saved_store(temp.path());
    assert_eq!(store.load_object_masks(0, true), 3);

    let dir = temp.path().join("annotation/moved");
    store.set_annotation_dir(&dir).expect("set dir");
    fs::remove_dir(&dir).expect("remove fresh dir");

    store.save_current_object_masks().expect("save masks");
    assert_eq!(
        common::png_files(&dir),
        vec!["bag.0.png", "bag.1.png", "bag.2.png"]
    );
}

#[test]
fn delete_is_refused_when_a_moving_mask_cannot_be_read() {
    xrant::logging::init_for_tests();
    let temp = tempfile::tempdir().expect("create temp dir");
    let mut store = saved_store(temp.path());
    store.drop_object_masks();
    fs::write(artifact(&store, 1), b"not a png").expect("corrupt artifact");

    assert_eq!(store.delete_objects(&[ObjectId(0)]), 0);
    assert_eq!(store.object_count(0), 3);

    store.save_current_object_masks().expect("save masks");
    assert_eq!(common::mask_value(&artifact(&store, 0)), 10);
    assert_eq!(common::mask_value(&artifact(&store, 2)), 30);

    // Deleting the last object moves nothing and is still allowed.
    assert_eq!(store.delete_objects(&[ObjectId(2)]), 1);
}

#[test]
fn missing_artifact_is_kept_when_a_later_mask_cannot_be_read() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let mut store = saved_store(temp.path());
    store.drop_object_masks();
    fs::remove_file(artifact(&store, 0)).expect("remove artifact");
    fs::write(artifact(&store, 2), b"not a png").expect("corrupt artifact");

    let removed = store.load_object_images(0, DEFAULT_BRUSH, false);
    assert!(removed.is_empty());
    assert_eq!(store.object_count(0), 3);
}
