//! Annotation store validation.
//!
//! Checks that a store can be written and read back without losing or
//! mixing up data:
//! - Names and paths are serializable (no whitespace, no empty filenames)
//! - Filenames are unique, so mask artifacts are not shared
//! - Object ids are unique per image and boxes are not empty
//! - Optionally, mask artifacts on disk match the object lists

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::model::io_mask_png::artifact_path;
use crate::model::{ImageRecord, ObjectId};
use crate::store::AnnotationStore;

/// Options for validation behavior.
#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// If true, treat warnings as errors.
    pub strict: bool,

    /// If true, compare the object lists with the mask files in the
    /// annotation directory.
    pub check_masks: bool,
}

/// Validates a store and returns a report of all issues found.
///
/// Mask sizes are only checked for masks already loaded in the store.
pub fn validate_store(store: &AnnotationStore, opts: &ValidateOptions) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_names(store, &mut report);
    validate_images(store.images(), &mut report);
    for (index, image) in store.images().iter().enumerate() {
        validate_objects(index, image, &mut report);
        if opts.check_masks {
            validate_artifacts(store.annotation_dir(), index, image, &mut report);
        }
    }

    report
}

fn validate_names(store: &AnnotationStore, report: &mut ValidationReport) {
    let names = [
        ("class name", store.class_name()),
        ("subclass name", store.subclass_name()),
        ("folder", store.folder()),
    ];
    for (what, value) in names {
        if has_whitespace(value) {
            report.add(ValidationIssue::error(
                IssueCode::UnserializableName,
                format!("{} '{}' contains whitespace", what, value),
                IssueContext::Store,
            ));
        }
    }

    let dirs = [
        ("image directory", store.image_dir()),
        ("annotation directory", store.annotation_dir()),
    ];
    for (what, dir) in dirs {
        let value = dir.to_string_lossy();
        if has_whitespace(&value) {
            report.add(ValidationIssue::error(
                IssueCode::UnserializableName,
                format!("{} '{}' contains whitespace", what, value),
                IssueContext::Store,
            ));
        }
    }
}

fn validate_images(images: &[ImageRecord], report: &mut ValidationReport) {
    let mut seen_names: HashMap<&str, usize> = HashMap::new();
    let mut seen_stems: HashMap<String, usize> = HashMap::new();

    for (index, image) in images.iter().enumerate() {
        let context = IssueContext::Image { index };

        if image.file_name.is_empty() {
            report.add(ValidationIssue::error(
                IssueCode::EmptyFileName,
                "Empty filename",
                context,
            ));
            continue;
        }

        if has_whitespace(&image.file_name) {
            report.add(ValidationIssue::error(
                IssueCode::FileNameHasWhitespace,
                format!("Filename '{}' contains whitespace", image.file_name),
                context.clone(),
            ));
        }

        if let Some(first) = seen_names.get(image.file_name.as_str()) {
            report.add(ValidationIssue::warning(
                IssueCode::DuplicateFileName,
                format!(
                    "Duplicate filename '{}' (first seen at index {}); both images write the same masks",
                    image.file_name, first
                ),
                context,
            ));
            continue;
        }
        seen_names.insert(&image.file_name, index);

        let stem = image.stem();
        if let Some(&first) = seen_stems.get(&stem) {
            report.add(ValidationIssue::warning(
                IssueCode::SharedArtifactStem,
                format!(
                    "Filename '{}' has the same stem as '{}' (index {}); their masks collide",
                    image.file_name, images[first].file_name, first
                ),
                context,
            ));
        } else {
            seen_stems.insert(stem, index);
        }
    }
}

fn validate_objects(index: usize, image: &ImageRecord, report: &mut ValidationReport) {
    let mut seen_ids: HashSet<ObjectId> = HashSet::new();

    for (position, object) in image.objects().iter().enumerate() {
        let context = IssueContext::Object {
            image: index,
            position,
        };

        if !seen_ids.insert(object.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateObjectId,
                format!("Duplicate object id {}", object.id),
                context.clone(),
            ));
        }

        if object.bbox.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyObjectBBox,
                format!("Box {}x{} covers no pixels", object.bbox.w, object.bbox.h),
                context.clone(),
            ));
        }

        if let Some(mask) = object.mask() {
            let (w, h) = mask.dimensions();
            let box_sized = (w, h) == (object.bbox.w, object.bbox.h);
            if !box_sized && !object.bbox.fits_within(w, h) {
                report.add(ValidationIssue::warning(
                    IssueCode::MaskSizeMismatch,
                    format!(
                        "Mask is {}x{}, neither the box size {}x{} nor a frame containing the box",
                        w, h, object.bbox.w, object.bbox.h
                    ),
                    context,
                ));
            }
        }
    }
}

fn validate_artifacts(
    annotation_dir: &Path,
    index: usize,
    image: &ImageRecord,
    report: &mut ValidationReport,
) {
    let stem = image.stem();

    for position in 0..image.object_count() {
        let path = artifact_path(annotation_dir, &stem, position);
        if !path.is_file() {
            report.add(ValidationIssue::warning(
                IssueCode::MissingMaskArtifact,
                format!("Mask file {} does not exist", path.display()),
                IssueContext::Object {
                    image: index,
                    position,
                },
            ));
        }
    }

    let stale = (image.object_count()..)
        .take_while(|&p| artifact_path(annotation_dir, &stem, p).exists())
        .count();
    if stale > 0 {
        report.add(ValidationIssue::warning(
            IssueCode::StaleMaskArtifact,
            format!(
                "{} stale mask file(s) above object count {}",
                stale,
                image.object_count()
            ),
            IssueContext::Image { index },
        ));
    }
}

fn has_whitespace(value: &str) -> bool {
    value.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::io_mask_png::write_mask;
    use crate::model::{BBox, ObjectRecord};
    use image::GrayImage;

    fn valid_store() -> AnnotationStore {
        let mut image = ImageRecord::new("bag_1.png");
        image.add_object(ObjectRecord::new(0u64, BBox::new(10, 20, 30, 40)));

        let mut store = AnnotationStore::new();
        store.push_image(image);
        store.push_image(ImageRecord::new("bag_2.png"));
        store
    }

    #[test]
    fn test_valid_store() {
        let report = validate_store(&valid_store(), &ValidateOptions::default());
        assert!(
            report.is_clean(),
            "Expected no issues, got: {:?}",
            report.issues
        );
    }

    #[test]
    fn test_duplicate_file_name_is_warning() {
        let mut store = valid_store();
        store.push_image(ImageRecord::new("bag_1.png"));

        let report = validate_store(&store, &ValidateOptions::default());
        assert_eq!(report.error_count(), 0);
        assert_eq!(report.warning_count(), 1);
        assert!(report.has(IssueCode::DuplicateFileName));
    }

    #[test]
    fn test_shared_artifact_stem() {
        let mut store = valid_store();
        store.push_image(ImageRecord::new("bag_1.jpg"));

        let report = validate_store(&store, &ValidateOptions::default());
        assert!(report.has(IssueCode::SharedArtifactStem));
    }

    #[test]
    fn test_whitespace_in_file_name() {
        let mut store = valid_store();
        store.push_image(ImageRecord::new("bag 3.png"));
        store.push_image(ImageRecord::new(""));

        let report = validate_store(&store, &ValidateOptions::default());
        assert_eq!(report.error_count(), 2);
        assert!(report.has(IssueCode::FileNameHasWhitespace));
        assert!(report.has(IssueCode::EmptyFileName));
    }

    #[test]
    fn test_unserializable_class_name() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let mut store = valid_store();
        store
            .load_directory(temp.path(), "bags", "*")
            .expect("scan empty dir");
        store.set_class_name("hand gun", "none").expect("set class");

        let report = validate_store(&store, &ValidateOptions::default());
        assert!(report.has(IssueCode::UnserializableName));
    }

    #[test]
    fn test_duplicate_object_id_and_empty_box() {
        let mut store = valid_store();
        let image = store.image_mut(0).expect("image 0");
        image.add_object(ObjectRecord::new(0u64, BBox::new(0, 0, 0, 5)));

        let report = validate_store(&store, &ValidateOptions::default());
        assert_eq!(report.error_count(), 1);
        assert!(report.has(IssueCode::DuplicateObjectId));
        assert!(report.has(IssueCode::EmptyObjectBBox));
    }

    #[test]
    fn test_mask_size_mismatch() {
        let mut store = valid_store();
        let image = store.image_mut(0).expect("image 0");
        image
            .object_by_id_mut(ObjectId(0))
            .expect("object 0")
            .set_mask(GrayImage::new(5, 5));

        let report = validate_store(&store, &ValidateOptions::default());
        assert!(report.has(IssueCode::MaskSizeMismatch));
    }

    #[test]
    fn test_check_masks_reports_missing_and_stale_files() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let mut store = valid_store();
        store
            .set_annotation_dir(temp.path().to_path_buf())
            .expect("set annotation dir");
        for (stem, position) in [("bag_2", 0), ("bag_2", 1)] {
            write_mask(&artifact_path(temp.path(), stem, position), &GrayImage::new(1, 1))
                .expect("write mask");
        }

        let opts = ValidateOptions {
            check_masks: true,
            ..Default::default()
        };
        let report = validate_store(&store, &opts);
        assert!(report.has(IssueCode::MissingMaskArtifact));
        assert!(report.has(IssueCode::StaleMaskArtifact));
        assert_eq!(report.warning_count(), 2);
    }

    #[test]
    fn test_report_serializes_to_json() {
        let mut store = valid_store();
        store.push_image(ImageRecord::new("bag_1.png"));
        let report = validate_store(&store, &ValidateOptions::default());

        let json: serde_json::Value =
            serde_json::from_str(&report.to_json().expect("serialize")).expect("parse json");
        assert_eq!(json["warning_count"], 1);
        assert_eq!(json["issues"][0]["code"], "DuplicateFileName");
        assert_eq!(json["issues"][0]["severity"], "warning");
        assert_eq!(json["issues"][0]["context"]["kind"], "image");
        assert_eq!(json["issues"][0]["context"]["index"], 2);
    }
}
