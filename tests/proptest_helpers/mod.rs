#![allow(dead_code)]

use std::path::PathBuf;

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use xrant::model::io_list_txt::ListHeader;
use xrant::model::{BBox, ImageRecord, ImageSet, Level, ObjectRecord, Polarity, ViewLabel};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Everything a record line stores about one object. Masks, regions and ids
/// are not part of the list file.
pub type ObjectSem = (ViewLabel, Polarity, BBox);

/// Everything a record line stores about one image.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageSem {
    pub file_name: String,
    pub set: ImageSet,
    pub level: Level,
    pub label: Polarity,
    pub objects: Vec<ObjectSem>,
}

pub fn image_semantics(images: &[ImageRecord]) -> Vec<ImageSem> {
    images
        .iter()
        .map(|image| ImageSem {
            file_name: image.file_name.clone(),
            set: image.set,
            level: image.level,
            label: image.label,
            objects: image
                .objects()
                .iter()
                .map(|o| (o.view, o.label, o.bbox))
                .collect(),
        })
        .collect()
}

pub fn arb_polarity() -> impl Strategy<Value = Polarity> {
    prop::sample::select(Polarity::ALL.to_vec())
}

pub fn arb_level() -> impl Strategy<Value = Level> {
    prop::sample::select(Level::ALL.to_vec())
}

pub fn arb_set() -> impl Strategy<Value = ImageSet> {
    prop::sample::select(ImageSet::ALL.to_vec())
}

pub fn arb_view() -> impl Strategy<Value = ViewLabel> {
    prop::sample::select(ViewLabel::ALL.to_vec())
}

pub fn arb_bbox() -> BoxedStrategy<BBox> {
    (-50i32..4096, -50i32..4096, 0u32..2048, 0u32..2048)
        .prop_map(|(x1, y1, w, h)| BBox::new(x1, y1, w, h))
        .boxed()
}

pub fn arb_image(max_objects: usize) -> BoxedStrategy<ImageRecord> {
    (
        file_name_strategy(),
        arb_set(),
        arb_level(),
        arb_polarity(),
        proptest::collection::vec((arb_view(), arb_polarity(), arb_bbox()), 0..=max_objects),
    )
        .prop_map(|(file_name, set, level, label, objects)| {
            let objects = objects
                .into_iter()
                .enumerate()
                .map(|(position, (view, label, bbox))| {
                    ObjectRecord::new(position, bbox).with_labels(view, label)
                })
                .collect();
            ImageRecord::with_objects(file_name, label, level, set, objects)
        })
        .boxed()
}

pub fn arb_images(max_images: usize, max_objects: usize) -> BoxedStrategy<Vec<ImageRecord>> {
    proptest::collection::vec(arb_image(max_objects), 1..=max_images).boxed()
}

pub fn arb_header() -> BoxedStrategy<ListHeader> {
    (name_strategy(), name_strategy(), name_strategy())
        .prop_map(|(class_name, subclass_name, folder)| ListHeader {
            image_dir: PathBuf::from(format!("/data/{folder}/color/")),
            annotation_dir: PathBuf::from(format!("/data/{folder}/annotation/{subclass_name}/")),
            class_name,
            subclass_name,
            folder,
            image_count: 0,
        })
        .boxed()
}

fn file_name_strategy() -> BoxedStrategy<String> {
    proptest::string::string_regex("[A-Za-z0-9_-]{1,12}\\.(png|jpg)")
        .expect("valid filename regex")
        .boxed()
}

fn name_strategy() -> BoxedStrategy<String> {
    proptest::string::string_regex("[a-z]{1,10}")
        .expect("valid name regex")
        .boxed()
}
