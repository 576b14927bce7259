//! Collection statistics.
//!
//! Counts how far the labeling of a collection has come: label, level and
//! set distributions of the images, view and polarity distributions of the
//! objects, and object box sizes.

mod report;

pub use report::{BBoxStats, LabelCount, StatsReport, SummarySection};

use std::collections::HashMap;
use std::hash::Hash;

use crate::model::{ImageRecord, ImageSet, Level, ObjectRecord, Polarity, ViewLabel};

/// Options for collection statistics.
#[derive(Clone, Debug)]
pub struct StatsOptions {
    /// Width of histogram bars (in characters).
    pub bar_width: usize,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self { bar_width: 20 }
    }
}

/// Computes a statistics report over `images`.
pub fn stats_images(images: &[ImageRecord], opts: &StatsOptions) -> StatsReport {
    let objects: Vec<&ObjectRecord> = images.iter().flat_map(|i| i.objects()).collect();

    StatsReport {
        summary: compute_summary(images, objects.len()),
        image_labels: distribution(&Polarity::ALL, images.iter().map(|i| i.label), |p| {
            p.name()
        }),
        levels: distribution(&Level::ALL, images.iter().map(|i| i.level), |l| l.name()),
        sets: distribution(&ImageSet::ALL, images.iter().map(|i| i.set), |s| s.name()),
        object_views: distribution(&ViewLabel::ALL, objects.iter().map(|o| o.view), |v| {
            v.name()
        }),
        object_labels: distribution(&Polarity::ALL, objects.iter().map(|o| o.label), |p| {
            p.name()
        }),
        bboxes: compute_bbox_stats(&objects),
        bar_width: opts.bar_width,
    }
}

fn compute_summary(images: &[ImageRecord], objects: usize) -> SummarySection {
    SummarySection {
        images: images.len(),
        objects,
        annotated_images: images.iter().filter(|i| i.object_count() > 0).count(),
        labeled_images: images.iter().filter(|i| i.label != Polarity::Skip).count(),
        leveled_images: images.iter().filter(|i| i.level.is_labeled()).count(),
        max_objects_per_image: images
            .iter()
            .map(ImageRecord::object_count)
            .max()
            .unwrap_or(0),
    }
}

/// Counts `values` per variant, listing every variant of `all` in order.
fn distribution<T: Copy + Eq + Hash>(
    all: &[T],
    values: impl Iterator<Item = T>,
    name: impl Fn(T) -> &'static str,
) -> Vec<LabelCount> {
    let mut counts: HashMap<T, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }

    all.iter()
        .map(|v| LabelCount {
            label: name(*v).to_string(),
            count: counts.get(v).copied().unwrap_or(0),
        })
        .collect()
}

fn compute_bbox_stats(objects: &[&ObjectRecord]) -> BBoxStats {
    let mut stats = BBoxStats {
        total: objects.len(),
        ..Default::default()
    };

    let mut area_sum = 0u64;
    let mut non_empty = 0usize;
    for bbox in objects.iter().map(|o| o.bbox) {
        if bbox.is_empty() {
            stats.empty += 1;
            continue;
        }
        non_empty += 1;
        area_sum += bbox.area();
        stats.min_width = Some(stats.min_width.map_or(bbox.w, |m| m.min(bbox.w)));
        stats.max_width = Some(stats.max_width.map_or(bbox.w, |m| m.max(bbox.w)));
        stats.min_height = Some(stats.min_height.map_or(bbox.h, |m| m.min(bbox.h)));
        stats.max_height = Some(stats.max_height.map_or(bbox.h, |m| m.max(bbox.h)));
    }

    if non_empty > 0 {
        stats.mean_area = Some(area_sum as f64 / non_empty as f64);
    }
    stats
}
