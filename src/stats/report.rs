//! Stats report types and terminal formatting.
//!
//! Reports render as text (Display) or serialize to JSON.

use serde::Serialize;
use std::fmt;

const RULE_WIDTH: usize = 59;

/// The result of computing collection statistics.
#[derive(Clone, Debug, Serialize)]
pub struct StatsReport {
    pub summary: SummarySection,
    /// Whole-image polarity distribution.
    pub image_labels: Vec<LabelCount>,
    /// Difficulty level distribution.
    pub levels: Vec<LabelCount>,
    /// Train/test/skip distribution.
    pub sets: Vec<LabelCount>,
    /// Object view label distribution.
    pub object_views: Vec<LabelCount>,
    /// Object polarity distribution.
    pub object_labels: Vec<LabelCount>,
    pub bboxes: BBoxStats,
    /// Display-only option for histogram rendering width.
    #[serde(skip)]
    pub(crate) bar_width: usize,
}

/// Summary counts for the collection.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SummarySection {
    pub images: usize,
    pub objects: usize,
    /// Images with at least one object.
    pub annotated_images: usize,
    /// Images whose whole-image label is not skip.
    pub labeled_images: usize,
    /// Images with a difficulty level.
    pub leveled_images: usize,
    pub max_objects_per_image: usize,
}

/// A single label with its count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// Object bounding box statistics.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BBoxStats {
    pub total: usize,
    /// Boxes with zero width or height.
    pub empty: usize,
    pub min_width: Option<u32>,
    pub max_width: Option<u32>,
    pub min_height: Option<u32>,
    pub max_height: Option<u32>,
    /// Mean area of the non-empty boxes, in pixels.
    pub mean_area: Option<f64>,
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(
            f,
            "╭─────────────────────────────────────────────────────────────╮"
        )?;
        writeln!(
            f,
            "│                  Annotation Stats Report                    │"
        )?;
        writeln!(
            f,
            "╰─────────────────────────────────────────────────────────────╯"
        )?;
        writeln!(f)?;

        self.fmt_summary(f)?;
        writeln!(f)?;
        self.fmt_counts(f, "Image labels", &self.image_labels, self.summary.images)?;
        writeln!(f)?;
        self.fmt_counts(f, "Levels", &self.levels, self.summary.images)?;
        writeln!(f)?;
        self.fmt_counts(f, "Sets", &self.sets, self.summary.images)?;
        writeln!(f)?;
        self.fmt_counts(f, "Object views", &self.object_views, self.summary.objects)?;
        writeln!(f)?;
        self.fmt_counts(f, "Object labels", &self.object_labels, self.summary.objects)?;
        writeln!(f)?;
        self.fmt_bboxes(f)?;

        Ok(())
    }
}

impl StatsReport {
    fn fmt_summary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;

        section_top(f, "Summary")?;
        writeln!(f, "│   Images:          {:>8}", format_number(s.images))?;
        writeln!(f, "│   Objects:         {:>8}", format_number(s.objects))?;
        writeln!(
            f,
            "│   Annotated:       {:>8} ({})",
            format_number(s.annotated_images),
            fmt_percent(s.annotated_images, s.images)
        )?;
        writeln!(
            f,
            "│   Labeled:         {:>8} ({})",
            format_number(s.labeled_images),
            fmt_percent(s.labeled_images, s.images)
        )?;
        writeln!(
            f,
            "│   With level:      {:>8} ({})",
            format_number(s.leveled_images),
            fmt_percent(s.leveled_images, s.images)
        )?;
        writeln!(
            f,
            "│   Max objects/img: {:>8}",
            format_number(s.max_objects_per_image)
        )?;
        section_bottom(f)
    }

    fn fmt_counts(
        &self,
        f: &mut fmt::Formatter<'_>,
        title: &str,
        counts: &[LabelCount],
        total: usize,
    ) -> fmt::Result {
        section_top(f, title)?;
        if total == 0 {
            writeln!(f, "│   Nothing to count.")?;
        } else {
            let max_count = counts.iter().map(|c| c.count).max().unwrap_or(0);
            for entry in counts {
                writeln!(
                    f,
                    "│   {:<10} {:>7} {:>6}  {}",
                    entry.label,
                    format_number(entry.count),
                    fmt_percent(entry.count, total),
                    render_bar(entry.count, max_count, self.bar_width)
                )?;
            }
        }
        section_bottom(f)
    }

    fn fmt_bboxes(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bboxes;

        section_top(f, "Object boxes")?;
        writeln!(f, "│   Total:           {:>8}", format_number(b.total))?;
        writeln!(
            f,
            "│   Empty:           {:>8} ({})",
            format_number(b.empty),
            fmt_percent(b.empty, b.total)
        )?;
        if let (Some(min_w), Some(max_w), Some(min_h), Some(max_h)) =
            (b.min_width, b.max_width, b.min_height, b.max_height)
        {
            writeln!(f, "│   Width:           {min_w} - {max_w} px")?;
            writeln!(f, "│   Height:          {min_h} - {max_h} px")?;
        }
        if let Some(mean) = b.mean_area {
            writeln!(f, "│   Mean area:       {:.1} px²", mean)?;
        }
        section_bottom(f)
    }
}

fn section_top(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    let used = title.chars().count() + 3;
    writeln!(
        f,
        "┌─ {} {}┐",
        title,
        "─".repeat(RULE_WIDTH.saturating_sub(used))
    )
}

fn section_bottom(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "└{}┘", "─".repeat(RULE_WIDTH))
}

/// Format a number with thousands separators.
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Format a percentage, handling zero denominators.
fn fmt_percent(numerator: usize, denominator: usize) -> String {
    if denominator == 0 {
        "n/a".to_string()
    } else {
        format!("{:.1}%", (numerator as f64 / denominator as f64) * 100.0)
    }
}

/// Render a horizontal bar using Unicode block characters.
fn render_bar(count: usize, max_count: usize, width: usize) -> String {
    if max_count == 0 || width == 0 {
        return String::new();
    }

    let filled = ((count * width) / max_count).min(width);
    "█".repeat(filled) + &"░".repeat(width - filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_fmt_percent() {
        assert_eq!(fmt_percent(0, 0), "n/a");
        assert_eq!(fmt_percent(1, 3), "33.3%");
    }

    #[test]
    fn test_render_bar() {
        assert_eq!(render_bar(5, 10, 10), "█████░░░░░");
        assert_eq!(render_bar(0, 0, 10), "");
    }
}
