//! Flat CSV export of images and objects.
//!
//! One row per object with the owning image's labels repeated on every row.
//! Images without objects still get a single row whose object columns are
//! empty, so whole-image labels survive the export.
//!
//! Columns: `filename, set, level, image_label, position, view,
//! object_label, x1, y1, w, h, mask`. The `mask` column holds the artifact
//! file name relative to the annotation directory.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use super::io_mask_png::MASK_EXTENSION;
use super::ImageRecord;
use crate::error::XrantError;

#[derive(Debug, Serialize)]
struct ObjectRow<'a> {
    filename: &'a str,
    set: &'static str,
    level: i32,
    image_label: &'static str,
    position: Option<usize>,
    view: Option<&'static str>,
    object_label: Option<&'static str>,
    x1: Option<i32>,
    y1: Option<i32>,
    w: Option<u32>,
    h: Option<u32>,
    mask: Option<String>,
}

/// Writes the object table of `images` to a CSV file.
pub fn write_objects_csv(path: &Path, images: &[ImageRecord]) -> Result<(), XrantError> {
    let file = File::create(path).map_err(XrantError::Io)?;
    let mut csv_writer = csv::Writer::from_writer(BufWriter::new(file));
    serialize_rows(&mut csv_writer, images, path)?;

    csv_writer
        .into_inner()
        .map_err(|e| XrantError::Io(e.into_error()))?
        .flush()
        .map_err(XrantError::Io)?;
    Ok(())
}

/// Renders the object table of `images` to a CSV string.
pub fn to_objects_csv_string(images: &[ImageRecord]) -> Result<String, XrantError> {
    let dummy_path = Path::new("<string>");
    let mut csv_writer = csv::Writer::from_writer(Vec::new());
    serialize_rows(&mut csv_writer, images, dummy_path)?;

    let bytes = csv_writer
        .into_inner()
        .map_err(|e| XrantError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| XrantError::RecordInvalid {
        path: dummy_path.to_path_buf(),
        message: format!("invalid UTF-8 in output: {e}"),
    })
}

fn serialize_rows<W: Write>(
    csv_writer: &mut csv::Writer<W>,
    images: &[ImageRecord],
    path: &Path,
) -> Result<(), XrantError> {
    for row in images.iter().flat_map(rows_for_image) {
        csv_writer
            .serialize(&row)
            .map_err(|source| XrantError::CsvWrite {
                path: path.to_path_buf(),
                source,
            })?;
    }
    Ok(())
}

fn rows_for_image(image: &ImageRecord) -> Vec<ObjectRow<'_>> {
    let base = || ObjectRow {
        filename: &image.file_name,
        set: image.set.name(),
        level: image.level.code(),
        image_label: image.label.name(),
        position: None,
        view: None,
        object_label: None,
        x1: None,
        y1: None,
        w: None,
        h: None,
        mask: None,
    };

    if image.object_count() == 0 {
        return vec![base()];
    }

    let stem = image.stem();
    image
        .objects()
        .iter()
        .enumerate()
        .map(|(position, object)| ObjectRow {
            position: Some(position),
            view: Some(object.view.name()),
            object_label: Some(object.label.name()),
            x1: Some(object.bbox.x1),
            y1: Some(object.bbox.y1),
            w: Some(object.bbox.w),
            h: Some(object.bbox.h),
            mask: Some(format!("{stem}.{position}.{MASK_EXTENSION}")),
            ..base()
        })
        .collect()
}
