//! PNG mask artifacts.
//!
//! Every object of an image owns one mask file inside the annotation
//! directory, named after the image's filename stem and the object's
//! **position** in the image's object list:
//!
//! ```text
//! <annotation_dir>/<stem>.<position>.png
//! ```
//!
//! Positions (not object ids) key the files, so removing an object shifts
//! the files of every later object down by one on the next save. The files
//! left above the new object count are swept by [`remove_stale_artifacts`].
//!
//! Masks are written as 8-bit grayscale PNGs. When reading, images with an
//! alpha channel contribute their alpha; all others their luma. A non-zero
//! value marks a selected pixel.

use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgba, RgbaImage};
use tracing::debug;

use super::BBox;
use crate::error::XrantError;

pub const MASK_EXTENSION: &str = "png";

/// Brush color used when no color is chosen (opaque red).
pub const DEFAULT_BRUSH: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Returns the artifact path for the object at `position` of the image
/// whose filename stem is `stem`.
pub fn artifact_path(annotation_dir: &Path, stem: &str, position: usize) -> PathBuf {
    annotation_dir.join(format!("{stem}.{position}.{MASK_EXTENSION}"))
}

/// Reads a mask file into a single-channel image.
pub fn read_mask(path: &Path) -> Result<GrayImage, XrantError> {
    let image = image::open(path).map_err(|source| XrantError::MaskDecode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(mask_from_image(image))
}

/// Writes a mask as an 8-bit grayscale PNG.
pub fn write_mask(path: &Path, mask: &GrayImage) -> Result<(), XrantError> {
    mask.save_with_format(path, ImageFormat::Png)
        .map_err(|source| XrantError::MaskEncode {
            path: path.to_path_buf(),
            source,
        })
}

/// Deletes the artifacts at positions `first_unused`, `first_unused + 1`, ...
/// until the first position without a file. Returns how many were removed.
pub fn remove_stale_artifacts(
    annotation_dir: &Path,
    stem: &str,
    first_unused: usize,
) -> Result<usize, XrantError> {
    let mut position = first_unused;
    loop {
        let path = artifact_path(annotation_dir, stem, position);
        if !path.exists() {
            return Ok(position - first_unused);
        }
        fs::remove_file(&path)?;
        debug!("removed stale mask {}", path.display());
        position += 1;
    }
}

/// Renders the display region of an object: a rectangle of the brush color
/// whose alpha is scaled by the mask.
///
/// A mask that already has the size of `bbox` is used as is. A larger mask
/// is treated as a full-frame canvas and read at the box's offset; the
/// region then covers only the part of the box inside the canvas, starting
/// at the box corner clamped into the frame.
pub fn composite_region(mask: &GrayImage, bbox: &BBox, brush: Rgba<u8>) -> RgbaImage {
    let (mask_w, mask_h) = mask.dimensions();
    let (x0, y0, width, height) = if (mask_w, mask_h) == (bbox.w, bbox.h) {
        (0, 0, bbox.w, bbox.h)
    } else {
        let (x0, width) = clip_span(bbox.x1, bbox.w, mask_w);
        let (y0, height) = clip_span(bbox.y1, bbox.h, mask_h);
        (x0, y0, width, height)
    };
    let [r, g, b, a] = brush.0;

    RgbaImage::from_fn(width, height, |x, y| {
        let coverage = mask.get_pixel(x0 + x, y0 + y)[0];
        let alpha = (a as u32 * coverage as u32 / 255) as u8;
        Rgba([r, g, b, alpha])
    })
}

/// Intersects `[start, start + len)` with `[0, limit)`.
fn clip_span(start: i32, len: u32, limit: u32) -> (u32, u32) {
    let lo = (start as i64).clamp(0, limit as i64);
    let hi = (start as i64 + len as i64).clamp(0, limit as i64);
    (lo as u32, (hi - lo).max(0) as u32)
}

/// Tight bounding box of the non-zero pixels of a painted mask.
///
/// Returns `None` if nothing is painted.
pub fn mask_bounds(mask: &GrayImage) -> Option<BBox> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel[0] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((xmin, ymin, xmax, ymax)) => (xmin.min(x), ymin.min(y), xmax.max(x), ymax.max(y)),
        });
    }

    bounds.map(|(xmin, ymin, xmax, ymax)| {
        BBox::new(xmin as i32, ymin as i32, xmax - xmin + 1, ymax - ymin + 1)
    })
}

/// Cuts the painted part out of a full-frame canvas.
///
/// Returns the cropped mask together with its box in canvas coordinates,
/// or `None` if the canvas is empty.
pub fn crop_selection(canvas: &GrayImage) -> Option<(GrayImage, BBox)> {
    let bbox = mask_bounds(canvas)?;
    let cropped =
        image::imageops::crop_imm(canvas, bbox.x1 as u32, bbox.y1 as u32, bbox.w, bbox.h)
            .to_image();
    Some((cropped, bbox))
}

/// Parses `rrggbb` or `rrggbbaa` (optionally prefixed with `#`).
pub fn parse_brush_color(raw: &str) -> Result<Rgba<u8>, String> {
    let hex = raw.trim().trim_start_matches('#');
    if !(hex.len() == 6 || hex.len() == 8) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!(
            "invalid brush color '{raw}' (expected rrggbb or rrggbbaa)"
        ));
    }

    let channel = |start: usize| u8::from_str_radix(&hex[start..start + 2], 16).unwrap_or(0);
    let alpha = if hex.len() == 8 { channel(6) } else { 255 };
    Ok(Rgba([channel(0), channel(2), channel(4), alpha]))
}

fn mask_from_image(image: DynamicImage) -> GrayImage {
    if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        GrayImage::from_fn(width, height, |x, y| Luma([rgba.get_pixel(x, y)[3]]))
    } else {
        image.into_luma8()
    }
}
