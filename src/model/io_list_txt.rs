//! Annotation list reader and writer.
//!
//! An annotation list is a plain text file with a four-line header followed
//! by one record per image:
//!
//! ```text
//! <class> <subclass>
//! <image_dir> <folder>
//! <annotation_dir> <subclass>
//! <image_count>
//! <record>
//! <record>
//! ```
//!
//! # Record Schemas
//!
//! Two record shapes exist. The writer always emits [`RecordSchema::Current`]:
//!
//! ```text
//! set level label object_count file_name (view label x1 y1 w h)*
//! ```
//!
//! Older files use [`RecordSchema::Legacy`], which has no set, level or
//! per-object labels:
//!
//! ```text
//! label object_count file_name (x1 y1 w h)*
//! ```
//!
//! The reader decides per line: the current shape is tried first (its token
//! count must be `5 + 6 * object_count`), then the legacy one
//! (`3 + 4 * object_count`). A line fitting both shapes that fails to decode
//! as current is decoded as legacy. A line matching neither is a parse error.
//!
//! # Format Limitations
//!
//! Fields are separated by whitespace, so file names, class names and paths
//! must not contain any. The writer refuses such values instead of producing
//! a file that would not load again. Object ids are not stored; objects read
//! back get their position as id.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, warn};

use super::{BBox, ImageRecord, ImageSet, Level, ObjectRecord, Polarity, ViewLabel};
use crate::error::XrantError;

/// Placeholder written for an unset class, subclass or folder name.
pub const UNNAMED: &str = "none";

const HEADER_LINES: usize = 4;
const CURRENT_FIXED_TOKENS: usize = 5;
const CURRENT_OBJECT_TOKENS: usize = 6;
const LEGACY_FIXED_TOKENS: usize = 3;
const LEGACY_OBJECT_TOKENS: usize = 4;

// ============================================================================
// Types
// ============================================================================

/// The shape of one record line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordSchema {
    Current,
    Legacy,
}

/// The four header lines of an annotation list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListHeader {
    pub class_name: String,
    pub subclass_name: String,
    /// Directory holding the source images.
    pub image_dir: PathBuf,
    pub folder: String,
    /// Directory holding the mask artifacts.
    pub annotation_dir: PathBuf,
    /// Image count as declared in the file. Ignored when writing.
    pub image_count: usize,
}

impl Default for ListHeader {
    fn default() -> Self {
        Self {
            class_name: UNNAMED.to_string(),
            subclass_name: UNNAMED.to_string(),
            image_dir: PathBuf::from("./"),
            folder: UNNAMED.to_string(),
            annotation_dir: PathBuf::from("./annotation/"),
            image_count: 0,
        }
    }
}

/// A fully parsed annotation list.
#[derive(Clone, Debug, Default)]
pub struct AnnotationList {
    pub header: ListHeader,
    pub images: Vec<ImageRecord>,
    /// How many records were read in the legacy shape.
    pub legacy_records: usize,
}

// ============================================================================
// Public API
// ============================================================================

/// Reads an annotation list file.
///
/// # Errors
/// Returns [`XrantError::Io`] if the file cannot be read,
/// [`XrantError::HeaderParse`] for a malformed header and
/// [`XrantError::RecordParse`] for the first malformed record line.
pub fn read_annotation_list(path: &Path) -> Result<AnnotationList, XrantError> {
    let text = fs::read_to_string(path).map_err(XrantError::Io)?;
    parse_annotation_list(&text, path)
}

/// Writes an annotation list file in the current schema.
///
/// The declared image count is taken from `images`, not from the header.
/// The file content is rendered before the file is opened, so a refused
/// list never truncates an existing file.
pub fn write_annotation_list(
    path: &Path,
    header: &ListHeader,
    images: &[ImageRecord],
) -> Result<(), XrantError> {
    let content = render_annotation_list(header, images, path)?;
    fs::write(path, content).map_err(XrantError::Io)?;
    Ok(())
}

/// Parses an annotation list from a string.
///
/// Useful for testing without file I/O.
pub fn from_annotation_list_str(text: &str) -> Result<AnnotationList, XrantError> {
    parse_annotation_list(text, Path::new("<string>"))
}

/// Renders an annotation list to a string.
///
/// Useful for testing without file I/O.
pub fn to_annotation_list_string(
    header: &ListHeader,
    images: &[ImageRecord],
) -> Result<String, XrantError> {
    render_annotation_list(header, images, Path::new("<string>"))
}

/// Returns the first schema whose shape a tokenized record line fits, if any.
///
/// A line can fit both shapes; [`parse_record_line`] then falls back to
/// legacy when the current decode fails.
pub fn detect_schema(tokens: &[&str]) -> Option<RecordSchema> {
    if shape_matches(tokens, CURRENT_FIXED_TOKENS, CURRENT_OBJECT_TOKENS, 3) {
        Some(RecordSchema::Current)
    } else if shape_matches(tokens, LEGACY_FIXED_TOKENS, LEGACY_OBJECT_TOKENS, 1) {
        Some(RecordSchema::Legacy)
    } else {
        None
    }
}

/// Formats one image as a current-schema record line (no newline).
pub fn format_record_line(image: &ImageRecord) -> String {
    let mut line = format!(
        "{} {} {} {} {}",
        image.set.code(),
        image.level.code(),
        image.label.code(),
        image.object_count(),
        image.file_name
    );
    for object in image.objects() {
        line.push_str(&format!(
            " {} {} {} {} {} {}",
            object.view.code(),
            object.label.code(),
            object.bbox.x1,
            object.bbox.y1,
            object.bbox.w,
            object.bbox.h
        ));
    }
    line
}

/// Parses one record line. Blank lines yield `Ok(None)`.
pub fn parse_record_line(
    line: &str,
    file_path: &Path,
    line_num: usize,
) -> Result<Option<(ImageRecord, RecordSchema)>, XrantError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(None);
    }

    let record_err = |message: String| XrantError::RecordParse {
        path: file_path.to_path_buf(),
        line: line_num,
        message,
    };

    let current = shape_matches(&tokens, CURRENT_FIXED_TOKENS, CURRENT_OBJECT_TOKENS, 3);
    let legacy = shape_matches(&tokens, LEGACY_FIXED_TOKENS, LEGACY_OBJECT_TOKENS, 1);

    // A legacy line can also fit the current shape when its first x1 equals
    // the count an equally long current line would need.
    let parsed = match (current, legacy) {
        (true, true) => parse_current(&tokens, &record_err)
            .map(|image| (image, RecordSchema::Current))
            .or_else(|err| {
                parse_legacy(&tokens, &record_err)
                    .map(|image| (image, RecordSchema::Legacy))
                    .map_err(|_| err)
            })?,
        (true, false) => (parse_current(&tokens, &record_err)?, RecordSchema::Current),
        (false, true) => (parse_legacy(&tokens, &record_err)?, RecordSchema::Legacy),
        (false, false) => {
            return Err(record_err(format!(
                "found {} tokens; expected 'set level label count file (view label x1 y1 w h)*' \
                 or legacy 'label count file (x1 y1 w h)*'",
                tokens.len()
            )))
        }
    };

    Ok(Some(parsed))
}

fn parse_current(
    tokens: &[&str],
    record_err: &impl Fn(String) -> XrantError,
) -> Result<ImageRecord, XrantError> {
    let set = parse_code(tokens[0], "set", ImageSet::from_code, record_err)?;
    let level = parse_code(tokens[1], "level", Level::from_code, record_err)?;
    let label = parse_code(tokens[2], "label", Polarity::from_code, record_err)?;
    let objects = tokens[CURRENT_FIXED_TOKENS..]
        .chunks_exact(CURRENT_OBJECT_TOKENS)
        .enumerate()
        .map(|(position, t)| -> Result<ObjectRecord, XrantError> {
            let view = parse_code(t[0], "view", ViewLabel::from_code, record_err)?;
            let label = parse_code(t[1], "object label", Polarity::from_code, record_err)?;
            let bbox = parse_bbox(&t[2..], record_err)?;
            Ok(ObjectRecord::new(position, bbox).with_labels(view, label))
        })
        .collect::<Result<Vec<_>, XrantError>>()?;
    Ok(ImageRecord::with_objects(tokens[4], label, level, set, objects))
}

fn parse_legacy(
    tokens: &[&str],
    record_err: &impl Fn(String) -> XrantError,
) -> Result<ImageRecord, XrantError> {
    let label = parse_code(tokens[0], "label", Polarity::from_code, record_err)?;
    let objects = tokens[LEGACY_FIXED_TOKENS..]
        .chunks_exact(LEGACY_OBJECT_TOKENS)
        .enumerate()
        .map(|(position, t)| parse_bbox(t, record_err).map(|bbox| ObjectRecord::new(position, bbox)))
        .collect::<Result<Vec<_>, XrantError>>()?;
    Ok(ImageRecord::with_objects(
        tokens[2],
        label,
        Level::default(),
        ImageSet::default(),
        objects,
    ))
}

/// Fuzz-only entrypoint for single record line parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_record_line(input: &str) -> Result<(), XrantError> {
    let _ = parse_record_line(input, Path::new("<fuzz>"), 1)?;
    Ok(())
}

// ============================================================================
// Reading
// ============================================================================

fn parse_annotation_list(text: &str, path: &Path) -> Result<AnnotationList, XrantError> {
    let mut lines = text.lines();
    let mut header_line = |line_num: usize| {
        lines.next().ok_or_else(|| XrantError::HeaderParse {
            path: path.to_path_buf(),
            line: line_num,
            message: format!("unexpected end of file; the header has {HEADER_LINES} lines"),
        })
    };

    let names = header_tokens(header_line(1)?, 2, 2, path, 1)?;
    let dirs = header_tokens(header_line(2)?, 2, 2, path, 2)?;
    // The subclass on line 3 repeats line 1 and is not read.
    let annotation = header_tokens(header_line(3)?, 1, usize::MAX, path, 3)?;
    let count_line = header_line(4)?;
    let image_count = count_line
        .trim()
        .parse::<usize>()
        .map_err(|_| XrantError::HeaderParse {
            path: path.to_path_buf(),
            line: 4,
            message: format!("invalid image count '{}'", count_line.trim()),
        })?;

    let header = ListHeader {
        class_name: names[0].to_string(),
        subclass_name: names[1].to_string(),
        image_dir: PathBuf::from(dirs[0]),
        folder: dirs[1].to_string(),
        annotation_dir: PathBuf::from(annotation[0]),
        image_count,
    };

    let mut images = Vec::with_capacity(image_count.min(1 << 16));
    let mut legacy_records = 0;
    for (offset, line) in lines.enumerate() {
        let line_num = HEADER_LINES + 1 + offset;
        if let Some((image, schema)) = parse_record_line(line, path, line_num)? {
            if schema == RecordSchema::Legacy {
                legacy_records += 1;
            }
            images.push(image);
        }
    }

    if images.len() != image_count {
        warn!(
            "{} declares {} images but holds {} records",
            path.display(),
            image_count,
            images.len()
        );
    }
    debug!(
        "parsed {} records from {} ({} legacy)",
        images.len(),
        path.display(),
        legacy_records
    );

    Ok(AnnotationList {
        header,
        images,
        legacy_records,
    })
}

fn header_tokens<'a>(
    line: &'a str,
    min: usize,
    max: usize,
    path: &Path,
    line_num: usize,
) -> Result<Vec<&'a str>, XrantError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < min || tokens.len() > max {
        let expected = if min == max {
            format!("{min}")
        } else {
            format!("at least {min}")
        };
        return Err(XrantError::HeaderParse {
            path: path.to_path_buf(),
            line: line_num,
            message: format!("expected {expected} fields, found {}", tokens.len()),
        });
    }
    Ok(tokens)
}

fn shape_matches(tokens: &[&str], fixed: usize, per_object: usize, count_at: usize) -> bool {
    if tokens.len() < fixed {
        return false;
    }
    tokens[count_at]
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_mul(per_object))
        .and_then(|n| n.checked_add(fixed))
        == Some(tokens.len())
}

fn parse_code<T>(
    raw: &str,
    field_name: &str,
    from_code: fn(i64) -> Option<T>,
    record_err: &impl Fn(String) -> XrantError,
) -> Result<T, XrantError> {
    raw.parse::<i64>()
        .ok()
        .and_then(from_code)
        .ok_or_else(|| record_err(format!("invalid {field_name} code '{raw}'")))
}

fn parse_number<T: FromStr>(
    raw: &str,
    field_name: &str,
    record_err: &impl Fn(String) -> XrantError,
) -> Result<T, XrantError> {
    raw.parse::<T>()
        .map_err(|_| record_err(format!("invalid {field_name} '{raw}'")))
}

fn parse_bbox(
    tokens: &[&str],
    record_err: &impl Fn(String) -> XrantError,
) -> Result<BBox, XrantError> {
    Ok(BBox::new(
        parse_number(tokens[0], "x1", record_err)?,
        parse_number(tokens[1], "y1", record_err)?,
        parse_number(tokens[2], "width", record_err)?,
        parse_number(tokens[3], "height", record_err)?,
    ))
}

// ============================================================================
// Writing
// ============================================================================

fn render_annotation_list(
    header: &ListHeader,
    images: &[ImageRecord],
    path: &Path,
) -> Result<String, XrantError> {
    let invalid = |message: String| XrantError::RecordInvalid {
        path: path.to_path_buf(),
        message,
    };

    let class_name = name_field(&header.class_name, "class name").map_err(invalid)?;
    let subclass_name = name_field(&header.subclass_name, "subclass name").map_err(invalid)?;
    let folder = name_field(&header.folder, "folder").map_err(invalid)?;
    let image_dir = dir_field(&header.image_dir, "image directory").map_err(invalid)?;
    let annotation_dir =
        dir_field(&header.annotation_dir, "annotation directory").map_err(invalid)?;

    for (index, image) in images.iter().enumerate() {
        if image.file_name.is_empty() {
            return Err(invalid(format!("image {index} has an empty file name")));
        }
        if image.file_name.chars().any(char::is_whitespace) {
            return Err(invalid(format!(
                "file name '{}' of image {index} contains whitespace",
                image.file_name
            )));
        }
    }

    let mut out = format!(
        "{class_name} {subclass_name}\n{image_dir} {folder}\n{annotation_dir} {subclass_name}\n{}",
        images.len()
    );
    for image in images {
        out.push('\n');
        out.push_str(&format_record_line(image));
    }
    Ok(out)
}

fn name_field<'a>(value: &'a str, what: &str) -> Result<&'a str, String> {
    if value.is_empty() {
        return Ok(UNNAMED);
    }
    if value.chars().any(char::is_whitespace) {
        return Err(format!("{what} '{value}' contains whitespace"));
    }
    Ok(value)
}

/// Directories are written with a trailing separator.
fn dir_field(dir: &Path, what: &str) -> Result<String, String> {
    let mut value = dir.to_string_lossy().into_owned();
    if value.is_empty() {
        value.push('.');
    }
    if value.chars().any(char::is_whitespace) {
        return Err(format!("{what} '{value}' contains whitespace"));
    }
    if !value.ends_with('/') && !value.ends_with(std::path::MAIN_SEPARATOR) {
        value.push('/');
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObjectId;

    const SAMPLE: &str = "gun pistol\n/data/bags/color/ bags\n/data/bags/annotation/pistol/ pistol\n2\n\
1 3 1 2 a.png 1 1 10 20 30 40 3 -1 0 0 5 5\n\
-1 0 -1 0 b.png";

    #[test]
    fn test_parse_record_line_reads_current_schema() {
        let (image, schema) = parse_record_line("1 3 1 1 a.png 2 -1 10 20 30 40", Path::new("l.txt"), 5)
            .expect("parse should succeed")
            .expect("line should produce a record");

        assert_eq!(schema, RecordSchema::Current);
        assert_eq!(image.file_name, "a.png");
        assert_eq!(image.set, ImageSet::Train);
        assert_eq!(image.level, Level::L3);
        assert_eq!(image.label, Polarity::Positive);

        let object = &image.objects()[0];
        assert_eq!(object.id, ObjectId(0));
        assert_eq!(object.view, ViewLabel::Moderate);
        assert_eq!(object.label, Polarity::Negative);
        assert_eq!(object.bbox, BBox::new(10, 20, 30, 40));
    }

    #[test]
    fn test_parse_record_line_reads_legacy_schema() {
        let (image, schema) =
            parse_record_line("1 2 img.png 10 20 30 40 50 60 70 80", Path::new("l.txt"), 5)
                .expect("parse should succeed")
                .expect("line should produce a record");

        assert_eq!(schema, RecordSchema::Legacy);
        assert_eq!(image.label, Polarity::Positive);
        assert_eq!(image.level, Level::Skip);
        assert_eq!(image.set, ImageSet::Skip);
        assert_eq!(image.object_count(), 2);
        assert_eq!(image.objects()[1].id, ObjectId(1));
        assert_eq!(image.objects()[1].view, ViewLabel::Skip);
        assert_eq!(image.objects()[1].label, Polarity::Positive);
        assert_eq!(image.objects()[1].bbox, BBox::new(50, 60, 70, 80));
    }

    #[test]
    fn test_parse_record_line_falls_back_to_legacy_when_shapes_collide() {
        // Eleven tokens with x1 = 1 also fit a current record with one object.
        let (image, schema) =
            parse_record_line("1 2 img.png 1 20 30 40 50 60 70 80", Path::new("l.txt"), 5)
                .expect("parse should succeed")
                .expect("line should produce a record");
        assert_eq!(schema, RecordSchema::Legacy);
        assert_eq!(image.file_name, "img.png");
        assert_eq!(image.objects()[0].bbox, BBox::new(1, 20, 30, 40));
        assert_eq!(image.objects()[1].bbox, BBox::new(50, 60, 70, 80));

        let line = "-1 5 a.png 3 0 1 1 4 0 1 1 5 0 1 1 6 0 1 1 7 0 1 1";
        let (image, schema) = parse_record_line(line, Path::new("l.txt"), 6)
            .expect("parse should succeed")
            .expect("line should produce a record");
        assert_eq!(schema, RecordSchema::Legacy);
        assert_eq!(image.label, Polarity::Negative);
        assert_eq!(image.object_count(), 5);
        assert_eq!(image.objects()[4].bbox, BBox::new(7, 0, 1, 1));
    }

    #[test]
    fn test_parse_record_line_reports_current_error_when_both_shapes_fail() {
        let err = parse_record_line("0 2 0 1 a.png 9 0 0 0 0 0", Path::new("l.txt"), 8).unwrap_err();
        match err {
            XrantError::RecordParse { line, message, .. } => {
                assert_eq!(line, 8);
                assert!(message.contains("view"), "unexpected message: {message}");
            }
            other => panic!("expected RecordParse, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_record_line_skips_blank_lines() {
        let parsed = parse_record_line("   ", Path::new("l.txt"), 7).expect("parse should succeed");
        assert!(parsed.is_none());
    }

    #[test]
    fn test_parse_record_line_rejects_wrong_token_count() {
        let err = parse_record_line("0 0 0 2 a.png 1 1 0 0 5", Path::new("l.txt"), 9).unwrap_err();
        assert!(matches!(err, XrantError::RecordParse { line: 9, .. }));
    }

    #[test]
    fn test_parse_record_line_rejects_unknown_codes() {
        let err = parse_record_line("0 7 0 0 a.png", Path::new("l.txt"), 5).unwrap_err();
        assert!(matches!(err, XrantError::RecordParse { .. }));

        let err = parse_record_line("0 0 0 1 a.png 9 1 0 0 5 5", Path::new("l.txt"), 5).unwrap_err();
        assert!(matches!(err, XrantError::RecordParse { .. }));
    }

    #[test]
    fn test_parse_record_line_rejects_negative_size() {
        let err = parse_record_line("0 0 0 1 a.png 1 1 0 0 -5 5", Path::new("l.txt"), 5).unwrap_err();
        assert!(matches!(err, XrantError::RecordParse { .. }));
    }

    #[test]
    fn test_detect_schema_prefers_current_shape() {
        assert_eq!(detect_schema(&["0", "0", "0", "0", "a.png"]), Some(RecordSchema::Current));
        assert_eq!(detect_schema(&["1", "0", "a.png"]), Some(RecordSchema::Legacy));
        assert_eq!(detect_schema(&["1", "x", "a.png"]), None);
        assert_eq!(detect_schema(&["1"]), None);
    }

    #[test]
    fn test_from_str_reads_header_and_records() {
        let list = from_annotation_list_str(SAMPLE).expect("parse list");

        assert_eq!(list.header.class_name, "gun");
        assert_eq!(list.header.subclass_name, "pistol");
        assert_eq!(list.header.image_dir, PathBuf::from("/data/bags/color/"));
        assert_eq!(list.header.folder, "bags");
        assert_eq!(list.header.annotation_dir, PathBuf::from("/data/bags/annotation/pistol/"));
        assert_eq!(list.header.image_count, 2);
        assert_eq!(list.images.len(), 2);
        assert_eq!(list.images[0].object_count(), 2);
        assert_eq!(list.images[1].set, ImageSet::Test);
        assert_eq!(list.legacy_records, 0);
    }

    #[test]
    fn test_from_str_rejects_short_header() {
        let err = from_annotation_list_str("gun pistol\n/data/ bags\n").unwrap_err();
        assert!(matches!(err, XrantError::HeaderParse { line: 3, .. }));

        let err = from_annotation_list_str("gun\n/data/ bags\n/a/ x\n0").unwrap_err();
        assert!(matches!(err, XrantError::HeaderParse { line: 1, .. }));

        let err = from_annotation_list_str("gun x\n/data/ bags\n/a/ x\nmany").unwrap_err();
        assert!(matches!(err, XrantError::HeaderParse { line: 4, .. }));
    }

    #[test]
    fn test_from_str_tolerates_count_mismatch_and_blank_lines() {
        let text = "a b\n./ f\n./annotation/ b\n5\n0 0 0 0 x.png\n\n0 0 0 0 y.png\n";
        let list = from_annotation_list_str(text).expect("parse list");
        assert_eq!(list.images.len(), 2);
        assert_eq!(list.header.image_count, 5);
    }

    #[test]
    fn test_writer_output_is_byte_compatible() {
        let list = from_annotation_list_str(SAMPLE).expect("parse list");
        let written =
            to_annotation_list_string(&list.header, &list.images).expect("render list");
        assert_eq!(written, SAMPLE);
    }

    #[test]
    fn test_writer_upgrades_legacy_records() {
        let text = "none none\n./ f\n./annotation/ none\n1\n-1 1 a.png 1 2 3 4";
        let list = from_annotation_list_str(text).expect("parse list");
        assert_eq!(list.legacy_records, 1);

        let written =
            to_annotation_list_string(&list.header, &list.images).expect("render list");
        assert!(written.ends_with("\n0 0 -1 1 a.png 0 1 1 2 3 4"));
    }

    #[test]
    fn test_writer_rejects_whitespace_in_names() {
        let header = ListHeader {
            class_name: "hand gun".to_string(),
            ..Default::default()
        };
        let err = to_annotation_list_string(&header, &[ImageRecord::new("a.png")]).unwrap_err();
        assert!(matches!(err, XrantError::RecordInvalid { .. }));

        let err = to_annotation_list_string(&ListHeader::default(), &[ImageRecord::new("a b.png")])
            .unwrap_err();
        assert!(matches!(err, XrantError::RecordInvalid { .. }));
    }

    #[test]
    fn test_writer_fills_empty_names() {
        let header = ListHeader {
            class_name: String::new(),
            ..Default::default()
        };
        let written = to_annotation_list_string(&header, &[ImageRecord::new("a.png")])
            .expect("render list");
        assert!(written.starts_with("none none\n"));
    }

    #[test]
    fn test_write_failure_leaves_existing_file_untouched() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("list.txt");
        fs::write(&path, "keep me").expect("write file");

        let err = write_annotation_list(&path, &ListHeader::default(), &[ImageRecord::new("a b")])
            .unwrap_err();
        assert!(matches!(err, XrantError::RecordInvalid { .. }));
        assert_eq!(fs::read_to_string(&path).expect("read file"), "keep me");
    }
}
