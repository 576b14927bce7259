use std::path::PathBuf;
use thiserror::Error;

use crate::validation::ValidationReport;

/// The main error type for xrant operations.
#[derive(Debug, Error)]
pub enum XrantError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode mask {path}: {source}")]
    MaskDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode mask {path}: {source}")]
    MaskEncode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to parse annotation list header in {path} (line {line}): {message}")]
    HeaderParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Failed to parse annotation record in {path} (line {line}): {message}")]
    RecordParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Cannot write annotation list {path}: {message}")]
    RecordInvalid { path: PathBuf, message: String },

    #[error("Failed to scan image directory {path}: {message}")]
    DirectoryScan { path: PathBuf, message: String },

    #[error("Invalid file pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to write CSV to {path}: {source}")]
    CsvWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
