//! Image directory scanning.
//!
//! Patterns are shell-style globs on the file's basename: `*` matches any
//! run of characters, `?` a single one. Several patterns may be joined with
//! `;` (e.g. `*.png;*.jpg`); empty alternatives are ignored so file dialog
//! filters like `*.png;;*.bmp` work as-is. Matching is case-sensitive.

use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::XrantError;

/// Pattern used when none is given.
pub const DEFAULT_PATTERN: &str = "*";

/// A compiled file name pattern.
#[derive(Clone, Debug)]
pub struct FilePattern {
    source: String,
    regex: Regex,
}

impl FilePattern {
    /// Compiles a `;`-separated list of glob patterns.
    pub fn new(pattern: &str) -> Result<Self, XrantError> {
        let alternatives: Vec<String> = pattern
            .split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(glob_to_regex)
            .collect();

        let body = if alternatives.is_empty() {
            glob_to_regex(DEFAULT_PATTERN)
        } else {
            alternatives.join("|")
        };

        let regex = Regex::new(&format!("^(?:{body})$")).map_err(|source| {
            XrantError::InvalidGlob {
                pattern: pattern.to_string(),
                source,
            }
        })?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.regex.is_match(file_name)
    }
}

/// Lists the files in `dir` whose basename matches `pattern`.
///
/// The scan is not recursive. Names are sorted case-insensitively, ties
/// broken by the exact name so the order is stable. A missing directory
/// yields an empty list.
pub fn scan_image_dir(dir: &Path, pattern: &FilePattern) -> Result<Vec<String>, XrantError> {
    if !dir.is_dir() {
        warn!("image directory does not exist: {}", dir.display());
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
    {
        let entry = entry.map_err(|e| XrantError::DirectoryScan {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            warn!("skipping non UTF-8 file name in {}", dir.display());
            continue;
        };
        if pattern.matches(name) {
            names.push(name.to_string());
        }
    }

    names.sort_by_cached_key(|name| (name.to_lowercase(), name.clone()));
    debug!(
        "found {} images matching '{}' in {}",
        names.len(),
        pattern.as_str(),
        dir.display()
    );
    Ok(names)
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2);
    for c in glob.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_pattern_matches_wildcards() {
        let pattern = FilePattern::new("*.png").expect("compile");
        assert!(pattern.matches("a.png"));
        assert!(!pattern.matches("a.png.bak"));
        assert!(!pattern.matches("a.PNG"));

        let pattern = FilePattern::new("bag_?.jpg").expect("compile");
        assert!(pattern.matches("bag_1.jpg"));
        assert!(!pattern.matches("bag_12.jpg"));
    }

    #[test]
    fn test_pattern_supports_alternatives() {
        let pattern = FilePattern::new("*.png;;*.bmp").expect("compile");
        assert!(pattern.matches("x.png"));
        assert!(pattern.matches("y.bmp"));
        assert!(!pattern.matches("z.jpg"));
    }

    #[test]
    fn test_empty_pattern_matches_everything() {
        let pattern = FilePattern::new("").expect("compile");
        assert!(pattern.matches("anything.tif"));
    }

    #[test]
    fn test_pattern_escapes_regex_metacharacters() {
        let pattern = FilePattern::new("scan(1)+.png").expect("compile");
        assert!(pattern.matches("scan(1)+.png"));
        assert!(!pattern.matches("scan1.png"));
    }

    #[test]
    fn test_scan_sorts_case_insensitively_and_skips_directories() {
        let temp = tempfile::tempdir().expect("create temp dir");
        for name in ["b.png", "A.png", "c.jpg", "a2.png"] {
            fs::write(temp.path().join(name), b"x").expect("write file");
        }
        fs::create_dir(temp.path().join("sub.png")).expect("create dir");

        let pattern = FilePattern::new("*.png").expect("compile");
        let names = scan_image_dir(temp.path(), &pattern).expect("scan");
        assert_eq!(names, vec!["A.png", "a2.png", "b.png"]);
    }

    #[test]
    fn test_scan_of_missing_dir_is_empty() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let pattern = FilePattern::new("*").expect("compile");
        let names = scan_image_dir(&temp.path().join("nope"), &pattern).expect("scan");
        assert!(names.is_empty());
    }
}
