//! Closed label vocabularies and their stable on-disk integer codes.
//!
//! Every label type round-trips through [`code`](Polarity::code) /
//! [`from_code`](Polarity::from_code). Codes outside the vocabulary convert
//! to `None` so callers can ignore them instead of failing.

use std::fmt;
use std::str::FromStr;

/// Whole-image or per-object polarity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Polarity {
    Positive,
    Negative,
    #[default]
    Skip,
}

impl Polarity {
    pub const ALL: [Polarity; 3] = [Polarity::Positive, Polarity::Negative, Polarity::Skip];

    /// Returns the integer written to annotation lists.
    pub fn code(self) -> i32 {
        match self {
            Polarity::Positive => 1,
            Polarity::Negative => -1,
            Polarity::Skip => 0,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Polarity::Positive),
            -1 => Some(Polarity::Negative),
            0 => Some(Polarity::Skip),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Polarity::Positive => "positive",
            Polarity::Negative => "negative",
            Polarity::Skip => "skip",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Polarity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" | "pos" => Ok(Polarity::Positive),
            "negative" | "neg" => Ok(Polarity::Negative),
            "skip" => Ok(Polarity::Skip),
            other => other
                .parse::<i64>()
                .ok()
                .and_then(Polarity::from_code)
                .ok_or_else(|| {
                    format!("invalid label '{s}' (expected positive, negative, skip, 1, -1 or 0)")
                }),
        }
    }
}

/// Difficulty of recognising the content of an image.
///
/// `Skip` means "not yet labeled"; `L1` is one object on a clean background
/// and `L5` is cluttered to the point of being unreadable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    #[default]
    Skip,
    L1,
    L2,
    L3,
    L4,
    L5,
}

impl Level {
    pub const ALL: [Level; 6] = [
        Level::Skip,
        Level::L1,
        Level::L2,
        Level::L3,
        Level::L4,
        Level::L5,
    ];

    pub fn code(self) -> i32 {
        match self {
            Level::Skip => 0,
            Level::L1 => 1,
            Level::L2 => 2,
            Level::L3 => 3,
            Level::L4 => 4,
            Level::L5 => 5,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Level::Skip),
            1 => Some(Level::L1),
            2 => Some(Level::L2),
            3 => Some(Level::L3),
            4 => Some(Level::L4),
            5 => Some(Level::L5),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Level::Skip => "skip",
            Level::L1 => "1",
            Level::L2 => "2",
            Level::L3 => "3",
            Level::L4 => "4",
            Level::L5 => "5",
        }
    }

    pub fn is_labeled(self) -> bool {
        self != Level::Skip
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("skip") {
            return Ok(Level::Skip);
        }
        trimmed
            .parse::<i64>()
            .ok()
            .and_then(Level::from_code)
            .ok_or_else(|| format!("invalid level '{s}' (expected 0-5 or skip)"))
    }
}

/// Which split of the dataset an image belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImageSet {
    #[default]
    Skip,
    Train,
    Test,
}

impl ImageSet {
    pub const ALL: [ImageSet; 3] = [ImageSet::Skip, ImageSet::Train, ImageSet::Test];

    pub fn code(self) -> i32 {
        match self {
            ImageSet::Skip => 0,
            ImageSet::Train => 1,
            ImageSet::Test => -1,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ImageSet::Skip),
            1 => Some(ImageSet::Train),
            -1 => Some(ImageSet::Test),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ImageSet::Skip => "skip",
            ImageSet::Train => "train",
            ImageSet::Test => "test",
        }
    }
}

impl fmt::Display for ImageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ImageSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "train" => Ok(ImageSet::Train),
            "test" => Ok(ImageSet::Test),
            "skip" => Ok(ImageSet::Skip),
            other => other
                .parse::<i64>()
                .ok()
                .and_then(ImageSet::from_code)
                .ok_or_else(|| format!("invalid set '{s}' (expected train, test or skip)")),
        }
    }
}

/// Viewing angle / visibility of an annotated object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ViewLabel {
    /// No view label.
    #[default]
    Skip,
    /// Typical, easy to recognise view at zero angle.
    Good,
    /// At some angle but clearly visible.
    Moderate,
    /// Side view, hard to recognise.
    Side,
}

impl ViewLabel {
    pub const ALL: [ViewLabel; 4] = [
        ViewLabel::Skip,
        ViewLabel::Good,
        ViewLabel::Moderate,
        ViewLabel::Side,
    ];

    pub fn code(self) -> i32 {
        match self {
            ViewLabel::Skip => 0,
            ViewLabel::Good => 1,
            ViewLabel::Moderate => 2,
            ViewLabel::Side => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ViewLabel::Skip),
            1 => Some(ViewLabel::Good),
            2 => Some(ViewLabel::Moderate),
            3 => Some(ViewLabel::Side),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ViewLabel::Skip => "skip",
            ViewLabel::Good => "good",
            ViewLabel::Moderate => "moderate",
            ViewLabel::Side => "side",
        }
    }

    /// Outline color used when drawing an object's bounding box (RGBA).
    pub fn outline_color(self) -> [u8; 4] {
        match self {
            ViewLabel::Skip => [255, 0, 255, 255],
            ViewLabel::Good => [0, 255, 0, 255],
            ViewLabel::Moderate => [0, 0, 255, 255],
            ViewLabel::Side => [255, 0, 0, 255],
        }
    }
}

impl fmt::Display for ViewLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ViewLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "good" => Ok(ViewLabel::Good),
            "moderate" => Ok(ViewLabel::Moderate),
            "side" => Ok(ViewLabel::Side),
            "skip" => Ok(ViewLabel::Skip),
            other => other
                .parse::<i64>()
                .ok()
                .and_then(ViewLabel::from_code)
                .ok_or_else(|| {
                    format!("invalid view '{s}' (expected good, moderate, side or skip)")
                }),
        }
    }
}
