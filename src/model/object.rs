//! A single user-selected object and its lazily loaded artifacts.

use std::path::Path;

use image::{GrayImage, Rgba, RgbaImage};
use tracing::{error, info, warn};

use super::io_mask_png;
use super::{BBox, ObjectId, Polarity, ViewLabel};
use crate::error::XrantError;

/// An in-memory artifact that may or may not be loaded.
///
/// Artifacts are dropped to free memory and reloaded from disk on demand,
/// so "not loaded" is a normal state rather than an error.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Artifact<T> {
    #[default]
    NotLoaded,
    Loaded(T),
}

impl<T> Artifact<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Artifact::Loaded(_))
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Artifact::Loaded(value) => Some(value),
            Artifact::NotLoaded => None,
        }
    }

    /// Replaces the content, returning the previous one.
    pub fn replace(&mut self, value: T) -> Option<T> {
        match std::mem::replace(self, Artifact::Loaded(value)) {
            Artifact::Loaded(old) => Some(old),
            Artifact::NotLoaded => None,
        }
    }

    /// Drops the content, returning it.
    pub fn unload(&mut self) -> Option<T> {
        match std::mem::take(self) {
            Artifact::Loaded(old) => Some(old),
            Artifact::NotLoaded => None,
        }
    }
}

impl<T> From<Option<T>> for Artifact<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Artifact::Loaded(value),
            None => Artifact::NotLoaded,
        }
    }
}

/// What happened when an object was asked to persist its mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskSaveOutcome {
    /// No mask in memory; nothing to write.
    NoMask,
    /// Mask already on disk and unchanged since.
    Unchanged,
    Written,
    /// Writing failed; the mask stays dirty so a later save retries.
    Failed,
}

/// One annotated region of an image.
#[derive(Clone, Debug)]
pub struct ObjectRecord {
    /// Identifier, unique within the owning image.
    pub id: ObjectId,

    /// Bounding box in source-image pixels.
    pub bbox: BBox,

    pub view: ViewLabel,

    pub label: Polarity,

    mask: Artifact<GrayImage>,
    region: Artifact<RgbaImage>,
    dirty: bool,
}

impl ObjectRecord {
    /// Creates an object with geometry only, as read from an annotation list.
    ///
    /// New objects are positive and carry no view label.
    pub fn new(id: impl Into<ObjectId>, bbox: BBox) -> Self {
        Self {
            id: id.into(),
            bbox,
            view: ViewLabel::Skip,
            label: Polarity::Positive,
            mask: Artifact::NotLoaded,
            region: Artifact::NotLoaded,
            dirty: false,
        }
    }

    /// Creates an object from a fresh selection.
    ///
    /// The box size comes from the region if one is given, else from the
    /// mask. The mask, if any, still has to be written to disk.
    pub fn from_selection(
        mask: Option<GrayImage>,
        region: Option<RgbaImage>,
        x1: i32,
        y1: i32,
        id: impl Into<ObjectId>,
    ) -> Self {
        let (w, h) = region
            .as_ref()
            .map(|r| r.dimensions())
            .or_else(|| mask.as_ref().map(|m| m.dimensions()))
            .unwrap_or((0, 0));

        let mut object = Self::new(id, BBox::new(x1, y1, w, h));
        object.dirty = mask.is_some();
        object.mask = mask.into();
        object.region = region.into();
        object
    }

    /// Sets the view and polarity labels.
    pub fn with_labels(mut self, view: ViewLabel, label: Polarity) -> Self {
        self.view = view;
        self.label = label;
        self
    }

    pub fn mask(&self) -> Option<&GrayImage> {
        self.mask.get()
    }

    pub fn region(&self) -> Option<&RgbaImage> {
        self.region.get()
    }

    pub fn has_mask(&self) -> bool {
        self.mask.is_loaded()
    }

    pub fn has_region(&self) -> bool {
        self.region.is_loaded()
    }

    /// Returns true if the mask still has to be written to disk.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Replaces the mask and marks it for saving.
    pub fn set_mask(&mut self, mask: GrayImage) {
        self.mask.replace(mask);
        self.dirty = true;
    }

    pub fn set_view(&mut self, view: ViewLabel) {
        self.view = view;
    }

    /// Frees the mask. Geometry and labels are kept.
    pub fn delete_mask(&mut self) {
        self.mask.unload();
    }

    /// Frees the display region.
    pub fn delete_region(&mut self) {
        self.region.unload();
    }

    /// Loads the mask from `path`.
    ///
    /// Does nothing if a mask is loaded and `force` is false. A forced reload
    /// never discards a mask with unsaved changes. A missing file leaves the
    /// object without a mask and is only logged. A loaded mask is marked
    /// dirty so that the next save writes it to its current position.
    pub fn load_mask(&mut self, path: &Path, force: bool) -> Result<(), XrantError> {
        if self.mask.is_loaded() && (!force || self.dirty) {
            return Ok(());
        }

        if !path.exists() {
            self.mask.unload();
            warn!("object mask file does not exist: {}", path.display());
            return Ok(());
        }

        let mask = io_mask_png::read_mask(path)?;
        self.mask.replace(mask);
        self.dirty = true;
        Ok(())
    }

    /// Loads the display region, loading the mask from `path` first if needed.
    pub fn load_region(
        &mut self,
        path: &Path,
        brush: Rgba<u8>,
        force: bool,
    ) -> Result<(), XrantError> {
        if self.region.is_loaded() && !force {
            return Ok(());
        }

        if !self.mask.is_loaded() {
            self.load_mask(path, false)?;
        }

        match self.region_for(brush) {
            Some(region) => {
                self.region.replace(region);
            }
            None => {
                self.region.unload();
                warn!("could not build object region from mask {}", path.display());
            }
        }
        Ok(())
    }

    /// Renders the mask in `brush` color for display. `None` without a mask.
    pub fn region_for(&self, brush: Rgba<u8>) -> Option<RgbaImage> {
        self.mask
            .get()
            .map(|mask| io_mask_png::composite_region(mask, &self.bbox, brush))
    }

    /// Writes the mask to `path` if it has unsaved changes.
    ///
    /// Failures are logged and reported through the outcome, never raised.
    pub fn save_mask(&mut self, path: &Path) -> MaskSaveOutcome {
        let Some(mask) = self.mask.get() else {
            return MaskSaveOutcome::NoMask;
        };
        if !self.dirty {
            return MaskSaveOutcome::Unchanged;
        }

        match io_mask_png::write_mask(path, mask) {
            Ok(()) => {
                self.dirty = false;
                info!("object mask saved to {}", path.display());
                MaskSaveOutcome::Written
            }
            Err(e) => {
                error!("error saving mask of object {}: {e}", self.id);
                MaskSaveOutcome::Failed
            }
        }
    }
}
