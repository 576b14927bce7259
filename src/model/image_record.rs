//! One source image with its whole-image labels and ordered objects.

use std::path::Path;

use image::Rgba;
use tracing::{debug, error, warn};

use super::io_mask_png::{artifact_path, remove_stale_artifacts};
use super::{ImageSet, Level, MaskSaveOutcome, ObjectId, ObjectRecord, Polarity};

/// Counts reported by [`ImageRecord::save_object_masks`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaskSaveSummary {
    pub written: usize,
    pub unchanged: usize,
    pub failed: usize,
    /// Stale artifact files removed above the object count.
    pub swept: usize,
}

/// Result of [`ImageRecord::load_object_masks`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MaskLoadSummary {
    /// Objects holding a mask after the load.
    pub loaded: usize,
    /// Positions whose artifact exists but could not be decoded.
    pub failed: Vec<usize>,
}

/// An image of the collection.
///
/// Objects keep insertion order; their position in this order (not their id)
/// names their mask artifact on disk.
#[derive(Clone, Debug, Default)]
pub struct ImageRecord {
    /// Basename of the image file, relative to the image directory.
    pub file_name: String,
    pub label: Polarity,
    pub level: Level,
    pub set: ImageSet,
    objects: Vec<ObjectRecord>,
}

impl ImageRecord {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Default::default()
        }
    }

    /// Creates a record with labels and objects, as read from a list file.
    pub fn with_objects(
        file_name: impl Into<String>,
        label: Polarity,
        level: Level,
        set: ImageSet,
        objects: Vec<ObjectRecord>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            label,
            level,
            set,
            objects,
        }
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn objects(&self) -> &[ObjectRecord] {
        &self.objects
    }

    pub fn object(&self, position: usize) -> Option<&ObjectRecord> {
        self.objects.get(position)
    }

    pub fn object_by_id(&self, id: ObjectId) -> Option<&ObjectRecord> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn object_by_id_mut(&mut self, id: ObjectId) -> Option<&mut ObjectRecord> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    /// Appends an object. The caller picks an id not yet used in this image.
    pub fn add_object(&mut self, object: ObjectRecord) {
        self.objects.push(object);
    }

    /// Removes the first object with `id`. Returns false if there is none.
    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        match self.objects.iter().position(|o| o.id == id) {
            Some(position) => {
                self.objects.remove(position);
                true
            }
            None => false,
        }
    }

    pub fn clear_objects(&mut self) {
        self.objects.clear();
    }

    /// Frees every object's mask and region.
    pub fn drop_masks(&mut self) {
        for object in &mut self.objects {
            object.delete_mask();
            object.delete_region();
        }
    }

    /// Filename without its extension; the prefix of all artifact names.
    pub fn stem(&self) -> String {
        Path::new(&self.file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// One past the highest id in use.
    pub fn next_object_id(&self) -> ObjectId {
        self.objects
            .iter()
            .map(|o| o.id)
            .max()
            .map(|id| id.next())
            .unwrap_or_default()
    }

    /// Writes the masks of all objects to their position-keyed paths and
    /// removes the artifacts left above the object count.
    ///
    /// Errors are logged and counted; the sweep stops at the first gap.
    pub fn save_object_masks(&mut self, annotation_dir: &Path) -> MaskSaveSummary {
        let stem = self.stem();
        let mut summary = MaskSaveSummary::default();

        for (position, object) in self.objects.iter_mut().enumerate() {
            let path = artifact_path(annotation_dir, &stem, position);
            match object.save_mask(&path) {
                MaskSaveOutcome::Written => summary.written += 1,
                MaskSaveOutcome::Failed => summary.failed += 1,
                MaskSaveOutcome::Unchanged | MaskSaveOutcome::NoMask => summary.unchanged += 1,
            }
        }

        match remove_stale_artifacts(annotation_dir, &stem, self.objects.len()) {
            Ok(swept) => summary.swept = swept,
            Err(e) => error!("error removing stale masks of {}: {e}", self.file_name),
        }

        debug!(
            "saved masks of {}: {} written, {} unchanged, {} failed, {} swept",
            self.file_name, summary.written, summary.unchanged, summary.failed, summary.swept
        );
        summary
    }

    /// Loads the mask of every object whose artifact exists.
    ///
    /// Objects without a file are kept. Artifacts that fail to decode are
    /// logged and reported by position.
    pub fn load_object_masks(&mut self, annotation_dir: &Path, force: bool) -> MaskLoadSummary {
        let stem = self.stem();
        let mut failed = Vec::new();
        for (position, object) in self.objects.iter_mut().enumerate() {
            let path = artifact_path(annotation_dir, &stem, position);
            if !path.exists() {
                continue;
            }
            if let Err(e) = object.load_mask(&path, force) {
                error!("{e}");
                failed.push(position);
            }
        }
        MaskLoadSummary {
            loaded: self.objects.iter().filter(|o| o.has_mask()).count(),
            failed,
        }
    }

    /// Returns the first object that would move to a lower position if
    /// `ids` were removed but has no mask in memory to carry along.
    ///
    /// Saving after such a removal would leave that object paired with the
    /// artifact of whichever object held its new position before.
    pub fn unmovable_object(&self, ids: &[ObjectId]) -> Option<&ObjectRecord> {
        let first = self.objects.iter().position(|o| ids.contains(&o.id))?;
        self.objects[first..]
            .iter()
            .find(|o| !ids.contains(&o.id) && !o.has_mask())
    }

    /// Loads masks and display regions of all objects.
    ///
    /// Objects whose artifact is missing are removed, but only after every
    /// position has been tried so that positions stay aligned with files
    /// during the pass. Nothing is removed if a later object whose mask
    /// failed to load would have to move. Returns the ids of the removed
    /// objects.
    pub fn load_object_regions(
        &mut self,
        annotation_dir: &Path,
        brush: Rgba<u8>,
        force: bool,
    ) -> Vec<ObjectId> {
        let stem = self.stem();
        let mut missing = Vec::new();

        for (position, object) in self.objects.iter_mut().enumerate() {
            let path = artifact_path(annotation_dir, &stem, position);
            if !path.exists() {
                warn!(
                    "mask of object {} of {} is missing: {}",
                    object.id,
                    self.file_name,
                    path.display()
                );
                missing.push(object.id);
                continue;
            }
            if let Err(e) = object.load_region(&path, brush, force) {
                error!("{e}");
            }
        }

        if let Some(stuck) = self.unmovable_object(&missing) {
            error!(
                "keeping objects with missing masks in {}: mask of object {} failed to load",
                self.file_name, stuck.id
            );
            return Vec::new();
        }
        for id in &missing {
            self.remove_object(*id);
        }
        missing
    }
}
