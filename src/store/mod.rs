//! The annotation store: an ordered image collection with a cursor.
//!
//! [`AnnotationStore`] owns every [`ImageRecord`] of a collection together
//! with the naming and directory settings that decide where the annotation
//! list and the mask artifacts live:
//!
//! ```text
//! <root>/color/<image files>
//! <root>/annotation/[<subclass> | <class>]/<stem>.<position>.png
//! <root>/annotation/[<subclass> | <class>]/<folder>[.<class>][.<subclass>].txt
//! ```
//!
//! Nothing is saved implicitly. Callers decide when to write masks and the
//! list.
//!
//! # Concurrency
//!
//! The store is a plain owned value that mutates the file system through
//! `&mut self` methods. It is not meant to be shared between threads for
//! mutation; wrap it in a `Mutex` if several threads need it.

pub mod scan;

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use image::{GrayImage, Rgba, RgbaImage};
use tracing::{debug, error, info, warn};

use crate::error::XrantError;
use crate::model::io_list_txt::{self, ListHeader, UNNAMED};
use crate::model::io_mask_png;
use crate::model::{
    ImageRecord, ImageSet, Level, MaskSaveSummary, ObjectId, ObjectRecord, Polarity, ViewLabel,
};

use scan::FilePattern;

/// Name of the directory holding the source images under the root.
pub const IMAGE_SUBDIR: &str = "color";

/// Name of the directory holding annotation output under the root.
pub const ANNOTATION_SUBDIR: &str = "annotation";

/// Which images a label edit applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelTarget {
    /// The image under the cursor.
    Current,
    /// The image at this index.
    At(usize),
    /// Every image.
    All,
}

/// An annotated image collection and its on-disk layout.
#[derive(Clone, Debug)]
pub struct AnnotationStore {
    images: Vec<ImageRecord>,
    cursor: usize,
    class_name: String,
    subclass_name: String,
    folder: String,
    root_dir: PathBuf,
    image_dir: PathBuf,
    annotation_dir: PathBuf,
    list_path: Option<PathBuf>,
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self {
            images: Vec::new(),
            cursor: 0,
            class_name: UNNAMED.to_string(),
            subclass_name: UNNAMED.to_string(),
            folder: UNNAMED.to_string(),
            root_dir: PathBuf::from("."),
            image_dir: PathBuf::from("./"),
            annotation_dir: PathBuf::from(".").join(ANNOTATION_SUBDIR),
            list_path: None,
        }
    }
}

impl AnnotationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from an annotation list file.
    pub fn open(path: &Path) -> Result<Self, XrantError> {
        let mut store = Self::new();
        store.load_annotation(path)?;
        Ok(store)
    }

    // ------------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------------

    /// Moves the cursor one image back and returns it. Stops at the first image.
    pub fn prev(&mut self) -> usize {
        self.cursor = self.peek_prev();
        self.cursor
    }

    /// Moves the cursor one image forward and returns it. Stops at the last image.
    pub fn next(&mut self) -> usize {
        self.cursor = self.peek_next();
        self.cursor
    }

    /// The index [`prev`](Self::prev) would move to.
    pub fn peek_prev(&self) -> usize {
        self.cursor.saturating_sub(1)
    }

    /// The index [`next`](Self::next) would move to.
    pub fn peek_next(&self) -> usize {
        if self.images.is_empty() {
            return 0;
        }
        (self.cursor + 1).min(self.images.len() - 1)
    }

    /// Moves the cursor to `index` if it is in range; returns the cursor.
    pub fn goto(&mut self, index: usize) -> usize {
        if index < self.images.len() {
            self.cursor = index;
        }
        self.cursor
    }

    pub fn current_index(&self) -> usize {
        self.cursor
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn image(&self, index: usize) -> Option<&ImageRecord> {
        self.images.get(index)
    }

    pub fn image_mut(&mut self, index: usize) -> Option<&mut ImageRecord> {
        self.images.get_mut(index)
    }

    pub fn current_image(&self) -> Option<&ImageRecord> {
        self.image(self.cursor)
    }

    pub fn current_image_mut(&mut self) -> Option<&mut ImageRecord> {
        self.images.get_mut(self.cursor)
    }

    /// Appends an image. Used when building a collection by hand.
    pub fn push_image(&mut self, image: ImageRecord) {
        self.images.push(image);
    }

    pub fn image_name(&self, index: usize) -> Option<&str> {
        self.image(index).map(|i| i.file_name.as_str())
    }

    /// Full path of the source image at `index`.
    pub fn image_path(&self, index: usize) -> Option<PathBuf> {
        self.image(index).map(|i| self.image_dir.join(&i.file_name))
    }

    pub fn current_image_path(&self) -> Option<PathBuf> {
        self.image_path(self.cursor)
    }

    /// Number of objects of the image at `index`; 0 if out of range.
    pub fn object_count(&self, index: usize) -> usize {
        self.image(index).map_or(0, ImageRecord::object_count)
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn subclass_name(&self) -> &str {
        &self.subclass_name
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    pub fn annotation_dir(&self) -> &Path {
        &self.annotation_dir
    }

    /// The list file last loaded or saved.
    pub fn list_path(&self) -> Option<&Path> {
        self.list_path.as_deref()
    }

    /// Artifact path of the object at `position` of image `index`.
    pub fn mask_path(&self, index: usize, position: usize) -> Option<PathBuf> {
        self.image(index)
            .map(|i| io_mask_png::artifact_path(&self.annotation_dir, &i.stem(), position))
    }

    /// The header written in front of the records.
    pub fn header(&self) -> ListHeader {
        ListHeader {
            class_name: self.class_name.clone(),
            subclass_name: self.subclass_name.clone(),
            image_dir: self.image_dir.clone(),
            folder: self.folder.clone(),
            annotation_dir: self.annotation_dir.clone(),
            image_count: self.images.len(),
        }
    }

    // ------------------------------------------------------------------------
    // Naming and directories
    // ------------------------------------------------------------------------

    /// Sets the class names and moves the annotation directory to
    /// `<root>/annotation/<subclass>`, or `<root>/annotation/<class>` without
    /// a subclass. The directory is created if missing.
    ///
    /// Artifacts written under the previous directory stay where they are.
    pub fn set_class_name(
        &mut self,
        class_name: impl Into<String>,
        subclass_name: impl Into<String>,
    ) -> Result<(), XrantError> {
        self.class_name = class_name.into();
        self.subclass_name = subclass_name.into();

        let mut dir = self.root_dir.join(ANNOTATION_SUBDIR);
        if is_named(&self.subclass_name) {
            dir.push(&self.subclass_name);
        } else if is_named(&self.class_name) {
            dir.push(&self.class_name);
        }
        self.set_annotation_dir(dir)
    }

    /// Moves the annotation directory, creating it if missing.
    pub fn set_annotation_dir(&mut self, dir: impl Into<PathBuf>) -> Result<(), XrantError> {
        let dir = dir.into();
        if !dir.is_dir() {
            fs::create_dir_all(&dir)?;
            info!("created annotation directory {}", dir.display());
        }
        info!("annotation directory changed to {}", dir.display());
        self.annotation_dir = dir;
        Ok(())
    }

    /// Replaces the collection with the images in `<root>/color` whose names
    /// match `pattern`. Returns the number of images found.
    ///
    /// The annotation directory is reset to `<root>/annotation`; call
    /// [`set_class_name`](Self::set_class_name) afterwards to pick the class
    /// subdirectory.
    pub fn load_directory(
        &mut self,
        root: &Path,
        folder: impl Into<String>,
        pattern: &str,
    ) -> Result<usize, XrantError> {
        let pattern = FilePattern::new(pattern)?;
        let image_dir = root.join(IMAGE_SUBDIR);
        let names = scan::scan_image_dir(&image_dir, &pattern)?;

        self.root_dir = root.to_path_buf();
        self.image_dir = image_dir;
        self.annotation_dir = root.join(ANNOTATION_SUBDIR);
        self.folder = folder.into();
        self.images = names.into_iter().map(ImageRecord::new).collect();
        self.cursor = 0;
        self.list_path = None;

        info!(
            "loaded {} images from {}",
            self.images.len(),
            self.image_dir.display()
        );
        Ok(self.images.len())
    }

    // ------------------------------------------------------------------------
    // Labels
    // ------------------------------------------------------------------------

    pub fn set_label(&mut self, target: LabelTarget, label: Polarity) {
        for i in self.target_range(target) {
            self.images[i].label = label;
        }
    }

    pub fn set_level(&mut self, target: LabelTarget, level: Level) {
        for i in self.target_range(target) {
            self.images[i].level = level;
        }
    }

    pub fn set_set(&mut self, target: LabelTarget, set: ImageSet) {
        for i in self.target_range(target) {
            self.images[i].set = set;
        }
    }

    /// Sets the level of every image.
    pub fn set_level_all(&mut self, level: Level) {
        self.set_level(LabelTarget::All, level);
    }

    /// Like [`set_label`](Self::set_label) with a raw code. Unknown codes are ignored.
    pub fn set_label_code(&mut self, target: LabelTarget, code: i64) {
        match Polarity::from_code(code) {
            Some(label) => self.set_label(target, label),
            None => debug!("ignoring unknown label code {code}"),
        }
    }

    /// Like [`set_level`](Self::set_level) with a raw code. Unknown codes are ignored.
    pub fn set_level_code(&mut self, target: LabelTarget, code: i64) {
        match Level::from_code(code) {
            Some(level) => self.set_level(target, level),
            None => debug!("ignoring unknown level code {code}"),
        }
    }

    /// Like [`set_set`](Self::set_set) with a raw code. Unknown codes are ignored.
    pub fn set_set_code(&mut self, target: LabelTarget, code: i64) {
        match ImageSet::from_code(code) {
            Some(set) => self.set_set(target, set),
            None => debug!("ignoring unknown set code {code}"),
        }
    }

    /// Sets the view label of object `id` of image `index`.
    /// Returns false if there is no such object.
    pub fn set_object_view(&mut self, index: usize, id: ObjectId, view: ViewLabel) -> bool {
        match self
            .images
            .get_mut(index)
            .and_then(|image| image.object_by_id_mut(id))
        {
            Some(object) => {
                object.set_view(view);
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------------
    // Objects
    // ------------------------------------------------------------------------

    /// Adds an object to the current image. See [`add_object_at`](Self::add_object_at).
    pub fn add_object(
        &mut self,
        mask: Option<GrayImage>,
        region: Option<RgbaImage>,
        x1: i32,
        y1: i32,
        id: ObjectId,
    ) -> bool {
        self.add_object_at(self.cursor, mask, region, x1, y1, id)
    }

    /// Adds an object to image `index`. Returns false if `index` is out of range.
    pub fn add_object_at(
        &mut self,
        index: usize,
        mask: Option<GrayImage>,
        region: Option<RgbaImage>,
        x1: i32,
        y1: i32,
        id: ObjectId,
    ) -> bool {
        match self.images.get_mut(index) {
            Some(image) => {
                image.add_object(ObjectRecord::from_selection(mask, region, x1, y1, id));
                true
            }
            None => false,
        }
    }

    /// Turns a painted full-frame canvas into a new object of the current
    /// image: the painted part is cropped, rendered in `brush` and added with
    /// the image's next free id.
    ///
    /// Returns `None` if nothing is painted or there is no current image.
    pub fn add_selection(&mut self, canvas: &GrayImage, brush: Rgba<u8>) -> Option<ObjectId> {
        let image = self.images.get_mut(self.cursor)?;
        let (mask, bbox) = io_mask_png::crop_selection(canvas)?;
        let region = io_mask_png::composite_region(&mask, &bbox, brush);
        let id = image.next_object_id();
        image.add_object(ObjectRecord::from_selection(
            Some(mask),
            Some(region),
            bbox.x1,
            bbox.y1,
            id,
        ));
        debug!("added object {id} at {:?} to {}", bbox, image.file_name);
        Some(id)
    }

    /// Deletes objects of the current image. See [`delete_objects_at`](Self::delete_objects_at).
    pub fn delete_objects(&mut self, ids: &[ObjectId]) -> usize {
        self.delete_objects_at(self.cursor, ids)
    }

    /// Deletes the objects with `ids` from image `index`.
    ///
    /// The masks of the image are reloaded from disk first, so that the
    /// remaining objects can be written to their new positions on the next
    /// save. If a remaining object that would move has no mask after the
    /// reload, nothing is deleted. Returns the number of deleted objects.
    pub fn delete_objects_at(&mut self, index: usize, ids: &[ObjectId]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        let Some(image) = self.images.get_mut(index) else {
            return 0;
        };

        let loaded = image.load_object_masks(&self.annotation_dir, true);
        if let Some(stuck) = image.unmovable_object(ids) {
            error!(
                "not deleting objects from {}: mask of object {} is not loaded (failed positions {:?})",
                image.file_name, stuck.id, loaded.failed
            );
            return 0;
        }
        let removed = ids.iter().filter(|id| image.remove_object(**id)).count();
        debug!("deleted {removed} objects from {}", image.file_name);
        removed
    }

    pub fn delete_all_objects(&mut self) {
        self.delete_all_objects_at(self.cursor);
    }

    pub fn delete_all_objects_at(&mut self, index: usize) {
        if let Some(image) = self.images.get_mut(index) {
            image.clear_objects();
        }
    }

    /// Frees the masks of the current image.
    pub fn drop_object_masks(&mut self) {
        self.drop_object_masks_at(self.cursor);
    }

    pub fn drop_object_masks_at(&mut self, index: usize) {
        if let Some(image) = self.images.get_mut(index) {
            image.drop_masks();
        }
    }

    // ------------------------------------------------------------------------
    // Mask artifacts
    // ------------------------------------------------------------------------

    pub fn save_current_object_masks(&mut self) -> Result<Option<MaskSaveSummary>, XrantError> {
        self.save_object_masks(self.cursor)
    }

    /// Writes the masks of image `index` and sweeps stale artifacts.
    ///
    /// Does nothing (and returns `None`) for an out-of-range index or an
    /// image without objects. Fails only if the annotation directory cannot
    /// be created; per-mask failures are counted in the summary.
    pub fn save_object_masks(
        &mut self,
        index: usize,
    ) -> Result<Option<MaskSaveSummary>, XrantError> {
        let Some(image) = self.images.get_mut(index) else {
            return Ok(None);
        };
        if image.object_count() == 0 {
            return Ok(None);
        }

        if !self.annotation_dir.is_dir() {
            warn!(
                "annotation directory {} does not exist, creating it",
                self.annotation_dir.display()
            );
            fs::create_dir_all(&self.annotation_dir)?;
        }
        Ok(Some(image.save_object_masks(&self.annotation_dir)))
    }

    /// Loads the saved masks of image `index`. Returns the number of loaded masks.
    pub fn load_object_masks(&mut self, index: usize, force: bool) -> usize {
        match self.images.get_mut(index) {
            Some(image) => image.load_object_masks(&self.annotation_dir, force).loaded,
            None => 0,
        }
    }

    /// Loads masks and display regions of image `index`, removing objects
    /// whose artifact is missing. Returns the removed ids.
    pub fn load_object_images(
        &mut self,
        index: usize,
        brush: Rgba<u8>,
        force: bool,
    ) -> Vec<ObjectId> {
        match self.images.get_mut(index) {
            Some(image) => image.load_object_regions(&self.annotation_dir, brush, force),
            None => Vec::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Annotation list
    // ------------------------------------------------------------------------

    /// `<folder>[.<class>][.<subclass>].txt`, unnamed parts left out.
    pub fn annotation_list_file_name(&self) -> String {
        let mut name = self.folder.clone();
        for part in [&self.class_name, &self.subclass_name] {
            if is_named(part) {
                name.push('.');
                name.push_str(part);
            }
        }
        name.push_str(".txt");
        name
    }

    /// Saves the list into the annotation directory under
    /// [`annotation_list_file_name`](Self::annotation_list_file_name).
    pub fn save_annotation_list(&mut self) -> Result<Option<PathBuf>, XrantError> {
        if !self.images.is_empty() && !self.annotation_dir.is_dir() {
            fs::create_dir_all(&self.annotation_dir)?;
        }
        let path = self.annotation_dir.join(self.annotation_list_file_name());
        self.save_annotation_list_as(&path)
    }

    /// Saves the list to `path` and remembers it.
    ///
    /// An empty store writes nothing and returns `None`. On error the store
    /// is unchanged.
    pub fn save_annotation_list_as(&mut self, path: &Path) -> Result<Option<PathBuf>, XrantError> {
        if self.images.is_empty() {
            warn!("nothing to save yet: the collection has no images");
            return Ok(None);
        }

        io_list_txt::write_annotation_list(path, &self.header(), &self.images)?;
        self.list_path = Some(path.to_path_buf());
        info!("annotation list saved to {}", path.display());
        Ok(Some(path.to_path_buf()))
    }

    /// Replaces the collection with the content of an annotation list.
    ///
    /// The store is only modified if the whole file parses. The root
    /// directory is taken as the parent of the image directory when that is
    /// named `color`, else as the image directory itself. Returns the number
    /// of images read.
    pub fn load_annotation(&mut self, path: &Path) -> Result<usize, XrantError> {
        let list = io_list_txt::read_annotation_list(path)?;
        let header = list.header;

        self.root_dir = root_of_image_dir(&header.image_dir);
        self.class_name = header.class_name;
        self.subclass_name = header.subclass_name;
        self.image_dir = header.image_dir;
        self.folder = header.folder;
        self.annotation_dir = header.annotation_dir;
        self.images = list.images;
        self.cursor = 0;
        self.list_path = Some(path.to_path_buf());

        info!(
            "loaded {} images from annotation list {}",
            self.images.len(),
            path.display()
        );
        Ok(self.images.len())
    }

    fn target_range(&self, target: LabelTarget) -> Range<usize> {
        let single = |i: usize| if i < self.images.len() { i..i + 1 } else { 0..0 };
        match target {
            LabelTarget::Current => single(self.cursor),
            LabelTarget::At(index) => single(index),
            LabelTarget::All => 0..self.images.len(),
        }
    }
}

fn is_named(name: &str) -> bool {
    !name.is_empty() && name != UNNAMED
}

fn root_of_image_dir(image_dir: &Path) -> PathBuf {
    let is_color_dir = image_dir
        .file_name()
        .is_some_and(|name| name == IMAGE_SUBDIR);
    if !is_color_dir {
        return image_dir.to_path_buf();
    }
    match image_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
