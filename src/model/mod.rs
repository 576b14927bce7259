//! Annotation data model for xrant.
//!
//! An annotated collection is a list of [`ImageRecord`]s. Each image carries
//! whole-image labels (polarity, difficulty [`Level`], [`ImageSet`]) and an
//! ordered list of [`ObjectRecord`]s: painted regions with a bounding box,
//! a [`ViewLabel`], a [`Polarity`] and a mask image stored next to the
//! annotation list.
//!
//! # Design Principles
//!
//! 1. **Closed vocabularies**: labels are enums with stable integer codes;
//!    unknown codes convert to `None` instead of panicking.
//!
//! 2. **Lazy artifacts**: masks and display regions are [`Artifact`]s that
//!    can be dropped to save memory and reloaded from disk on demand.
//!
//! 3. **Permissive construction**: malformed geometry (e.g. negative corners)
//!    can be represented so that validation reports it.
//!
//! # Example
//!
//! ```
//! use xrant::model::{BBox, ImageRecord, ObjectRecord, Polarity, ViewLabel};
//!
//! let mut image = ImageRecord::new("bag_0001.png");
//! image.label = Polarity::Positive;
//! image.add_object(
//!     ObjectRecord::new(0u64, BBox::new(10, 20, 30, 40))
//!         .with_labels(ViewLabel::Good, Polarity::Positive),
//! );
//! assert_eq!(image.object_count(), 1);
//! ```

mod bbox;
mod ids;
mod image_record;
pub mod io_export_csv;
pub mod io_list_txt;
pub mod io_mask_png;
mod labels;
mod object;

pub use bbox::BBox;
pub use ids::ObjectId;
pub use image_record::{ImageRecord, MaskLoadSummary, MaskSaveSummary};
pub use labels::{ImageSet, Level, Polarity, ViewLabel};
pub use object::{Artifact, MaskSaveOutcome, ObjectRecord};
