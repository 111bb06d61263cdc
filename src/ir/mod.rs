//! Data model and on-disk codecs.
//!
//! Three representations of the same dataset live here:
//!
//! 1. **Per-image annotation sources** ([`io_annotation_csv`],
//!    [`io_image_json`]): scattered, inconsistently named and
//!    occasionally malformed.
//! 2. **Canonical records** ([`AnnotationRecord`]): what every source is
//!    normalized to before it reaches a manifest.
//! 3. **COCO manifests** ([`Manifest`], [`io_coco_json`]): the output unit.
//!
//! # Example
//!
//! ```
//! use plumleaf::ir::{Annotation, BBox, Category, Image, Manifest, ManifestInfo};
//!
//! let mut manifest = Manifest::new(ManifestInfo::default(), vec![Category::background()]);
//! manifest.images.push(Image::new(1234567890u64, "java_plums/healthy/images/a.jpg", 512, 512));
//! manifest.annotations.push(Annotation::new(
//!     1u64,
//!     1234567890u64,
//!     0u64,
//!     BBox::from_xywh(0.0, 0.0, 512.0, 512.0),
//! ));
//! assert_eq!(manifest.annotations[0].area, 262144.0);
//! ```

mod bbox;
mod ids;
pub mod io_annotation_csv;
pub mod io_coco_json;
pub mod io_image_json;
pub mod labelmap;
mod model;
mod record;

pub use bbox::BBox;
pub use ids::{AnnotationId, CategoryId, ImageId};
pub use labelmap::{Labelmap, LabelmapEntry};
pub use model::{Annotation, Category, Image, License, Manifest, ManifestInfo};
pub use record::{
    normalize_row, AnnotationRecord, AnnotationSource, MalformedRow, RawRow, RecordBatch,
    RowError, RowOutcome,
};
