//! COCO-shaped manifest model.
//!
//! A [`Manifest`] is one self-contained images/annotations/categories
//! collection. The field order of every struct follows the order in which
//! the keys are written to disk.

use serde::{Deserialize, Serialize};

use super::bbox::BBox;
use super::ids::{AnnotationId, CategoryId, ImageId};

/// One COCO collection: the unit of output.
///
/// Every annotation's `image_id` and `category_id` resolve within the same
/// manifest; [`crate::validation::validate_manifest`] checks this before a
/// manifest is written.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub info: ManifestInfo,

    pub images: Vec<Image>,

    pub annotations: Vec<Annotation>,

    pub categories: Vec<Category>,

    #[serde(default)]
    pub licenses: Vec<License>,
}

impl Manifest {
    /// Creates an empty manifest over a fixed category list.
    pub fn new(info: ManifestInfo, categories: Vec<Category>) -> Self {
        Self {
            info,
            images: Vec::new(),
            annotations: Vec::new(),
            categories,
            licenses: Vec::new(),
        }
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|cat| cat.id == id)
    }
}

/// Free-form descriptive metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A license entry. Manifests produced by this crate always carry an empty
/// license list; the type exists so foreign manifests still parse.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub id: u64,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// An image record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,

    /// Category-qualified relative path, e.g. `java_plums/healthy/images/a.jpg`.
    pub file_name: String,

    pub width: u32,

    pub height: u32,
}

impl Image {
    pub fn new(id: impl Into<ImageId>, file_name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            width,
            height,
        }
    }
}

/// A category (class label).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,

    pub name: String,

    pub supercategory: String,
}

impl Category {
    pub fn new(
        id: impl Into<CategoryId>,
        name: impl Into<String>,
        supercategory: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            supercategory: supercategory.into(),
        }
    }

    /// The id-0 category every labelmap-derived list starts with.
    pub fn background() -> Self {
        Self::new(CategoryId::BACKGROUND, "background", "background")
    }
}

/// An annotation (bounding box with label).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,

    pub image_id: ImageId,

    pub category_id: CategoryId,

    pub bbox: BBox,

    /// Always `bbox.width * bbox.height`.
    pub area: f64,

    /// Crowd annotations are not supported; always 0.
    #[serde(default)]
    pub iscrowd: u8,
}

impl Annotation {
    /// Creates an annotation whose area is derived from its box.
    pub fn new(
        id: impl Into<AnnotationId>,
        image_id: impl Into<ImageId>,
        category_id: impl Into<CategoryId>,
        bbox: BBox,
    ) -> Self {
        Self {
            id: id.into(),
            image_id: image_id.into(),
            category_id: category_id.into(),
            bbox,
            area: bbox.area(),
            iscrowd: 0,
        }
    }
}
