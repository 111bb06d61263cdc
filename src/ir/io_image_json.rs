//! Per-image JSON annotations.
//!
//! Each raw image ships with a sidecar JSON that is itself a tiny COCO file:
//! one image, one annotation, one category, plus an `info` block carrying
//! contributor/source/license metadata. The ids inside are generated and
//! carry no meaning outside the file.
//!
//! Readers here are lenient about missing fields because the sidecars come
//! from several tools; the only structural requirement is that `images` and
//! `annotations` are non-empty lists.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::bbox::BBox;
use super::ids::CategoryId;
use super::record::AnnotationRecord;
use crate::error::DatasetError;
use crate::image_store::FALLBACK_DIMENSIONS;

/// Top-level per-image annotation document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageAnnotationFile {
    #[serde(default)]
    pub info: ImageJsonInfo,

    #[serde(default)]
    pub images: Vec<ImageJsonImage>,

    #[serde(default)]
    pub annotations: Vec<ImageJsonAnnotation>,

    #[serde(default)]
    pub categories: Vec<ImageJsonCategory>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageJsonInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<ImageJsonLicense>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageJsonLicense {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageJsonImage {
    #[serde(default)]
    pub id: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    #[serde(default)]
    pub file_name: String,

    /// File size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageJsonAnnotation {
    #[serde(default)]
    pub id: u64,

    #[serde(default)]
    pub image_id: u64,

    #[serde(default)]
    pub category_id: u64,

    #[serde(default)]
    pub segmentation: Vec<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageJsonCategory {
    #[serde(default)]
    pub id: u64,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub supercategory: String,
}

impl ImageAnnotationFile {
    /// Extracts the first image/annotation pair as a canonical record.
    ///
    /// Missing image dimensions fall back to 512x512 and a missing bbox
    /// covers the whole image. `label` replaces the file's own category id.
    ///
    /// # Errors
    /// [`DatasetError::ImageJsonInvalid`] when `images` or `annotations`
    /// is empty.
    pub fn primary_record(
        &self,
        path: &Path,
        label: CategoryId,
    ) -> Result<AnnotationRecord, DatasetError> {
        let (Some(image), Some(annotation)) = (self.images.first(), self.annotations.first())
        else {
            return Err(DatasetError::ImageJsonInvalid {
                path: path.to_path_buf(),
                message: "missing 'images' or 'annotations' list".to_string(),
            });
        };

        let width = image.width.unwrap_or(FALLBACK_DIMENSIONS.0);
        let height = image.height.unwrap_or(FALLBACK_DIMENSIONS.1);
        let bbox = annotation
            .bbox
            .unwrap_or_else(|| BBox::full_image(width, height));

        Ok(AnnotationRecord {
            item: 0,
            bbox,
            label,
        })
    }
}

/// Reads a per-image annotation JSON file.
pub fn read_image_json(path: &Path) -> Result<ImageAnnotationFile, DatasetError> {
    let file = File::open(path).map_err(|e| DatasetError::io(path, e))?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| DatasetError::JsonParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a per-image annotation JSON file (pretty, two-space indent).
pub fn write_image_json(path: &Path, file: &ImageAnnotationFile) -> Result<(), DatasetError> {
    let out = File::create(path).map_err(|e| DatasetError::io(path, e))?;
    let writer = BufWriter::new(out);

    serde_json::to_writer_pretty(writer, file).map_err(|source| DatasetError::JsonWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a per-image annotation from a JSON string.
pub fn from_image_json_str(json: &str) -> Result<ImageAnnotationFile, serde_json::Error> {
    serde_json::from_str(json)
}

/// Reads a per-image annotation from JSON bytes.
pub fn from_image_json_slice(bytes: &[u8]) -> Result<ImageAnnotationFile, serde_json::Error> {
    serde_json::from_slice(bytes)
}
