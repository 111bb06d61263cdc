//! COCO manifest reader and writer.
//!
//! The [`Manifest`] model already has the COCO key layout, so this module is
//! a thin file/string boundary around serde.
//!
//! # Output shape
//!
//! ```text
//! {
//!   "info":        {"year": .., "version": .., "description": .., "url": ..},
//!   "images":      [{"id", "file_name", "width", "height"}],
//!   "annotations": [{"id", "image_id", "category_id", "bbox": [x, y, w, h], "area", "iscrowd"}],
//!   "categories":  [{"id", "name", "supercategory"}],
//!   "licenses":    []
//! }
//! ```
//!
//! Lists are written in the order the builder produced them; they are not
//! re-sorted, since image ids are random and sorting by them would scatter
//! images of one category.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use super::model::Manifest;
use crate::error::DatasetError;

/// Reads a manifest from a COCO JSON file.
pub fn read_coco_json(path: &Path) -> Result<Manifest, DatasetError> {
    let file = File::open(path).map_err(|e| DatasetError::io(path, e))?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| DatasetError::JsonParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a manifest to a COCO JSON file (pretty, two-space indent).
pub fn write_coco_json(path: &Path, manifest: &Manifest) -> Result<(), DatasetError> {
    let file = File::create(path).map_err(|e| DatasetError::io(path, e))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, manifest).map_err(|source| {
        DatasetError::JsonWrite {
            path: path.to_path_buf(),
            source,
        }
    })?;
    writer.flush().map_err(|e| DatasetError::io(path, e))
}

/// Reads a manifest from a COCO JSON string.
pub fn from_coco_str(json: &str) -> Result<Manifest, serde_json::Error> {
    serde_json::from_str(json)
}

/// Reads a manifest from a COCO JSON byte slice.
pub fn from_coco_slice(bytes: &[u8]) -> Result<Manifest, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Writes a manifest to a COCO JSON string.
pub fn to_coco_string(manifest: &Manifest) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(manifest)
}
