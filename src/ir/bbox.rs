//! Bounding boxes in COCO `[x, y, width, height]` form.

use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box in pixel units.
///
/// `(x, y)` is the top-left corner, x grows right and y grows down. The box
/// is stored exactly as the source declared it: width and height are never
/// recomputed from corners, so the value written to a manifest is
/// bit-identical to the value parsed from the annotation source.
///
/// Negative or non-finite extents are representable; the normalizer only
/// checks that every field parses as a number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BBox {
    #[inline]
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A box covering a whole `width` x `height` image.
    #[inline]
    pub fn full_image(width: u32, height: u32) -> Self {
        Self::from_xywh(0.0, 0.0, width as f64, height as f64)
    }

    /// Returns `width * height`. May be negative for a malformed box.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    #[inline]
    pub fn to_array(&self) -> [f64; 4] {
        [self.x, self.y, self.width, self.height]
    }
}

impl From<[f64; 4]> for BBox {
    fn from([x, y, width, height]: [f64; 4]) -> Self {
        Self::from_xywh(x, y, width, height)
    }
}

impl From<BBox> for [f64; 4] {
    fn from(bbox: BBox) -> Self {
        bbox.to_array()
    }
}
