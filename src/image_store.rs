//! Image dimension probing.
//!
//! Only the header is read; pixels are never decoded. Failures are not
//! errors: callers substitute [`FALLBACK_DIMENSIONS`] and carry on. A
//! header declaring a zero width or height counts as a failure.

use std::path::Path;

/// Width/height used when an image cannot be probed.
pub const FALLBACK_DIMENSIONS: (u32, u32) = (512, 512);

/// Read-only source of image dimensions.
pub trait ImageStore {
    /// Returns `(width, height)` in pixels, or `None` if the image cannot be
    /// read.
    fn dimensions(&self, path: &Path) -> Option<(u32, u32)>;

    /// Like [`ImageStore::dimensions`] but never fails. The flag is `true`
    /// when the fallback was used.
    fn dimensions_or_fallback(&self, path: &Path) -> ((u32, u32), bool) {
        match self.dimensions(path) {
            Some(dims) => (dims, false),
            None => (FALLBACK_DIMENSIONS, true),
        }
    }
}

/// Probes image headers on the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsImageStore;

impl ImageStore for FsImageStore {
    fn dimensions(&self, path: &Path) -> Option<(u32, u32)> {
        let size = match imagesize::size(path) {
            Ok(size) => size,
            Err(err) => {
                log::debug!("cannot read image size of {}: {}", path.display(), err);
                return None;
            }
        };

        let width: u32 = size.width.try_into().ok()?;
        let height: u32 = size.height.try_into().ok()?;
        if width == 0 || height == 0 {
            log::debug!(
                "{} declares an empty {}x{} image",
                path.display(),
                width,
                height
            );
            return None;
        }
        Some((width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_image_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not an image").unwrap();

        let store = FsImageStore;
        assert_eq!(store.dimensions(&path), None);
        assert_eq!(store.dimensions_or_fallback(&path), ((512, 512), true));
    }

    #[test]
    fn zero_width_header_falls_back() {
        // 24-bit BMP header declaring 0x8 pixels.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"BM");
        bytes.extend_from_slice(&54u32.to_le_bytes());
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        bytes.extend_from_slice(&54u32.to_le_bytes());
        bytes.extend_from_slice(&40u32.to_le_bytes());
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.extend_from_slice(&8i32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&24u16.to_le_bytes());
        bytes.resize(54, 0);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zero.bmp");
        std::fs::write(&path, bytes).unwrap();

        let store = FsImageStore;
        assert_eq!(store.dimensions(&path), None);
        assert_eq!(store.dimensions_or_fallback(&path), (FALLBACK_DIMENSIONS, true));
    }

    #[test]
    fn missing_image_falls_back() {
        let store = FsImageStore;
        let (dims, fell_back) = store.dimensions_or_fallback(Path::new("/nonexistent/x.png"));
        assert_eq!(dims, FALLBACK_DIMENSIONS);
        assert!(fell_back);
    }
}
