//! Split resolution: which images of a category belong to a split.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::DatasetError;
use crate::layout::{list_images, DatasetLayout, IMAGE_EXTENSIONS};

/// How a resolved split was selected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Membership {
    /// A split file listed `declared` distinct stems.
    Listed { declared: usize },
    /// No split file: every image in the directory.
    Unfiltered { split_file: PathBuf },
}

/// The ordered images of one (category, split).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSplit {
    pub category: String,
    pub split: String,
    pub images: Vec<PathBuf>,
    pub membership: Membership,
}

impl ResolvedSplit {
    /// Declared stems that had no image on disk.
    pub fn missing(&self) -> usize {
        match self.membership {
            Membership::Listed { declared } => declared.saturating_sub(self.images.len()),
            Membership::Unfiltered { .. } => 0,
        }
    }
}

impl fmt::Display for ResolvedSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let found = self.images.len();
        match &self.membership {
            Membership::Listed { declared } => {
                writeln!(
                    f,
                    "Loaded {} images for {}/{}",
                    declared, self.category, self.split
                )?;
                write!(
                    f,
                    "  Found {}/{} images for {}/{}",
                    found, declared, self.category, self.split
                )
            }
            Membership::Unfiltered { split_file } => {
                writeln!(
                    f,
                    "Warning: Split file '{}' does not exist, using all images",
                    split_file.display()
                )?;
                write!(
                    f,
                    "  No split file for {}/{}, using all {} images",
                    self.category, self.split, found
                )
            }
        }
    }
}

/// Reads a split file: one stem per line, trimmed, blank lines skipped.
///
/// Returns `Ok(None)` when the file does not exist. Repeated stems are kept
/// once, at their first position.
pub fn read_split_file(path: &Path) -> Result<Option<Vec<String>>, DatasetError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(DatasetError::io(path, err)),
    };

    let mut seen = HashSet::new();
    let stems = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(line.to_string()))
        .map(String::from)
        .collect();

    Ok(Some(stems))
}

/// Maps each stem to the first `<stem>.<ext>` in `images_dir` that exists,
/// trying extensions in [`IMAGE_EXTENSIONS`] order. Unmatched stems are
/// dropped.
pub fn resolve_stems(images_dir: &Path, stems: &[String]) -> Vec<PathBuf> {
    stems
        .iter()
        .filter_map(|stem| {
            let found = IMAGE_EXTENSIONS
                .iter()
                .map(|ext| images_dir.join(format!("{}.{}", stem, ext)))
                .find(|candidate| candidate.is_file());
            if found.is_none() {
                log::debug!("no image for stem '{}' in {}", stem, images_dir.display());
            }
            found
        })
        .collect()
}

/// Resolves the images of `category` that belong to `split`.
pub fn resolve_split(
    layout: &DatasetLayout,
    category: &str,
    split: &str,
) -> Result<ResolvedSplit, DatasetError> {
    let images_dir = layout.images_dir(category);
    let split_file = layout.split_file(category, split);

    let (images, membership) = match read_split_file(&split_file)? {
        Some(stems) => (
            resolve_stems(&images_dir, &stems),
            Membership::Listed {
                declared: stems.len(),
            },
        ),
        None => (list_images(&images_dir)?, Membership::Unfiltered { split_file }),
    };

    Ok(ResolvedSplit {
        category: category.to_string(),
        split: split.to_string(),
        images,
        membership,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(images: &[&str]) -> (tempfile::TempDir, DatasetLayout) {
        let dir = tempfile::tempdir().unwrap();
        let layout = DatasetLayout::new(dir.path(), "java_plums");
        let images_dir = layout.images_dir("healthy");
        fs::create_dir_all(&images_dir).unwrap();
        fs::create_dir_all(layout.sets_dir("healthy")).unwrap();
        for name in images {
            fs::write(images_dir.join(name), b"x").unwrap();
        }
        (dir, layout)
    }

    #[test]
    fn test_listed_split_reports_shortfall() {
        let (_dir, layout) = setup(&["a.jpg", "b.png", "c.jpg"]);
        fs::write(layout.split_file("healthy", "train"), "a\nb\n\nd\n").unwrap();

        let resolved = resolve_split(&layout, "healthy", "train").unwrap();
        let names: Vec<_> = resolved
            .images
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.png"]);
        assert_eq!(resolved.membership, Membership::Listed { declared: 3 });
        assert_eq!(resolved.missing(), 1);
        assert_eq!(
            resolved.to_string(),
            "Loaded 3 images for healthy/train\n  Found 2/3 images for healthy/train"
        );
    }

    #[test]
    fn test_complete_split_keeps_file_order() {
        let (_dir, layout) = setup(&["a.jpg", "b.jpg"]);
        fs::write(layout.split_file("healthy", "val"), "b\na\n").unwrap();

        let resolved = resolve_split(&layout, "healthy", "val").unwrap();
        assert!(resolved
            .to_string()
            .ends_with("Found 2/2 images for healthy/val"));
        assert!(resolved.images[0].ends_with("b.jpg"));
    }

    #[test]
    fn test_missing_split_file_uses_everything() {
        let (_dir, layout) = setup(&["b.png", "a.jpg"]);

        let resolved = resolve_split(&layout, "healthy", "test").unwrap();
        assert_eq!(resolved.images.len(), 2);
        assert!(resolved.images[0].ends_with("a.jpg"));
        let text = resolved.to_string();
        assert!(text.starts_with("Warning: Split file"));
        assert!(text.ends_with("No split file for healthy/test, using all 2 images"));
    }

    #[test]
    fn test_empty_split_file_selects_nothing() {
        let (_dir, layout) = setup(&["a.jpg"]);
        fs::write(layout.split_file("healthy", "train"), "\n").unwrap();

        let resolved = resolve_split(&layout, "healthy", "train").unwrap();
        assert!(resolved.images.is_empty());
        assert_eq!(resolved.membership, Membership::Listed { declared: 0 });
    }

    #[test]
    fn test_duplicate_stems_counted_once() {
        let (_dir, layout) = setup(&["a.jpg"]);
        fs::write(layout.split_file("healthy", "train"), "a\n a \na\n").unwrap();

        let resolved = resolve_split(&layout, "healthy", "train").unwrap();
        assert_eq!(resolved.images.len(), 1);
        assert_eq!(resolved.membership, Membership::Listed { declared: 1 });
    }

    #[test]
    fn test_extension_order_prefers_jpg() {
        let (_dir, layout) = setup(&["a.png", "a.jpg"]);
        let images = resolve_stems(&layout.images_dir("healthy"), &["a".to_string()]);
        assert_eq!(images.len(), 1);
        assert!(images[0].ends_with("a.jpg"));
    }
}
