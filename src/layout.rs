//! Filesystem layout of a reorganized dataset.
//!
//! ```text
//! <root>/<dataset_dir>/
//!     labelmap.json
//!     <category>/
//!         images/<stem>.<jpg|png|jpeg|bmp>
//!         csv/<stem>.csv
//!         json/<stem>.json
//!         sets/<split>.txt
//! ```

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::DatasetError;

/// Recognised image extensions, in resolution order.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "png", "jpeg", "bmp"];

pub const LABELMAP_FILE: &str = "labelmap.json";

#[derive(Clone, Debug)]
pub struct DatasetLayout {
    root: PathBuf,
    dataset_dir: String,
}

impl DatasetLayout {
    pub fn new(root: impl Into<PathBuf>, dataset_dir: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            dataset_dir: dataset_dir.into(),
        }
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.root.join(&self.dataset_dir)
    }

    pub fn labelmap_path(&self) -> PathBuf {
        self.dataset_path().join(LABELMAP_FILE)
    }

    pub fn category_path(&self, category: &str) -> PathBuf {
        self.dataset_path().join(category)
    }

    pub fn images_dir(&self, category: &str) -> PathBuf {
        self.category_path(category).join("images")
    }

    pub fn csv_dir(&self, category: &str) -> PathBuf {
        self.category_path(category).join("csv")
    }

    pub fn json_dir(&self, category: &str) -> PathBuf {
        self.category_path(category).join("json")
    }

    pub fn sets_dir(&self, category: &str) -> PathBuf {
        self.category_path(category).join("sets")
    }

    pub fn split_file(&self, category: &str, split: &str) -> PathBuf {
        self.sets_dir(category).join(format!("{}.txt", split))
    }

    pub fn csv_path(&self, category: &str, stem: &str) -> PathBuf {
        self.csv_dir(category).join(format!("{}.csv", stem))
    }

    pub fn json_path(&self, category: &str, stem: &str) -> PathBuf {
        self.json_dir(category).join(format!("{}.json", stem))
    }

    /// The path written into `images[].file_name`: relative to the root and
    /// qualified by category, always with `/` separators.
    pub fn image_file_name(&self, category: &str, file_name: &str) -> String {
        format!("{}/{}/images/{}", self.dataset_dir, category, file_name)
    }
}

/// Regular files directly inside `dir` with extension `ext`, sorted by name.
///
/// Matching is case-sensitive, like a shell glob.
pub fn list_files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>, DatasetError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| {
            let path = source.path().unwrap_or(dir).to_path_buf();
            DatasetError::io(path, source.into())
        })?;

        if entry.file_type().is_file()
            && entry.path().extension().and_then(|e| e.to_str()) == Some(ext)
        {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Every image in `dir`: all `.jpg` files, then `.png`, `.jpeg`, `.bmp`,
/// each group sorted by name.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    let mut images = Vec::new();
    for ext in IMAGE_EXTENSIONS {
        images.extend(list_files_with_extension(dir, ext)?);
    }
    Ok(images)
}

/// The file stem as UTF-8, if it has one.
pub fn file_stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}
