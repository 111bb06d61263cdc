//! Dataset profile: naming, metadata and defaults for one dataset.
//!
//! The built-in profile describes the Java plum leaf disease dataset. A
//! YAML file passed with `--profile` overrides any subset of fields:
//!
//! ```yaml
//! dataset_dir: java_plums
//! categories: [healthy, dry]
//! partition:
//!   seed: 7
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DatasetError;
use crate::ir::ManifestInfo;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetProfile {
    /// Directory under the dataset root holding the reorganized tree.
    pub dataset_dir: String,
    /// Human title used in manifest descriptions.
    pub title: String,
    pub url: String,
    pub year: u32,
    pub version: String,
    /// Supercategory of every non-background category.
    pub supercategory: String,
    pub categories: Vec<String>,
    pub splits: Vec<String>,
    pub partition: PartitionSettings,
    pub image_json: ImageJsonSettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionSettings {
    pub seed: u64,
    pub train_fraction: f64,
    pub val_fraction: f64,
}

/// Metadata stamped into generated per-image JSON files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageJsonSettings {
    pub description: String,
    pub contributor: String,
    pub source: String,
    pub license_name: String,
    pub license_url: String,
    /// Trees under the dataset root scanned by the generator.
    pub source_dirs: Vec<String>,
}

impl Default for DatasetProfile {
    fn default() -> Self {
        Self {
            dataset_dir: "java_plums".to_string(),
            title: "Java Plum Leaf Disease Classification".to_string(),
            url: "https://prod-dcd-datasets-cache-zipfiles.s3.eu-west-1.amazonaws.com/y6d3z6f8z9-1.zip"
                .to_string(),
            year: 2025,
            version: "1.0".to_string(),
            supercategory: "java_plum_leaf".to_string(),
            categories: [
                "healthy",
                "bacterial_spot",
                "brown_blight",
                "sooty_mold",
                "powdery_mildew",
                "dry",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            splits: ["train", "val", "test"].into_iter().map(String::from).collect(),
            partition: PartitionSettings::default(),
            image_json: ImageJsonSettings::default(),
        }
    }
}

impl Default for PartitionSettings {
    fn default() -> Self {
        Self {
            seed: 42,
            train_fraction: 0.70,
            val_fraction: 0.15,
        }
    }
}

impl Default for ImageJsonSettings {
    fn default() -> Self {
        Self {
            description: "data".to_string(),
            contributor: "search engine".to_string(),
            source: "augmented".to_string(),
            license_name: "Creative Commons Attribution 4.0 International".to_string(),
            license_url: "https://creativecommons.org/licenses/by/4.0/".to_string(),
            source_dirs: vec!["Raw Data".to_string(), "Compressed Data".to_string()],
        }
    }
}

impl DatasetProfile {
    /// Info block for the manifest of `scope` (a category or `combined`)
    /// and `split`.
    pub fn manifest_info(&self, scope: &str, split: &str) -> ManifestInfo {
        ManifestInfo {
            year: Some(self.year),
            version: Some(self.version.clone()),
            description: Some(format!("{} {} {} split", self.title, scope, split)),
            url: Some(self.url.clone()),
        }
    }

    /// Rejects profiles the partitioner or builder cannot work with.
    pub fn validate(&self) -> Result<(), DatasetError> {
        let PartitionSettings {
            train_fraction,
            val_fraction,
            ..
        } = self.partition;

        for (name, value) in [("train_fraction", train_fraction), ("val_fraction", val_fraction)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DatasetError::InvalidOptions {
                    message: format!("{} must be in [0.0, 1.0], got {}", name, value),
                });
            }
        }
        if train_fraction + val_fraction > 1.0 {
            return Err(DatasetError::InvalidOptions {
                message: "train_fraction + val_fraction must not exceed 1.0".to_string(),
            });
        }
        if self.dataset_dir.trim().is_empty() {
            return Err(DatasetError::InvalidOptions {
                message: "dataset_dir must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Loads the profile at `path`, or the built-in profile when `path` is
/// `None`. The result is validated either way.
pub fn load_profile(path: Option<&Path>) -> Result<DatasetProfile, DatasetError> {
    let profile = match path {
        Some(path) => {
            let file = File::open(path).map_err(|e| DatasetError::io(path, e))?;
            serde_yaml::from_reader(BufReader::new(file)).map_err(|source| {
                DatasetError::ProfileParse {
                    path: path.to_path_buf(),
                    source,
                }
            })?
        }
        None => DatasetProfile::default(),
    };

    profile.validate()?;
    Ok(profile)
}
