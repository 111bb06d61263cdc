//! Reproducible train/val/test partitioning.
//!
//! All `(category, stem)` pairs of the dataset are shuffled together with an
//! explicit random source, cut into three contiguous runs and then filtered
//! per category. Boundaries truncate:
//!
//! ```text
//! train_end = floor(train_fraction * total)
//! val_end   = train_end + floor(val_fraction * total)
//! ```
//!
//! Split files are always rewritten from scratch, never merged.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::DatasetProfile;
use crate::error::DatasetError;
use crate::layout::{file_stem, list_images, DatasetLayout};

/// Split files written for every category, in write order.
pub const SPLIT_FILES: [&str; 5] = ["train", "val", "test", "all", "train_val"];

/// The global partition, in shuffled order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    pub train: Vec<(String, String)>,
    pub val: Vec<(String, String)>,
    pub test: Vec<(String, String)>,
}

/// One category's view of a [`Partition`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategorySplits {
    pub train: Vec<String>,
    pub val: Vec<String>,
    pub test: Vec<String>,
    /// Every stem of the category, in shuffled order.
    pub all: Vec<String>,
}

impl CategorySplits {
    /// `train` followed by `val`.
    pub fn train_val(&self) -> Vec<String> {
        self.train.iter().chain(&self.val).cloned().collect()
    }

    /// Stems for one of [`SPLIT_FILES`].
    pub fn stems(&self, name: &str) -> Option<Vec<String>> {
        match name {
            "train" => Some(self.train.clone()),
            "val" => Some(self.val.clone()),
            "test" => Some(self.test.clone()),
            "all" => Some(self.all.clone()),
            "train_val" => Some(self.train_val()),
            _ => None,
        }
    }
}

/// Shuffles `pairs` with `rng` and cuts the result into train/val/test.
pub fn partition<R: Rng + ?Sized>(
    mut pairs: Vec<(String, String)>,
    train_fraction: f64,
    val_fraction: f64,
    rng: &mut R,
) -> Partition {
    pairs.shuffle(rng);

    let total = pairs.len();
    let train_end = ((train_fraction * total as f64).floor() as usize).min(total);
    let val_end = (train_end + (val_fraction * total as f64).floor() as usize).min(total);

    let test = pairs.split_off(val_end);
    let val = pairs.split_off(train_end);

    Partition {
        train: pairs,
        val,
        test,
    }
}

impl Partition {
    /// Stems of `category`, keeping their shuffled relative order.
    pub fn for_category(&self, category: &str) -> CategorySplits {
        let pick = |pairs: &[(String, String)]| -> Vec<String> {
            pairs
                .iter()
                .filter(|(cat, _)| cat == category)
                .map(|(_, stem)| stem.clone())
                .collect()
        };

        let train = pick(&self.train);
        let val = pick(&self.val);
        let test = pick(&self.test);
        let all = train.iter().chain(&val).chain(&test).cloned().collect();

        CategorySplits {
            train,
            val,
            test,
            all,
        }
    }

    pub fn len(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Serializes stems the way split files store them: joined by `\n` with a
/// trailing `\n`.
pub fn format_split_file(stems: &[String]) -> String {
    let mut out = stems.join("\n");
    out.push('\n');
    out
}

/// Every `(category, stem)` pair on disk, category by category in profile
/// order. Categories without an image directory are skipped.
///
/// A stem present under several extensions (`a.jpg`, `a.png`) is one pair,
/// placed where its first file in [`list_images`] order is.
pub fn collect_stems(
    layout: &DatasetLayout,
    categories: &[String],
) -> Result<Vec<(String, String)>, DatasetError> {
    let mut pairs = Vec::new();
    for category in categories {
        let images_dir = layout.images_dir(category);
        if !images_dir.is_dir() {
            log::debug!("no image directory for {}, not partitioned", category);
            continue;
        }
        let mut seen = HashSet::new();
        for image in list_images(&images_dir)? {
            let Some(stem) = file_stem(&image) else {
                continue;
            };
            if seen.insert(stem.to_string()) {
                pairs.push((category.clone(), stem.to_string()));
            } else {
                log::debug!("{} shares its stem with another image", image.display());
            }
        }
    }
    Ok(pairs)
}

/// Per-category outcome of [`write_partition`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PartitionEntry {
    Written {
        category: String,
        train: usize,
        val: usize,
        test: usize,
    },
    Skipped {
        category: String,
        images_dir: PathBuf,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartitionReport {
    pub total: usize,
    pub entries: Vec<PartitionEntry>,
}

impl fmt::Display for PartitionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            match entry {
                PartitionEntry::Written {
                    category,
                    train,
                    val,
                    test,
                } => writeln!(
                    f,
                    "Created splits for {}: train={}, val={}, test={}",
                    category, train, val, test
                )?,
                PartitionEntry::Skipped {
                    category,
                    images_dir,
                } => writeln!(
                    f,
                    "Warning: {} does not exist, skipping {}",
                    images_dir.display(),
                    category
                )?,
            }
        }
        write!(f, "Partitioned {} images", self.total)
    }
}

/// Writes the five split files of one category under its `sets/` directory.
pub fn write_split_files(
    layout: &DatasetLayout,
    category: &str,
    splits: &CategorySplits,
) -> Result<(), DatasetError> {
    let sets_dir = layout.sets_dir(category);
    fs::create_dir_all(&sets_dir).map_err(|e| DatasetError::io(&sets_dir, e))?;

    for name in SPLIT_FILES {
        let stems = splits.stems(name).unwrap_or_default();
        let path = layout.split_file(category, name);
        fs::write(&path, format_split_file(&stems)).map_err(|e| DatasetError::io(&path, e))?;
    }
    Ok(())
}

/// Partitions every profile category on disk and rewrites its split files.
pub fn write_partition<R: Rng + ?Sized>(
    layout: &DatasetLayout,
    profile: &DatasetProfile,
    rng: &mut R,
) -> Result<PartitionReport, DatasetError> {
    let pairs = collect_stems(layout, &profile.categories)?;
    let partition = partition(
        pairs,
        profile.partition.train_fraction,
        profile.partition.val_fraction,
        rng,
    );

    let mut report = PartitionReport {
        total: partition.len(),
        entries: Vec::new(),
    };

    for category in &profile.categories {
        let images_dir = layout.images_dir(category);
        if !images_dir.is_dir() {
            report.entries.push(PartitionEntry::Skipped {
                category: category.clone(),
                images_dir,
            });
            continue;
        }

        let splits = partition.for_category(category);
        write_split_files(layout, category, &splits)?;
        report.entries.push(PartitionEntry::Written {
            category: category.clone(),
            train: splits.train.len(),
            val: splits.val.len(),
            test: splits.test.len(),
        });
    }

    Ok(report)
}
