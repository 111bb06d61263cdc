//! Raw dataset reorganization.
//!
//! Turns the distribution layout (`Raw Data/<Category_Name>/<stem>.jpg`
//! with an optional `<stem>.json` beside each image) into the dataset
//! layout consumed by conversion:
//!
//! 1. copy images to `<category>/images/` and JSON to `<category>/json/`
//! 2. convert each JSON to a one-row `<category>/csv/<stem>.csv`
//! 3. write `labelmap.json`
//! 4. recompute every split file with the seeded partitioner
//!
//! A JSON file that cannot be converted is reported and gets no CSV; the
//! image and the JSON copy are kept.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use walkdir::WalkDir;

use crate::config::DatasetProfile;
use crate::error::DatasetError;
use crate::ir::io_annotation_csv::write_annotation_csv;
use crate::ir::labelmap::write_labelmap;
use crate::ir::{AnnotationSource, CategoryId, Labelmap};
use crate::layout::{file_stem, list_files_with_extension, DatasetLayout};
use crate::split::{write_partition, PartitionReport};

#[derive(Clone, Debug)]
pub struct ReorganizeOptions {
    pub root: PathBuf,
    /// Raw tree, relative to `root` unless absolute.
    pub raw: PathBuf,
    /// Overrides the profile's partition seed.
    pub seed: Option<u64>,
}

/// A per-image JSON that produced no CSV.
#[derive(Clone, Debug, PartialEq)]
pub struct FailedConversion {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CategoryOutcome {
    Copied {
        category: String,
        raw_dir: PathBuf,
        images: usize,
        json: usize,
        csv: usize,
        failed: Vec<FailedConversion>,
    },
    Missing {
        category: String,
        raw: PathBuf,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReorganizeReport {
    pub categories: Vec<CategoryOutcome>,
    pub labelmap: PathBuf,
    pub partition: PartitionReport,
}

impl fmt::Display for ReorganizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.categories {
            match outcome {
                CategoryOutcome::Copied {
                    category,
                    raw_dir,
                    images,
                    json,
                    csv,
                    failed,
                } => {
                    writeln!(f, "Processing {} -> {}...", raw_dir.display(), category)?;
                    writeln!(f, "  Found {} images", images)?;
                    for failure in failed {
                        writeln!(
                            f,
                            "  Warning: could not convert {}: {}",
                            failure.path.display(),
                            failure.message
                        )?;
                    }
                    writeln!(
                        f,
                        "  Completed {}: {} json, {} csv",
                        category, json, csv
                    )?;
                }
                CategoryOutcome::Missing { category, raw } => writeln!(
                    f,
                    "Warning: no directory for {} in {}, skipping",
                    category,
                    raw.display()
                )?,
            }
        }
        writeln!(f, "Created {}", self.labelmap.display())?;
        write!(f, "{}", self.partition)
    }
}

/// The subdirectory of `raw` whose lower-cased name is `category`.
fn find_raw_dir(raw: &Path, category: &str) -> Result<Option<PathBuf>, DatasetError> {
    for entry in WalkDir::new(raw).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|source| {
            let path = source.path().unwrap_or(raw).to_path_buf();
            DatasetError::io(path, source.into())
        })?;
        if entry.file_type().is_dir()
            && entry.file_name().to_string_lossy().to_lowercase() == category
        {
            return Ok(Some(entry.into_path()));
        }
    }
    Ok(None)
}

fn create_dir(path: &Path) -> Result<(), DatasetError> {
    fs::create_dir_all(path).map_err(|e| DatasetError::io(path, e))
}

fn copy_file(from: &Path, to: &Path) -> Result<(), DatasetError> {
    fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| DatasetError::io(from, e))
}

fn reorganize_category(
    layout: &DatasetLayout,
    category: &str,
    label: CategoryId,
    raw_dir: PathBuf,
) -> Result<CategoryOutcome, DatasetError> {
    let images_dir = layout.images_dir(category);
    let json_dir = layout.json_dir(category);
    let csv_dir = layout.csv_dir(category);
    for dir in [&images_dir, &json_dir, &csv_dir] {
        create_dir(dir)?;
    }

    let images = list_files_with_extension(&raw_dir, "jpg")?;
    let (mut json, mut csv) = (0, 0);
    let mut failed = Vec::new();

    for image in &images {
        let (Some(stem), Some(name)) = (file_stem(image), image.file_name()) else {
            continue;
        };
        copy_file(image, &images_dir.join(name))?;

        let raw_json = raw_dir.join(format!("{}.json", stem));
        if !raw_json.is_file() {
            continue;
        }
        copy_file(&raw_json, &layout.json_path(category, stem))?;
        json += 1;

        let source = AnnotationSource::ImageJson {
            path: raw_json.clone(),
            label,
        };
        match source.load() {
            Ok(batch) => {
                write_annotation_csv(&layout.csv_path(category, stem), &batch.records)?;
                csv += 1;
            }
            Err(err) => {
                log::warn!("not converting {}: {}", raw_json.display(), err);
                failed.push(FailedConversion {
                    path: raw_json,
                    message: err.to_string(),
                });
            }
        }
    }

    Ok(CategoryOutcome::Copied {
        category: category.to_string(),
        raw_dir,
        images: images.len(),
        json,
        csv,
        failed,
    })
}

/// Reorganizes the raw tree, writes the labelmap and recomputes splits.
///
/// # Errors
/// Fails when the raw tree does not exist or a copy/write fails.
pub fn reorganize_dataset(
    opts: &ReorganizeOptions,
    profile: &DatasetProfile,
) -> Result<ReorganizeReport, DatasetError> {
    let raw = opts.root.join(&opts.raw);
    if !raw.is_dir() {
        return Err(DatasetError::InvalidOptions {
            message: format!("raw data directory {} does not exist", raw.display()),
        });
    }

    let layout = DatasetLayout::new(&opts.root, &profile.dataset_dir);
    let labelmap = Labelmap::from_category_names(&profile.categories);

    let mut categories = Vec::new();
    for (idx, category) in profile.categories.iter().enumerate() {
        let label = CategoryId::new(idx as u64 + 1);
        let outcome = match find_raw_dir(&raw, category)? {
            Some(raw_dir) => reorganize_category(&layout, category, label, raw_dir)?,
            None => CategoryOutcome::Missing {
                category: category.clone(),
                raw: raw.clone(),
            },
        };
        categories.push(outcome);
    }

    create_dir(&layout.dataset_path())?;
    let labelmap_path = layout.labelmap_path();
    write_labelmap(&labelmap_path, &labelmap)?;

    let seed = opts.seed.unwrap_or(profile.partition.seed);
    let partition = write_partition(&layout, profile, &mut StdRng::seed_from_u64(seed))?;

    Ok(ReorganizeReport {
        categories,
        labelmap: labelmap_path,
        partition,
    })
}
