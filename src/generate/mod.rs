//! Single-image annotation generator.
//!
//! Writes a `<stem>.json` beside every `*.jpg` of each source tree, holding
//! one image, one whole-image annotation and one category. Ids are drawn
//! with [`IdStrategy::Timestamped`](crate::idgen::IdStrategy::Timestamped)
//! from a caller-supplied allocator.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;
use walkdir::WalkDir;

use crate::config::DatasetProfile;
use crate::error::DatasetError;
use crate::idgen::IdAllocator;
use crate::image_store::ImageStore;
use crate::ir::io_image_json::{
    write_image_json, ImageAnnotationFile, ImageJsonAnnotation, ImageJsonCategory,
    ImageJsonImage, ImageJsonInfo, ImageJsonLicense,
};
use crate::ir::BBox;
use crate::layout::{file_stem, list_files_with_extension};

#[derive(Clone, Debug)]
pub struct AnnotateOptions {
    pub root: PathBuf,
    /// Source trees relative to `root`. Empty means the profile's.
    pub sources: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceOutcome {
    Generated {
        source: String,
        category: String,
        files: Vec<PathBuf>,
    },
    Missing {
        path: PathBuf,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnnotateReport {
    pub outcomes: Vec<SourceOutcome>,
}

impl AnnotateReport {
    pub fn generated(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                SourceOutcome::Generated { files, .. } => files.len(),
                SourceOutcome::Missing { .. } => 0,
            })
            .sum()
    }
}

impl fmt::Display for AnnotateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            match outcome {
                SourceOutcome::Generated {
                    source,
                    category,
                    files,
                } => {
                    writeln!(f, "Processing {}/{}...", source, category)?;
                    for file in files {
                        let name = file.file_name().unwrap_or_default().to_string_lossy();
                        writeln!(f, "Generated: {}", name)?;
                    }
                }
                SourceOutcome::Missing { path } => {
                    writeln!(f, "Skipping {}: does not exist", path.display())?;
                }
            }
        }
        writeln!(f, "Generated {} annotation file(s)", self.generated())
    }
}

/// Builds the annotation document for one image.
pub fn image_annotation<S, R>(
    profile: &DatasetProfile,
    store: &S,
    ids: &mut IdAllocator<R>,
    image_path: &Path,
    category_name: &str,
    supercategory: &str,
) -> Result<ImageAnnotationFile, DatasetError>
where
    S: ImageStore + ?Sized,
    R: Rng,
{
    let image_id = ids.next_raw();
    let annotation_id = ids.next_raw();
    let category_id = ids.next_raw();

    let ((width, height), _) = store.dimensions_or_fallback(image_path);
    let size = fs::metadata(image_path)
        .map_err(|e| DatasetError::io(image_path, e))?
        .len();
    let bbox = BBox::full_image(width, height);
    let settings = &profile.image_json;

    Ok(ImageAnnotationFile {
        info: ImageJsonInfo {
            description: Some(settings.description.clone()),
            version: Some(profile.version.clone()),
            year: Some(profile.year),
            contributor: Some(settings.contributor.clone()),
            source: Some(settings.source.clone()),
            license: Some(ImageJsonLicense {
                name: settings.license_name.clone(),
                url: settings.license_url.clone(),
            }),
        },
        images: vec![ImageJsonImage {
            id: image_id,
            width: Some(width),
            height: Some(height),
            file_name: image_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size: Some(size),
            format: Some("JPEG".to_string()),
            url: Some(String::new()),
            hash: Some(String::new()),
            status: Some("success".to_string()),
        }],
        annotations: vec![ImageJsonAnnotation {
            id: annotation_id,
            image_id,
            category_id,
            segmentation: Vec::new(),
            area: Some(bbox.area()),
            bbox: Some(bbox),
        }],
        categories: vec![ImageJsonCategory {
            id: category_id,
            name: category_name.to_string(),
            supercategory: supercategory.to_string(),
        }],
    })
}

fn category_dirs(source: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(source).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(source).to_path_buf();
            DatasetError::io(path, err.into())
        })?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

/// Generates annotation files for every image under the source trees.
/// Existing `<stem>.json` files are overwritten.
pub fn annotate_sources<S, R>(
    opts: &AnnotateOptions,
    profile: &DatasetProfile,
    store: &S,
    ids: &mut IdAllocator<R>,
) -> Result<AnnotateReport, DatasetError>
where
    S: ImageStore + ?Sized,
    R: Rng,
{
    let sources = if opts.sources.is_empty() {
        profile.image_json.source_dirs.clone()
    } else {
        opts.sources.clone()
    };

    let mut report = AnnotateReport::default();

    for source in &sources {
        let source_path = opts.root.join(source);
        if !source_path.is_dir() {
            report.outcomes.push(SourceOutcome::Missing { path: source_path });
            continue;
        }

        for category_dir in category_dirs(&source_path)? {
            let category = category_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut files = Vec::new();

            for image in list_files_with_extension(&category_dir, "jpg")? {
                let Some(stem) = file_stem(&image) else {
                    continue;
                };
                let doc = image_annotation(profile, store, ids, &image, &category, source)?;
                let json_path = category_dir.join(format!("{}.json", stem));
                write_image_json(&json_path, &doc)?;
                files.push(json_path);
            }

            report.outcomes.push(SourceOutcome::Generated {
                source: source.clone(),
                category,
                files,
            });
        }
    }

    Ok(report)
}
