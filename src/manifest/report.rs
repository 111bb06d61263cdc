//! Build and conversion reports.
//!
//! These follow the shape of the integrity report but only ever carry
//! warnings: anything recorded here was dropped or defaulted and the run
//! carried on.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::split::ResolvedSplit;

/// Counts of manifest elements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ManifestCounts {
    pub images: usize,
    pub annotations: usize,
}

/// A stable code for something the builder dropped or defaulted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuildIssueCode {
    /// An image header could not be read; 512x512 was used.
    ImageSizeFallback,
    /// An annotation source could not be read or had the wrong structure.
    UnreadableSource,
    /// A row whose fields did not parse.
    MalformedRow,
    /// A row whose label names no category in the labelmap.
    UnknownCategory,
}

impl BuildIssueCode {
    fn summary(self) -> &'static str {
        match self {
            BuildIssueCode::ImageSizeFallback => "image(s) could not be probed, used 512x512",
            BuildIssueCode::UnreadableSource => "annotation file(s) could not be read",
            BuildIssueCode::MalformedRow => "malformed annotation row(s) dropped",
            BuildIssueCode::UnknownCategory => "annotation(s) with an unknown category dropped",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BuildIssue {
    pub code: BuildIssueCode,
    pub message: String,
}

/// What happened while building one manifest.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ManifestReport {
    pub category: String,
    pub split: String,
    pub counts: ManifestCounts,
    pub issues: Vec<BuildIssue>,
}

impl ManifestReport {
    pub fn new(category: impl Into<String>, split: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            split: split.into(),
            ..Default::default()
        }
    }

    /// Records an issue and logs it.
    pub fn add(&mut self, code: BuildIssueCode, message: impl Into<String>) {
        let message = message.into();
        log::debug!("{}/{}: {}", self.category, self.split, message);
        self.issues.push(BuildIssue { code, message });
    }

    pub fn count(&self, code: BuildIssueCode) -> usize {
        self.issues.iter().filter(|i| i.code == code).count()
    }
}

impl fmt::Display for ManifestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for code in [
            BuildIssueCode::ImageSizeFallback,
            BuildIssueCode::UnreadableSource,
            BuildIssueCode::MalformedRow,
            BuildIssueCode::UnknownCategory,
        ] {
            let n = self.count(code);
            if n > 0 {
                writeln!(
                    f,
                    "Warning: {}/{}: {} {}",
                    self.category,
                    self.split,
                    n,
                    code.summary()
                )?;
            }
        }
        Ok(())
    }
}

/// One step of a conversion run, in the order it happened.
#[derive(Clone, Debug, PartialEq)]
pub enum ConvertEntry {
    /// The labelmap was missing; the built-in one was used.
    LabelmapFallback { path: PathBuf },
    /// A category without an image directory.
    CategorySkipped { category: String, images_dir: PathBuf },
    /// One per-category manifest was built and written.
    Manifest {
        resolved: ResolvedSplit,
        build: ManifestReport,
        path: PathBuf,
    },
    /// One combined manifest was written.
    Combined { path: PathBuf, counts: ManifestCounts },
}

/// Everything a conversion run did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConvertReport {
    pub entries: Vec<ConvertEntry>,
}

impl ConvertReport {
    /// Paths of every manifest written, in write order.
    pub fn written(&self) -> impl Iterator<Item = &PathBuf> {
        self.entries.iter().filter_map(|entry| match entry {
            ConvertEntry::Manifest { path, .. } | ConvertEntry::Combined { path, .. } => Some(path),
            _ => None,
        })
    }
}

fn created(f: &mut fmt::Formatter<'_>, path: &Path, counts: ManifestCounts) -> fmt::Result {
    writeln!(
        f,
        "Created {}: {} images, {} annotations",
        path.display(),
        counts.images,
        counts.annotations
    )
}

impl fmt::Display for ConvertEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertEntry::LabelmapFallback { path } => writeln!(
                f,
                "Warning: {} does not exist, using the built-in labelmap",
                path.display()
            ),
            ConvertEntry::CategorySkipped {
                category,
                images_dir,
            } => writeln!(
                f,
                "Warning: {} does not exist, skipping {}",
                images_dir.display(),
                category
            ),
            ConvertEntry::Manifest {
                resolved,
                build,
                path,
            } => {
                writeln!(f, "{}", resolved)?;
                write!(f, "{}", build)?;
                created(f, path, build.counts)
            }
            ConvertEntry::Combined { path, counts } => created(f, path, *counts),
        }
    }
}

impl fmt::Display for ConvertReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            write!(f, "{}", entry)?;
        }
        Ok(())
    }
}
