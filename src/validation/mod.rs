//! Manifest integrity checks.
//!
//! Run on every manifest before it is written. Errors here mean the builder
//! produced something inconsistent, not that the input data was bad: bad
//! input is dropped or defaulted upstream and shows up in the build report.
//!
//! Checked:
//! - unique image, category and annotation ids
//! - annotation ids are exactly `1..=count`, in order
//! - every annotation's `image_id` and `category_id` resolve
//! - category 0, when present, is named `background`
//! - images have non-zero dimensions and boxes are finite
//! - `area` matches the box (warning only)

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::{HashMap, HashSet};

use crate::error::DatasetError;
use crate::ir::{AnnotationId, CategoryId, ImageId, Manifest};

/// Checks `manifest` and returns every issue found.
pub fn validate_manifest(manifest: &Manifest) -> ValidationReport {
    let mut report = ValidationReport::new();

    let image_ids: HashSet<ImageId> = manifest.images.iter().map(|i| i.id).collect();
    let category_ids: HashSet<CategoryId> = manifest.categories.iter().map(|c| c.id).collect();

    validate_images(manifest, &mut report);
    validate_categories(manifest, &mut report);
    validate_annotations(manifest, &image_ids, &category_ids, &mut report);

    report
}

/// Like [`validate_manifest`], but turns any error into
/// [`DatasetError::ManifestInconsistent`]. Warnings are logged.
pub fn ensure_consistent(name: &str, manifest: &Manifest) -> Result<(), DatasetError> {
    let report = validate_manifest(manifest);

    for issue in report
        .issues
        .iter()
        .filter(|i| i.severity == Severity::Warning)
    {
        log::warn!("{}: {}", name, issue);
    }

    if report.is_ok() {
        Ok(())
    } else {
        Err(DatasetError::ManifestInconsistent {
            name: name.to_string(),
            error_count: report.error_count(),
            report,
        })
    }
}

fn validate_images(manifest: &Manifest, report: &mut ValidationReport) {
    let mut seen_ids: HashMap<ImageId, usize> = HashMap::new();

    for (idx, image) in manifest.images.iter().enumerate() {
        let id = image.id.as_u64();

        if let Some(first_idx) = seen_ids.get(&image.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateImageId,
                format!(
                    "Duplicate image ID {} (first seen at index {})",
                    id, first_idx
                ),
                IssueContext::Image { id },
            ));
        } else {
            seen_ids.insert(image.id, idx);
        }

        if image.width == 0 || image.height == 0 {
            report.add(ValidationIssue::error(
                IssueCode::InvalidImageDimensions,
                format!(
                    "Invalid dimensions {}x{} (must be positive)",
                    image.width, image.height
                ),
                IssueContext::Image { id },
            ));
        }
    }
}

fn validate_categories(manifest: &Manifest, report: &mut ValidationReport) {
    let mut seen_ids: HashMap<CategoryId, usize> = HashMap::new();

    for (idx, category) in manifest.categories.iter().enumerate() {
        let id = category.id.as_u64();

        if let Some(first_idx) = seen_ids.get(&category.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateCategoryId,
                format!(
                    "Duplicate category ID {} (first seen at index {})",
                    id, first_idx
                ),
                IssueContext::Category { id },
            ));
        } else {
            seen_ids.insert(category.id, idx);
        }

        if category.id.is_background() && category.name != "background" {
            report.add(ValidationIssue::error(
                IssueCode::MisnamedBackground,
                format!("Category 0 is named '{}', expected 'background'", category.name),
                IssueContext::Category { id },
            ));
        }
    }
}

fn validate_annotations(
    manifest: &Manifest,
    image_ids: &HashSet<ImageId>,
    category_ids: &HashSet<CategoryId>,
    report: &mut ValidationReport,
) {
    let mut seen_ids: HashMap<AnnotationId, usize> = HashMap::new();

    for (idx, annotation) in manifest.annotations.iter().enumerate() {
        let id = annotation.id.as_u64();

        if let Some(first_idx) = seen_ids.get(&annotation.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateAnnotationId,
                format!(
                    "Duplicate annotation ID {} (first seen at index {})",
                    id, first_idx
                ),
                IssueContext::Annotation { id },
            ));
        } else {
            seen_ids.insert(annotation.id, idx);
        }

        let expected = idx as u64 + 1;
        if id != expected {
            report.add(ValidationIssue::error(
                IssueCode::NonSequentialAnnotationId,
                format!("Annotation at index {} has ID {}, expected {}", idx, id, expected),
                IssueContext::Annotation { id },
            ));
        }

        if !image_ids.contains(&annotation.image_id) {
            report.add(ValidationIssue::error(
                IssueCode::MissingImageRef,
                format!("References non-existent image {}", annotation.image_id),
                IssueContext::Annotation { id },
            ));
        }

        if !category_ids.contains(&annotation.category_id) {
            report.add(ValidationIssue::error(
                IssueCode::MissingCategoryRef,
                format!(
                    "References non-existent category {}",
                    annotation.category_id
                ),
                IssueContext::Annotation { id },
            ));
        }

        let bbox = &annotation.bbox;
        if !bbox.is_finite() {
            // Would be written as `null` and fail to read back.
            report.add(ValidationIssue::error(
                IssueCode::BBoxNotFinite,
                format!(
                    "Non-finite box [{}, {}, {}, {}]",
                    bbox.x, bbox.y, bbox.width, bbox.height
                ),
                IssueContext::Annotation { id },
            ));
            continue;
        }

        if (annotation.area - bbox.area()).abs() > f64::EPSILON * bbox.area().abs().max(1.0) {
            report.add(ValidationIssue::warning(
                IssueCode::AreaMismatch,
                format!(
                    "Area {} does not match box {}x{}",
                    annotation.area, bbox.width, bbox.height
                ),
                IssueContext::Annotation { id },
            ));
        }
    }
}
