//! Manifest building and aggregation.
//!
//! A conversion run builds one manifest per (category, split) and,
//! optionally, one combined manifest per split:
//!
//! ```text
//! resolve_split ─► build_manifest ─► ensure_consistent ─► write
//!                        │
//!                        └──► CombinedManifests::absorb ─► write
//! ```
//!
//! # Identity
//!
//! Image ids come from one [`IdAllocator`] shared by the whole run, so they
//! are unique across every manifest the run writes and the combined
//! manifest can keep them as they are. Annotation ids are dense `1..=n`
//! within each manifest; the combined manifest renumbers them in
//! concatenation order. No `image_id` or `category_id` is ever rewritten.

mod report;

pub use report::{
    BuildIssue, BuildIssueCode, ConvertEntry, ConvertReport, ManifestCounts, ManifestReport,
};

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;

use crate::config::DatasetProfile;
use crate::error::DatasetError;
use crate::idgen::{IdAllocator, SequentialIds};
use crate::image_store::ImageStore;
use crate::ir::io_coco_json::write_coco_json;
use crate::ir::labelmap::read_labelmap;
use crate::ir::{Annotation, AnnotationSource, Category, CategoryId, Image, Labelmap, Manifest};
use crate::layout::{file_stem, DatasetLayout};
use crate::split::{resolve_split, ResolvedSplit};
use crate::validation::ensure_consistent;

/// Options for [`convert_dataset`].
#[derive(Clone, Debug)]
pub struct ConvertOptions {
    /// Dataset root; the reorganized tree lives under `<root>/<dataset_dir>`.
    pub root: PathBuf,
    /// Output directory for manifests. Created if missing.
    pub out: PathBuf,
    /// Categories to convert. Empty means every profile category.
    pub categories: Vec<String>,
    /// Splits to convert. Empty means every profile split.
    pub splits: Vec<String>,
    /// Also write `combined_instances_{split}.json`.
    pub combined: bool,
    /// Read `json/<stem>.json` for images that have no CSV.
    pub json_fallback: bool,
}

/// Output file name of a per-category manifest.
pub fn category_manifest_name(category: &str, split: &str) -> String {
    format!("{}_instances_{}.json", category, split)
}

/// Output file name of a combined manifest.
pub fn combined_manifest_name(split: &str) -> String {
    format!("combined_instances_{}.json", split)
}

/// Everything fixed for the duration of a run.
#[derive(Clone, Debug)]
pub struct BuildContext<'a> {
    pub layout: &'a DatasetLayout,
    pub profile: &'a DatasetProfile,
    pub labelmap: Labelmap,
    categories: Vec<Category>,
    known: HashSet<CategoryId>,
    pub json_fallback: bool,
}

impl<'a> BuildContext<'a> {
    pub fn new(
        layout: &'a DatasetLayout,
        profile: &'a DatasetProfile,
        labelmap: Labelmap,
        json_fallback: bool,
    ) -> Self {
        let categories = labelmap.categories(&profile.supercategory);
        let known = categories.iter().map(|c| c.id).collect();
        Self {
            layout,
            profile,
            labelmap,
            categories,
            known,
            json_fallback,
        }
    }

    /// The run's category list, shared by every manifest.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Locates the annotation source of one image, if it has one.
    ///
    /// The CSV wins; the per-image JSON is only considered with
    /// `json_fallback`, labelled with the category's labelmap id.
    pub fn locate_source(&self, category: &str, stem: &str) -> Option<AnnotationSource> {
        let csv = self.layout.csv_path(category, stem);
        if csv.is_file() {
            return Some(AnnotationSource::Csv(csv));
        }
        if !self.json_fallback {
            return None;
        }
        let json = self.layout.json_path(category, stem);
        let label = self.labelmap.id_of(category)?;
        json.is_file()
            .then_some(AnnotationSource::ImageJson { path: json, label })
    }
}

/// Builds the manifest of one resolved (category, split).
///
/// Never fails: unreadable images fall back to 512x512, unreadable sources
/// and bad rows are dropped and recorded in the report.
pub fn build_manifest<S, R>(
    ctx: &BuildContext<'_>,
    store: &S,
    ids: &mut IdAllocator<R>,
    resolved: &ResolvedSplit,
) -> (Manifest, ManifestReport)
where
    S: ImageStore + ?Sized,
    R: Rng,
{
    let category = resolved.category.as_str();
    let mut manifest = Manifest::new(
        ctx.profile.manifest_info(category, &resolved.split),
        ctx.categories.clone(),
    );
    let mut report = ManifestReport::new(category, &resolved.split);
    let mut annotation_ids = SequentialIds::new();

    for path in &resolved.images {
        let ((width, height), fell_back) = store.dimensions_or_fallback(path);
        if fell_back {
            report.add(
                BuildIssueCode::ImageSizeFallback,
                format!("could not read size of {}", path.display()),
            );
        }

        let image_id = ids.next_image_id();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        manifest.images.push(Image::new(
            image_id,
            ctx.layout.image_file_name(category, &file_name),
            width,
            height,
        ));

        let Some(source) = file_stem(path).and_then(|stem| ctx.locate_source(category, stem))
        else {
            continue;
        };

        let batch = match source.load() {
            Ok(batch) => batch,
            Err(err) => {
                report.add(BuildIssueCode::UnreadableSource, err.to_string());
                continue;
            }
        };

        for malformed in &batch.malformed_rows {
            report.add(
                BuildIssueCode::MalformedRow,
                format!(
                    "{} line {}: {}",
                    source.path().display(),
                    malformed.line,
                    malformed.error
                ),
            );
        }

        for record in batch.records {
            if !ctx.known.contains(&record.label) {
                report.add(
                    BuildIssueCode::UnknownCategory,
                    format!(
                        "{}: label {} is not in the labelmap",
                        source.path().display(),
                        record.label
                    ),
                );
                continue;
            }
            manifest.annotations.push(Annotation::new(
                annotation_ids.next_id(),
                image_id,
                record.label,
                record.bbox,
            ));
        }
    }

    report.counts = ManifestCounts {
        images: manifest.images.len(),
        annotations: manifest.annotations.len(),
    };
    (manifest, report)
}

/// Per-split accumulator for combined manifests.
#[derive(Clone, Debug, Default)]
pub struct CombinedManifests {
    by_split: BTreeMap<String, Manifest>,
    order: Vec<String>,
}

impl CombinedManifests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a finished per-category manifest to its split's combined
    /// manifest. Images keep their ids; annotations are renumbered to
    /// continue the combined sequence.
    pub fn absorb(&mut self, ctx: &BuildContext<'_>, split: &str, manifest: &Manifest) {
        let combined = self.by_split.entry(split.to_string()).or_insert_with(|| {
            self.order.push(split.to_string());
            Manifest::new(
                ctx.profile.manifest_info("combined", split),
                ctx.categories.clone(),
            )
        });

        combined.images.extend(manifest.images.iter().cloned());

        let offset = combined.annotations.len() as u64;
        combined
            .annotations
            .extend(manifest.annotations.iter().enumerate().map(|(i, ann)| {
                let mut ann = ann.clone();
                ann.id = (offset + i as u64 + 1).into();
                ann
            }));
    }

    pub fn get(&self, split: &str) -> Option<&Manifest> {
        self.by_split.get(split)
    }

    /// Combined manifests in the order their splits were first absorbed.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Manifest)> {
        self.order
            .iter()
            .filter_map(|split| self.by_split.get(split).map(|m| (split.as_str(), m)))
    }
}

/// Reads the labelmap, falling back to the profile's categories when the
/// file does not exist. The flag is `true` when the fallback was used.
pub fn load_labelmap_or_default(
    layout: &DatasetLayout,
    profile: &DatasetProfile,
) -> Result<(Labelmap, bool), DatasetError> {
    let path = layout.labelmap_path();
    if path.is_file() {
        Ok((read_labelmap(&path)?, false))
    } else {
        log::warn!(
            "{} not found, using built-in labelmap for {} categories",
            path.display(),
            profile.categories.len()
        );
        Ok((Labelmap::from_category_names(&profile.categories), true))
    }
}

fn selection_or_default(requested: &[String], defaults: &[String]) -> Vec<String> {
    if requested.is_empty() {
        defaults.to_vec()
    } else {
        requested.to_vec()
    }
}

fn write_checked(path: &Path, manifest: &Manifest) -> Result<(), DatasetError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    ensure_consistent(&name, manifest)?;
    write_coco_json(path, manifest)
}

/// Converts the reorganized dataset into COCO manifests.
///
/// # Errors
/// Fails on labelmap parse errors, on IO errors writing output, and with
/// [`DatasetError::ManifestInconsistent`] if a built manifest does not pass
/// the integrity check. Missing categories, missing split files, unreadable
/// images and bad annotation rows are reported, not returned.
pub fn convert_dataset<S, R>(
    opts: &ConvertOptions,
    profile: &DatasetProfile,
    store: &S,
    ids: &mut IdAllocator<R>,
) -> Result<ConvertReport, DatasetError>
where
    S: ImageStore + ?Sized,
    R: Rng,
{
    convert_dataset_with(opts, profile, store, ids, |_| {})
}

/// Like [`convert_dataset`], calling `progress` with each report entry as
/// soon as it is recorded, so a run that fails part-way has already
/// announced every manifest it wrote.
pub fn convert_dataset_with<S, R, F>(
    opts: &ConvertOptions,
    profile: &DatasetProfile,
    store: &S,
    ids: &mut IdAllocator<R>,
    mut progress: F,
) -> Result<ConvertReport, DatasetError>
where
    S: ImageStore + ?Sized,
    R: Rng,
    F: FnMut(&ConvertEntry),
{
    let layout = DatasetLayout::new(&opts.root, &profile.dataset_dir);
    let categories = selection_or_default(&opts.categories, &profile.categories);
    let splits = selection_or_default(&opts.splits, &profile.splits);

    fs::create_dir_all(&opts.out).map_err(|e| DatasetError::io(&opts.out, e))?;

    let mut report = ConvertReport::default();
    let mut record = |entry: ConvertEntry| {
        progress(&entry);
        report.entries.push(entry);
    };

    let (labelmap, fell_back) = load_labelmap_or_default(&layout, profile)?;
    if fell_back {
        record(ConvertEntry::LabelmapFallback {
            path: layout.labelmap_path(),
        });
    }
    let ctx = BuildContext::new(&layout, profile, labelmap, opts.json_fallback);

    let mut combined = CombinedManifests::new();

    for category in &categories {
        let images_dir = layout.images_dir(category);
        if !images_dir.is_dir() {
            record(ConvertEntry::CategorySkipped {
                category: category.clone(),
                images_dir,
            });
            continue;
        }

        for split in &splits {
            let resolved = resolve_split(&layout, category, split)?;
            let (manifest, build) = build_manifest(&ctx, store, ids, &resolved);

            let path = opts.out.join(category_manifest_name(category, split));
            write_checked(&path, &manifest)?;
            log::info!("wrote {}", path.display());

            if opts.combined {
                combined.absorb(&ctx, split, &manifest);
            }
            record(ConvertEntry::Manifest {
                resolved,
                build,
                path,
            });
        }
    }

    if opts.combined {
        for (split, manifest) in combined.iter() {
            let path = opts.out.join(combined_manifest_name(split));
            write_checked(&path, manifest)?;
            log::info!("wrote {}", path.display());
            record(ConvertEntry::Combined {
                path,
                counts: ManifestCounts {
                    images: manifest.images.len(),
                    annotations: manifest.annotations.len(),
                },
            });
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idgen::IdStrategy;
    use crate::ir::io_coco_json::read_coco_json;
    use crate::split::Membership;
    use std::collections::HashMap;

    /// Serves fixed dimensions by file name; anything else is unreadable.
    struct FixedStore(HashMap<String, (u32, u32)>);

    impl ImageStore for FixedStore {
        fn dimensions(&self, path: &Path) -> Option<(u32, u32)> {
            let name = path.file_name()?.to_str()?;
            self.0.get(name).copied()
        }
    }

    fn store() -> FixedStore {
        FixedStore(HashMap::from([
            ("a.jpg".to_string(), (640, 480)),
            ("b.jpg".to_string(), (800, 600)),
        ]))
    }

    fn profile() -> DatasetProfile {
        DatasetProfile {
            categories: vec!["healthy".to_string(), "dry".to_string()],
            ..Default::default()
        }
    }

    fn tree(images: &[(&str, &[&str])]) -> (tempfile::TempDir, DatasetLayout) {
        let dir = tempfile::tempdir().unwrap();
        let layout = DatasetLayout::new(dir.path(), "java_plums");
        for (category, names) in images {
            let images_dir = layout.images_dir(category);
            fs::create_dir_all(&images_dir).unwrap();
            fs::create_dir_all(layout.csv_dir(category)).unwrap();
            for name in *names {
                fs::write(images_dir.join(name), b"x").unwrap();
            }
        }
        (dir, layout)
    }

    fn unfiltered(layout: &DatasetLayout, category: &str, images: &[&str]) -> ResolvedSplit {
        ResolvedSplit {
            category: category.to_string(),
            split: "train".to_string(),
            images: images
                .iter()
                .map(|name| layout.images_dir(category).join(name))
                .collect(),
            membership: Membership::Listed {
                declared: images.len(),
            },
        }
    }

    #[test]
    fn test_build_links_annotations_to_images() {
        let (_dir, layout) = tree(&[("healthy", &["a.jpg", "b.jpg", "c.jpg"])]);
        fs::write(
            layout.csv_path("healthy", "a"),
            "#item,x,y,width,height,label\n0,1,2,3,4,1\n1,5,6,7,8,1\n",
        )
        .unwrap();
        fs::write(
            layout.csv_path("healthy", "c"),
            "#item,x,y,w,h,class\n0,0,0,10,10,1\n",
        )
        .unwrap();

        let profile = profile();
        let ctx = BuildContext::new(
            &layout,
            &profile,
            Labelmap::from_category_names(&profile.categories),
            false,
        );
        let mut ids = IdAllocator::seeded(7, IdStrategy::Wide);
        let resolved = unfiltered(&layout, "healthy", &["a.jpg", "b.jpg", "c.jpg"]);

        let (manifest, report) = build_manifest(&ctx, &store(), &mut ids, &resolved);

        assert_eq!(manifest.images.len(), 3);
        assert_eq!(manifest.images[0].width, 640);
        assert_eq!(
            manifest.images[0].file_name,
            "java_plums/healthy/images/a.jpg"
        );
        assert_eq!((manifest.images[2].width, manifest.images[2].height), (512, 512));
        assert_eq!(report.count(BuildIssueCode::ImageSizeFallback), 1);

        let ann_ids: Vec<u64> = manifest.annotations.iter().map(|a| a.id.as_u64()).collect();
        assert_eq!(ann_ids, vec![1, 2, 3]);
        assert_eq!(manifest.annotations[0].image_id, manifest.images[0].id);
        assert_eq!(manifest.annotations[2].image_id, manifest.images[2].id);
        assert_eq!(manifest.annotations[1].area, 56.0);
        assert_eq!(manifest.categories.len(), 3);
        assert_eq!(report.counts.annotations, 3);
        assert!(crate::validation::validate_manifest(&manifest).is_ok());
    }

    #[test]
    fn test_unknown_label_is_dropped() {
        let (_dir, layout) = tree(&[("healthy", &["a.jpg"])]);
        fs::write(
            layout.csv_path("healthy", "a"),
            "#item,x,y,width,height,label\n0,1,2,3,4,9\n1,1,2,3,4,2\n",
        )
        .unwrap();

        let profile = profile();
        let ctx = BuildContext::new(
            &layout,
            &profile,
            Labelmap::from_category_names(&profile.categories),
            false,
        );
        let mut ids = IdAllocator::seeded(1, IdStrategy::Wide);
        let resolved = unfiltered(&layout, "healthy", &["a.jpg"]);

        let (manifest, report) = build_manifest(&ctx, &store(), &mut ids, &resolved);
        assert_eq!(manifest.annotations.len(), 1);
        assert_eq!(manifest.annotations[0].id.as_u64(), 1);
        assert_eq!(manifest.annotations[0].category_id.as_u64(), 2);
        assert_eq!(report.count(BuildIssueCode::UnknownCategory), 1);
    }

    #[test]
    fn test_json_fallback_uses_labelmap_id() {
        let (_dir, layout) = tree(&[("dry", &["a.jpg"])]);
        fs::create_dir_all(layout.json_dir("dry")).unwrap();
        fs::write(
            layout.json_path("dry", "a"),
            r#"{"images":[{"id":5,"width":640,"height":480}],
                "annotations":[{"id":6,"image_id":5,"category_id":77,"bbox":[1,2,3,4]}]}"#,
        )
        .unwrap();

        let profile = profile();
        let labelmap = Labelmap::from_category_names(&profile.categories);
        let mut ids = IdAllocator::seeded(1, IdStrategy::Wide);
        let resolved = unfiltered(&layout, "dry", &["a.jpg"]);

        let without = BuildContext::new(&layout, &profile, labelmap.clone(), false);
        let (manifest, _) = build_manifest(&without, &store(), &mut ids, &resolved);
        assert!(manifest.annotations.is_empty());

        let with = BuildContext::new(&layout, &profile, labelmap, true);
        let (manifest, _) = build_manifest(&with, &store(), &mut ids, &resolved);
        assert_eq!(manifest.annotations.len(), 1);
        assert_eq!(manifest.annotations[0].category_id.as_u64(), 2);
        assert_eq!(manifest.annotations[0].bbox.to_array(), [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_unreadable_source_is_reported() {
        let (_dir, layout) = tree(&[("healthy", &["a.jpg"])]);
        fs::create_dir_all(layout.csv_path("healthy", "a")).unwrap();

        let profile = profile();
        let ctx = BuildContext::new(
            &layout,
            &profile,
            Labelmap::from_category_names(&profile.categories),
            true,
        );
        // A directory named like the CSV is not a file, so no source is found.
        let mut ids = IdAllocator::seeded(1, IdStrategy::Wide);
        let resolved = unfiltered(&layout, "healthy", &["a.jpg"]);
        let (manifest, report) = build_manifest(&ctx, &store(), &mut ids, &resolved);
        assert_eq!(manifest.images.len(), 1);
        assert!(report.issues.is_empty());

        fs::create_dir_all(layout.json_dir("healthy")).unwrap();
        fs::write(layout.json_path("healthy", "a"), r#"{"images":[]}"#).unwrap();
        let (_, report) = build_manifest(&ctx, &store(), &mut ids, &resolved);
        assert_eq!(report.count(BuildIssueCode::UnreadableSource), 1);
    }

    #[test]
    fn test_combined_renumbers_annotations_only() {
        let (_dir, layout) = tree(&[("healthy", &["a.jpg"]), ("dry", &["b.jpg"])]);
        for (category, stem) in [("healthy", "a"), ("dry", "b")] {
            fs::write(
                layout.csv_path(category, stem),
                "#item,x,y,width,height,label\n0,1,1,2,2,1\n1,1,1,3,3,2\n",
            )
            .unwrap();
        }

        let profile = profile();
        let ctx = BuildContext::new(
            &layout,
            &profile,
            Labelmap::from_category_names(&profile.categories),
            false,
        );
        let mut ids = IdAllocator::seeded(3, IdStrategy::Wide);
        let (healthy, _) = build_manifest(
            &ctx,
            &store(),
            &mut ids,
            &unfiltered(&layout, "healthy", &["a.jpg"]),
        );
        let (dry, _) = build_manifest(
            &ctx,
            &store(),
            &mut ids,
            &unfiltered(&layout, "dry", &["b.jpg"]),
        );

        let mut combined = CombinedManifests::new();
        combined.absorb(&ctx, "train", &healthy);
        combined.absorb(&ctx, "train", &dry);
        let merged = combined.get("train").unwrap();

        assert_eq!(merged.images.len(), 2);
        assert_eq!(merged.images[0].id, healthy.images[0].id);
        assert_eq!(merged.images[1].id, dry.images[0].id);
        let ann_ids: Vec<u64> = merged.annotations.iter().map(|a| a.id.as_u64()).collect();
        assert_eq!(ann_ids, vec![1, 2, 3, 4]);
        assert_eq!(merged.annotations[2].image_id, dry.images[0].id);
        assert_eq!(
            merged.info.description.as_deref(),
            Some("Java Plum Leaf Disease Classification combined train split")
        );
        assert!(crate::validation::validate_manifest(merged).is_ok());
    }

    #[test]
    fn test_progress_sees_manifests_written_before_a_failure() {
        let (dir, layout) = tree(&[("healthy", &["a.jpg"]), ("dry", &["b.jpg"])]);
        let out = dir.path().join("annotations");
        // A directory where the dry manifest should go makes its write fail.
        fs::create_dir_all(out.join("dry_instances_train.json")).unwrap();

        let opts = ConvertOptions {
            root: dir.path().to_path_buf(),
            out,
            categories: vec![],
            splits: vec!["train".to_string()],
            combined: false,
            json_fallback: false,
        };
        let mut seen = Vec::new();
        let mut ids = IdAllocator::seeded(5, IdStrategy::Wide);
        let result = convert_dataset_with(&opts, &profile(), &store(), &mut ids, |entry| {
            seen.push(entry.to_string())
        });

        assert!(matches!(result, Err(DatasetError::PathIo { .. })));
        assert_eq!(seen.len(), 2);
        assert!(seen[0].contains("using the built-in labelmap"));
        assert!(seen[1].contains("healthy_instances_train.json: 1 images, 0 annotations"));
        assert!(layout.images_dir("dry").is_dir());
    }

    #[test]
    fn test_convert_dataset_writes_expected_files() {
        let (dir, layout) = tree(&[("healthy", &["a.jpg", "b.jpg"])]);
        fs::create_dir_all(layout.sets_dir("healthy")).unwrap();
        fs::write(layout.split_file("healthy", "train"), "a\nb\nd\n").unwrap();
        fs::write(layout.split_file("healthy", "val"), "\n").unwrap();

        let opts = ConvertOptions {
            root: dir.path().to_path_buf(),
            out: dir.path().join("annotations"),
            categories: vec![],
            splits: vec!["train".to_string(), "val".to_string()],
            combined: true,
            json_fallback: false,
        };
        let mut ids = IdAllocator::seeded(42, IdStrategy::Wide);
        let report = convert_dataset(&opts, &profile(), &store(), &mut ids).unwrap();

        let text = report.to_string();
        assert!(text.contains("using the built-in labelmap"));
        assert!(text.contains("Found 2/3 images for healthy/train"));
        assert!(text.contains("skipping dry"));
        assert_eq!(report.written().count(), 4);

        let train = read_coco_json(&opts.out.join("healthy_instances_train.json")).unwrap();
        assert_eq!(train.images.len(), 2);
        let val = read_coco_json(&opts.out.join("healthy_instances_val.json")).unwrap();
        assert!(val.images.is_empty());
        let combined = read_coco_json(&opts.out.join("combined_instances_train.json")).unwrap();
        assert_eq!(combined.images, train.images);
    }
}
