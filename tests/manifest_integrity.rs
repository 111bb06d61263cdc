//! Referential integrity of built manifests over generated dataset trees.

mod proptest_helpers;

use std::collections::HashSet;
use std::fs;

use plumleaf::config::DatasetProfile;
use plumleaf::idgen::{IdAllocator, IdStrategy};
use plumleaf::image_store::FsImageStore;
use plumleaf::ir::io_coco_json::read_coco_json;
use plumleaf::layout::DatasetLayout;
use plumleaf::manifest::{convert_dataset, ConvertOptions};
use plumleaf::validation::validate_manifest;
use proptest::prelude::*;
use proptest_helpers::{arb_coord, arb_stem, proptest_config};

#[derive(Clone, Debug)]
struct ImageSpec {
    stem: String,
    /// `None`: no CSV. Each row is `(w, h, label)`; labels run past the
    /// labelmap so some rows are dropped.
    rows: Option<Vec<(f64, f64, u64)>>,
    malformed: bool,
    in_split: bool,
}

fn arb_image() -> impl Strategy<Value = ImageSpec> {
    (
        arb_stem(),
        prop::option::of(prop::collection::vec((arb_coord(), arb_coord(), 0u64..10), 0..4)),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(stem, rows, malformed, in_split)| ImageSpec {
            stem,
            rows,
            malformed,
            in_split,
        })
}

fn arb_category_images() -> impl Strategy<Value = Vec<ImageSpec>> {
    prop::collection::vec(arb_image(), 0..8).prop_map(|mut images| {
        let mut seen = HashSet::new();
        images.retain(|img| seen.insert(img.stem.clone()));
        images
    })
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn manifests_are_consistent(
        healthy in arb_category_images(),
        dry in arb_category_images(),
        ghosts in 0usize..3,
        seed in any::<u64>(),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let layout = DatasetLayout::new(dir.path(), "java_plums");
        let profile = DatasetProfile {
            categories: vec!["healthy".to_string(), "dry".to_string()],
            splits: vec!["train".to_string()],
            ..Default::default()
        };

        let mut expected_images = 0;
        for (category, images) in [("healthy", &healthy), ("dry", &dry)] {
            fs::create_dir_all(layout.images_dir(category)).unwrap();
            fs::create_dir_all(layout.csv_dir(category)).unwrap();
            fs::create_dir_all(layout.sets_dir(category)).unwrap();

            let mut split = String::new();
            for image in images {
                fs::write(layout.images_dir(category).join(format!("{}.jpg", image.stem)), b"x").unwrap();
                if image.in_split {
                    split.push_str(&image.stem);
                    split.push('\n');
                    expected_images += 1;
                }
                if let Some(rows) = &image.rows {
                    let mut body = String::from("#item,x,y,width,height,label\n#comment,,,,,\n");
                    for (i, (w, h, label)) in rows.iter().enumerate() {
                        body.push_str(&format!("{i},0,0,{w},{h},{label}\n"));
                    }
                    if image.malformed {
                        body.push_str("99,0,0,NaNish,1,1\n");
                    }
                    fs::write(layout.csv_path(category, &image.stem), body).unwrap();
                }
            }
            for g in 0..ghosts {
                split.push_str(&format!("ghost-{g}\n"));
            }
            fs::write(layout.split_file(category, "train"), split).unwrap();
        }

        let opts = ConvertOptions {
            root: dir.path().to_path_buf(),
            out: dir.path().join("annotations"),
            categories: vec![],
            splits: vec![],
            combined: true,
            json_fallback: false,
        };
        let mut ids = IdAllocator::seeded(seed, IdStrategy::Wide);
        let report = convert_dataset(&opts, &profile, &FsImageStore, &mut ids).unwrap();
        prop_assert_eq!(report.written().count(), 3);

        let combined = read_coco_json(&opts.out.join("combined_instances_train.json")).unwrap();
        prop_assert_eq!(combined.images.len(), expected_images);

        for name in ["healthy_instances_train.json", "dry_instances_train.json", "combined_instances_train.json"] {
            let manifest = read_coco_json(&opts.out.join(name)).unwrap();
            let integrity = validate_manifest(&manifest);
            prop_assert!(integrity.is_ok(), "{}: {}", name, integrity);

            let image_ids: HashSet<_> = manifest.images.iter().map(|i| i.id).collect();
            prop_assert_eq!(image_ids.len(), manifest.images.len());
            for (i, ann) in manifest.annotations.iter().enumerate() {
                prop_assert_eq!(ann.id.as_u64(), i as u64 + 1);
                prop_assert!(image_ids.contains(&ann.image_id));
                prop_assert!(ann.category_id.as_u64() <= 2);
                let area = ann.bbox.width * ann.bbox.height;
                prop_assert!((ann.area - area).abs() <= 1e-9 * area.abs().max(1.0));
            }
        }
    }
}
