//! Plumleaf: annotation aggregation for the Java plum leaf disease dataset.
//!
//! The dataset ships as scattered per-image annotations (a JSON document or
//! a small CSV per image, grouped by disease category). Plumleaf turns them
//! into COCO manifests per category and split, with image ids that are
//! unique across the whole run so per-category manifests can be combined
//! without remapping.
//!
//! # Modules
//!
//! - [`ir`]: manifest model, canonical annotation records and on-disk codecs
//! - [`idgen`]: collision-checked id allocation
//! - [`split`]: split file resolution and seeded partitioning
//! - [`manifest`]: manifest building and aggregation
//! - [`validation`]: integrity checks run before a manifest is written
//! - [`reorganize`]: raw tree to dataset layout
//! - [`generate`]: single-image annotation generator
//! - [`error`]: error types

pub mod config;
pub mod error;
pub mod generate;
pub mod idgen;
pub mod image_store;
pub mod ir;
pub mod layout;
pub mod manifest;
pub mod reorganize;
pub mod split;
pub mod validation;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub use error::DatasetError;

use config::load_profile;
use generate::AnnotateOptions;
use idgen::{IdAllocator, IdStrategy};
use image_store::FsImageStore;
use layout::DatasetLayout;
use manifest::ConvertOptions;
use reorganize::ReorganizeOptions;

/// The plumleaf CLI application.
#[derive(Parser)]
#[command(name = "plumleaf")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build COCO manifests from per-image CSV annotations.
    Convert(ConvertArgs),
    /// Recompute the train/val/test split files.
    Split(SplitArgs),
    /// Reorganize the raw tree into the dataset layout.
    Reorganize(ReorganizeArgs),
    /// Generate a whole-image annotation JSON beside every raw image.
    Annotate(AnnotateArgs),
}

#[derive(clap::Args)]
struct ProfileArg {
    /// YAML dataset profile overriding the built-in one.
    #[arg(long, env = "PLUMLEAF_PROFILE")]
    profile: Option<PathBuf>,
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Dataset root directory.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Output directory for manifests.
    #[arg(long, default_value = "annotations")]
    out: PathBuf,

    /// Categories to convert (default: all).
    #[arg(long, num_args = 1..)]
    categories: Vec<String>,

    /// Splits to convert (default: train val test).
    #[arg(long, num_args = 1..)]
    splits: Vec<String>,

    /// Also write combined_instances_{split}.json.
    #[arg(long)]
    combined: bool,

    /// Read json/<stem>.json for images without a CSV.
    #[arg(long)]
    json_fallback: bool,

    /// Seed for image ids; makes them reproducible.
    #[arg(long)]
    seed: Option<u64>,

    #[command(flatten)]
    profile: ProfileArg,
}

#[derive(clap::Args)]
struct SplitArgs {
    /// Dataset root directory.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Partition seed (default: from profile).
    #[arg(long)]
    seed: Option<u64>,

    #[command(flatten)]
    profile: ProfileArg,
}

#[derive(clap::Args)]
struct ReorganizeArgs {
    /// Dataset root directory.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Raw tree, relative to the root.
    #[arg(long, default_value = "Raw Data")]
    raw: PathBuf,

    /// Partition seed (default: from profile).
    #[arg(long)]
    seed: Option<u64>,

    #[command(flatten)]
    profile: ProfileArg,
}

#[derive(clap::Args)]
struct AnnotateArgs {
    /// Dataset root directory.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Source trees to scan (default: from profile).
    #[arg(long = "source", num_args = 1..)]
    sources: Vec<String>,

    /// Seed for generated ids.
    #[arg(long)]
    seed: Option<u64>,

    #[command(flatten)]
    profile: ProfileArg,
}

/// Run the plumleaf CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), DatasetError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Convert(args)) => run_convert(args),
        Some(Commands::Split(args)) => run_split(args),
        Some(Commands::Reorganize(args)) => run_reorganize(args),
        Some(Commands::Annotate(args)) => run_annotate(args),
        None => {
            println!("plumleaf {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Annotation aggregation for the Java plum leaf disease dataset.");
            println!();
            println!("Run 'plumleaf --help' for usage information.");
            Ok(())
        }
    }
}

fn run_convert(args: ConvertArgs) -> Result<(), DatasetError> {
    let profile = load_profile(args.profile.profile.as_deref())?;
    let opts = ConvertOptions {
        root: args.root,
        out: args.out,
        categories: args.categories,
        splits: args.splits,
        combined: args.combined,
        json_fallback: args.json_fallback,
    };

    let mut ids = IdAllocator::from_seed_option(args.seed, IdStrategy::Wide);
    let report =
        manifest::convert_dataset_with(&opts, &profile, &FsImageStore, &mut ids, |entry| {
            print!("{}", entry)
        })?;
    log::info!("{} manifest(s) written", report.written().count());

    if ids.redraws() > 0 {
        log::info!("{} identifier collision(s) redrawn", ids.redraws());
    }
    Ok(())
}

fn run_split(args: SplitArgs) -> Result<(), DatasetError> {
    let profile = load_profile(args.profile.profile.as_deref())?;
    let layout = DatasetLayout::new(&args.root, &profile.dataset_dir);
    let seed = args.seed.unwrap_or(profile.partition.seed);

    let report = split::write_partition(&layout, &profile, &mut StdRng::seed_from_u64(seed))?;
    println!("{}", report);
    Ok(())
}

fn run_reorganize(args: ReorganizeArgs) -> Result<(), DatasetError> {
    let profile = load_profile(args.profile.profile.as_deref())?;
    let opts = ReorganizeOptions {
        root: args.root,
        raw: args.raw,
        seed: args.seed,
    };

    let report = reorganize::reorganize_dataset(&opts, &profile)?;
    println!("{}", report);
    Ok(())
}

fn run_annotate(args: AnnotateArgs) -> Result<(), DatasetError> {
    let profile = load_profile(args.profile.profile.as_deref())?;
    let opts = AnnotateOptions {
        root: args.root,
        sources: args.sources,
    };

    let mut ids = IdAllocator::from_seed_option(args.seed, IdStrategy::Timestamped);
    let report = generate::annotate_sources(&opts, &profile, &FsImageStore, &mut ids)?;
    print!("{}", report);
    Ok(())
}
