//! xrant: annotation store for X-ray image collections.
//!
//! xrant keeps per-image labels (polarity, difficulty level, train/test set)
//! and per-image lists of painted objects for a directory of X-ray images.
//! Object masks live as PNG files next to a plain text annotation list, and
//! the store keeps both in sync across edits, deletions and reloads.
//!
//! # Modules
//!
//! - [`model`]: Labels, objects, images and their file formats
//! - [`store`]: The annotation store with cursor, naming and persistence
//! - [`validation`]: Consistency checks and error reporting
//! - [`stats`]: Labeling progress statistics
//! - [`error`]: Error types for xrant operations
//! - [`logging`]: Diagnostic output setup

pub mod error;
pub mod logging;
pub mod model;
pub mod stats;
pub mod store;
pub mod validation;

use std::path::{Path, PathBuf};

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use image::Rgba;

pub use error::XrantError;
pub use store::{AnnotationStore, LabelTarget};

use model::io_mask_png::parse_brush_color;
use model::{ImageSet, Level, Polarity};

/// The xrant CLI application.
#[derive(Parser)]
#[command(name = "xrant")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Scan a collection root and write a fresh annotation list.
    Init(InitArgs),
    /// Validate an annotation list for errors and warnings.
    Validate(ValidateArgs),
    /// Show labeling statistics of an annotation list.
    Stats(StatsArgs),
    /// Export objects of an annotation list as CSV.
    Export(ExportArgs),
    /// Rewrite an annotation list in the current record schema.
    Upgrade(UpgradeArgs),
    /// Set whole-image labels and save the list in place.
    Set(SetArgs),
    /// Drop objects whose mask file is missing and renumber the rest.
    Prune(PruneArgs),
}

/// Output format for reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Arguments for the init subcommand.
#[derive(clap::Args)]
struct InitArgs {
    /// Collection root; images are read from its 'color' subdirectory.
    root: PathBuf,

    /// Image file pattern; ';' separates alternatives (e.g. '*.png;*.jpg').
    #[arg(long, default_value = "*.png", env = "XRANT_GLOB")]
    glob: String,

    /// Object class name.
    #[arg(long = "class", default_value = "none", env = "XRANT_CLASS")]
    class_name: String,

    /// Object subclass name.
    #[arg(long = "subclass", default_value = "none", env = "XRANT_SUBCLASS")]
    subclass_name: String,

    /// Folder name used for the list file (defaults to the root's name).
    #[arg(long)]
    folder: Option<String>,
}

/// Arguments for the validate subcommand.
#[derive(clap::Args)]
struct ValidateArgs {
    /// Annotation list to validate.
    input: PathBuf,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Also compare object lists and mask sizes with the mask files on disk.
    #[arg(long)]
    check_masks: bool,

    /// Output format for the report.
    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,
}

/// Arguments for the stats subcommand.
#[derive(clap::Args)]
struct StatsArgs {
    /// Annotation list to analyze.
    input: PathBuf,

    /// Output format for the report.
    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,
}

/// Arguments for the export subcommand.
#[derive(clap::Args)]
struct ExportArgs {
    /// Annotation list to export.
    input: PathBuf,

    /// Output CSV file.
    #[arg(long)]
    csv: PathBuf,
}

/// Arguments for the upgrade subcommand.
#[derive(clap::Args)]
struct UpgradeArgs {
    /// Annotation list to rewrite.
    input: PathBuf,

    /// Output file (defaults to rewriting the input).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Arguments for the set subcommand.
#[derive(clap::Args)]
#[command(group(ArgGroup::new("target").required(true).args(["index", "all"])))]
struct SetArgs {
    /// Annotation list to edit.
    input: PathBuf,

    /// Edit the image at this index.
    #[arg(long)]
    index: Option<usize>,

    /// Edit every image.
    #[arg(long)]
    all: bool,

    /// Whole-image label: positive, negative or skip.
    #[arg(long, allow_hyphen_values = true)]
    label: Option<Polarity>,

    /// Difficulty level: 0 (skip) to 5.
    #[arg(long)]
    level: Option<Level>,

    /// Set: train, test or skip.
    #[arg(long, allow_hyphen_values = true)]
    set: Option<ImageSet>,
}

/// Arguments for the prune subcommand.
#[derive(clap::Args)]
struct PruneArgs {
    /// Annotation list to prune.
    input: PathBuf,

    /// Brush color (rrggbb or rrggbbaa) used to render object regions.
    #[arg(long, value_parser = parse_brush_color, default_value = "ff0000")]
    brush: Rgba<u8>,
}

/// Run the xrant CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), XrantError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init(args)) => run_init(args),
        Some(Commands::Validate(args)) => run_validate(args),
        Some(Commands::Stats(args)) => run_stats(args),
        Some(Commands::Export(args)) => run_export(args),
        Some(Commands::Upgrade(args)) => run_upgrade(args),
        Some(Commands::Set(args)) => run_set(args),
        Some(Commands::Prune(args)) => run_prune(args),
        None => {
            println!("xrant {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Annotation store for X-ray image collections.");
            println!();
            println!("Run 'xrant --help' for usage information.");
            Ok(())
        }
    }
}

fn run_init(args: InitArgs) -> Result<(), XrantError> {
    let folder = args.folder.unwrap_or_else(|| folder_name_of(&args.root));

    let mut store = AnnotationStore::new();
    store.load_directory(&args.root, folder, &args.glob)?;
    store.set_class_name(args.class_name, args.subclass_name)?;

    match store.save_annotation_list()? {
        Some(path) => {
            println!(
                "Wrote {} images to {}",
                store.image_count(),
                path.display()
            );
            Ok(())
        }
        None => Err(XrantError::InvalidArgument(format!(
            "no images matching '{}' in {}",
            args.glob,
            store.image_dir().display()
        ))),
    }
}

fn run_validate(args: ValidateArgs) -> Result<(), XrantError> {
    let mut store = AnnotationStore::open(&args.input)?;
    if args.check_masks {
        // Mask sizes can only be compared against loaded masks.
        for index in 0..store.image_count() {
            store.load_object_masks(index, false);
        }
    }

    let opts = validation::ValidateOptions {
        strict: args.strict,
        check_masks: args.check_masks,
    };
    let report = validation::validate_store(&store, &opts);

    match args.output {
        OutputFormat::Json => {
            let json = report.to_json().map_err(|e| XrantError::Io(e.into()))?;
            println!("{json}");
        }
        OutputFormat::Text => print!("{}", report),
    }

    let has_errors = report.error_count() > 0;
    let has_warnings = report.warning_count() > 0;

    if has_errors || (opts.strict && has_warnings) {
        Err(XrantError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

fn run_stats(args: StatsArgs) -> Result<(), XrantError> {
    let store = AnnotationStore::open(&args.input)?;
    let report = stats::stats_images(store.images(), &stats::StatsOptions::default());

    match args.output {
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&report).map_err(|e| XrantError::Io(e.into()))?;
            println!("{json}");
        }
        OutputFormat::Text => print!("{}", report),
    }
    Ok(())
}

fn run_export(args: ExportArgs) -> Result<(), XrantError> {
    let store = AnnotationStore::open(&args.input)?;
    model::io_export_csv::write_objects_csv(&args.csv, store.images())?;

    let objects: usize = store.images().iter().map(|i| i.object_count()).sum();
    println!(
        "Exported {} objects of {} images to {}",
        objects,
        store.image_count(),
        args.csv.display()
    );
    Ok(())
}

fn run_upgrade(args: UpgradeArgs) -> Result<(), XrantError> {
    let list = model::io_list_txt::read_annotation_list(&args.input)?;
    let output = args.output.unwrap_or_else(|| args.input.clone());
    model::io_list_txt::write_annotation_list(&output, &list.header, &list.images)?;

    println!(
        "Upgraded {} legacy records of {} to {}",
        list.legacy_records,
        list.images.len(),
        output.display()
    );
    Ok(())
}

fn run_set(args: SetArgs) -> Result<(), XrantError> {
    if args.label.is_none() && args.level.is_none() && args.set.is_none() {
        return Err(XrantError::InvalidArgument(
            "nothing to set; pass --label, --level or --set".to_string(),
        ));
    }

    let mut store = AnnotationStore::open(&args.input)?;
    let target = match args.index {
        Some(index) if index >= store.image_count() => {
            return Err(XrantError::InvalidArgument(format!(
                "image index {} out of range (list has {} images)",
                index,
                store.image_count()
            )));
        }
        Some(index) => LabelTarget::At(index),
        None => LabelTarget::All,
    };

    if let Some(label) = args.label {
        store.set_label(target, label);
    }
    if let Some(level) = args.level {
        store.set_level(target, level);
    }
    if let Some(set) = args.set {
        store.set_set(target, set);
    }

    store.save_annotation_list_as(&args.input)?;
    println!("Updated {}", args.input.display());
    Ok(())
}

fn run_prune(args: PruneArgs) -> Result<(), XrantError> {
    let mut store = AnnotationStore::open(&args.input)?;

    let mut removed = 0;
    for index in 0..store.image_count() {
        removed += prune_image(&mut store, index, args.brush)?;
    }

    store.save_annotation_list_as(&args.input)?;
    println!(
        "Removed {} objects without mask from {}",
        removed,
        args.input.display()
    );
    Ok(())
}

fn prune_image(
    store: &mut AnnotationStore,
    index: usize,
    brush: Rgba<u8>,
) -> Result<usize, XrantError> {
    let removed = store.load_object_images(index, brush, false).len();
    if removed > 0 {
        store.save_object_masks(index)?;
    }
    store.drop_object_masks_at(index);
    Ok(removed)
}

fn folder_name_of(root: &Path) -> String {
    root.canonicalize()
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .or_else(|| root.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_FOLDER.to_string())
}

const DEFAULT_FOLDER: &str = "annotations";
