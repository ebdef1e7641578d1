//! odrecord: object detection datasets to TFRecord training files.
//!
//! odrecord walks a directory of annotated JPEG images (LabelMe style JSON
//! or PASCAL VOC XML), normalizes every box against the real image size,
//! assigns label ids in first-seen order and writes `train.record`,
//! `test.record` and `label_map.pbtxt` for the TensorFlow object detection
//! API.
//!
//! # Modules
//!
//! - [`annotation`]: Reading one annotation file plus its image
//! - [`label_map`]: Label name to id assignment and the `.pbtxt` sidecar
//! - [`record`]: `tf.train.Example` encoding and TFRecord framing
//! - [`pipeline`]: Train/test conversion passes
//! - [`inspect`]: Summaries of written record files
//! - [`project`]: Project directory layout and `setting.json`
//! - [`job`]: Running the external trainer and exporter
//! - [`error`]: Error types for odrecord operations

pub mod annotation;
pub mod error;
pub mod inspect;
pub mod job;
pub mod label_map;
pub mod pipeline;
pub mod project;
pub mod record;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use annotation::AnnotationFormat;
use job::{JobEvent, JobOptions, ProcessRunner};
use label_map::{read_label_map, LabelMap};
use pipeline::{generate_record, ConversionRun, RecordJob, Split, LABEL_MAP_FILE_NAME};
use project::{project_names, save_settings, ProjectLayout, ProjectSettings};

pub use error::RecordError;

/// The odrecord CLI application.
#[derive(Parser)]
#[command(name = "odrecord")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Convert the train and test sets into record files.
    Convert(ConvertArgs),
    /// Convert a single split.
    Record(RecordArgs),
    /// Summarize a record file.
    Inspect(InspectArgs),
    /// List the projects under a root directory.
    Projects(ProjectsArgs),
    /// Show or initialize a project's setting.json.
    Settings(SettingsArgs),
    /// Train a project task with the external trainer.
    Train(JobArgs),
    /// Export a trained project task with the external exporter.
    Export(JobArgs),
}

/// Arguments for the convert subcommand.
#[derive(clap::Args)]
struct ConvertArgs {
    /// Train set directory.
    #[arg(long, env = "ODRECORD_TRAIN_DIR", required_unless_present = "project")]
    train_dir: Option<PathBuf>,

    /// Test set directory.
    #[arg(long, env = "ODRECORD_TEST_DIR", required_unless_present = "project")]
    test_dir: Option<PathBuf>,

    /// Directory receiving train.record, test.record and label_map.pbtxt.
    #[arg(long, env = "ODRECORD_OUTPUT_DIR", required_unless_present = "project")]
    output_dir: Option<PathBuf>,

    /// Annotation format ('json' or 'xml').
    #[arg(long, env = "ODRECORD_FORMAT")]
    format: Option<AnnotationFormat>,

    /// Subfolder of each set directory to scan (repeatable; default: the directory itself).
    #[arg(long = "subfolder")]
    subfolders: Vec<String>,

    /// Project name; paths and format come from the project layout.
    #[arg(long, conflicts_with_all = ["train_dir", "test_dir", "output_dir"])]
    project: Option<String>,

    /// Task name within the project (default: the TFRecord entry of setting.json).
    #[arg(long, requires = "project")]
    task: Option<String>,

    /// Root directory holding datasets/ and projects/.
    #[arg(long, env = "ODRECORD_ROOT", default_value = ".")]
    root: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum SplitArg {
    Train,
    Test,
}

impl From<SplitArg> for Split {
    fn from(value: SplitArg) -> Self {
        match value {
            SplitArg::Train => Split::Train,
            SplitArg::Test => Split::Test,
        }
    }
}

/// Arguments for the record subcommand.
#[derive(clap::Args)]
struct RecordArgs {
    /// Directory holding the split's annotation files.
    #[arg(long)]
    dataset_dir: PathBuf,

    /// Directory receiving the record file (and label map).
    #[arg(long, env = "ODRECORD_OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Which split to write.
    #[arg(long, value_enum)]
    split: SplitArg,

    /// Label map to start from (default for 'test': <output-dir>/label_map.pbtxt).
    #[arg(long)]
    label_map: Option<PathBuf>,

    /// Annotation format ('json' or 'xml').
    #[arg(long, env = "ODRECORD_FORMAT", default_value = "json")]
    format: AnnotationFormat,

    /// Subfolder of the dataset directory to scan (repeatable).
    #[arg(long = "subfolder")]
    subfolders: Vec<String>,
}

/// Arguments for the inspect subcommand.
#[derive(clap::Args)]
struct InspectArgs {
    /// Record file to inspect.
    input: PathBuf,
}

/// Arguments for the projects subcommand.
#[derive(clap::Args)]
struct ProjectsArgs {
    /// Root directory holding projects/.
    #[arg(long, env = "ODRECORD_ROOT", default_value = ".")]
    root: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum SettingsAction {
    /// Print the current settings.
    Show,
    /// Write default settings for a new project.
    Init,
}

/// Arguments for the settings subcommand.
#[derive(clap::Args)]
struct SettingsArgs {
    #[arg(value_enum)]
    action: SettingsAction,

    /// Project name.
    #[arg(long)]
    project: String,

    /// Root directory holding projects/.
    #[arg(long, env = "ODRECORD_ROOT", default_value = ".")]
    root: PathBuf,

    /// Overwrite an existing setting.json on init.
    #[arg(long)]
    force: bool,

    /// Comma separated labels written on init (e.g. "cat,dog").
    #[arg(long)]
    labels: Option<String>,
}

/// Arguments for the train and export subcommands.
#[derive(clap::Args)]
struct JobArgs {
    /// Project name.
    #[arg(long)]
    project: String,

    /// Task name (default: the TFRecord entry of setting.json).
    #[arg(long)]
    task: Option<String>,

    /// Root directory holding projects/, models/ and the scripts.
    #[arg(long, env = "ODRECORD_ROOT", default_value = ".")]
    root: PathBuf,

    /// Python interpreter used to run the scripts.
    #[arg(long, env = "ODRECORD_PYTHON", default_value = "python")]
    python: String,

    /// Directory holding model_main_tf2.py and exporter_main_v2.py.
    #[arg(long, env = "ODRECORD_SCRIPT_DIR", default_value = "script")]
    script_dir: PathBuf,
}

impl JobArgs {
    fn options(&self) -> JobOptions {
        JobOptions {
            python: self.python.clone(),
            script_dir: self.script_dir.clone(),
        }
    }
}

/// Run the odrecord CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), RecordError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Convert(args)) => run_convert(args),
        Some(Commands::Record(args)) => run_record(args),
        Some(Commands::Inspect(args)) => run_inspect(args),
        Some(Commands::Projects(args)) => run_projects(args),
        Some(Commands::Settings(args)) => run_settings(args),
        Some(Commands::Train(args)) => run_train(args),
        Some(Commands::Export(args)) => run_export(args),
        None => {
            println!("odrecord {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Convert object detection datasets into TFRecord training files.");
            println!();
            println!("Run 'odrecord --help' for usage information.");
            Ok(())
        }
    }
}

/// Execute the convert subcommand.
fn run_convert(args: ConvertArgs) -> Result<(), RecordError> {
    let (train_dir, test_dir, output_dir, format) = match &args.project {
        Some(project) => {
            let layout = ProjectLayout::new(&args.root, project)?;
            let settings = if args.format.is_none() || args.task.is_none() {
                Some(layout.load_settings()?)
            } else {
                None
            };
            let task = resolve_task(args.task.as_deref(), settings.as_ref(), &layout)?;
            let format = args
                .format
                .or(settings.map(|s| s.required.format))
                .unwrap_or_default();
            (
                layout.dataset_dir(Split::Train),
                layout.dataset_dir(Split::Test),
                layout.tfrecord_dir(&task)?,
                format,
            )
        }
        None => match (args.train_dir, args.test_dir, args.output_dir) {
            (Some(train), Some(test), Some(output)) => {
                (train, test, output, args.format.unwrap_or_default())
            }
            _ => {
                return Err(RecordError::DatasetLayout {
                    path: PathBuf::from("."),
                    message: "--train-dir, --test-dir and --output-dir are required without --project"
                        .to_string(),
                })
            }
        },
    };

    let mut run = ConversionRun::new(&output_dir, format);
    if !args.subfolders.is_empty() {
        run = run.with_subfolders(args.subfolders);
    }

    let (trained, train_summary) = run.train(&train_dir, &mut |_| {})?;
    print!("{train_summary}");
    let (label_map, test_summary) = trained.test(&test_dir, &mut |_| {})?;
    print!("{test_summary}");

    println!(
        "✓ Converted {} example(s) with {} label(s) into {}",
        train_summary.examples + test_summary.examples,
        label_map.len(),
        output_dir.display()
    );
    Ok(())
}

/// Execute the record subcommand.
fn run_record(args: RecordArgs) -> Result<(), RecordError> {
    let split = Split::from(args.split);
    let default_map = args.output_dir.join(LABEL_MAP_FILE_NAME);
    let mut label_map = match (&args.label_map, split) {
        (Some(path), _) => read_label_map(path)?,
        (None, Split::Test) if default_map.is_file() => read_label_map(&default_map)?,
        (None, Split::Test) => {
            return Err(RecordError::DatasetLayout {
                path: default_map,
                message: "the test split needs the label map of the train split".to_string(),
            })
        }
        (None, Split::Train) => LabelMap::new(),
    };
    info!("Starting from {} known label(s)", label_map.len());

    let mut job = RecordJob::new(&args.dataset_dir, &args.output_dir, args.format);
    if !args.subfolders.is_empty() {
        job = job.with_subfolders(args.subfolders);
    }

    let summary = generate_record(&job, &mut label_map, split, &mut |_| {})?;
    print!("{summary}");
    Ok(())
}

/// Execute the inspect subcommand.
fn run_inspect(args: InspectArgs) -> Result<(), RecordError> {
    let summary = inspect::inspect_record(&args.input)?;
    print!("{summary}");
    Ok(())
}

/// Execute the projects subcommand.
fn run_projects(args: ProjectsArgs) -> Result<(), RecordError> {
    let names = project_names(&args.root)?;
    if names.is_empty() {
        println!("No projects under {}", args.root.join("projects").display());
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

/// Execute the settings subcommand.
fn run_settings(args: SettingsArgs) -> Result<(), RecordError> {
    let layout = ProjectLayout::new(&args.root, &args.project)?;
    let path = layout.settings_path();

    match args.action {
        SettingsAction::Show => {
            let settings = layout.load_settings()?;
            let json = serde_json::to_string_pretty(&settings)
                .map_err(|source| RecordError::SettingsWrite { path, source })?;
            println!("{json}");
        }
        SettingsAction::Init => {
            let project_dir = layout.project_dir();
            if !project_dir.is_dir() {
                return Err(RecordError::DatasetLayout {
                    path: project_dir,
                    message: "project directory does not exist".to_string(),
                });
            }
            if path.exists() && !args.force {
                return Err(RecordError::DatasetLayout {
                    path,
                    message: "settings already exist (use --force to overwrite)".to_string(),
                });
            }
            let mut settings = ProjectSettings::scaffold();
            if let Some(labels) = &args.labels {
                settings.set_labels_csv(labels);
            }
            save_settings(&path, &settings)?;
            println!("✓ Wrote {}", path.display());
        }
    }
    Ok(())
}

/// Execute the train subcommand.
fn run_train(args: JobArgs) -> Result<(), RecordError> {
    let layout = ProjectLayout::new(&args.root, &args.project)?;
    let settings = layout.load_settings()?;
    let task = resolve_task(args.task.as_deref(), Some(&settings), &layout)?;

    job::run_train(
        &ProcessRunner,
        &layout,
        &task,
        &settings,
        &args.options(),
        &mut print_event,
    )?;
    println!("✓ Training of '{task}' finished");
    Ok(())
}

/// Execute the export subcommand.
fn run_export(args: JobArgs) -> Result<(), RecordError> {
    let layout = ProjectLayout::new(&args.root, &args.project)?;
    let task = match args.task.as_deref() {
        Some(task) => task.to_string(),
        None => resolve_task(None, Some(&layout.load_settings()?), &layout)?,
    };

    let copied = job::run_export(
        &ProcessRunner,
        &layout,
        &task,
        &args.options(),
        &mut print_event,
    )?;
    println!("✓ Export of '{task}' finished; label map at {}", copied.display());
    Ok(())
}

fn resolve_task(
    task: Option<&str>,
    settings: Option<&ProjectSettings>,
    layout: &ProjectLayout,
) -> Result<String, RecordError> {
    match (task, settings) {
        (Some(task), _) => Ok(task.to_string()),
        (None, Some(settings)) if !settings.required.task.is_empty() => {
            Ok(settings.required.task.clone())
        }
        _ => Err(RecordError::DatasetLayout {
            path: layout.settings_path(),
            message: "no task given and setting.json has no TFRecord entry".to_string(),
        }),
    }
}

fn print_event(event: &JobEvent) {
    match event {
        JobEvent::Stdout(line) => println!("{line}"),
        JobEvent::Stderr(line) => eprintln!("{line}"),
    }
}
