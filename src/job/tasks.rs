//! Trainer and exporter invocations for a project task.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use super::pipeline_config::write_pipeline_config;
use super::{drive, JobEvent, JobOutcome, JobRunner, JobSpec};
use crate::error::RecordError;
use crate::label_map::read_label_map;
use crate::pipeline::LABEL_MAP_FILE_NAME;
use crate::project::{ProjectLayout, ProjectSettings};

pub const TRAIN_SCRIPT: &str = "model_main_tf2.py";
pub const EXPORT_SCRIPT: &str = "exporter_main_v2.py";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobOptions {
    /// Interpreter used to run the scripts.
    pub python: String,
    /// Directory holding the scripts; relative paths are taken from the
    /// layout root.
    pub script_dir: PathBuf,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            python: "python".to_string(),
            script_dir: PathBuf::from("script"),
        }
    }
}

impl JobOptions {
    fn script(&self, layout: &ProjectLayout, name: &str) -> PathBuf {
        layout.root().join(&self.script_dir).join(name)
    }
}

/// A ready-to-run training job.
#[derive(Clone, Debug)]
pub struct TrainPlan {
    pub spec: JobSpec,
    pub label_map_path: PathBuf,
    /// Number of classes in the task's label map.
    pub num_classes: usize,
}

/// Builds the training invocation for `task`.
///
/// The task must already have been converted: its label map is read to
/// count the classes, and `Models/<task>/pipeline.config` must exist
/// (see [`write_pipeline_config`]).
pub fn train_job(
    layout: &ProjectLayout,
    task: &str,
    settings: &ProjectSettings,
    options: &JobOptions,
) -> Result<TrainPlan, RecordError> {
    let label_map_path = layout.label_map_path(task)?;
    require_file(&label_map_path, "label map not found; convert the dataset first")?;
    let label_map = read_label_map(&label_map_path)?;
    info!(
        "Task '{task}' has {} class(es) in {}",
        label_map.len(),
        label_map_path.display()
    );

    if !settings.required.labels.is_empty() {
        let configured: BTreeSet<&str> =
            settings.required.labels.iter().map(String::as_str).collect();
        let converted: BTreeSet<&str> = label_map.iter().map(|(name, _)| name).collect();
        if configured != converted {
            warn!(
                "labels in {} ({}) differ from the converted label map ({})",
                layout.settings_path().display(),
                configured.into_iter().collect::<Vec<_>>().join(", "),
                converted.into_iter().collect::<Vec<_>>().join(", ")
            );
        }
    }

    let pipeline_config = layout.pipeline_config_path(task)?;
    require_file(&pipeline_config, "pipeline config not found")?;

    let spec = JobSpec::new(&options.python)
        .arg(options.script(layout, TRAIN_SCRIPT))
        .arg("--pipeline_config_path")
        .arg(pipeline_config)
        .arg("--model_dir")
        .arg(layout.checkpoint_dir(task)?)
        .arg("--checkpoint_every_n")
        .arg(settings.optional.checkpoint_every_n.to_string())
        .current_dir(layout.root());

    Ok(TrainPlan {
        spec,
        label_map_path,
        num_classes: label_map.len(),
    })
}

/// Builds the export invocation for `task`.
pub fn export_job(
    layout: &ProjectLayout,
    task: &str,
    options: &JobOptions,
) -> Result<JobSpec, RecordError> {
    Ok(JobSpec::new(&options.python)
        .arg(options.script(layout, EXPORT_SCRIPT))
        .arg("--trained_checkpoint_dir")
        .arg(layout.checkpoint_dir(task)?)
        .arg("--pipeline_config_path")
        .arg(layout.pipeline_config_path(task)?)
        .arg("--output_directory")
        .arg(layout.models_dir(task)?)
        .current_dir(layout.root()))
}

/// Copies the task's label map next to the exported model.
pub fn finish_export(layout: &ProjectLayout, task: &str) -> Result<PathBuf, RecordError> {
    let label_map = layout.label_map_path(task)?;
    let target = layout.models_dir(task)?.join(LABEL_MAP_FILE_NAME);
    require_file(&label_map, "label map not found")?;
    fs::copy(&label_map, &target).map_err(|source| RecordError::OutputWrite {
        path: target.clone(),
        source,
    })?;
    Ok(target)
}

/// Writes the task's `pipeline.config` from the reference model, then trains
/// `task`, forwarding the trainer's output to `on_event`.
pub fn run_train(
    runner: &dyn JobRunner,
    layout: &ProjectLayout,
    task: &str,
    settings: &ProjectSettings,
    options: &JobOptions,
    on_event: &mut dyn FnMut(&JobEvent),
) -> Result<JobOutcome, RecordError> {
    write_pipeline_config(layout, task, settings)?;
    let plan = train_job(layout, task, settings, options)?;
    info!("Starting training: {}", plan.spec.display());
    let outcome = drive(runner.submit(&plan.spec)?, on_event)?;
    info!("Training of '{task}' finished");
    Ok(outcome)
}

/// Exports `task` and copies its label map into `Models/<task>`.
pub fn run_export(
    runner: &dyn JobRunner,
    layout: &ProjectLayout,
    task: &str,
    options: &JobOptions,
    on_event: &mut dyn FnMut(&JobEvent),
) -> Result<PathBuf, RecordError> {
    let spec = export_job(layout, task, options)?;
    info!("Starting export: {}", spec.display());
    drive(runner.submit(&spec)?, on_event)?;
    let copied = finish_export(layout, task)?;
    info!("Export of '{task}' finished; label map copied to {}", copied.display());
    Ok(copied)
}

fn require_file(path: &Path, message: &str) -> Result<(), RecordError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(RecordError::DatasetLayout {
            path: path.to_path_buf(),
            message: message.to_string(),
        })
    }
}
