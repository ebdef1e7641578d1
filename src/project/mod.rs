//! Conventional on-disk layout of a training project.
//!
//! ```text
//! <root>/
//!   datasets/<project>/{train,test}/
//!   projects/<project>/setting.json
//!   projects/<project>/{TFRecord,Checkpoint,Models}/<task>/
//!   models/<reference model>/
//! ```
//!
//! Paths are only computed here; nothing creates the directories.

pub mod settings;

pub use settings::{
    load_settings, save_settings, OptionalSettings, ProjectSettings, RequiredSettings,
    SETTINGS_FILE_NAME,
};

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::RecordError;
use crate::pipeline::{Split, LABEL_MAP_FILE_NAME};

pub const PIPELINE_CONFIG_FILE_NAME: &str = "pipeline.config";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
    project: String,
}

impl ProjectLayout {
    /// `project` must be a single non-empty path component.
    pub fn new(root: impl Into<PathBuf>, project: &str) -> Result<Self, RecordError> {
        let root = root.into();
        check_component(&root, "project", project)?;
        Ok(Self {
            root,
            project: project.to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn dataset_dir(&self, split: Split) -> PathBuf {
        self.root
            .join("datasets")
            .join(&self.project)
            .join(split.name())
    }

    pub fn project_dir(&self) -> PathBuf {
        self.root.join("projects").join(&self.project)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.project_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn tfrecord_dir(&self, task: &str) -> Result<PathBuf, RecordError> {
        self.task_dir("TFRecord", task)
    }

    pub fn checkpoint_dir(&self, task: &str) -> Result<PathBuf, RecordError> {
        self.task_dir("Checkpoint", task)
    }

    pub fn models_dir(&self, task: &str) -> Result<PathBuf, RecordError> {
        self.task_dir("Models", task)
    }

    /// `TFRecord/<task>/label_map.pbtxt`, as written by a conversion run.
    pub fn label_map_path(&self, task: &str) -> Result<PathBuf, RecordError> {
        Ok(self.tfrecord_dir(task)?.join(LABEL_MAP_FILE_NAME))
    }

    pub fn pipeline_config_path(&self, task: &str) -> Result<PathBuf, RecordError> {
        Ok(self.models_dir(task)?.join(PIPELINE_CONFIG_FILE_NAME))
    }

    /// Directory of a downloaded reference model.
    pub fn reference_model_dir(&self, model: &str) -> Result<PathBuf, RecordError> {
        let models = self.root.join("models");
        check_component(&models, "model", model)?;
        Ok(models.join(model))
    }

    pub fn load_settings(&self) -> Result<ProjectSettings, RecordError> {
        load_settings(&self.settings_path())
    }

    fn task_dir(&self, kind: &str, task: &str) -> Result<PathBuf, RecordError> {
        let base = self.project_dir().join(kind);
        check_component(&base, "task", task)?;
        Ok(base.join(task))
    }
}

/// Names of the projects under `<root>/projects` that carry a settings file,
/// sorted.
pub fn project_names(root: &Path) -> Result<Vec<String>, RecordError> {
    let projects = root.join("projects");
    if !projects.is_dir() {
        return Ok(Vec::new());
    }

    let read_err = |source| RecordError::Read {
        path: projects.clone(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(&projects).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        if entry.path().join(SETTINGS_FILE_NAME).is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

fn check_component(base: &Path, what: &str, name: &str) -> Result<(), RecordError> {
    let mut components = Path::new(name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    );
    if name.is_empty() || !single_normal {
        return Err(RecordError::DatasetLayout {
            path: base.to_path_buf(),
            message: format!("invalid {what} name '{name}'"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_conventional_paths() {
        let layout = ProjectLayout::new("/work", "pets").expect("layout");

        assert_eq!(
            layout.dataset_dir(Split::Train),
            PathBuf::from("/work/datasets/pets/train")
        );
        assert_eq!(
            layout.dataset_dir(Split::Test),
            PathBuf::from("/work/datasets/pets/test")
        );
        assert_eq!(
            layout.settings_path(),
            PathBuf::from("/work/projects/pets/setting.json")
        );
        assert_eq!(
            layout.label_map_path("v1").expect("path"),
            PathBuf::from("/work/projects/pets/TFRecord/v1/label_map.pbtxt")
        );
        assert_eq!(
            layout.checkpoint_dir("v1").expect("path"),
            PathBuf::from("/work/projects/pets/Checkpoint/v1")
        );
        assert_eq!(
            layout.pipeline_config_path("v1").expect("path"),
            PathBuf::from("/work/projects/pets/Models/v1/pipeline.config")
        );
        assert_eq!(
            layout.reference_model_dir("ssd").expect("path"),
            PathBuf::from("/work/models/ssd")
        );
    }

    #[test]
    fn rejects_names_that_escape_the_layout() {
        assert!(ProjectLayout::new("/work", "").is_err());
        assert!(ProjectLayout::new("/work", "..").is_err());
        assert!(ProjectLayout::new("/work", "a/b").is_err());

        let layout = ProjectLayout::new("/work", "pets").expect("layout");
        assert!(matches!(
            layout.tfrecord_dir("../other"),
            Err(RecordError::DatasetLayout { .. })
        ));
    }

    #[test]
    fn lists_projects_with_settings() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let projects = temp.path().join("projects");
        for name in ["b", "a", "no_settings"] {
            fs::create_dir_all(projects.join(name)).expect("create dir");
        }
        fs::write(projects.join("a").join(SETTINGS_FILE_NAME), "{}").expect("write");
        fs::write(projects.join("b").join(SETTINGS_FILE_NAME), "{}").expect("write");

        assert_eq!(project_names(temp.path()).expect("list"), vec!["a", "b"]);
    }

    #[test]
    fn no_projects_dir_is_empty() {
        let temp = tempfile::tempdir().expect("create temp dir");
        assert!(project_names(temp.path()).expect("list").is_empty());
    }
}
