//! `setting.json`: per-project training configuration.
//!
//! ```json
//! {
//!   "required": { "Model": "...", "format": "json", "TFRecord": "...", "labels": [] },
//!   "optional": { "batch_size": 3, "num_steps": 90000, "checkpoint_every_n": 10000 }
//! }
//! ```

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::annotation::AnnotationFormat;
use crate::error::RecordError;

pub const SETTINGS_FILE_NAME: &str = "setting.json";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSettings {
    pub required: RequiredSettings,
    #[serde(default)]
    pub optional: OptionalSettings,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RequiredSettings {
    /// Reference model directory name under `models/`.
    #[serde(rename = "Model", default)]
    pub model: String,
    #[serde(default)]
    pub format: AnnotationFormat,
    /// Task name; selects `TFRecord/<task>`, `Checkpoint/<task>` and `Models/<task>`.
    #[serde(rename = "TFRecord", default)]
    pub task: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionalSettings {
    pub batch_size: u32,
    pub num_steps: u64,
    pub checkpoint_every_n: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fine_tune_checkpoint_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_bfloat16: Option<bool>,
}

impl Default for OptionalSettings {
    fn default() -> Self {
        Self {
            batch_size: 3,
            num_steps: 90_000,
            checkpoint_every_n: 10_000,
            fine_tune_checkpoint_type: None,
            use_bfloat16: None,
        }
    }
}

impl ProjectSettings {
    /// Settings written for a freshly created project.
    pub fn scaffold() -> Self {
        Self {
            required: RequiredSettings::default(),
            optional: OptionalSettings {
                fine_tune_checkpoint_type: Some("detection".to_string()),
                use_bfloat16: Some(false),
                ..OptionalSettings::default()
            },
        }
    }

    /// Sets `labels` from a comma separated list, trimming each entry.
    pub fn set_labels_csv(&mut self, labels: &str) {
        self.required.labels = labels
            .split(',')
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(str::to_string)
            .collect();
    }
}

pub fn load_settings(path: &Path) -> Result<ProjectSettings, RecordError> {
    let text = fs::read_to_string(path).map_err(|source| RecordError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    from_settings_str(&text, path)
}

pub fn from_settings_str(text: &str, path: &Path) -> Result<ProjectSettings, RecordError> {
    serde_json::from_str(text).map_err(|source| RecordError::SettingsParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes `settings` as indented JSON, replacing `path` atomically.
pub fn save_settings(path: &Path, settings: &ProjectSettings) -> Result<(), RecordError> {
    let json = serde_json::to_string_pretty(settings).map_err(|source| {
        RecordError::SettingsWrite {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let write_err = |source: std::io::Error| RecordError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(write_err)?;
    temp.write_all(json.as_bytes()).map_err(write_err)?;
    temp.write_all(b"\n").map_err(write_err)?;
    temp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
