//! `pipeline.config` for a training task.
//!
//! The reference model's config is copied into `Models/<task>` with the
//! fields that depend on the project replaced:
//!
//! | block | field |
//! |---|---|
//! | `model.<architecture>` | `num_classes` |
//! | `train_config` | `batch_size`, `num_steps`, `fine_tune_checkpoint` |
//! | `train_input_reader`, `eval_input_reader` | `label_map_path` |
//! | `*_input_reader.tf_record_input_reader` | `input_path` |
//!
//! `fine_tune_checkpoint_type` and `use_bfloat16` are also set when the
//! project settings carry them. Fields missing from a block are appended
//! before its closing brace. The rest of the file, comments included, is
//! copied through untouched.
//!
//! The rewrite is line based: a block opens with `name {` on its own line
//! and closes with a lone `}`. Lines holding both braces are copied as is.
//! Paths are written relative to the layout root, where the trainer runs.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};
use tempfile::NamedTempFile;

use crate::error::RecordError;
use crate::label_map::read_label_map;
use crate::pipeline::Split;
use crate::project::{ProjectLayout, ProjectSettings, PIPELINE_CONFIG_FILE_NAME};

/// Matches any one block name.
const ANY: &str = "*";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigValue {
    Str(String),
    Int(u64),
    Bool(bool),
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Str(s) => {
                write!(f, "\"")?;
                for c in s.chars() {
                    match c {
                        '\\' => write!(f, "\\\\")?,
                        '"' => write!(f, "\\\"")?,
                        c => write!(f, "{c}")?,
                    }
                }
                write!(f, "\"")
            }
            ConfigValue::Int(n) => write!(f, "{n}"),
            ConfigValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// One field to set inside the block at `block`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigOverride {
    pub block: Vec<&'static str>,
    pub key: &'static str,
    pub value: ConfigValue,
}

impl ConfigOverride {
    fn new(block: &[&'static str], key: &'static str, value: ConfigValue) -> Self {
        Self {
            block: block.to_vec(),
            key,
            value,
        }
    }

    fn applies_to(&self, stack: &[String]) -> bool {
        self.block.len() == stack.len()
            && self
                .block
                .iter()
                .zip(stack)
                .all(|(want, have)| *want == ANY || want == have)
    }

    fn block_name(&self) -> String {
        self.block.join(".").replace(ANY, "<architecture>")
    }
}

/// The overrides for training `task` with `num_classes` classes.
pub fn training_overrides(
    layout: &ProjectLayout,
    task: &str,
    settings: &ProjectSettings,
    num_classes: usize,
) -> Result<Vec<ConfigOverride>, RecordError> {
    let model = &settings.required.model;
    let checkpoint = layout
        .reference_model_dir(model)?
        .join("checkpoint")
        .join("ckpt-0");
    let tfrecord = layout.tfrecord_dir(task)?;
    let label_map = root_relative(layout, &layout.label_map_path(task)?);
    let record = |split: Split| root_relative(layout, &tfrecord.join(split.record_file_name()));

    let train = &settings.optional;
    let mut overrides = vec![
        ConfigOverride::new(&["model", ANY], "num_classes", ConfigValue::Int(num_classes as u64)),
        ConfigOverride::new(&["train_config"], "batch_size", ConfigValue::Int(train.batch_size.into())),
        ConfigOverride::new(&["train_config"], "num_steps", ConfigValue::Int(train.num_steps)),
        ConfigOverride::new(
            &["train_config"],
            "fine_tune_checkpoint",
            root_relative(layout, &checkpoint),
        ),
    ];
    if let Some(kind) = &train.fine_tune_checkpoint_type {
        overrides.push(ConfigOverride::new(
            &["train_config"],
            "fine_tune_checkpoint_type",
            ConfigValue::Str(kind.clone()),
        ));
    }
    if let Some(enabled) = train.use_bfloat16 {
        overrides.push(ConfigOverride::new(
            &["train_config"],
            "use_bfloat16",
            ConfigValue::Bool(enabled),
        ));
    }
    for (reader, split) in [
        ("train_input_reader", Split::Train),
        ("eval_input_reader", Split::Test),
    ] {
        overrides.push(ConfigOverride::new(&[reader], "label_map_path", label_map.clone()));
        overrides.push(ConfigOverride::new(
            &[reader, "tf_record_input_reader"],
            "input_path",
            record(split),
        ));
    }
    Ok(overrides)
}

/// Applies `overrides` to the text of a pipeline config.
///
/// Every override's block must be present; repeated occurrences of an
/// overridden field collapse into one.
pub fn rewrite_pipeline_config(
    text: &str,
    overrides: &[ConfigOverride],
    path: &Path,
) -> Result<String, RecordError> {
    let mut out = String::with_capacity(text.len());
    let mut stack: Vec<String> = Vec::new();
    let mut applied = vec![false; overrides.len()];

    for (index, line) in text.lines().enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let trimmed = line.trim();
        let indent = &line[..line.len() - line.trim_start().len()];

        if trimmed.is_empty() || trimmed.starts_with('#') {
            push_line(&mut out, line);
        } else if trimmed == "}" {
            for (o, done) in overrides.iter().zip(applied.iter_mut()) {
                if !*done && o.applies_to(&stack) {
                    push_line(&mut out, &format!("{indent}  {}: {}", o.key, o.value));
                    *done = true;
                }
            }
            if stack.pop().is_none() {
                return Err(config_err(path, format!("line {}: unmatched '}}'", index + 1)));
            }
            push_line(&mut out, line);
        } else if let Some(name) = block_open(trimmed) {
            stack.push(name.to_string());
            push_line(&mut out, line);
        } else if let Some(key) = field_key(trimmed) {
            let mut matched = false;
            for (o, done) in overrides.iter().zip(applied.iter_mut()) {
                if o.key == key && o.applies_to(&stack) {
                    if !*done {
                        push_line(&mut out, &format!("{indent}{key}: {}", o.value));
                        *done = true;
                    }
                    matched = true;
                    break;
                }
            }
            if !matched {
                push_line(&mut out, line);
            }
        } else {
            push_line(&mut out, line);
        }
    }

    if let Some(open) = stack.last() {
        return Err(config_err(path, format!("block '{open}' is not closed")));
    }
    if let Some(missing) = overrides
        .iter()
        .zip(&applied)
        .find_map(|(o, done)| (!done).then_some(o))
    {
        return Err(config_err(
            path,
            format!("no '{}' block for '{}'", missing.block_name(), missing.key),
        ));
    }
    Ok(out)
}

/// Writes `Models/<task>/pipeline.config` from the reference model named in
/// `settings` and returns its path.
///
/// The task must already have been converted; its label map gives the
/// number of classes.
pub fn write_pipeline_config(
    layout: &ProjectLayout,
    task: &str,
    settings: &ProjectSettings,
) -> Result<PathBuf, RecordError> {
    let label_map_path = layout.label_map_path(task)?;
    if !label_map_path.is_file() {
        return Err(RecordError::DatasetLayout {
            path: label_map_path,
            message: "label map not found; convert the dataset first".to_string(),
        });
    }
    let num_classes = read_label_map(&label_map_path)?.len();

    let model = &settings.required.model;
    if model.is_empty() {
        return Err(RecordError::DatasetLayout {
            path: layout.settings_path(),
            message: "no reference model set in 'Model'".to_string(),
        });
    }
    let source = layout
        .reference_model_dir(model)?
        .join(PIPELINE_CONFIG_FILE_NAME);
    let text = fs::read_to_string(&source).map_err(|err| RecordError::Read {
        path: source.clone(),
        source: err,
    })?;

    let overrides = training_overrides(layout, task, settings, num_classes)?;
    let config = rewrite_pipeline_config(&text, &overrides, &source)?;
    for o in &overrides {
        debug!("{}.{} = {}", o.block_name(), o.key, o.value);
    }

    let target = layout.pipeline_config_path(task)?;
    let dir = layout.models_dir(task)?;
    let write_err = |source: std::io::Error| RecordError::OutputWrite {
        path: target.clone(),
        source,
    };
    fs::create_dir_all(&dir).map_err(write_err)?;
    let mut temp = NamedTempFile::new_in(&dir).map_err(write_err)?;
    temp.write_all(config.as_bytes()).map_err(write_err)?;
    temp.as_file().sync_all().map_err(write_err)?;
    temp.persist(&target).map_err(|e| write_err(e.error))?;

    info!(
        "Wrote {} from {} ({num_classes} class(es))",
        target.display(),
        source.display()
    );
    Ok(target)
}

/// Exercises the rewriter with the training field set on arbitrary input.
#[cfg(feature = "fuzzing")]
pub fn fuzz_rewrite_pipeline_config(input: &str) -> Result<String, RecordError> {
    let overrides = [
        ConfigOverride::new(&["model", ANY], "num_classes", ConfigValue::Int(3)),
        ConfigOverride::new(&["train_config"], "batch_size", ConfigValue::Int(1)),
        ConfigOverride::new(
            &["train_input_reader", "tf_record_input_reader"],
            "input_path",
            ConfigValue::Str("train.record".to_string()),
        ),
    ];
    rewrite_pipeline_config(input, &overrides, Path::new("<fuzz>"))
}

fn root_relative(layout: &ProjectLayout, path: &Path) -> ConfigValue {
    let shown = match path.strip_prefix(layout.root()) {
        Ok(rel) => Path::new(".").join(rel),
        Err(_) => path.to_path_buf(),
    };
    ConfigValue::Str(shown.to_string_lossy().replace('\\', "/"))
}

fn block_open(trimmed: &str) -> Option<&str> {
    let name = trimmed.strip_suffix('{')?.trim_end();
    let name = name.strip_suffix(':').unwrap_or(name).trim_end();
    is_ident(name).then_some(name)
}

fn field_key(trimmed: &str) -> Option<&str> {
    if trimmed.contains('{') || trimmed.contains('}') {
        return None;
    }
    let (key, _) = trimmed.split_once(':')?;
    let key = key.trim_end();
    is_ident(key).then_some(key)
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

fn config_err(path: &Path, message: String) -> RecordError {
    RecordError::DatasetLayout {
        path: path.to_path_buf(),
        message,
    }
}
