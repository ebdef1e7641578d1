//! Dataset to record conversion.
//!
//! A full run is two passes over the same [`LabelMap`]: the train split
//! first, which assigns ids, then the test split, which reuses them.
//! [`generate_record`] runs one pass; [`ConversionRun`] runs both and only
//! hands out the test pass once the train pass has succeeded.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use walkdir::WalkDir;

use crate::annotation::AnnotationFormat;
use crate::error::RecordError;
use crate::label_map::{write_label_map, LabelMap};
use crate::record::{write_records, Progress};

/// Name of the label map sidecar written next to the record files.
pub const LABEL_MAP_FILE_NAME: &str = "label_map.pbtxt";

/// One of the two dataset subsets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }

    /// `train.record` or `test.record`.
    pub fn record_file_name(&self) -> String {
        format!("{}.record", self.name())
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a pass reads from and writes to.
#[derive(Clone, Debug)]
pub struct RecordJob {
    /// Directory holding the split's annotation files.
    pub dataset_root: PathBuf,
    /// Subdirectories of `dataset_root` to scan; `""` scans the root itself.
    pub subfolders: Vec<String>,
    /// Directory receiving the record and label map files.
    pub output_dir: PathBuf,
    pub format: AnnotationFormat,
}

impl RecordJob {
    pub fn new(
        dataset_root: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        format: AnnotationFormat,
    ) -> Self {
        Self {
            dataset_root: dataset_root.into(),
            subfolders: vec![String::new()],
            output_dir: output_dir.into(),
            format,
        }
    }

    pub fn with_subfolders(mut self, subfolders: Vec<String>) -> Self {
        self.subfolders = subfolders;
        self
    }
}

/// Outcome of one pass.
#[derive(Clone, Debug)]
pub struct SplitSummary {
    pub split: Split,
    pub record_path: PathBuf,
    /// Number of annotation files found (and examples written).
    pub examples: usize,
    pub boxes: usize,
    /// Labels that received their id during this pass.
    pub new_labels: Vec<String>,
    /// Set when the label map sidecar was (re)written by this pass.
    pub label_map_path: Option<PathBuf>,
}

impl fmt::Display for SplitSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} set: {} example(s), {} box(es) -> {}",
            self.split,
            self.examples,
            self.boxes,
            self.record_path.display()
        )?;
        if !self.new_labels.is_empty() {
            writeln!(f, "  new labels: {}", self.new_labels.join(", "))?;
        }
        if let Some(path) = &self.label_map_path {
            writeln!(f, "  label map: {}", path.display())?;
        }
        Ok(())
    }
}

/// Lists the annotation files of a split.
///
/// Each subfolder is walked recursively and its matches are sorted by path
/// relative to the subfolder; subfolders keep the order they were given in.
/// The order fixes the order in which label ids are assigned.
///
/// Symlinked files are read, symlinked directories are not descended into.
pub fn collect_annotation_files(
    dataset_root: &Path,
    subfolders: &[String],
    format: AnnotationFormat,
) -> Result<Vec<PathBuf>, RecordError> {
    let mut files = Vec::new();

    for subfolder in subfolders {
        let dir = if subfolder.is_empty() {
            dataset_root.to_path_buf()
        } else {
            dataset_root.join(subfolder)
        };

        if !dir.is_dir() {
            return Err(RecordError::DatasetLayout {
                path: dir,
                message: "dataset folder does not exist or is not a directory".to_string(),
            });
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(&dir) {
            let entry = entry.map_err(|source| RecordError::DatasetLayout {
                path: dir.clone(),
                message: format!("failed while traversing dataset folder: {source}"),
            })?;

            let is_file = entry.file_type().is_file()
                || (entry.path_is_symlink() && entry.path().is_file());
            if is_file && format.matches(entry.path()) {
                found.push(entry.into_path());
            }
        }

        found.sort_by_cached_key(|path| rel_string(&dir, path));
        files.extend(found);
    }

    Ok(files)
}

/// Converts one split into `<output_dir>/<split>.record`.
///
/// The train split always writes `label_map.pbtxt`. The test split keeps
/// using the ids in `label_map`; if it meets labels the train split never
/// had, they are appended, reported with a warning, and the sidecar is
/// rewritten so it covers every id present in either record file.
pub fn generate_record(
    job: &RecordJob,
    label_map: &mut LabelMap,
    split: Split,
    progress: &mut dyn FnMut(Progress),
) -> Result<SplitSummary, RecordError> {
    fs::create_dir_all(&job.output_dir).map_err(|source| RecordError::OutputWrite {
        path: job.output_dir.clone(),
        source,
    })?;

    let files = collect_annotation_files(&job.dataset_root, &job.subfolders, job.format)?;
    info!(
        "Found {} {} annotation file(s) for the {} set under {}",
        files.len(),
        job.format,
        split,
        job.dataset_root.display()
    );

    let record_path = job.output_dir.join(split.record_file_name());
    let mark = label_map.len();
    let stats = write_records(&record_path, &files, label_map, job.format, progress)?;
    let new_labels = label_map.names_since(mark).to_vec();

    let label_map_path = match split {
        Split::Train => Some(job.output_dir.join(LABEL_MAP_FILE_NAME)),
        Split::Test if !new_labels.is_empty() => {
            warn!(
                "{} label(s) appear only in the test set and were added to the label map: {}",
                new_labels.len(),
                new_labels.join(", ")
            );
            Some(job.output_dir.join(LABEL_MAP_FILE_NAME))
        }
        Split::Test => None,
    };
    if let Some(path) = &label_map_path {
        write_label_map(path, label_map)?;
    }

    info!("Finish generating {split} set tfrecord");

    Ok(SplitSummary {
        split,
        record_path,
        examples: stats.examples,
        boxes: stats.boxes,
        new_labels,
        label_map_path,
    })
}

/// A full conversion that has not run its train pass yet.
#[derive(Clone, Debug)]
pub struct ConversionRun {
    output_dir: PathBuf,
    format: AnnotationFormat,
    subfolders: Vec<String>,
    label_map: LabelMap,
}

/// A conversion whose train pass succeeded; only the test pass remains.
#[derive(Clone, Debug)]
pub struct TrainedRun {
    run: ConversionRun,
}

impl ConversionRun {
    pub fn new(output_dir: impl Into<PathBuf>, format: AnnotationFormat) -> Self {
        Self {
            output_dir: output_dir.into(),
            format,
            subfolders: vec![String::new()],
            label_map: LabelMap::new(),
        }
    }

    pub fn with_subfolders(mut self, subfolders: Vec<String>) -> Self {
        self.subfolders = subfolders;
        self
    }

    /// Starts numbering from an existing map instead of an empty one.
    pub fn with_label_map(mut self, label_map: LabelMap) -> Self {
        self.label_map = label_map;
        self
    }

    fn job(&self, dataset_root: &Path) -> RecordJob {
        RecordJob::new(dataset_root, &self.output_dir, self.format)
            .with_subfolders(self.subfolders.clone())
    }

    /// Runs the train pass.
    pub fn train(
        mut self,
        dataset_root: &Path,
        progress: &mut dyn FnMut(Progress),
    ) -> Result<(TrainedRun, SplitSummary), RecordError> {
        let job = self.job(dataset_root);
        let summary = generate_record(&job, &mut self.label_map, Split::Train, progress)?;
        Ok((TrainedRun { run: self }, summary))
    }
}

impl TrainedRun {
    /// Label ids assigned so far.
    pub fn label_map(&self) -> &LabelMap {
        &self.run.label_map
    }

    /// Runs the test pass and returns the final label map.
    pub fn test(
        mut self,
        dataset_root: &Path,
        progress: &mut dyn FnMut(Progress),
    ) -> Result<(LabelMap, SplitSummary), RecordError> {
        let job = self.run.job(dataset_root);
        let summary = generate_record(&job, &mut self.run.label_map, Split::Test, progress)?;
        Ok((self.run.label_map, summary))
    }
}

fn rel_string(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}
