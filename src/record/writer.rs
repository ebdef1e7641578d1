//! Streams annotation files into one record file.

use std::io::BufWriter;
use std::path::{Path, PathBuf};

use log::{debug, info};
use prost::Message;
use tempfile::NamedTempFile;

use super::detection::encode_example;
use super::tfrecord::TfRecordWriter;
use crate::annotation::{read_annotation, AnnotationFormat};
use crate::error::RecordError;
use crate::label_map::LabelMap;

/// Files between two progress signals.
pub const PROGRESS_INTERVAL: usize = 100;

/// Position of the writer within the current pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    /// Zero-based index of the file about to be processed.
    pub index: usize,
    /// Number of files in the pass.
    pub total: usize,
}

/// Counts produced by one [`write_records`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub examples: usize,
    pub boxes: usize,
}

/// Reads, encodes and writes every file in `files`, in order, to `output`.
///
/// Records go to a temporary file next to `output` that is renamed over it
/// only after the last example has been written and synced. On any error
/// the temporary file is removed and `output` is left untouched.
///
/// `progress` is called before files `0, 100, 200, ...`.
pub fn write_records(
    output: &Path,
    files: &[PathBuf],
    label_map: &mut LabelMap,
    format: AnnotationFormat,
    progress: &mut dyn FnMut(Progress),
) -> Result<WriteStats, RecordError> {
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let write_err = |source: std::io::Error| RecordError::OutputWrite {
        path: output.to_path_buf(),
        source,
    };

    let temp = NamedTempFile::new_in(dir).map_err(write_err)?;
    let mut writer = TfRecordWriter::new(BufWriter::new(temp));
    let mut stats = WriteStats::default();
    let total = files.len();

    for (index, file) in files.iter().enumerate() {
        if index % PROGRESS_INTERVAL == 0 {
            info!("On image {index} of {total}");
            progress(Progress { index, total });
        }

        let record = read_annotation(file, format)?;
        let label_ids = label_map.assign_all(&record.labels);
        debug!(
            "{}: {}x{}, {} box(es)",
            file.display(),
            record.width(),
            record.height(),
            record.boxes.len()
        );

        let example = encode_example(&record, &label_ids);
        writer
            .write_record(&example.encode_to_vec())
            .map_err(write_err)?;

        stats.boxes += record.boxes.len();
    }
    stats.examples = writer.records();

    let temp = writer
        .into_inner()
        .map_err(write_err)?
        .into_inner()
        .map_err(|e| write_err(e.into_error()))?;
    temp.as_file().sync_all().map_err(write_err)?;
    temp.persist(output).map_err(|e| write_err(e.error))?;

    Ok(stats)
}
