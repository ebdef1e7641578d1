//! TFRecord output: example schema, framing and the streaming writer.

pub mod detection;
pub mod example;
pub mod tfrecord;
mod writer;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use prost::Message;

pub use detection::{encode_example, DecodedBox, DetectionExample};
pub use example::{Example, Feature};
pub use tfrecord::{masked_crc32c, TfRecordReader, TfRecordWriter};
pub use writer::{write_records, Progress, WriteStats, PROGRESS_INTERVAL};

use crate::error::RecordError;

/// Opens a record file for sequential reading.
pub fn open_record_file(path: &Path) -> Result<TfRecordReader<BufReader<File>>, RecordError> {
    let file = File::open(path).map_err(|source| RecordError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(TfRecordReader::new(BufReader::new(file), path))
}

/// Reads and decodes every detection example in `path`.
pub fn read_examples(path: &Path) -> Result<Vec<DetectionExample>, RecordError> {
    open_record_file(path)?
        .enumerate()
        .map(|(index, payload)| decode_example(&payload?, index, path))
        .collect()
}

/// Decodes the payload of record `index` in `path`.
pub fn decode_example(
    payload: &[u8],
    index: usize,
    path: &Path,
) -> Result<DetectionExample, RecordError> {
    let example = Example::decode(payload).map_err(|source| RecordError::ExampleDecode {
        path: path.to_path_buf(),
        index,
        source,
    })?;
    DetectionExample::from_example(&example).map_err(|message| RecordError::RecordCorrupt {
        path: path.to_path_buf(),
        message: format!("example #{index}: {message}"),
    })
}
