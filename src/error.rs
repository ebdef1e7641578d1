use std::path::PathBuf;
use thiserror::Error;

/// The main error type for odrecord operations.
///
/// Every variant aborts the conversion pass it occurs in; nothing is
/// skipped and retried.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read image {path}: {message}")]
    ImageRead { path: PathBuf, message: String },

    #[error("Image {path} is {format}, expected JPEG")]
    UnsupportedImageFormat { path: PathBuf, format: String },

    #[error("Malformed annotation in {path}: {message}")]
    MalformedAnnotation { path: PathBuf, message: String },

    #[error("Corrupt record file {path}: {message}")]
    RecordCorrupt { path: PathBuf, message: String },

    #[error("Failed to decode example #{index} in {path}: {source}")]
    ExampleDecode {
        path: PathBuf,
        index: usize,
        #[source]
        source: prost::DecodeError,
    },

    #[error("Invalid label map {path}: {message}")]
    LabelMapParse { path: PathBuf, message: String },

    #[error("Failed to parse settings from {path}: {source}")]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write settings to {path}: {source}")]
    SettingsWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid dataset layout at {path}: {message}")]
    DatasetLayout { path: PathBuf, message: String },

    #[error("Failed to start '{program}': {source}")]
    JobSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {status}")]
    JobFailed { program: String, status: String },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}
