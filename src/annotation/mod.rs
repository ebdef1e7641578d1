//! Annotation reading and normalization.
//!
//! Two on-disk formats are supported, each with one annotation file per
//! image and the JPEG stored next to it under the same stem:
//!
//! - [`AnnotationFormat::Json`]: LabelMe-style `imagePath` + `shapes`
//! - [`AnnotationFormat::Xml`]: Pascal VOC `<annotation>` documents
//!
//! [`read_annotation`] parses the file, reads the image header and normalizes the
//! boxes against the image's real dimensions. It never touches the label
//! map; id assignment happens afterwards, once the whole file has been read.

mod bbox;
pub mod image;
pub mod io_json;
pub mod io_voc_xml;
mod model;
mod space;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use bbox::BBox;
pub use image::{read_jpeg, JpegImage, JPEG_FORMAT};
pub use model::{AnnotationRecord, LabeledBox, ParsedAnnotation};
pub use space::{Normalized, Pixel};

use crate::error::RecordError;

/// Extension of the image expected next to every annotation file.
pub const IMAGE_EXTENSION: &str = "jpg";

/// Annotation file format of a dataset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationFormat {
    #[default]
    Json,
    Xml,
}

impl AnnotationFormat {
    /// File extension of annotation files in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            AnnotationFormat::Json => "json",
            AnnotationFormat::Xml => "xml",
        }
    }

    /// Returns true if `path` has this format's extension. The match is
    /// case-sensitive, like the `.jpg` lookup in [`read_annotation`].
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == self.extension())
    }

    /// Parses one annotation file without looking at the image.
    pub fn parse_file(&self, path: &Path) -> Result<ParsedAnnotation, RecordError> {
        match self {
            AnnotationFormat::Json => io_json::read_json_annotation(path),
            AnnotationFormat::Xml => io_voc_xml::read_voc_annotation(path),
        }
    }
}

impl fmt::Display for AnnotationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AnnotationFormat {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "labelme" => Ok(AnnotationFormat::Json),
            "xml" | "voc" => Ok(AnnotationFormat::Xml),
            other => Err(RecordError::UnsupportedFormat(format!(
                "'{other}' (supported: json, xml)"
            ))),
        }
    }
}

/// Reads one annotation unit: the annotation file at `path` and the `.jpg`
/// with the same stem.
pub fn read_annotation(
    path: &Path,
    format: AnnotationFormat,
) -> Result<AnnotationRecord, RecordError> {
    let parsed = format.parse_file(path)?;
    let image_path = path.with_extension(IMAGE_EXTENSION);
    let image = read_jpeg(&image_path)?;
    Ok(AnnotationRecord::new(parsed, image_path, image))
}
