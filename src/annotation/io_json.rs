//! LabelMe-style JSON annotation reader.
//!
//! Each JSON file describes one image:
//!
//! ```json
//! {
//!   "imagePath": "img001.jpg",
//!   "shapes": [
//!     { "label": "cat", "points": [[10, 20], [110, 220]] }
//!   ]
//! }
//! ```
//!
//! The first two points of a shape are taken as the top-left and
//! bottom-right corners of the box. Any further points and any other keys
//! (`imageData`, `flags`, `shape_type`, ...) are ignored.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use super::bbox::BBox;
use super::model::{LabeledBox, ParsedAnnotation};
use crate::error::RecordError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonAnnotationFile {
    image_path: String,
    shapes: Vec<JsonShape>,
}

#[derive(Debug, Deserialize)]
struct JsonShape {
    label: String,
    points: Vec<[f64; 2]>,
}

/// Reads one JSON annotation file.
pub fn read_json_annotation(path: &Path) -> Result<ParsedAnnotation, RecordError> {
    let file = File::open(path).map_err(|source| RecordError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    let raw: JsonAnnotationFile =
        serde_json::from_reader(reader).map_err(|source| RecordError::MalformedAnnotation {
            path: path.to_path_buf(),
            message: source.to_string(),
        })?;

    json_to_parsed(raw, path)
}

/// Parses a JSON annotation from a string.
///
/// Useful for testing without file I/O.
pub fn from_json_str(json: &str) -> Result<ParsedAnnotation, RecordError> {
    from_json_slice(json.as_bytes())
}

/// Parses a JSON annotation from bytes.
pub fn from_json_slice(bytes: &[u8]) -> Result<ParsedAnnotation, RecordError> {
    let path = Path::new("<memory>");
    let raw: JsonAnnotationFile =
        serde_json::from_slice(bytes).map_err(|source| RecordError::MalformedAnnotation {
            path: path.to_path_buf(),
            message: source.to_string(),
        })?;

    json_to_parsed(raw, path)
}

fn json_to_parsed(raw: JsonAnnotationFile, path: &Path) -> Result<ParsedAnnotation, RecordError> {
    let mut objects = Vec::with_capacity(raw.shapes.len());

    for (index, shape) in raw.shapes.into_iter().enumerate() {
        if shape.label.is_empty() {
            return Err(RecordError::MalformedAnnotation {
                path: path.to_path_buf(),
                message: format!("shape #{index} has an empty label"),
            });
        }

        let (top_left, bottom_right) = match shape.points.as_slice() {
            [first, second, ..] => (*first, *second),
            points => {
                return Err(RecordError::MalformedAnnotation {
                    path: path.to_path_buf(),
                    message: format!(
                        "shape #{index} ('{}') has {} point(s); expected two corners",
                        shape.label,
                        points.len()
                    ),
                });
            }
        };

        objects.push(LabeledBox {
            label: shape.label,
            bbox: BBox::from_corners(top_left, bottom_right),
        });
    }

    Ok(ParsedAnnotation {
        filename: raw.image_path,
        objects,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shapes_in_order() {
        let json = r#"{
            "version": "5.2.1",
            "flags": {},
            "imagePath": "img001.jpg",
            "imageData": null,
            "shapes": [
                {"label": "cat", "points": [[10, 20], [110, 220]], "shape_type": "rectangle"},
                {"label": "dog", "points": [[1.5, 2.5], [3.5, 4.5]]}
            ]
        }"#;

        let parsed = from_json_str(json).expect("parse json");
        assert_eq!(parsed.filename, "img001.jpg");
        assert_eq!(parsed.labels().collect::<Vec<_>>(), vec!["cat", "dog"]);
        assert_eq!(parsed.objects[0].bbox, BBox::from_xyxy(10.0, 20.0, 110.0, 220.0));
        assert_eq!(parsed.objects[1].bbox, BBox::from_xyxy(1.5, 2.5, 3.5, 4.5));
    }

    #[test]
    fn empty_shapes_is_legal() {
        let parsed = from_json_str(r#"{"imagePath": "a.jpg", "shapes": []}"#).expect("parse");
        assert!(parsed.objects.is_empty());
    }

    #[test]
    fn missing_image_path_is_malformed() {
        let err = from_json_str(r#"{"shapes": []}"#).unwrap_err();
        match err {
            RecordError::MalformedAnnotation { message, .. } => {
                assert!(message.contains("imagePath"), "{message}")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_shapes_is_malformed() {
        let err = from_json_str(r#"{"imagePath": "a.jpg"}"#).unwrap_err();
        assert!(matches!(err, RecordError::MalformedAnnotation { .. }));
    }

    #[test]
    fn single_point_is_malformed() {
        let err = from_json_str(
            r#"{"imagePath": "a.jpg", "shapes": [{"label": "cat", "points": [[1, 2]]}]}"#,
        )
        .unwrap_err();
        match err {
            RecordError::MalformedAnnotation { message, .. } => {
                assert!(message.contains("1 point(s)"), "{message}")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_pair_points_are_malformed() {
        let err = from_json_str(
            r#"{"imagePath": "a.jpg", "shapes": [{"label": "cat", "points": [[1, 2, 3], [4, 5, 6]]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RecordError::MalformedAnnotation { .. }));
    }

    #[test]
    fn empty_label_is_malformed() {
        let err = from_json_str(
            r#"{"imagePath": "a.jpg", "shapes": [{"label": "", "points": [[1, 2], [3, 4]]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RecordError::MalformedAnnotation { .. }));
    }
}
