//! In-memory annotation types.
//!
//! A [`ParsedAnnotation`] is what a format reader produces from the
//! annotation file alone. Once the image next to it has been read, it
//! becomes an [`AnnotationRecord`] with normalized boxes.

use std::path::PathBuf;

use super::bbox::BBox;
use super::image::JpegImage;
use super::space::{Normalized, Pixel};

/// One labeled object in pixel space.
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledBox {
    /// Class name as written in the annotation file.
    pub label: String,
    /// Box corners in pixels.
    pub bbox: BBox<Pixel>,
}

/// The contents of one annotation file, independent of the image.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedAnnotation {
    /// Image name recorded in the annotation (`imagePath` / `<filename>`).
    pub filename: String,
    /// Objects in file order.
    pub objects: Vec<LabeledBox>,
}

impl ParsedAnnotation {
    /// Returns the object labels in file order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.objects.iter().map(|object| object.label.as_str())
    }
}

/// One image's ground truth, ready to be encoded.
///
/// `boxes` and `labels` always have the same length; both may be empty.
#[derive(Clone, Debug)]
pub struct AnnotationRecord {
    /// Resolved path of the JPEG the boxes refer to.
    pub image_path: PathBuf,
    /// Name stored as the example's filename and source id.
    pub filename: String,
    /// Raw image bytes and the dimensions read from them.
    pub image: JpegImage,
    pub boxes: Vec<BBox<Normalized>>,
    pub labels: Vec<String>,
}

impl AnnotationRecord {
    /// Normalizes `parsed` against the dimensions of `image`.
    pub fn new(parsed: ParsedAnnotation, image_path: PathBuf, image: JpegImage) -> Self {
        let width = f64::from(image.width);
        let height = f64::from(image.height);

        let (boxes, labels) = parsed
            .objects
            .into_iter()
            .map(|object| (object.bbox.to_normalized(width, height), object.label))
            .unzip();

        Self {
            image_path,
            filename: parsed.filename,
            image,
            boxes,
            labels,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_normalizes_against_image_dimensions() {
        let parsed = ParsedAnnotation {
            filename: "img.jpg".into(),
            objects: vec![
                LabeledBox {
                    label: "cat".into(),
                    bbox: BBox::from_xyxy(10.0, 20.0, 50.0, 40.0),
                },
                LabeledBox {
                    label: "dog".into(),
                    bbox: BBox::from_xyxy(0.0, 0.0, 100.0, 50.0),
                },
            ],
        };
        let image = JpegImage {
            bytes: vec![],
            width: 100,
            height: 50,
        };

        let record = AnnotationRecord::new(parsed, PathBuf::from("img.jpg"), image);
        assert_eq!(record.labels, vec!["cat", "dog"]);
        assert_eq!(record.boxes.len(), 2);
        assert_eq!(record.boxes[0].xmin, 0.1);
        assert_eq!(record.boxes[0].ymin, 0.4);
        assert_eq!(record.boxes[0].xmax, 0.5);
        assert_eq!(record.boxes[0].ymax, 0.8);
        assert_eq!(record.boxes[1].xmax, 1.0);
        assert_eq!(record.boxes[1].ymax, 1.0);
    }
}
