//! Object detection examples in the TF Object Detection API layout.

use super::example::{Example, Feature};
use crate::annotation::{AnnotationRecord, BBox, Normalized, JPEG_FORMAT};
use crate::label_map::LabelId;

pub const HEIGHT: &str = "image/height";
pub const WIDTH: &str = "image/width";
pub const FILENAME: &str = "image/filename";
pub const SOURCE_ID: &str = "image/source_id";
pub const ENCODED: &str = "image/encoded";
pub const FORMAT: &str = "image/format";
pub const BBOX_XMIN: &str = "image/object/bbox/xmin";
pub const BBOX_XMAX: &str = "image/object/bbox/xmax";
pub const BBOX_YMIN: &str = "image/object/bbox/ymin";
pub const BBOX_YMAX: &str = "image/object/bbox/ymax";
pub const CLASS_TEXT: &str = "image/object/class/text";
pub const CLASS_LABEL: &str = "image/object/class/label";

/// Encodes one annotation record.
///
/// `label_ids` must be aligned with `record.labels`. Coordinates are
/// narrowed to `f32` (the `FloatList` element type) but otherwise written
/// as-is.
pub fn encode_example(record: &AnnotationRecord, label_ids: &[LabelId]) -> Example {
    debug_assert_eq!(record.labels.len(), label_ids.len());

    Example::from_features([
        (HEIGHT, Feature::int64(i64::from(record.height()))),
        (WIDTH, Feature::int64(i64::from(record.width()))),
        (FILENAME, Feature::bytes(record.filename.as_bytes())),
        (SOURCE_ID, Feature::bytes(record.filename.as_bytes())),
        (ENCODED, Feature::bytes(record.image.bytes.clone())),
        (FORMAT, Feature::bytes(JPEG_FORMAT)),
        (BBOX_XMIN, Feature::float_list(coords(record, |b| b.xmin))),
        (BBOX_XMAX, Feature::float_list(coords(record, |b| b.xmax))),
        (BBOX_YMIN, Feature::float_list(coords(record, |b| b.ymin))),
        (BBOX_YMAX, Feature::float_list(coords(record, |b| b.ymax))),
        (
            CLASS_TEXT,
            Feature::bytes_list(
                record
                    .labels
                    .iter()
                    .map(|label| label.as_bytes().to_vec())
                    .collect(),
            ),
        ),
        (
            CLASS_LABEL,
            Feature::int64_list(label_ids.iter().map(|id| i64::from(id.as_u32())).collect()),
        ),
    ])
}

fn coords(record: &AnnotationRecord, axis: impl Fn(&BBox<Normalized>) -> f64) -> Vec<f32> {
    record.boxes.iter().map(|b| axis(b) as f32).collect()
}

/// One box read back from an encoded example.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
    pub label: String,
    pub label_id: i64,
}

impl DecodedBox {
    /// The stored coordinates, widened back to `f64`.
    pub fn bbox(&self) -> BBox<Normalized> {
        BBox::from_xyxy(
            f64::from(self.xmin),
            f64::from(self.ymin),
            f64::from(self.xmax),
            f64::from(self.ymax),
        )
    }
}

/// Structured view of an encoded detection example.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionExample {
    pub filename: String,
    pub source_id: String,
    pub width: i64,
    pub height: i64,
    pub format: String,
    pub image_len: usize,
    pub boxes: Vec<DecodedBox>,
}

impl DetectionExample {
    /// Interprets `example` as a detection example.
    ///
    /// Returns a message describing the first missing or inconsistent
    /// feature.
    pub fn from_example(example: &Example) -> Result<Self, String> {
        let height = single_int(example, HEIGHT)?;
        let width = single_int(example, WIDTH)?;
        let filename = single_string(example, FILENAME)?;
        let source_id = single_string(example, SOURCE_ID)?;
        let format = single_string(example, FORMAT)?;
        let image_len = bytes_list(example, ENCODED)?
            .first()
            .map(Vec::len)
            .ok_or_else(|| format!("{ENCODED} is empty"))?;

        let xmin = float_list(example, BBOX_XMIN)?;
        let xmax = float_list(example, BBOX_XMAX)?;
        let ymin = float_list(example, BBOX_YMIN)?;
        let ymax = float_list(example, BBOX_YMAX)?;
        let text = bytes_list(example, CLASS_TEXT)?;
        let label = example
            .feature(CLASS_LABEL)
            .and_then(Feature::as_int64_list)
            .ok_or_else(|| format!("missing int64 feature {CLASS_LABEL}"))?;

        let count = xmin.len();
        if [xmax.len(), ymin.len(), ymax.len(), text.len(), label.len()]
            .iter()
            .any(|&len| len != count)
        {
            return Err(format!(
                "box lists have different lengths (xmin={}, xmax={}, ymin={}, ymax={}, text={}, label={})",
                count,
                xmax.len(),
                ymin.len(),
                ymax.len(),
                text.len(),
                label.len()
            ));
        }

        let boxes = (0..count)
            .map(|i| DecodedBox {
                xmin: xmin[i],
                ymin: ymin[i],
                xmax: xmax[i],
                ymax: ymax[i],
                label: String::from_utf8_lossy(&text[i]).into_owned(),
                label_id: label[i],
            })
            .collect();

        Ok(Self {
            filename,
            source_id,
            width,
            height,
            format,
            image_len,
            boxes,
        })
    }
}

fn single_int(example: &Example, key: &str) -> Result<i64, String> {
    match example.feature(key).and_then(Feature::as_int64_list) {
        Some([value]) => Ok(*value),
        Some(other) => Err(format!("{key} has {} values; expected 1", other.len())),
        None => Err(format!("missing int64 feature {key}")),
    }
}

fn single_string(example: &Example, key: &str) -> Result<String, String> {
    match bytes_list(example, key)? {
        [value] => Ok(String::from_utf8_lossy(value).into_owned()),
        other => Err(format!("{key} has {} values; expected 1", other.len())),
    }
}

fn bytes_list<'a>(example: &'a Example, key: &str) -> Result<&'a [Vec<u8>], String> {
    example
        .feature(key)
        .and_then(Feature::as_bytes_list)
        .ok_or_else(|| format!("missing bytes feature {key}"))
}

fn float_list<'a>(example: &'a Example, key: &str) -> Result<&'a [f32], String> {
    example
        .feature(key)
        .and_then(Feature::as_float_list)
        .ok_or_else(|| format!("missing float feature {key}"))
}
