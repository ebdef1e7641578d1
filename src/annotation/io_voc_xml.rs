//! Pascal VOC XML annotation reader.
//!
//! Only the fields the record needs are read: `<filename>` and, for each
//! `<object>`, its `<name>` and `<bndbox>` corners. `<size>` is ignored
//! because the dimensions are taken from the image itself. A document with
//! no `<object>` elements describes an image with no boxes.

use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::Node;

use super::bbox::BBox;
use super::model::{LabeledBox, ParsedAnnotation};
use crate::error::RecordError;

/// Reads one VOC XML annotation file.
pub fn read_voc_annotation(path: &Path) -> Result<ParsedAnnotation, RecordError> {
    let xml = fs::read_to_string(path).map_err(|source| RecordError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_voc_xml_str(&xml, path)
}

/// Parses VOC XML from a UTF-8 string.
///
/// Useful for testing/fuzzing without file I/O.
pub fn from_voc_xml_str(xml: &str) -> Result<ParsedAnnotation, RecordError> {
    parse_voc_xml_str(xml, Path::new("<memory>"))
}

/// Parses VOC XML from bytes.
///
/// The input must be valid UTF-8.
pub fn from_voc_xml_slice(bytes: &[u8]) -> Result<ParsedAnnotation, RecordError> {
    let xml = std::str::from_utf8(bytes).map_err(|source| RecordError::MalformedAnnotation {
        path: PathBuf::from("<memory>"),
        message: format!("input is not valid UTF-8: {source}"),
    })?;
    from_voc_xml_str(xml)
}

fn parse_voc_xml_str(xml: &str, path: &Path) -> Result<ParsedAnnotation, RecordError> {
    let document = roxmltree::Document::parse(xml).map_err(|source| malformed(path, source))?;

    let annotation = document.root_element();
    if annotation.tag_name().name() != "annotation" {
        return Err(malformed(path, "missing <annotation> root element"));
    }

    let filename = required_child_text(annotation, "filename", path, "<annotation>")?;

    let mut objects = Vec::new();
    for object in annotation
        .children()
        .filter(|node| node.is_element() && node.tag_name().name() == "object")
    {
        let label = required_child_text(object, "name", path, "<object>")?;
        let bndbox = child_element(object, "bndbox")
            .ok_or_else(|| malformed(path, format!("missing <bndbox> in <object> '{label}'")))?;

        let xmin = parse_required_f64(bndbox, "xmin", path)?;
        let ymin = parse_required_f64(bndbox, "ymin", path)?;
        let xmax = parse_required_f64(bndbox, "xmax", path)?;
        let ymax = parse_required_f64(bndbox, "ymax", path)?;

        let bbox = BBox::from_xyxy(xmin, ymin, xmax, ymax);
        if !bbox.is_finite() {
            return Err(malformed(
                path,
                format!("non-finite <bndbox> coordinate in <object> '{label}'"),
            ));
        }
        objects.push(LabeledBox { label, bbox });
    }

    Ok(ParsedAnnotation { filename, objects })
}

fn malformed(path: &Path, message: impl ToString) -> RecordError {
    RecordError::MalformedAnnotation {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

fn required_child_text(
    node: Node<'_, '_>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<String, RecordError> {
    optional_child_text(node, tag)
        .ok_or_else(|| malformed(path, format!("missing <{tag}> in {context}")))
}

fn parse_required_f64(node: Node<'_, '_>, tag: &str, path: &Path) -> Result<f64, RecordError> {
    let raw = required_child_text(node, tag, path, "<bndbox>")?;
    raw.parse::<f64>().map_err(|_| {
        malformed(
            path,
            format!("invalid <{tag}> value '{raw}' in <bndbox>; expected floating-point number"),
        )
    })
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == tag)
}

fn optional_child_text(node: Node<'_, '_>, tag: &str) -> Option<String> {
    child_element(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_objects_in_document_order() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<annotation>
  <folder>images</folder>
  <filename>img1.jpg</filename>
  <size><width>640</width><height>480</height><depth>3</depth></size>
  <object>
    <name>cat</name>
    <pose>Unspecified</pose>
    <bndbox><xmin>10</xmin><ymin>20</ymin><xmax>30</xmax><ymax>40</ymax></bndbox>
  </object>
  <object>
    <name>dog</name>
    <bndbox><xmin>1.5</xmin><ymin>2</ymin><xmax>3</xmax><ymax>4.25</ymax></bndbox>
  </object>
</annotation>"#;

        let parsed = from_voc_xml_str(xml).expect("parse xml");
        assert_eq!(parsed.filename, "img1.jpg");
        assert_eq!(parsed.labels().collect::<Vec<_>>(), vec!["cat", "dog"]);
        assert_eq!(parsed.objects[0].bbox, BBox::from_xyxy(10.0, 20.0, 30.0, 40.0));
        assert_eq!(parsed.objects[1].bbox, BBox::from_xyxy(1.5, 2.0, 3.0, 4.25));
    }

    #[test]
    fn no_objects_is_legal() {
        let xml = "<annotation><filename>empty.jpg</filename></annotation>";
        let parsed = from_voc_xml_str(xml).expect("parse xml");
        assert_eq!(parsed.filename, "empty.jpg");
        assert!(parsed.objects.is_empty());
    }

    #[test]
    fn missing_coordinate_is_malformed() {
        let xml = r#"<annotation><filename>a.jpg</filename>
  <object><name>cat</name><bndbox><xmin>1</xmin><ymin>2</ymin><xmax>3</xmax></bndbox></object>
</annotation>"#;
        let err = from_voc_xml_str(xml).unwrap_err();
        match err {
            RecordError::MalformedAnnotation { message, .. } => {
                assert!(message.contains("<ymax>"), "{message}")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_numeric_coordinate_is_malformed() {
        let xml = r#"<annotation><filename>a.jpg</filename>
  <object><name>cat</name><bndbox><xmin>left</xmin><ymin>2</ymin><xmax>3</xmax><ymax>4</ymax></bndbox></object>
</annotation>"#;
        assert!(matches!(
            from_voc_xml_str(xml),
            Err(RecordError::MalformedAnnotation { .. })
        ));
    }

    #[test]
    fn non_finite_coordinate_is_malformed() {
        for value in ["NaN", "inf", "-infinity"] {
            let xml = format!(
                "<annotation><filename>a.jpg</filename><object><name>cat</name>\
                 <bndbox><xmin>1</xmin><ymin>2</ymin><xmax>{value}</xmax><ymax>4</ymax></bndbox>\
                 </object></annotation>"
            );
            match from_voc_xml_str(&xml) {
                Err(RecordError::MalformedAnnotation { message, .. }) => {
                    assert!(message.contains("non-finite"), "{value}: {message}")
                }
                other => panic!("{value}: unexpected result {other:?}"),
            }
        }
    }

    #[test]
    fn missing_filename_is_malformed() {
        let xml = "<annotation><object><name>cat</name></object></annotation>";
        assert!(matches!(
            from_voc_xml_str(xml),
            Err(RecordError::MalformedAnnotation { .. })
        ));
    }

    #[test]
    fn wrong_root_is_malformed() {
        assert!(matches!(
            from_voc_xml_str("<dataset><filename>a.jpg</filename></dataset>"),
            Err(RecordError::MalformedAnnotation { .. })
        ));
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        assert!(matches!(
            from_voc_xml_slice(&[0xFF, 0xFE, 0x00]),
            Err(RecordError::MalformedAnnotation { .. })
        ));
    }
}
