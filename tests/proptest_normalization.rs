use std::fs;

use odrecord::annotation::{read_annotation, AnnotationFormat};
use odrecord::label_map::LabelMap;
use odrecord::record::{encode_example, DetectionExample};
use proptest::prelude::*;

mod common;
mod proptest_helpers;

use proptest_helpers::EPS_NORMALIZED;

fn close(actual: f32, expected: f64) -> bool {
    (f64::from(actual) - expected).abs() <= EPS_NORMALIZED
}

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn voc_boxes_are_divided_by_image_size(
        (width, height, [x1, y1, x2, y2]) in proptest_helpers::arb_box_in_image(),
    ) {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = common::write_voc_sample(
            temp.path(),
            "img",
            (width, height),
            &[("obj", [f64::from(x1), f64::from(y1), f64::from(x2), f64::from(y2)])],
        );

        let record = read_annotation(&path, AnnotationFormat::Xml).expect("read annotation");
        let ids = LabelMap::new().assign_all(&record.labels);
        let decoded = DetectionExample::from_example(&encode_example(&record, &ids))
            .expect("decode example");

        let (w, h) = (f64::from(width), f64::from(height));
        let b = &decoded.boxes[0];
        prop_assert!(close(b.xmin, f64::from(x1) / w), "xmin {} vs {}", b.xmin, f64::from(x1) / w);
        prop_assert!(close(b.ymin, f64::from(y1) / h), "ymin {} vs {}", b.ymin, f64::from(y1) / h);
        prop_assert!(close(b.xmax, f64::from(x2) / w), "xmax {} vs {}", b.xmax, f64::from(x2) / w);
        prop_assert!(close(b.ymax, f64::from(y2) / h), "ymax {} vs {}", b.ymax, f64::from(y2) / h);
        prop_assert!([b.xmin, b.ymin, b.xmax, b.ymax].iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn json_dimensions_come_from_the_image(
        (width, height, [x1, y1, x2, y2]) in proptest_helpers::arb_box_in_image(),
    ) {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = common::write_json_sample(
            temp.path(),
            "img",
            (width, height),
            &[("obj", [f64::from(x1), f64::from(y1), f64::from(x2), f64::from(y2)])],
        );
        // The sample claims a 1x1 image in its metadata; the JPEG header wins.
        prop_assert!(fs::read_to_string(&path).expect("read json").contains("\"imageWidth\": 1"));

        let record = read_annotation(&path, AnnotationFormat::Json).expect("read annotation");
        prop_assert_eq!((record.width(), record.height()), (u32::from(width), u32::from(height)));
        prop_assert_eq!(record.boxes.len(), 1);
        prop_assert_eq!(record.labels.clone(), vec!["obj".to_string()]);
    }
}
