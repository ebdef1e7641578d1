#![allow(dead_code)]

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

/// Tolerance for normalized coordinates after the round trip through `f32`.
pub const EPS_NORMALIZED: f64 = 1e-6;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Short label names drawn from a small alphabet so that repeats are common.
pub fn arb_label() -> BoxedStrategy<String> {
    "[a-e]{1,2}".boxed()
}

/// Label names including the characters the text format has to escape.
pub fn arb_awkward_label() -> BoxedStrategy<String> {
    "[a-z \"\\\\'#{}:\\n\\r\\t\\x07]{1,12}".boxed()
}

/// Per-file label lists.
pub fn arb_files(max_files: usize, max_boxes: usize) -> BoxedStrategy<Vec<Vec<String>>> {
    prop::collection::vec(prop::collection::vec(arb_label(), 0..=max_boxes), 0..=max_files).boxed()
}

/// Image size and a pixel box inside it, as `(width, height, [x1, y1, x2, y2])`.
pub fn arb_box_in_image() -> BoxedStrategy<(u16, u16, [u16; 4])> {
    (1u16..=4000, 1u16..=4000)
        .prop_flat_map(|(width, height)| {
            (
                Just(width),
                Just(height),
                0..=width,
                0..=height,
                0..=width,
                0..=height,
            )
        })
        .prop_map(|(width, height, ax, ay, bx, by)| {
            (
                width,
                height,
                [ax.min(bx), ay.min(by), ax.max(bx), ay.max(by)],
            )
        })
        .boxed()
}
