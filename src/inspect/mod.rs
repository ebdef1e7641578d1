//! Record file inspection.
//!
//! Reads a record file back and summarizes what it contains: example and
//! box counts, the label distribution, and boxes whose normalized
//! coordinates fall outside `[0, 1]`.

mod report;

pub use report::{LabelCount, RecordSummary};

use std::collections::HashMap;
use std::path::Path;

use crate::error::RecordError;
use crate::record::{decode_example, open_record_file, DecodedBox, DetectionExample};

/// Inspect a record file and produce a summary.
pub fn inspect_record(path: &Path) -> Result<RecordSummary, RecordError> {
    let mut summary = Accumulator::default();

    for (index, payload) in open_record_file(path)?.enumerate() {
        let example = decode_example(&payload?, index, path)?;
        summary.add(&example);
    }

    Ok(summary.finish(path))
}

/// Summarize already decoded examples.
pub fn summarize_examples<'a, I>(path: &Path, examples: I) -> RecordSummary
where
    I: IntoIterator<Item = &'a DetectionExample>,
{
    let mut summary = Accumulator::default();
    for example in examples {
        summary.add(example);
    }
    summary.finish(path)
}

#[derive(Default)]
struct Accumulator {
    examples: usize,
    boxes: usize,
    empty_examples: usize,
    out_of_range: usize,
    labels: HashMap<(String, i64), usize>,
}

impl Accumulator {
    fn add(&mut self, example: &DetectionExample) {
        self.examples += 1;
        self.boxes += example.boxes.len();
        if example.boxes.is_empty() {
            self.empty_examples += 1;
        }

        for bbox in &example.boxes {
            if !bbox.bbox().is_within_unit() {
                self.out_of_range += 1;
            }
            *self
                .labels
                .entry((bbox.label.clone(), bbox.label_id))
                .or_insert(0) += 1;
        }
    }

    fn finish(self, path: &Path) -> RecordSummary {
        // Sort by count descending, then by name and id for deterministic output
        let mut labels: Vec<LabelCount> = self
            .labels
            .into_iter()
            .map(|((label, id), count)| LabelCount { label, id, count })
            .collect();
        labels.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.label.cmp(&b.label))
                .then_with(|| a.id.cmp(&b.id))
        });

        RecordSummary {
            path: path.to_path_buf(),
            examples: self.examples,
            boxes: self.boxes,
            empty_examples: self.empty_examples,
            out_of_range: self.out_of_range,
            labels,
        }
    }
}
