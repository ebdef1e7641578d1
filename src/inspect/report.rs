//! Record summary types and terminal formatting.

use std::fmt;
use std::path::PathBuf;

/// The result of inspecting a record file.
#[derive(Clone, Debug)]
pub struct RecordSummary {
    /// The inspected file.
    pub path: PathBuf,
    /// Number of examples in the file.
    pub examples: usize,
    /// Total number of boxes across all examples.
    pub boxes: usize,
    /// Examples that carry no boxes.
    pub empty_examples: usize,
    /// Boxes with at least one coordinate outside `[0, 1]`.
    pub out_of_range: usize,
    /// Box counts per label, sorted by count descending then name.
    pub labels: Vec<LabelCount>,
}

/// A single label with its box count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelCount {
    pub label: String,
    pub id: i64,
    pub count: usize,
}

impl fmt::Display for RecordSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Record: {}", self.path.display())?;
        writeln!(f)?;
        writeln!(f, "  Examples:        {:>8}", format_number(self.examples))?;
        writeln!(f, "  Boxes:           {:>8}", format_number(self.boxes))?;
        writeln!(
            f,
            "  Without boxes:   {:>8}  ({})",
            format_number(self.empty_examples),
            fmt_percent(self.empty_examples, self.examples)
        )?;
        writeln!(f)?;

        if self.labels.is_empty() {
            writeln!(f, "  No labels found.")?;
        } else {
            writeln!(f, "  Labels ({}):", self.labels.len())?;
            for entry in &self.labels {
                writeln!(
                    f,
                    "    {:>4}  {:<20} {:>8}  {:>6}",
                    entry.id,
                    truncate_label(&entry.label, 20),
                    format_number(entry.count),
                    fmt_percent(entry.count, self.boxes)
                )?;
            }
        }
        writeln!(f)?;

        if self.out_of_range > 0 {
            writeln!(
                f,
                "  ⚠ Boxes outside [0, 1]: {} / {} ({})",
                format_number(self.out_of_range),
                format_number(self.boxes),
                fmt_percent(self.out_of_range, self.boxes)
            )?;
        } else {
            writeln!(f, "  ✓ All boxes within [0, 1]")?;
        }

        Ok(())
    }
}

/// Format a number with thousands separators.
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

fn fmt_percent(numerator: usize, denominator: usize) -> String {
    if denominator == 0 {
        "n/a".to_string()
    } else {
        format!("{:.1}%", (numerator as f64 / denominator as f64) * 100.0)
    }
}

fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        label.to_string()
    } else {
        let kept: String = label.chars().take(max_chars - 1).collect();
        format!("{kept}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_truncate_label_counts_chars() {
        assert_eq!(truncate_label("short", 10), "short");
        assert_eq!(truncate_label("ééééééééééé", 5), "éééé…");
    }

    #[test]
    fn test_display_output() {
        let summary = RecordSummary {
            path: PathBuf::from("out/train.record"),
            examples: 2,
            boxes: 3,
            empty_examples: 0,
            out_of_range: 1,
            labels: vec![
                LabelCount {
                    label: "dog".into(),
                    id: 2,
                    count: 2,
                },
                LabelCount {
                    label: "cat".into(),
                    id: 1,
                    count: 1,
                },
            ],
        };

        let output = summary.to_string();
        assert!(output.contains("out/train.record"));
        assert!(output.contains("Labels (2)"));
        assert!(output.contains("dog"));
        assert!(output.contains("Boxes outside [0, 1]: 1 / 3"));
    }
}
