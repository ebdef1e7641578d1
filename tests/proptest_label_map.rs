use std::collections::HashMap;

use odrecord::label_map::{from_pbtxt_str, to_pbtxt_string, LabelMap};
use proptest::prelude::*;

mod proptest_helpers;

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn ids_follow_first_occurrence(files in proptest_helpers::arb_files(8, 6)) {
        let mut map = LabelMap::new();
        let mut expected: Vec<String> = Vec::new();

        for labels in &files {
            let ids = map.assign_all(labels);
            prop_assert_eq!(ids.len(), labels.len());

            for (label, id) in labels.iter().zip(&ids) {
                if !expected.contains(label) {
                    expected.push(label.clone());
                }
                let position = expected.iter().position(|l| l == label).expect("label recorded");
                prop_assert_eq!(id.as_u32() as usize, position + 1);
            }
        }

        let names: Vec<&str> = map.iter().map(|(name, _)| name).collect();
        prop_assert_eq!(names, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn ids_are_dense_from_one(files in proptest_helpers::arb_files(8, 6)) {
        let mut map = LabelMap::new();
        for labels in &files {
            map.assign_all(labels);
        }

        let ids: Vec<u32> = map.iter().map(|(_, id)| id.as_u32()).collect();
        let dense: Vec<u32> = (1..=map.len() as u32).collect();
        prop_assert_eq!(ids, dense);
    }

    #[test]
    fn assignment_is_deterministic(files in proptest_helpers::arb_files(8, 6)) {
        let assign = |files: &[Vec<String>]| {
            let mut map = LabelMap::new();
            let ids: Vec<Vec<u32>> = files
                .iter()
                .map(|labels| map.assign_all(labels).iter().map(|id| id.as_u32()).collect())
                .collect();
            (map, ids)
        };

        prop_assert_eq!(assign(&files), assign(&files));
    }

    #[test]
    fn existing_ids_are_never_reassigned(
        train in proptest_helpers::arb_files(4, 4),
        test in proptest_helpers::arb_files(4, 4),
    ) {
        let mut map = LabelMap::new();
        for labels in &train {
            map.assign_all(labels);
        }
        let before: HashMap<String, u32> = map
            .iter()
            .map(|(name, id)| (name.to_string(), id.as_u32()))
            .collect();

        for labels in &test {
            map.assign_all(labels);
        }
        for (name, id) in &before {
            prop_assert_eq!(map.get(name).map(|id| id.as_u32()), Some(*id));
        }
    }

    #[test]
    fn pbtxt_text_reads_back(names in prop::collection::vec(proptest_helpers::arb_awkward_label(), 0..8)) {
        let map: LabelMap = names.iter().collect();
        let text = to_pbtxt_string(&map);
        let restored = from_pbtxt_str(&text).expect("parse written label map");
        prop_assert_eq!(restored, map);
    }
}
