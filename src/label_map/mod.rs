//! Label name to class id mapping.
//!
//! Ids are dense and 1-based, handed out in the order label names are first
//! seen. The same map is carried from the train pass into the test pass so
//! both splits agree on every id.

mod pbtxt;

use std::collections::HashMap;
use std::fmt;

pub use pbtxt::{from_pbtxt_str, read_label_map, to_pbtxt_string, write_label_map};

/// A class id as stored in `image/object/class/label`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabelId(pub u32);

impl LabelId {
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LabelId({})", self.0)
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Insertion-ordered label map.
///
/// The id of a name is its insertion position plus one, so ids can never
/// have gaps or be reused.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelMap {
    names: Vec<String>,
    ids: HashMap<String, LabelId>,
}

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Looks up the id of `name` without assigning one.
    pub fn get(&self, name: &str) -> Option<LabelId> {
        self.ids.get(name).copied()
    }

    /// Returns the name registered under `id`.
    pub fn name(&self, id: LabelId) -> Option<&str> {
        let index = (id.0 as usize).checked_sub(1)?;
        self.names.get(index).map(String::as_str)
    }

    /// Returns the id of `name`, assigning the next id if it is new.
    pub fn get_or_insert(&mut self, name: &str) -> LabelId {
        if let Some(id) = self.get(name) {
            return id;
        }

        let id = LabelId::new(self.names.len() as u32 + 1);
        self.names.push(name.to_owned());
        self.ids.insert(name.to_owned(), id);
        id
    }

    /// Resolves ids for every label of one annotation file, assigning new
    /// ids in order of first appearance.
    ///
    /// Callers read the whole file before calling this, so a file that
    /// fails to load never leaves ids behind.
    pub fn assign_all<S: AsRef<str>>(&mut self, labels: &[S]) -> Vec<LabelId> {
        labels
            .iter()
            .map(|label| self.get_or_insert(label.as_ref()))
            .collect()
    }

    /// Iterates `(name, id)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, LabelId)> + '_ {
        self.names
            .iter()
            .enumerate()
            .map(|(index, name)| (name.as_str(), LabelId::new(index as u32 + 1)))
    }

    /// Names inserted after the map had `mark` entries.
    pub fn names_since(&self, mark: usize) -> &[String] {
        self.names.get(mark..).unwrap_or(&[])
    }
}

impl<S: AsRef<str>> FromIterator<S> for LabelMap {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut map = LabelMap::new();
        for name in iter {
            map.get_or_insert(name.as_ref());
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_follow_first_occurrence() {
        let mut map = LabelMap::new();
        let ids = map.assign_all(&["cat", "dog", "cat"]);
        assert_eq!(ids, vec![LabelId(1), LabelId(2), LabelId(1)]);

        let ids = map.assign_all(&["dog", "bird"]);
        assert_eq!(ids, vec![LabelId(2), LabelId(3)]);

        let pairs: Vec<_> = map.iter().collect();
        assert_eq!(
            pairs,
            vec![("cat", LabelId(1)), ("dog", LabelId(2)), ("bird", LabelId(3))]
        );
    }

    #[test]
    fn get_does_not_assign() {
        let map = LabelMap::new();
        assert_eq!(map.get("cat"), None);
        assert!(map.is_empty());
    }

    #[test]
    fn name_resolves_ids() {
        let map: LabelMap = ["cat", "dog"].into_iter().collect();
        assert_eq!(map.name(LabelId(1)), Some("cat"));
        assert_eq!(map.name(LabelId(2)), Some("dog"));
        assert_eq!(map.name(LabelId(0)), None);
        assert_eq!(map.name(LabelId(3)), None);
    }

    #[test]
    fn names_since_reports_new_entries() {
        let mut map: LabelMap = ["cat"].into_iter().collect();
        let mark = map.len();
        map.assign_all(&["cat", "fox"]);
        assert_eq!(map.names_since(mark), ["fox".to_string()]);
        assert!(map.names_since(10).is_empty());
    }
}
