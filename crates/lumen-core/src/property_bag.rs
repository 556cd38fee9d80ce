//! Flat string properties attached to a telemetry record

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Insertion-ordered map of string keys to string values.
///
/// Keys are unique. Inserting an existing key replaces its value but keeps
/// the key at its original position, so output stays deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyBag {
    entries: Vec<(String, String)>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a property, overwriting any previous value for `key`
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Insert a property only when a value is present
    pub fn insert_opt(&mut self, key: impl Into<String>, value: Option<impl Into<String>>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    /// Insert every entry of `other`, later values winning
    pub fn merge(&mut self, other: PropertyBag) {
        for (key, value) in other.entries {
            self.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for PropertyBag {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertyBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = PropertyBag::new();
        bag.extend(iter);
        bag
    }
}

impl IntoIterator for PropertyBag {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for PropertyBag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_overwrites_in_place() {
        let mut bag = PropertyBag::new();
        bag.insert("a", "1");
        bag.insert("b", "2");
        bag.insert("a", "3");

        assert_eq!(bag.len(), 2);
        assert_eq!(bag.get("a"), Some("3"));
        assert_eq!(bag.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_insert_opt_skips_missing_values() {
        let mut bag = PropertyBag::new();
        bag.insert_opt("present", Some(""));
        bag.insert_opt("absent", None::<String>);

        assert_eq!(bag.get("present"), Some(""));
        assert!(!bag.contains_key("absent"));
    }

    #[test]
    fn test_merge_last_write_wins() {
        let mut bag: PropertyBag = [("UserId", "abc"), ("Region", "eu")].into_iter().collect();
        let other: PropertyBag = [("Region", "us"), ("Tier", "gold")].into_iter().collect();
        bag.merge(other);

        assert_eq!(
            bag.iter().collect::<Vec<_>>(),
            vec![("UserId", "abc"), ("Region", "us"), ("Tier", "gold")]
        );
    }

    #[test]
    fn test_serializes_as_ordered_object() {
        let bag: PropertyBag = [("z", "1"), ("a", "2")].into_iter().collect();
        assert_eq!(serde_json::to_string(&bag).unwrap(), r#"{"z":"1","a":"2"}"#);
    }
}
