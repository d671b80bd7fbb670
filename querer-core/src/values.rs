//! The decoded key/value mapping a record is populated from.

use std::collections::HashMap;

use indexmap::IndexMap;

/// A multi-valued mapping from keys to values, as produced by decoding a URL
/// query string.
///
/// Each key maps to the ordered list of values it was given, so repeated keys
/// (`?tag=a&tag=b`) are preserved. The unmarshaler only ever reads the first
/// value of a key. Keys keep their insertion order.
///
/// ```
/// use querer_core::QueryValues;
///
/// let query: QueryValues = [("tag", "a"), ("tag", "b"), ("page", "")]
///     .into_iter()
///     .collect();
///
/// assert_eq!(query.get("tag"), Some("a"));
/// assert_eq!(query.get_all("tag"), ["a", "b"]);
/// assert_eq!(query.get("page"), Some(""));
/// assert_eq!(query.supplied("page"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryValues {
    inner: IndexMap<String, Vec<String>>,
}

impl QueryValues {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// First value for `key`, if the key is present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// First value for `key`, treating an empty string the same as a missing
    /// key. This is the lookup the unmarshaler uses.
    pub fn supplied(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.is_empty())
    }

    /// All values for `key`, in the order they were added.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.inner.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Append `value` to the values of `key`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.entry(key.into()).or_default().push(value.into());
    }

    /// Replace every value of `key` with `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.insert(key.into(), vec![value.into()]);
    }

    /// Remove `key` and return its values.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.inner.shift_remove(key)
    }

    /// Whether `key` is present (even with an empty value).
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the mapping has no keys
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate over keys and their values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.inner
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }
}

impl<K, V> FromIterator<(K, V)> for QueryValues
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = QueryValues::new();
        values.extend(iter);
        values
    }
}

impl<K, V> Extend<(K, V)> for QueryValues
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.add(key, value);
        }
    }
}

impl From<IndexMap<String, Vec<String>>> for QueryValues {
    fn from(inner: IndexMap<String, Vec<String>>) -> Self {
        QueryValues { inner }
    }
}

impl From<HashMap<String, Vec<String>>> for QueryValues {
    fn from(map: HashMap<String, Vec<String>>) -> Self {
        QueryValues {
            inner: map.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_value_wins() {
        let mut query = QueryValues::new();
        query.add("sort", "name");
        query.add("sort", "age");
        assert_eq!(query.get("sort"), Some("name"));
        assert_eq!(query.get_all("sort").len(), 2);

        query.set("sort", "age");
        assert_eq!(query.get_all("sort"), ["age"]);
    }

    #[test]
    fn empty_values_are_not_supplied() {
        let query: QueryValues = [("a", ""), ("b", "x")].into_iter().collect();
        assert!(query.contains_key("a"));
        assert_eq!(query.supplied("a"), None);
        assert_eq!(query.supplied("b"), Some("x"));
        assert_eq!(query.supplied("missing"), None);
    }

    #[test]
    fn empty_value_list_is_not_supplied() {
        let mut map = HashMap::new();
        map.insert("a".to_string(), Vec::new());
        let query = QueryValues::from(map);
        assert!(query.contains_key("a"));
        assert_eq!(query.get("a"), None);
        assert!(query.get_all("a").is_empty());
    }

    #[test]
    fn remove_keeps_order() {
        let mut query: QueryValues = [("a", "1"), ("b", "2"), ("c", "3")].into_iter().collect();
        assert_eq!(query.remove("b"), Some(vec!["2".to_string()]));
        let keys: Vec<_> = query.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, ["a", "c"]);
        assert_eq!(query.len(), 2);
        assert!(!query.is_empty());
    }
}
