/// Route values: the named values produced by matching and consumed by
/// link generation
///
/// Keys are compared case-insensitively everywhere. Insertion order is kept
/// so that query strings come out in the order values were supplied.

use std::borrow::Cow;
use std::fmt;

/// Case-insensitive string equality (Unicode simple lower-casing)
///
/// # Examples
///
/// ```
/// use rhtmx_routing::values::eq_ignore_case;
///
/// assert!(eq_ignore_case("Home", "home"));
/// assert!(eq_ignore_case("ПРИВЕТ", "привет"));
/// assert!(!eq_ignore_case("Home", "Homes"));
/// ```
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    if a.len() == b.len() && a.eq_ignore_ascii_case(b) {
        return true;
    }
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Lower-cases char by char, the folding `eq_ignore_case` compares with
///
/// Unlike `str::to_lowercase` there is no context-sensitive mapping, so a
/// final `Σ` becomes `σ`.
///
/// # Examples
///
/// ```
/// use rhtmx_routing::values::fold_case;
///
/// assert_eq!(fold_case("Home"), "home");
/// assert_eq!(fold_case("ΟΔΟΣ"), "οδοσ");
/// ```
pub fn fold_case(value: &str) -> String {
    value.chars().flat_map(char::to_lowercase).collect()
}

/// A single route value
///
/// `Null` is kept distinct from a missing key so that an explicit `null`
/// can clear an ambient value during link generation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RouteValue {
    #[default]
    Null,
    Text(String),
    /// Produces repeated keys when written to a query string
    List(Vec<String>),
}

impl RouteValue {
    /// Text form of the value; `None` for null, empty text and empty lists
    ///
    /// Lists are joined with `,`.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            RouteValue::Null => None,
            RouteValue::Text(s) if s.is_empty() => None,
            RouteValue::Text(s) => Some(Cow::Borrowed(s)),
            RouteValue::List(items) if items.is_empty() => None,
            RouteValue::List(items) => Some(Cow::Owned(items.join(","))),
        }
    }

    /// True for null, empty text and empty lists
    pub fn is_empty(&self) -> bool {
        self.as_text().is_none()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RouteValue::Null)
    }
}

impl fmt::Display for RouteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.write_str(&text),
            None => Ok(()),
        }
    }
}

impl From<&str> for RouteValue {
    fn from(value: &str) -> Self {
        RouteValue::Text(value.to_string())
    }
}

impl From<String> for RouteValue {
    fn from(value: String) -> Self {
        RouteValue::Text(value)
    }
}

impl From<&String> for RouteValue {
    fn from(value: &String) -> Self {
        RouteValue::Text(value.clone())
    }
}

impl From<Vec<&str>> for RouteValue {
    fn from(values: Vec<&str>) -> Self {
        RouteValue::List(values.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for RouteValue {
    fn from(values: Vec<String>) -> Self {
        RouteValue::List(values)
    }
}

impl<T: Into<RouteValue>> From<Option<T>> for RouteValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(RouteValue::Null, Into::into)
    }
}

macro_rules! route_value_from_display {
    ($($t:ty),*) => {
        $(impl From<$t> for RouteValue {
            fn from(value: $t) -> Self {
                RouteValue::Text(value.to_string())
            }
        })*
    };
}

route_value_from_display!(i32, i64, u32, u64, usize, bool, f64);

/// Compares two optional values the way route values are compared:
/// null, empty and missing are equivalent, text compares case-insensitively
///
/// # Examples
///
/// ```
/// use rhtmx_routing::values::{parts_equal, RouteValue};
///
/// assert!(parts_equal(Some(&RouteValue::from("Home")), Some(&RouteValue::from("HOME"))));
/// assert!(parts_equal(None, Some(&RouteValue::Null)));
/// assert!(parts_equal(Some(&RouteValue::from("")), None));
/// assert!(!parts_equal(Some(&RouteValue::from("a")), None));
/// ```
pub fn parts_equal(a: Option<&RouteValue>, b: Option<&RouteValue>) -> bool {
    let a = a.and_then(RouteValue::as_text);
    let b = b.and_then(RouteValue::as_text);
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => eq_ignore_case(&a, &b),
        _ => false,
    }
}

/// Ordered, case-insensitive map of route values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteValueDictionary {
    entries: Vec<(String, RouteValue)>,
}

impl RouteValueDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| eq_ignore_case(k, key))
    }

    pub fn get(&self, key: &str) -> Option<&RouteValue> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    /// Text of a value, `None` when missing, null or empty
    pub fn get_text(&self, key: &str) -> Option<Cow<'_, str>> {
        self.get(key).and_then(RouteValue::as_text)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Inserts or replaces a value; a replaced entry keeps its position and
    /// original key spelling
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RouteValue>) {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Inserts only if the key is not already present
    pub fn insert_if_absent(&mut self, key: impl Into<String>, value: impl Into<RouteValue>) {
        let key = key.into();
        if !self.contains_key(&key) {
            self.entries.push((key, value.into()));
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<RouteValue> {
        self.position(key).map(|i| self.entries.remove(i).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RouteValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RouteValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Copies every entry of `other` over this dictionary
    pub fn merge(&mut self, other: &RouteValueDictionary) {
        for (key, value) in other.iter() {
            self.insert(key, value.clone());
        }
    }
}

impl<K, V> FromIterator<(K, V)> for RouteValueDictionary
where
    K: Into<String>,
    V: Into<RouteValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dictionary = RouteValueDictionary::new();
        for (key, value) in iter {
            dictionary.insert(key, value);
        }
        dictionary
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for RouteValueDictionary
where
    K: Into<String>,
    V: Into<RouteValue>,
{
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a RouteValueDictionary {
    type Item = &'a (String, RouteValue);
    type IntoIter = std::slice::Iter<'a, (String, RouteValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let values = RouteValueDictionary::from([("Controller", "Home")]);
        assert_eq!(values.get("controller"), Some(&RouteValue::from("Home")));
        assert!(values.contains_key("CONTROLLER"));
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut values = RouteValueDictionary::from([("a", "1"), ("b", "2")]);
        values.insert("A", "3");

        let keys: Vec<&str> = values.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(values.get_text("a").as_deref(), Some("3"));
    }

    #[test]
    fn test_null_is_distinct_from_missing() {
        let values = RouteValueDictionary::from([("id", RouteValue::Null)]);
        assert!(values.contains_key("id"));
        assert_eq!(values.get_text("id"), None);
    }

    #[test]
    fn test_option_conversion() {
        let none: Option<&str> = None;
        assert_eq!(RouteValue::from(none), RouteValue::Null);
        assert_eq!(RouteValue::from(Some(5)), RouteValue::from("5"));
    }
}
