// Ordered query-parameter multimap with `URLSearchParams` semantics.
//
// Keys may repeat and keep their insertion order. Parsing is lossy only for
// pairs with an empty key, serialization leaves `,` unescaped so that list
// parameters read as `fuel=diesel,petrol`.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::fmt;

// RFC 3986 unreserved characters plus the list separator
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b',');

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a raw query string, with or without the leading `?`.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = url::form_urlencoded::parse(query.as_bytes())
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        Self { pairs }
    }

    /// Splits a location such as `/cars?min_price=1` and parses its query part.
    pub fn from_location(location: &str) -> Self {
        match location.split_once('?') {
            Some((_, query)) => Self::parse(query),
            None => Self::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// First non-blank value among `keys`, tried in order.
    pub fn get_any(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|key| self.get(key))
            .map(str::trim)
            .find(|value| !value.is_empty())
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    pub fn delete(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    pub fn delete_all(&mut self, keys: &[&str]) {
        self.pairs.retain(|(k, _)| !keys.contains(&k.as_str()));
    }

    /// Removes every pair whose key is in `keys` and inserts `replacement` at
    /// the position of the first removed pair, or at the end if none matched.
    pub fn replace_keys(&mut self, keys: &[&str], replacement: Vec<(String, String)>) {
        let position = self
            .pairs
            .iter()
            .position(|(k, _)| keys.contains(&k.as_str()))
            .unwrap_or(self.pairs.len());
        self.delete_all(keys);
        let position = position.min(self.pairs.len());
        self.pairs.splice(position..position, replacement);
    }

    /// Location for `base_path`, without a trailing `?` when empty.
    pub fn to_location(&self, base_path: &str) -> String {
        if self.is_empty() {
            base_path.to_string()
        } else {
            format!("{}?{}", base_path, self)
        }
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(
                f,
                "{}={}",
                utf8_percent_encode(key, QUERY_COMPONENT),
                utf8_percent_encode(value, QUERY_COMPONENT)
            )?;
        }
        Ok(())
    }
}
