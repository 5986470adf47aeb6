//! Key paths: ordered sequences of string segments addressing a nested
//! location inside a JSON document.

use crate::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// An ordered, possibly-empty sequence of string segments.
///
/// # Examples
///
/// ```
/// use carve_model::{key_path, KeyPath};
///
/// let path = key_path!("user", "address", "city");
/// assert_eq!(path.len(), 3);
/// assert_eq!(path.to_string(), "user.address.city");
///
/// let single: KeyPath = "title".into();
/// assert_eq!(single.segments(), ["title"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// The empty key path.
    #[inline]
    pub fn root() -> Self {
        Self::default()
    }

    /// Create a key path from owned segments.
    #[inline]
    pub fn from_segments(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Parse a JSON value into a key path.
    ///
    /// A string becomes a single-segment path; an array of strings becomes a
    /// path of those segments; a JSON array produced by [`KeyPath`]'s own
    /// serialization round-trips. Anything else is rejected.
    pub fn parse(value: &Value) -> ModelResult<Self> {
        match value {
            Value::String(s) => Ok(Self::from_segments(vec![s.clone()])),
            Value::Array(items) => {
                let mut segments = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => segments.push(s.clone()),
                        other => return Err(ModelError::invalid_key_path(other)),
                    }
                }
                Ok(Self::from_segments(segments))
            }
            other => Err(ModelError::invalid_key_path(other)),
        }
    }

    /// Check whether a JSON value is a valid key path: an array whose every
    /// element is a string. The empty array is a valid key path.
    #[inline]
    pub fn is_key_path(value: &Value) -> bool {
        matches!(value, Value::Array(items) if items.iter().all(Value::is_string))
    }

    /// The segments of this path.
    #[inline]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The first segment, if any.
    #[inline]
    pub fn first(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    /// Everything after the first segment.
    #[inline]
    pub fn rest(&self) -> KeyPath {
        KeyPath::from_segments(self.segments.iter().skip(1).cloned().collect())
    }

    /// Check if this path has no segments.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The number of segments in this path.
    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// This path as a plain JSON array of strings.
    #[inline]
    pub fn to_value(&self) -> Value {
        Value::Array(
            self.segments
                .iter()
                .map(|s| Value::String(s.clone()))
                .collect(),
        )
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl From<&str> for KeyPath {
    fn from(segment: &str) -> Self {
        Self::from_segments(vec![segment.to_string()])
    }
}

impl From<String> for KeyPath {
    fn from(segment: String) -> Self {
        Self::from_segments(vec![segment])
    }
}

impl From<Vec<String>> for KeyPath {
    fn from(segments: Vec<String>) -> Self {
        Self::from_segments(segments)
    }
}

impl From<&[&str]> for KeyPath {
    fn from(segments: &[&str]) -> Self {
        Self::from_segments(segments.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for KeyPath {
    fn from(segments: [&str; N]) -> Self {
        Self::from_segments(segments.iter().map(|s| s.to_string()).collect())
    }
}

/// Build a [`KeyPath`] from string segments.
///
/// # Examples
///
/// ```
/// use carve_model::key_path;
///
/// let path = key_path!("letters", "a");
/// assert_eq!(path.to_string(), "letters.a");
///
/// let root = key_path!();
/// assert!(root.is_empty());
/// ```
#[macro_export]
macro_rules! key_path {
    () => {
        $crate::KeyPath::root()
    };
    ($($segment:expr),+ $(,)?) => {
        $crate::KeyPath::from_segments(vec![$($segment.to_string()),+])
    };
}
