//! Dot-delimited addressing into JSON values.
//!
//! A segment that parses as an unsigned integer indexes sequences; any
//! segment keys mappings. Missing keys, out-of-range indices and addressing
//! into scalars all yield an absent value rather than an error.

use serde_json::Value as JsonValue;
use std::fmt;

/// A parsed address such as `a.b.0`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathAddress {
    segments: Vec<String>,
}

impl PathAddress {
    /// Parses a dot-delimited address. Empty segments are dropped, so `""`
    /// and `"."` both address the root.
    pub fn parse(address: &str) -> Self {
        let segments = address
            .split('.')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        Self { segments }
    }

    /// Builds an address from already split segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether this address points at the value itself.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Looks up the addressed sub-value, borrowing from `value`.
    pub fn get<'a>(&self, value: &'a JsonValue) -> Option<&'a JsonValue> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| step(current, segment))
    }

    /// Returns a copy of the addressed sub-value, or `null` when absent.
    pub fn resolve(&self, value: &JsonValue) -> JsonValue {
        self.get(value).cloned().unwrap_or(JsonValue::Null)
    }
}

fn step<'a>(value: &'a JsonValue, segment: &str) -> Option<&'a JsonValue> {
    match value {
        JsonValue::Object(map) => map.get(segment),
        JsonValue::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index)),
        _ => None,
    }
}

impl fmt::Display for PathAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}
