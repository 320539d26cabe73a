//! `{placeholder}` substitution for URL and header templates.

use crate::accumulator::Accumulator;
use crate::error::{DataPointError, DataPointResult};
use crate::path::PathAddress;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value as JsonValue;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder pattern is valid"));

/// Renders `template` against the accumulator.
///
/// A placeholder is `{root}` or `{root.path}` where root is one of
/// `value`, `initialValue`, `params`, `locals` or `values`. Strings are
/// inserted verbatim, anything else as compact JSON. A placeholder that
/// resolves to null is an error attributed to `owner`.
pub fn render(template: &str, acc: &Accumulator, owner: &str) -> DataPointResult<String> {
    let mut failure = None;

    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures| {
        let placeholder = caps[1].trim();
        match lookup(placeholder, acc) {
            Some(text) => text,
            None => {
                failure.get_or_insert_with(|| {
                    DataPointError::execution(
                        owner,
                        format!("placeholder '{{{}}}' in '{}' did not resolve", placeholder, template),
                    )
                });
                String::new()
            }
        }
    });

    match failure {
        Some(err) => Err(err),
        None => Ok(rendered.into_owned()),
    }
}

fn lookup(placeholder: &str, acc: &Accumulator) -> Option<String> {
    let (root, path) = placeholder.split_once('.').unwrap_or((placeholder, ""));
    match acc.lookup(root, &PathAddress::parse(path))? {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
