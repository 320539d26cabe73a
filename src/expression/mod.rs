//! # Transform Expressions
//!
//! A transform expression is a pipe-delimited sequence of tokens, for
//! example `source:getOrgInfo | $repos.0 | string.upperCase()`.
//!
//! ## Components
//!
//! * `grammar` - Pest grammar for a single token
//! * `token` - Classification of raw tokens into [`ReducerToken`]s
//!
//! Splitting is purely lexical: there is no escaping of `|` inside tokens.

mod grammar;
pub mod token;

pub use token::{classify, ReducerToken, TokenKind};

use crate::error::DataPointResult;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Ordered sequence of raw, trimmed, non-empty tokens.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransformExpression {
    tokens: Vec<String>,
}

impl TransformExpression {
    /// Splits `text` on `|` and trims every token. Empty or whitespace-only
    /// input yields an empty expression.
    pub fn parse(text: &str) -> Self {
        let tokens = text
            .split('|')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect();
        Self { tokens }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// An empty expression is the identity transform.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Classifies every token, left to right, failing on the first token
    /// that matches no shape.
    pub fn classify(&self) -> DataPointResult<Vec<ReducerToken>> {
        self.tokens.iter().map(|token| classify(token)).collect()
    }
}

impl FromStr for TransformExpression {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for TransformExpression {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl fmt::Display for TransformExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.join(" | "))
    }
}

/// Whether `s` is a valid kind, namespace or function name.
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
