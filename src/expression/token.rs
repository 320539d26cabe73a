//! Classification of raw pipeline tokens.

use super::grammar::{Rule, TokenParser};
use crate::entity::EntityKey;
use crate::error::{DataPointError, DataPointResult};
use crate::path::PathAddress;
use log::debug;
use pest::iterators::Pair;
use pest::Parser;
use std::fmt;
use std::str::FromStr;

const EXPECTED_SHAPES: &str = "expected $path, namespace.name(args) or kind:id";

/// Lexical shape of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `$a.b.c`
    Path,
    /// `namespace.name(args)`
    Function,
    /// `kind:id`
    Entity,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Path => write!(f, "ReducerPath"),
            TokenKind::Function => write!(f, "ReducerFunction"),
            TokenKind::Entity => write!(f, "ReducerEntity"),
        }
    }
}

impl FromStr for TokenKind {
    type Err = DataPointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ReducerPath" | "path" => Ok(TokenKind::Path),
            "ReducerFunction" | "function" => Ok(TokenKind::Function),
            "ReducerEntity" | "entity" => Ok(TokenKind::Entity),
            other => Err(DataPointError::classification(
                other,
                "unknown reducer type, expected ReducerPath, ReducerFunction or ReducerEntity",
            )),
        }
    }
}

/// A classified token, ready to be bound to a reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReducerToken {
    Path {
        source: String,
        address: PathAddress,
    },
    Function {
        source: String,
        /// Registry key, `namespace.name`
        name: String,
        args: Vec<String>,
    },
    Entity {
        source: String,
        key: EntityKey,
        /// Token ended in `[]`: apply the entity to each element
        collection: bool,
    },
}

impl ReducerToken {
    pub fn kind(&self) -> TokenKind {
        match self {
            ReducerToken::Path { .. } => TokenKind::Path,
            ReducerToken::Function { .. } => TokenKind::Function,
            ReducerToken::Entity { .. } => TokenKind::Entity,
        }
    }

    /// The token text as written in the expression.
    pub fn source(&self) -> &str {
        match self {
            ReducerToken::Path { source, .. }
            | ReducerToken::Function { source, .. }
            | ReducerToken::Entity { source, .. } => source,
        }
    }
}

impl fmt::Display for ReducerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source())
    }
}

impl FromStr for ReducerToken {
    type Err = DataPointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        classify(s)
    }
}

/// Classifies one token. Shapes are tried in order: path, function, entity.
pub fn classify(token: &str) -> DataPointResult<ReducerToken> {
    let token = token.trim();
    let mut pairs = TokenParser::parse(Rule::token, token)
        .map_err(|_| DataPointError::classification(token, EXPECTED_SHAPES))?;

    let shape = pairs
        .next()
        .and_then(|pair| pair.into_inner().next())
        .ok_or_else(|| DataPointError::classification(token, EXPECTED_SHAPES))?;

    let classified = match shape.as_rule() {
        Rule::path => build_path(token, shape),
        Rule::function => build_function(token, shape),
        Rule::entity => build_entity(token, shape),
        other => Err(DataPointError::classification(
            token,
            format!("unexpected rule {:?}", other),
        )),
    }?;

    debug!("Classified '{}' as {}", token, classified.kind());
    Ok(classified)
}

fn build_path(token: &str, pair: Pair<Rule>) -> DataPointResult<ReducerToken> {
    let segments: Vec<String> = pair
        .into_inner()
        .filter(|inner| inner.as_rule() == Rule::path_address)
        .flat_map(|address| address.into_inner())
        .map(|segment| segment.as_str().to_string())
        .collect();

    Ok(ReducerToken::Path {
        source: token.to_string(),
        address: PathAddress::from_segments(segments),
    })
}

fn build_function(token: &str, pair: Pair<Rule>) -> DataPointResult<ReducerToken> {
    let mut names = Vec::with_capacity(2);
    let mut args = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::identifier => names.push(inner.as_str()),
            Rule::arguments => {
                args = inner
                    .into_inner()
                    .map(|arg| arg.as_str().trim().to_string())
                    .collect();
            }
            _ => {}
        }
    }

    // `f( )` carries no arguments
    if args.len() == 1 && args[0].is_empty() {
        args.clear();
    }

    match names.as_slice() {
        [namespace, name] => Ok(ReducerToken::Function {
            source: token.to_string(),
            name: format!("{}.{}", namespace, name),
            args,
        }),
        _ => Err(DataPointError::classification(
            token,
            "function tokens need a namespace and a name",
        )),
    }
}

fn build_entity(token: &str, pair: Pair<Rule>) -> DataPointResult<ReducerToken> {
    let mut kind = None;
    let mut id = None;
    let mut collection = false;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::identifier => kind = Some(inner.as_str()),
            Rule::entity_id => id = Some(inner.as_str()),
            Rule::collection => collection = true,
            _ => {}
        }
    }

    let (kind, id) = kind
        .zip(id)
        .ok_or_else(|| DataPointError::classification(token, "entity tokens need a kind and an id"))?;
    let key = EntityKey::new(kind, id)
        .map_err(|e| DataPointError::classification(token, e.to_string()))?;

    Ok(ReducerToken::Entity {
        source: token.to_string(),
        key,
        collection,
    })
}
