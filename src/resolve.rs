//! # Reducer Resolver and Resolution Engine
//!
//! Resolution runs in three phases:
//!
//! 1. **Classify** every token of the expression ([`classify`](crate::expression::classify))
//! 2. **Bind** every token to a reducer against one [`Store`] snapshot
//! 3. **Fold** the accumulator through the reducers, left to right
//!
//! Classification and lookup failures therefore surface before any reducer
//! runs. The fold stops at the first failing stage; stages after it never
//! start and earlier effects are not rolled back.

use crate::accumulator::Accumulator;
use crate::error::{DataPointError, DataPointResult};
use crate::expression::{ReducerToken, TokenKind, TransformExpression};
use crate::reducer::{BoxedReducer, CollectionReducer, FunctionReducer, PathReducer};
use crate::store::Store;
use log::{debug, error, info, warn};
use std::sync::Arc;

/// Resolves `expression` against `acc`.
///
/// At the top level the accumulator's `values` are replaced by the
/// store's global values. An empty expression otherwise returns `acc`
/// unchanged.
pub async fn resolve(
    store: &Arc<Store>,
    acc: Accumulator,
    expression: &TransformExpression,
) -> DataPointResult<Accumulator> {
    let acc = with_store_values(store, acc);
    if expression.is_empty() {
        return Ok(acc);
    }

    info!("🚀 Resolving '{}' ({} stages)", expression, expression.len());
    let tokens = expression.classify()?;
    let reducers = bind_all(store, &tokens)?;

    match fold(&reducers, acc).await {
        Ok(acc) => {
            info!("✅ Resolved '{}'", expression);
            Ok(acc)
        }
        Err(e) => {
            error!("❌ Resolution of '{}' failed: {}", expression, e);
            Err(e)
        }
    }
}

/// Binds and runs a single classified token.
pub async fn resolve_reducer(
    store: &Arc<Store>,
    acc: Accumulator,
    token: &ReducerToken,
) -> DataPointResult<Accumulator> {
    let reducer = bind_token(store, token)?;
    reducer.reduce(with_store_values(store, acc)).await
}

fn with_store_values(store: &Store, acc: Accumulator) -> Accumulator {
    if acc.depth == 0 {
        acc.with_values(Arc::clone(store.values()))
    } else {
        acc
    }
}

/// Binds one classified token to a reducer.
pub fn bind_token(store: &Arc<Store>, token: &ReducerToken) -> DataPointResult<BoxedReducer> {
    match token {
        ReducerToken::Path { source, address } => Ok(Box::new(PathReducer::new(source.as_str(), address.clone()))),
        ReducerToken::Function { source, name, args } => {
            let function = store.functions().get(name)?;
            Ok(Box::new(FunctionReducer::new(source.as_str(), function, args.clone())))
        }
        ReducerToken::Entity { source, key, collection } => {
            let entity = store.entities().get(key)?;
            let kind = store.kinds().get(entity.kind())?;
            let reducer = kind.bind(store, entity)?;
            if *collection {
                Ok(Box::new(CollectionReducer::new(source.as_str(), reducer)))
            } else {
                Ok(reducer)
            }
        }
    }
}

/// Returns a resolver bound to one token kind, named as in
/// [`TokenKind`]'s `Display` (`ReducerPath`, `ReducerFunction`,
/// `ReducerEntity`).
pub fn get_reducer_function(store: &Arc<Store>, kind: &str) -> DataPointResult<BoundResolver> {
    Ok(BoundResolver {
        store: Arc::clone(store),
        kind: kind.parse()?,
    })
}

/// Resolver for tokens of a single kind, for callers composing their own
/// pipelines.
#[derive(Debug, Clone)]
pub struct BoundResolver {
    store: Arc<Store>,
    kind: TokenKind,
}

impl BoundResolver {
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Binds `token`, which must be of this resolver's kind.
    pub fn bind(&self, token: &ReducerToken) -> DataPointResult<BoxedReducer> {
        if token.kind() != self.kind {
            return Err(DataPointError::classification(
                token.source(),
                format!("expected a {} token, found {}", self.kind, token.kind()),
            ));
        }
        bind_token(&self.store, token)
    }

    pub async fn resolve(&self, acc: Accumulator, token: &ReducerToken) -> DataPointResult<Accumulator> {
        let reducer = self.bind(token)?;
        reducer.reduce(with_store_values(&self.store, acc)).await
    }
}

/// Classifies a nested expression held in entity options. Empty text is
/// `None`.
pub(crate) fn compile(text: &str) -> DataPointResult<Option<Vec<ReducerToken>>> {
    let expression = TransformExpression::parse(text);
    if expression.is_empty() {
        return Ok(None);
    }
    expression.classify().map(Some)
}

/// Re-enters the engine from inside a running reducer.
///
/// Binding happens here rather than when the owner was bound, so entities
/// may refer to themselves. Depth is bounded by the store's
/// `max_nesting_depth`.
pub(crate) async fn resolve_nested(
    store: &Arc<Store>,
    acc: Accumulator,
    tokens: &[ReducerToken],
    owner: &str,
) -> DataPointResult<Accumulator> {
    let depth = acc.depth;
    let limit = store.limits().max_nesting_depth;
    if depth >= limit {
        return Err(DataPointError::execution(
            owner,
            format!("maximum nesting depth of {} exceeded", limit),
        ));
    }

    let reducers = bind_all(store, tokens)?;
    let result = fold(&reducers, acc.with_depth(depth + 1)).await?;
    Ok(result.with_depth(depth))
}

fn bind_all(store: &Arc<Store>, tokens: &[ReducerToken]) -> DataPointResult<Vec<BoxedReducer>> {
    tokens.iter().map(|token| bind_token(store, token)).collect()
}

async fn fold(reducers: &[BoxedReducer], mut acc: Accumulator) -> DataPointResult<Accumulator> {
    let total = reducers.len();
    for (index, reducer) in reducers.iter().enumerate() {
        debug!("Stage {}/{} '{}' (depth {})", index + 1, total, reducer.name(), acc.depth);
        acc = reducer.reduce(acc).await.map_err(|e| {
            warn!("Stage {}/{} '{}' failed: {}", index + 1, total, reducer.name(), e);
            e
        })?;
    }
    Ok(acc)
}
