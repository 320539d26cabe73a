//! The `model` kind: `before`, `value` and `after` expressions run in order.

use super::EntityKind;
use crate::accumulator::Accumulator;
use crate::entity::EntityDescriptor;
use crate::error::DataPointResult;
use crate::expression::ReducerToken;
use crate::reducer::{BoxedReducer, Reducer};
use crate::resolve::{compile, resolve_nested};
use crate::store::Store;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Options of a `model:*` entity. Every stage is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    pub before: Option<String>,
    pub value: Option<String>,
    pub after: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ModelKind;

impl EntityKind for ModelKind {
    fn bind(&self, store: &Arc<Store>, entity: Arc<EntityDescriptor>) -> DataPointResult<BoxedReducer> {
        let options: ModelOptions = entity.options_as()?;

        let mut stages = Vec::with_capacity(3);
        for text in [&options.before, &options.value, &options.after].into_iter().flatten() {
            if let Some(tokens) = compile(text)? {
                stages.push(tokens);
            }
        }

        Ok(Box::new(ModelReducer {
            name: entity.key().to_string(),
            entity,
            store: Arc::clone(store),
            stages,
        }))
    }
}

pub struct ModelReducer {
    name: String,
    entity: Arc<EntityDescriptor>,
    store: Arc<Store>,
    stages: Vec<Vec<ReducerToken>>,
}

#[async_trait]
impl Reducer for ModelReducer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn reduce(&self, acc: Accumulator) -> DataPointResult<Accumulator> {
        let mut scoped = acc.clone().with_context(Some(Arc::clone(&self.entity)));
        for tokens in &self.stages {
            scoped = resolve_nested(&self.store, scoped, tokens, &self.name).await?;
        }
        Ok(acc.with_value(scoped.value))
    }
}
