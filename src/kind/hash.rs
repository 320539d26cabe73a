//! The `hash` kind: reshape a mapping.
//!
//! Operations run in a fixed order: `value`, `mapKeys`, `omitKeys`,
//! `pickKeys`, `addKeys`, `addValues`. Transform expressions inside the
//! options are resolved re-entrantly against the current value.

use super::EntityKind;
use crate::accumulator::Accumulator;
use crate::entity::EntityDescriptor;
use crate::error::{DataPointError, DataPointResult};
use crate::expression::ReducerToken;
use crate::reducer::{type_name, BoxedReducer, Reducer};
use crate::resolve::{compile, resolve_nested};
use crate::store::Store;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Options of a `hash:*` entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HashOptions {
    /// Expression applied to the incoming value first
    pub value: Option<String>,
    /// New key -> expression; replaces the mapping
    pub map_keys: Option<BTreeMap<String, String>>,
    pub omit_keys: Vec<String>,
    pub pick_keys: Option<Vec<String>>,
    /// New key -> expression; merged into the mapping
    pub add_keys: BTreeMap<String, String>,
    /// Literal entries merged into the mapping
    pub add_values: Map<String, JsonValue>,
}

impl HashOptions {
    fn has_keyed_operations(&self) -> bool {
        self.map_keys.is_some()
            || !self.omit_keys.is_empty()
            || self.pick_keys.is_some()
            || !self.add_keys.is_empty()
            || !self.add_values.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HashKind;

impl EntityKind for HashKind {
    fn bind(&self, store: &Arc<Store>, entity: Arc<EntityDescriptor>) -> DataPointResult<BoxedReducer> {
        let options: HashOptions = entity.options_as()?;

        let value = match &options.value {
            Some(text) => compile(text)?,
            None => None,
        };
        let map_keys = match &options.map_keys {
            Some(map) => Some(compile_keyed(map)?),
            None => None,
        };
        let add_keys = compile_keyed(&options.add_keys)?;

        Ok(Box::new(HashReducer {
            name: entity.key().to_string(),
            entity,
            store: Arc::clone(store),
            value,
            map_keys,
            add_keys,
            options,
        }))
    }
}

type KeyedTokens = Vec<(String, Option<Vec<ReducerToken>>)>;

fn compile_keyed(map: &BTreeMap<String, String>) -> DataPointResult<KeyedTokens> {
    map.iter()
        .map(|(key, text)| -> DataPointResult<_> { Ok((key.clone(), compile(text)?)) })
        .collect()
}

pub struct HashReducer {
    name: String,
    entity: Arc<EntityDescriptor>,
    store: Arc<Store>,
    value: Option<Vec<ReducerToken>>,
    map_keys: Option<KeyedTokens>,
    add_keys: KeyedTokens,
    options: HashOptions,
}

impl HashReducer {
    async fn run(
        &self,
        acc: &Accumulator,
        tokens: &Option<Vec<ReducerToken>>,
        value: JsonValue,
    ) -> DataPointResult<JsonValue> {
        match tokens {
            Some(tokens) => {
                let nested = acc.clone().with_value(value);
                Ok(resolve_nested(&self.store, nested, tokens, &self.name).await?.value)
            }
            None => Ok(value),
        }
    }

    async fn evaluate_keys(
        &self,
        acc: &Accumulator,
        keyed: &KeyedTokens,
        source: &Map<String, JsonValue>,
    ) -> DataPointResult<Map<String, JsonValue>> {
        let mut result = Map::new();
        for (key, tokens) in keyed {
            let value = self.run(acc, tokens, JsonValue::Object(source.clone())).await?;
            result.insert(key.clone(), value);
        }
        Ok(result)
    }
}

#[async_trait]
impl Reducer for HashReducer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn reduce(&self, acc: Accumulator) -> DataPointResult<Accumulator> {
        let scoped = acc.clone().with_context(Some(Arc::clone(&self.entity)));
        let value = self.run(&scoped, &self.value, acc.value.clone()).await?;

        if !self.options.has_keyed_operations() {
            return Ok(acc.with_value(value));
        }

        let mut map = match value {
            JsonValue::Object(map) => map,
            other => {
                return Err(DataPointError::execution(
                    &self.name,
                    format!("expected an object to reshape but found {}", type_name(&other)),
                ))
            }
        };

        if let Some(map_keys) = &self.map_keys {
            map = self.evaluate_keys(&scoped, map_keys, &map).await?;
        }

        for key in &self.options.omit_keys {
            map.remove(key);
        }

        if let Some(pick_keys) = &self.options.pick_keys {
            map.retain(|key, _| pick_keys.contains(key));
        }

        if !self.add_keys.is_empty() {
            let added = self.evaluate_keys(&scoped, &self.add_keys, &map).await?;
            map.extend(added);
        }

        map.extend(self.options.add_values.iter().map(|(k, v)| (k.clone(), v.clone())));

        Ok(acc.with_value(JsonValue::Object(map)))
    }
}
