//! Immutable snapshot of everything a resolution reads.
//!
//! A [`Store`] is assembled at setup time and then shared behind an `Arc`.
//! Nothing mutates a store that a pipeline holds: hot reloads build a new
//! store and publish it (see [`DataPoint`](crate::DataPoint)).

use crate::accumulator::Accumulator;
use crate::config::{EngineConfig, ResolutionConfig};
use crate::entity::{EntityDescriptor, EntityStore};
use crate::error::DataPointResult;
use crate::fetch::Fetcher;
use crate::function::{FunctionRegistry, ReducerFunction};
use crate::kind::{EntityKind, KindRegistry};
use log::debug;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

/// Entity store, function and kind registries, global values, the network
/// capability and resolution limits.
#[derive(Debug, Clone)]
pub struct Store {
    entities: EntityStore,
    functions: FunctionRegistry,
    kinds: KindRegistry,
    values: Arc<JsonValue>,
    fetcher: Arc<dyn Fetcher>,
    limits: ResolutionConfig,
}

impl Store {
    /// Creates a store with the built-in functions and kinds.
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            entities: EntityStore::new(),
            functions: FunctionRegistry::with_builtins(),
            kinds: KindRegistry::with_builtins(),
            values: Arc::new(JsonValue::Object(Map::new())),
            fetcher,
            limits: ResolutionConfig::default(),
        }
    }

    /// Creates a store populated from the values, entities and limits of
    /// `config`.
    pub fn from_config(config: &EngineConfig, fetcher: Arc<dyn Fetcher>) -> DataPointResult<Self> {
        let mut store = Self::new(fetcher);
        store.set_limits(config.resolution);

        for (key, value) in &config.values {
            store.add_value(key.as_str(), value.clone());
        }
        for (key, options) in &config.entities {
            store.add_entity(EntityDescriptor::new(key, options.clone())?);
        }

        debug!(
            "Store built from config: {} entities, {} functions, {} kinds",
            store.entities.len(),
            store.functions.len(),
            store.kinds.len()
        );
        Ok(store)
    }

    pub fn add_entity(&mut self, descriptor: EntityDescriptor) {
        self.entities.insert(descriptor);
    }

    pub fn add_function(&mut self, name: &str, function: Arc<dyn ReducerFunction>) -> DataPointResult<()> {
        self.functions.register(name, function)
    }

    pub fn add_kind(&mut self, name: &str, kind: Arc<dyn EntityKind>) -> DataPointResult<()> {
        self.kinds.register(name, kind)
    }

    /// Sets a global value, visible to templates as `{values.<key>}`.
    pub fn add_value(&mut self, key: impl Into<String>, value: JsonValue) {
        if let JsonValue::Object(map) = Arc::make_mut(&mut self.values) {
            map.insert(key.into(), value);
        }
    }

    pub fn set_limits(&mut self, limits: ResolutionConfig) {
        self.limits = limits;
    }

    pub fn set_fetcher(&mut self, fetcher: Arc<dyn Fetcher>) {
        self.fetcher = fetcher;
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    pub fn kinds(&self) -> &KindRegistry {
        &self.kinds
    }

    pub fn values(&self) -> &Arc<JsonValue> {
        &self.values
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    pub fn limits(&self) -> ResolutionConfig {
        self.limits
    }

    /// Creates an accumulator for `value` that sees this store's values.
    pub fn accumulator(&self, value: JsonValue) -> Accumulator {
        Accumulator::new(value).with_values(Arc::clone(&self.values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKey;
    use crate::fetch::MockFetcher;
    use serde_json::json;

    #[test]
    fn test_new_store_has_builtins() {
        let store = Store::new(Arc::new(MockFetcher::new()));
        assert!(store.functions().contains("string.trim"));
        assert!(store.kinds().contains("source"));
        assert!(store.entities().is_empty());
        assert_eq!(store.limits(), ResolutionConfig::default());
    }

    #[test]
    fn test_values_are_copy_on_write() {
        let mut store = Store::new(Arc::new(MockFetcher::new()));
        store.add_value("host", json!("remote.test"));

        let acc = store.accumulator(json!(1));
        store.add_value("host", json!("changed"));

        assert_eq!(acc.values["host"], json!("remote.test"));
        assert_eq!(store.values()["host"], json!("changed"));
    }

    #[test]
    fn test_from_config() {
        let mut config = EngineConfig::default();
        config.resolution.max_nesting_depth = 3;
        config.values.insert("host".to_string(), json!("remote.test"));
        config
            .entities
            .insert("source:a1".to_string(), json!({"url": "http://remote.test/source1"}));

        let store = Store::from_config(&config, Arc::new(MockFetcher::new())).unwrap();
        assert_eq!(store.limits().max_nesting_depth, 3);
        assert!(store.entities().contains(&EntityKey::parse("source:a1").unwrap()));
        assert_eq!(store.values()["host"], json!("remote.test"));

        config.entities.insert("bad".to_string(), json!({}));
        assert!(Store::from_config(&config, Arc::new(MockFetcher::new())).is_err());
    }
}
