//! The `DataPoint` facade: registration surface plus transform entry point.

use crate::accumulator::Accumulator;
use crate::config::{EngineConfig, HttpConfig};
use crate::entity::EntityDescriptor;
use crate::error::DataPointResult;
use crate::expression::TransformExpression;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::function::ReducerFunction;
use crate::kind::EntityKind;
use crate::resolve;
use crate::store::Store;
use log::info;
use serde_json::Value as JsonValue;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Engine handle.
///
/// Registrations build a new [`Store`] and swap it in under a write lock.
/// A resolution captures the current snapshot once and runs the whole
/// pipeline against it, so registrations made meanwhile never affect an
/// in-flight pipeline.
#[derive(Debug)]
pub struct DataPoint {
    store: RwLock<Arc<Store>>,
    writer: Mutex<()>,
}

impl DataPoint {
    /// Creates an engine that fetches over HTTP with default settings.
    pub fn new() -> DataPointResult<Self> {
        let fetcher = HttpFetcher::new(&HttpConfig::default())?;
        Ok(Self::with_fetcher(Arc::new(fetcher)))
    }

    /// Creates an engine from a validated configuration.
    pub fn from_config(config: &EngineConfig) -> DataPointResult<Self> {
        config.validate()?;
        let fetcher = HttpFetcher::new(&config.http)?;
        let store = Store::from_config(config, Arc::new(fetcher))?;
        info!("DataPoint ready with {} entities", store.entities().len());
        Ok(Self::with_store(store))
    }

    /// Creates an engine over a custom network capability.
    pub fn with_fetcher(fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_store(Store::new(fetcher))
    }

    pub fn with_store(store: Store) -> Self {
        Self {
            store: RwLock::new(Arc::new(store)),
            writer: Mutex::new(()),
        }
    }

    /// The current store snapshot.
    pub fn store(&self) -> Arc<Store> {
        self.store.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Applies `change` to a copy of the current store and publishes the
    /// copy if `change` succeeds.
    ///
    /// Updates are serialized. `change` may read [`store`](Self::store),
    /// which still returns the previous snapshot, but must not call another
    /// registration method on this handle: that would deadlock.
    pub fn update<F, R>(&self, change: F) -> DataPointResult<R>
    where
        F: FnOnce(&mut Store) -> DataPointResult<R>,
    {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = Store::clone(&self.store());
        let result = change(&mut next)?;
        *self.store.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        Ok(result)
    }

    pub fn add_entity(&self, descriptor: EntityDescriptor) -> DataPointResult<()> {
        self.update(|store| {
            store.add_entity(descriptor);
            Ok(())
        })
    }

    /// Registers several entities from `kind:id -> options` pairs in one
    /// swap. Nothing is published if any key is invalid.
    pub fn add_entities<I, K>(&self, entities: I) -> DataPointResult<()>
    where
        I: IntoIterator<Item = (K, JsonValue)>,
        K: AsRef<str>,
    {
        let descriptors = entities
            .into_iter()
            .map(|(key, options)| EntityDescriptor::new(key.as_ref(), options))
            .collect::<DataPointResult<Vec<_>>>()?;

        self.update(|store| {
            for descriptor in descriptors {
                store.add_entity(descriptor);
            }
            Ok(())
        })
    }

    pub fn add_function(&self, name: &str, function: Arc<dyn ReducerFunction>) -> DataPointResult<()> {
        self.update(|store| store.add_function(name, function))
    }

    pub fn add_kind(&self, name: &str, kind: Arc<dyn EntityKind>) -> DataPointResult<()> {
        self.update(|store| store.add_kind(name, kind))
    }

    pub fn add_value(&self, key: &str, value: JsonValue) -> DataPointResult<()> {
        self.update(|store| {
            store.add_value(key, value);
            Ok(())
        })
    }

    /// Resolves `expression` against `acc` using the current snapshot.
    pub async fn resolve(
        &self,
        acc: Accumulator,
        expression: &TransformExpression,
    ) -> DataPointResult<Accumulator> {
        let store = self.store();
        resolve::resolve(&store, acc, expression).await
    }

    /// Parses `expression` and resolves it starting from `value`.
    pub async fn transform(&self, expression: &str, value: JsonValue) -> DataPointResult<Accumulator> {
        let store = self.store();
        let acc = store.accumulator(value);
        resolve::resolve(&store, acc, &TransformExpression::parse(expression)).await
    }
}
