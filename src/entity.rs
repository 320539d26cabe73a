//! Entity descriptors and the store that holds them.
//!
//! An entity is a named unit of behaviour registered under a composite
//! `kind:id` key. Descriptors are created at setup time and never change
//! afterwards; the kind handler registered for `kind` turns a descriptor
//! into a reducer when a pipeline references it.

use crate::accumulator::Accumulator;
use crate::error::{DataPointError, DataPointResult, Registry};
use crate::expression::is_identifier;
use crate::fetch::SourceRequest;
use async_trait::async_trait;
use log::warn;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Composite `kind:id` key. Case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    kind: String,
    id: String,
}

impl EntityKey {
    /// Creates a key from its parts, validating both.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> DataPointResult<Self> {
        let kind = kind.into();
        let id = id.into();

        if !is_identifier(&kind) {
            return Err(DataPointError::configuration_with_key(
                format!("Invalid entity kind '{}'", kind),
                format!("{}:{}", kind, id),
            ));
        }
        if id.is_empty()
            || id.chars().any(|c| c.is_whitespace() || c == '|')
            || id.ends_with("[]")
        {
            return Err(DataPointError::configuration_with_key(
                format!("Invalid entity id '{}'", id),
                format!("{}:{}", kind, id),
            ));
        }

        Ok(Self { kind, id })
    }

    /// Parses a `kind:id` string. The id may itself contain colons.
    pub fn parse(key: &str) -> DataPointResult<Self> {
        let (kind, id) = key.split_once(':').ok_or_else(|| {
            DataPointError::configuration_with_key(
                format!("Entity key '{}' must have the form kind:id", key),
                key,
            )
        })?;
        Self::new(kind, id)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for EntityKey {
    type Err = DataPointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Outcome of a pre-request hook.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestControl {
    /// Send this (possibly rewritten) request
    Proceed(SourceRequest),
    /// Skip the fetch and continue with this value as the response body
    Respond(JsonValue),
}

/// Hook run before a source entity performs its fetch.
///
/// Returning an error vetoes the request and fails the stage.
#[async_trait]
pub trait BeforeRequest: Send + Sync {
    async fn before_request(
        &self,
        acc: &Accumulator,
        request: SourceRequest,
    ) -> DataPointResult<RequestControl>;
}

#[async_trait]
impl<F> BeforeRequest for F
where
    F: Fn(&Accumulator, SourceRequest) -> DataPointResult<RequestControl> + Send + Sync,
{
    async fn before_request(
        &self,
        acc: &Accumulator,
        request: SourceRequest,
    ) -> DataPointResult<RequestControl> {
        self(acc, request)
    }
}

/// Hook run on the response body of a source entity.
#[async_trait]
pub trait AfterRequest: Send + Sync {
    async fn after_request(&self, acc: &Accumulator, response: JsonValue) -> DataPointResult<JsonValue>;
}

#[async_trait]
impl<F> AfterRequest for F
where
    F: Fn(&Accumulator, JsonValue) -> DataPointResult<JsonValue> + Send + Sync,
{
    async fn after_request(&self, acc: &Accumulator, response: JsonValue) -> DataPointResult<JsonValue> {
        self(acc, response)
    }
}

/// Programmatic hooks attached to a descriptor.
#[derive(Clone, Default)]
pub struct EntityHooks {
    pub before_request: Option<Arc<dyn BeforeRequest>>,
    pub after_request: Option<Arc<dyn AfterRequest>>,
}

impl fmt::Debug for EntityHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityHooks")
            .field("before_request", &self.before_request.is_some())
            .field("after_request", &self.after_request.is_some())
            .finish()
    }
}

/// A registered entity: its key, kind-specific options and hooks.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    key: EntityKey,
    options: JsonValue,
    hooks: EntityHooks,
}

impl EntityDescriptor {
    /// Creates a descriptor from a `kind:id` string and its options.
    pub fn new(key: &str, options: JsonValue) -> DataPointResult<Self> {
        Ok(Self::from_key(EntityKey::parse(key)?, options))
    }

    pub fn from_key(key: EntityKey, options: JsonValue) -> Self {
        Self {
            key,
            options,
            hooks: EntityHooks::default(),
        }
    }

    pub fn with_before_request(mut self, hook: impl BeforeRequest + 'static) -> Self {
        self.hooks.before_request = Some(Arc::new(hook));
        self
    }

    pub fn with_after_request(mut self, hook: impl AfterRequest + 'static) -> Self {
        self.hooks.after_request = Some(Arc::new(hook));
        self
    }

    pub fn key(&self) -> &EntityKey {
        &self.key
    }

    pub fn kind(&self) -> &str {
        self.key.kind()
    }

    pub fn id(&self) -> &str {
        self.key.id()
    }

    pub fn options(&self) -> &JsonValue {
        &self.options
    }

    pub fn hooks(&self) -> &EntityHooks {
        &self.hooks
    }

    /// Deserializes the options into a handler's typed configuration.
    /// `null` options are treated as an empty mapping.
    pub fn options_as<T: DeserializeOwned>(&self) -> DataPointResult<T> {
        let options = match &self.options {
            JsonValue::Null => JsonValue::Object(Map::new()),
            other => other.clone(),
        };
        serde_json::from_value(options).map_err(|e| {
            DataPointError::configuration_with_key(
                format!("Invalid options for entity '{}': {}", self.key, e),
                self.key.to_string(),
            )
        })
    }
}

impl PartialEq for EntityDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.options == other.options
    }
}

/// Read-mostly map from entity key to descriptor.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    entities: HashMap<EntityKey, Arc<EntityDescriptor>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor, replacing any previous one under the same key.
    pub fn insert(&mut self, descriptor: EntityDescriptor) -> Option<Arc<EntityDescriptor>> {
        let key = descriptor.key().clone();
        let previous = self.entities.insert(key.clone(), Arc::new(descriptor));
        if previous.is_some() {
            warn!("Entity '{}' was registered twice; keeping the latest definition", key);
        }
        previous
    }

    /// Looks up a descriptor by exact key.
    pub fn get(&self, key: &EntityKey) -> DataPointResult<Arc<EntityDescriptor>> {
        self.entities
            .get(key)
            .cloned()
            .ok_or_else(|| DataPointError::lookup(key.to_string(), Registry::EntityStore))
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.entities.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &EntityKey> {
        self.entities.keys()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_key_parsing() {
        let key = EntityKey::parse("source:getOrgInfo").unwrap();
        assert_eq!(key.kind(), "source");
        assert_eq!(key.id(), "getOrgInfo");
        assert_eq!(key.to_string(), "source:getOrgInfo");

        let key = EntityKey::parse("hash:a.1").unwrap();
        assert_eq!(key.id(), "a.1");

        let key = EntityKey::parse("model:ns:inner").unwrap();
        assert_eq!(key.kind(), "model");
        assert_eq!(key.id(), "ns:inner");
    }

    #[test]
    fn test_invalid_keys() {
        assert!(EntityKey::parse("no-colon").is_err());
        assert!(EntityKey::parse("source:").is_err());
        assert!(EntityKey::parse(":id").is_err());
        assert!(EntityKey::parse("bad kind:id").is_err());
        assert!(EntityKey::parse("source:with space").is_err());
        assert!(EntityKey::parse("source:list[]").is_err());
    }

    #[test]
    fn test_store_lookup() {
        let mut store = EntityStore::new();
        store.insert(EntityDescriptor::new("hash:asIs", json!({})).unwrap());

        let key = EntityKey::parse("hash:asIs").unwrap();
        assert!(store.get(&key).is_ok());

        let missing = EntityKey::parse("hash:missing").unwrap();
        let err = store.get(&missing).unwrap_err();
        assert_eq!(
            err,
            DataPointError::lookup("hash:missing", Registry::EntityStore)
        );

        // Keys are case-sensitive
        assert!(!store.contains(&EntityKey::parse("Hash:asIs").unwrap()));
    }

    #[derive(Debug, Deserialize, Default)]
    struct Options {
        #[serde(default)]
        url: Option<String>,
    }

    #[test]
    fn test_options_as() {
        let descriptor = EntityDescriptor::new("source:a", json!({"url": "http://x"})).unwrap();
        let options: Options = descriptor.options_as().unwrap();
        assert_eq!(options.url.as_deref(), Some("http://x"));

        let descriptor = EntityDescriptor::new("source:b", JsonValue::Null).unwrap();
        let options: Options = descriptor.options_as().unwrap();
        assert!(options.url.is_none());

        let descriptor = EntityDescriptor::new("source:c", json!({"url": 5})).unwrap();
        assert!(matches!(
            descriptor.options_as::<Options>(),
            Err(DataPointError::ConfigurationError { .. })
        ));
    }

    #[tokio::test]
    async fn test_closure_hooks() {
        let descriptor = EntityDescriptor::new("source:a", json!({"url": "http://x"}))
            .unwrap()
            .with_before_request(
                |_acc: &Accumulator, request: SourceRequest| -> DataPointResult<RequestControl> {
                    Ok(RequestControl::Proceed(request.with_header("User-Agent", "DataPoint")))
                },
            );

        let hook = descriptor.hooks().before_request.clone().unwrap();
        let control = hook
            .before_request(&Accumulator::default(), SourceRequest::get("http://x"))
            .await
            .unwrap();

        match control {
            RequestControl::Proceed(request) => {
                assert_eq!(request.headers.get("User-Agent").map(String::as_str), Some("DataPoint"))
            }
            other => panic!("unexpected control {:?}", other),
        }
    }
}
