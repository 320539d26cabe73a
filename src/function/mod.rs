//! Custom functions addressable from expressions as `namespace.name(args)`.

use crate::accumulator::Accumulator;
use crate::error::{DataPointError, DataPointResult, Registry};
use crate::expression::is_identifier;
use async_trait::async_trait;
use log::debug;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub mod builtins;

pub use builtins::builtin_functions;

/// A user-supplied function `(accumulator, args) -> value`.
///
/// Arguments are the literal, trimmed strings written between the
/// parentheses of the token.
#[async_trait]
pub trait ReducerFunction: Send + Sync {
    async fn call(&self, acc: &Accumulator, args: &[String]) -> DataPointResult<JsonValue>;
}

/// Adapter for synchronous closures.
pub struct SyncFunction<F>(F);

impl<F> SyncFunction<F>
where
    F: Fn(&Accumulator, &[String]) -> DataPointResult<JsonValue> + Send + Sync,
{
    pub fn new(function: F) -> Self {
        Self(function)
    }
}

#[async_trait]
impl<F> ReducerFunction for SyncFunction<F>
where
    F: Fn(&Accumulator, &[String]) -> DataPointResult<JsonValue> + Send + Sync,
{
    async fn call(&self, acc: &Accumulator, args: &[String]) -> DataPointResult<JsonValue> {
        (self.0)(acc, args)
    }
}

/// Adapter for closures returning a future. The closure receives owned
/// copies of the accumulator and arguments.
pub struct AsyncFunction<F>(F);

impl<F, Fut> AsyncFunction<F>
where
    F: Fn(Accumulator, Vec<String>) -> Fut + Send + Sync,
    Fut: Future<Output = DataPointResult<JsonValue>> + Send,
{
    pub fn new(function: F) -> Self {
        Self(function)
    }
}

#[async_trait]
impl<F, Fut> ReducerFunction for AsyncFunction<F>
where
    F: Fn(Accumulator, Vec<String>) -> Fut + Send + Sync,
    Fut: Future<Output = DataPointResult<JsonValue>> + Send,
{
    async fn call(&self, acc: &Accumulator, args: &[String]) -> DataPointResult<JsonValue> {
        (self.0)(acc.clone(), args.to_vec()).await
    }
}

/// Map from `namespace.name` to function.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn ReducerFunction>>,
}

impl FunctionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-populated with the built-in functions.
    pub fn with_builtins() -> Self {
        Self {
            functions: builtin_functions(),
        }
    }

    /// Registers a function under `namespace.name`, shadowing any previous
    /// registration.
    pub fn register(&mut self, name: &str, function: Arc<dyn ReducerFunction>) -> DataPointResult<()> {
        validate_name(name)?;
        if self.functions.insert(name.to_string(), function).is_some() {
            debug!("Function '{}' replaced", name);
        }
        Ok(())
    }

    /// Registers a synchronous closure.
    pub fn register_fn<F>(&mut self, name: &str, function: F) -> DataPointResult<()>
    where
        F: Fn(&Accumulator, &[String]) -> DataPointResult<JsonValue> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(SyncFunction::new(function)))
    }

    /// Registers a closure returning a future.
    pub fn register_async<F, Fut>(&mut self, name: &str, function: F) -> DataPointResult<()>
    where
        F: Fn(Accumulator, Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DataPointResult<JsonValue>> + Send + 'static,
    {
        self.register(name, Arc::new(AsyncFunction::new(function)))
    }

    /// Looks up a function by exact `namespace.name`.
    pub fn get(&self, name: &str) -> DataPointResult<Arc<dyn ReducerFunction>> {
        self.functions
            .get(name)
            .cloned()
            .ok_or_else(|| DataPointError::lookup(name, Registry::FunctionRegistry))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

fn validate_name(name: &str) -> DataPointResult<()> {
    match name.split_once('.') {
        Some((namespace, function)) if is_identifier(namespace) && is_identifier(function) => Ok(()),
        _ => Err(DataPointError::configuration_with_key(
            format!("Function name '{}' must have the form namespace.name", name),
            name,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_register_and_call() {
        let mut registry = FunctionRegistry::new();
        registry
            .register_fn("test.addString", |acc: &Accumulator, args: &[String]| -> DataPointResult<JsonValue> {
                let base = acc.value.as_str().unwrap_or_default();
                Ok(json!(format!("{}{}", base, args.join(""))))
            })
            .unwrap();

        let function = registry.get("test.addString").unwrap();
        let value = function
            .call(&Accumulator::new(json!("hello ")), &["world".to_string()])
            .await
            .unwrap();
        assert_eq!(value, json!("hello world"));
    }

    #[tokio::test]
    async fn test_register_async() {
        let mut registry = FunctionRegistry::new();
        registry
            .register_async("test.delayed", |acc: Accumulator, _args: Vec<String>| async move {
                tokio::task::yield_now().await;
                Ok::<_, DataPointError>(json!({"wrapped": acc.value}))
            })
            .unwrap();

        let value = registry
            .get("test.delayed")
            .unwrap()
            .call(&Accumulator::new(json!(1)), &[])
            .await
            .unwrap();
        assert_eq!(value, json!({"wrapped": 1}));
    }

    #[test]
    fn test_lookup_miss() {
        let registry = FunctionRegistry::new();
        let err = registry.get("test.missing").err().unwrap();
        assert_eq!(err, DataPointError::lookup("test.missing", Registry::FunctionRegistry));
    }

    #[test]
    fn test_name_validation() {
        let mut registry = FunctionRegistry::new();
        let noop = |_: &Accumulator, _: &[String]| -> DataPointResult<JsonValue> { Ok(JsonValue::Null) };

        assert!(registry.register_fn("nonamespace", noop).is_err());
        assert!(registry.register_fn("too.many.dots", noop).is_err());
        assert!(registry.register_fn("ns.has space", noop).is_err());
        assert!(registry.register_fn("ns.ok", noop).is_ok());
        assert_eq!(registry.names(), vec!["ns.ok"]);
    }

    #[test]
    fn test_builtins_can_be_shadowed() {
        let mut registry = FunctionRegistry::with_builtins();
        assert!(registry.contains("string.upperCase"));

        registry
            .register_fn("string.upperCase", |_: &Accumulator, _: &[String]| -> DataPointResult<JsonValue> {
                Ok(json!("shadowed"))
            })
            .unwrap();
        assert!(registry.contains("string.upperCase"));
    }
}
