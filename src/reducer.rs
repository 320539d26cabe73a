//! Executable pipeline steps.
//!
//! A reducer consumes an accumulator and returns the next one. Reducers are
//! produced on demand by the resolver and dropped once their pipeline has
//! run.

use crate::accumulator::Accumulator;
use crate::error::{DataPointError, DataPointResult};
use crate::function::ReducerFunction;
use crate::path::PathAddress;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// An executable step, `accumulator -> accumulator`.
#[async_trait]
pub trait Reducer: Send + Sync {
    /// Name used in logs and error messages, usually the token text.
    fn name(&self) -> &str;

    async fn reduce(&self, acc: Accumulator) -> DataPointResult<Accumulator>;
}

/// Owned, type-erased reducer.
pub type BoxedReducer = Box<dyn Reducer>;

/// Replaces the value with the addressed sub-value. Never suspends.
pub struct PathReducer {
    name: String,
    address: PathAddress,
}

impl PathReducer {
    pub fn new(name: impl Into<String>, address: PathAddress) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }
}

#[async_trait]
impl Reducer for PathReducer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn reduce(&self, acc: Accumulator) -> DataPointResult<Accumulator> {
        let value = self.address.resolve(&acc.value);
        Ok(acc.with_value(value))
    }
}

/// Invokes a registered function with the token's literal arguments.
pub struct FunctionReducer {
    name: String,
    function: Arc<dyn ReducerFunction>,
    args: Vec<String>,
}

impl FunctionReducer {
    pub fn new(name: impl Into<String>, function: Arc<dyn ReducerFunction>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            function,
            args,
        }
    }
}

#[async_trait]
impl Reducer for FunctionReducer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn reduce(&self, acc: Accumulator) -> DataPointResult<Accumulator> {
        let value = self.function.call(&acc, &self.args).await?;
        Ok(acc.with_value(value))
    }
}

/// Applies an inner reducer to every element of a sequence, in order.
pub struct CollectionReducer {
    name: String,
    inner: BoxedReducer,
}

impl CollectionReducer {
    pub fn new(name: impl Into<String>, inner: BoxedReducer) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }
}

#[async_trait]
impl Reducer for CollectionReducer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn reduce(&self, acc: Accumulator) -> DataPointResult<Accumulator> {
        let items = match &acc.value {
            JsonValue::Array(items) => items.clone(),
            other => {
                return Err(DataPointError::execution(
                    &self.name,
                    format!("expected an array to map over but found {}", type_name(other)),
                ))
            }
        };

        let mut results = Vec::with_capacity(items.len());
        for item in items {
            let reduced = self.inner.reduce(acc.clone().with_value(item)).await?;
            results.push(reduced.value);
        }

        Ok(acc.with_value(JsonValue::Array(results)))
    }
}

/// Short name of a JSON value's type, for error messages.
pub(crate) fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
