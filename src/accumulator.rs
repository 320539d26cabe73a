//! The value-plus-context record threaded through a pipeline.

use crate::entity::EntityDescriptor;
use crate::path::PathAddress;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

/// Accumulator passed from reducer to reducer.
///
/// Reducers never mutate an accumulator in place: each one consumes the
/// accumulator it is given and returns a new one. Within a pipeline only
/// `value` changes between stages; the remaining fields describe the
/// resolution and are carried forward as they are.
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    /// Current value
    pub value: JsonValue,
    /// Value the outermost pipeline started from
    pub initial_value: JsonValue,
    /// Caller supplied parameters
    pub params: JsonValue,
    /// Caller supplied scratch values
    pub locals: JsonValue,
    /// Global values registered on the store
    pub values: Arc<JsonValue>,
    /// Entity currently being resolved, if any
    pub context: Option<Arc<EntityDescriptor>>,
    /// Number of enclosing re-entrant resolutions
    pub depth: usize,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new(JsonValue::Null)
    }
}

impl Accumulator {
    /// Creates an accumulator whose value and initial value are `value`.
    pub fn new(value: JsonValue) -> Self {
        Self {
            initial_value: value.clone(),
            value,
            params: JsonValue::Object(Map::new()),
            locals: JsonValue::Object(Map::new()),
            values: Arc::new(JsonValue::Object(Map::new())),
            context: None,
            depth: 0,
        }
    }

    /// Replaces the current value.
    pub fn with_value(mut self, value: JsonValue) -> Self {
        self.value = value;
        self
    }

    pub fn with_params(mut self, params: JsonValue) -> Self {
        self.params = params;
        self
    }

    pub fn with_locals(mut self, locals: JsonValue) -> Self {
        self.locals = locals;
        self
    }

    pub fn with_values(mut self, values: Arc<JsonValue>) -> Self {
        self.values = values;
        self
    }

    pub fn with_context(mut self, context: Option<Arc<EntityDescriptor>>) -> Self {
        self.context = context;
        self
    }

    pub(crate) fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Looks up one of the named roots (`value`, `initialValue`, `params`,
    /// `locals`, `values`) and addresses into it.
    ///
    /// Returns `None` for an unknown root; an unresolved address inside a
    /// known root yields `Some(Null)`.
    pub fn lookup(&self, root: &str, address: &PathAddress) -> Option<JsonValue> {
        let base = match root {
            "value" => &self.value,
            "initialValue" => &self.initial_value,
            "params" => &self.params,
            "locals" => &self.locals,
            "values" => self.values.as_ref(),
            _ => return None,
        };
        Some(address.resolve(base))
    }
}

impl From<JsonValue> for Accumulator {
    fn from(value: JsonValue) -> Self {
        Accumulator::new(value)
    }
}
