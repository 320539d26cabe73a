//! # Entity Kinds
//!
//! A kind handler turns an [`EntityDescriptor`] into a [`Reducer`]. The
//! registry maps kind names (`source`, `hash`, `model`, ...) to handlers;
//! adding a kind is a registration call, the resolver never changes.
//!
//! ## Built-in kinds
//!
//! * [`SourceKind`] - fetches a remote resource through the store's fetcher
//! * [`HashKind`] - reshapes a mapping with nested transform expressions
//! * [`ModelKind`] - runs `before`, `value` and `after` expressions in order
//!
//! [`Reducer`]: crate::reducer::Reducer

use crate::entity::EntityDescriptor;
use crate::error::{DataPointError, DataPointResult, Registry};
use crate::expression::is_identifier;
use crate::reducer::BoxedReducer;
use crate::store::Store;
use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub mod hash;
pub mod model;
pub mod source;

pub use hash::{HashKind, HashOptions};
pub use model::{ModelKind, ModelOptions};
pub use source::{SourceKind, SourceOptions};

/// Handler capability for one entity kind.
///
/// `bind` runs while a pipeline is being bound, before any reducer
/// executes, so option errors surface ahead of any I/O. The store is the
/// snapshot the pipeline was bound against.
pub trait EntityKind: Send + Sync {
    fn bind(&self, store: &Arc<Store>, entity: Arc<EntityDescriptor>) -> DataPointResult<BoxedReducer>;
}

/// Map from kind name to handler.
#[derive(Clone, Default)]
pub struct KindRegistry {
    kinds: HashMap<String, Arc<dyn EntityKind>>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with `source`, `hash` and `model` registered.
    pub fn with_builtins() -> Self {
        let mut kinds: HashMap<String, Arc<dyn EntityKind>> = HashMap::new();
        kinds.insert("source".to_string(), Arc::new(SourceKind));
        kinds.insert("hash".to_string(), Arc::new(HashKind));
        kinds.insert("model".to_string(), Arc::new(ModelKind));
        Self { kinds }
    }

    /// Registers a handler, replacing any previous one for the same kind.
    pub fn register(&mut self, name: &str, kind: Arc<dyn EntityKind>) -> DataPointResult<()> {
        if !is_identifier(name) {
            return Err(DataPointError::configuration_with_key(
                format!("Invalid kind name '{}'", name),
                name,
            ));
        }
        if self.kinds.insert(name.to_string(), kind).is_some() {
            debug!("Kind '{}' replaced", name);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> DataPointResult<Arc<dyn EntityKind>> {
        self.kinds
            .get(name)
            .cloned()
            .ok_or_else(|| DataPointError::lookup(name, Registry::KindRegistry))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    /// Registered kind names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.kinds.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl fmt::Debug for KindRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindRegistry").field("kinds", &self.names()).finish()
    }
}
