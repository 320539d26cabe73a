//! # DataPoint
//!
//! A declarative data-aggregation engine. Callers register entities
//! (remote sources, reshaping hashes, models) and custom functions, then
//! describe how to combine them with a pipe-delimited transform
//! expression such as `source:getOrgInfo | $repos_url | string.trim()`.
//!
//! ## Core Components
//!
//! * `expression` - Transform expression parsing and token classification
//! * `resolve` - Reducer resolver and the sequential resolution engine
//! * `reducer` - Executable pipeline steps
//! * `accumulator` - Value-plus-context record threaded through a pipeline
//! * `entity` - Entity keys, descriptors, hooks and the entity store
//! * `function` - Custom function registry and built-in functions
//! * `kind` - Kind handlers (`source`, `hash`, `model`) and their registry
//! * `fetch` - Network capability used by `source` entities
//! * `store` - Immutable snapshot of all registries
//! * `datapoint` - Facade with registration and atomic hot reload
//! * `config` - File and environment configuration
//! * `error` - Error types and handling
//!
//! ## Architecture
//!
//! A resolution classifies every token of an expression, binds each one to
//! a reducer against a single [`Store`] snapshot, then folds an
//! [`Accumulator`] through the reducers strictly left to right. The first
//! failing stage aborts the pipeline. Independent resolutions may run
//! concurrently over the same store because nothing mutates a published
//! store.

pub mod accumulator;
pub mod config;
pub mod datapoint;
pub mod entity;
pub mod error;
pub mod expression;
pub mod fetch;
pub mod function;
pub mod kind;
pub mod logging;
pub mod path;
pub mod reducer;
pub mod resolve;
pub mod store;
pub mod template;

// Re-export main types for convenience
pub use accumulator::Accumulator;
pub use config::{EngineConfig, HttpConfig, LoggingConfig, ResolutionConfig};
pub use datapoint::DataPoint;
pub use entity::{AfterRequest, BeforeRequest, EntityDescriptor, EntityKey, EntityStore, RequestControl};
pub use error::{DataPointError, DataPointResult, ErrorCategory, Registry};
pub use expression::{classify, ReducerToken, TokenKind, TransformExpression};
pub use fetch::{Fetcher, HttpFetcher, HttpMethod, MockFetcher, SourceRequest};
pub use function::{AsyncFunction, FunctionRegistry, ReducerFunction, SyncFunction};
pub use kind::{EntityKind, KindRegistry};
pub use path::PathAddress;
pub use reducer::{BoxedReducer, Reducer};
pub use resolve::{bind_token, get_reducer_function, resolve, resolve_reducer, BoundResolver};
pub use store::Store;
