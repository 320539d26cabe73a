//! Error handling for the transform expression engine.
//!
//! Every failure surfaced by a resolution is a single [`DataPointError`].
//! The variants follow the phases a pipeline goes through: classifying the
//! tokens of an expression, binding them against the registries, and
//! executing the bound reducers.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for engine operations.
pub type DataPointResult<T> = Result<T, DataPointError>;

/// Registries a token can be looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Registry {
    /// Entity descriptors keyed by `kind:id`
    EntityStore,
    /// Custom functions keyed by `namespace.name`
    FunctionRegistry,
    /// Kind handlers keyed by kind name
    KindRegistry,
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Registry::EntityStore => write!(f, "Entity store"),
            Registry::FunctionRegistry => write!(f, "Function registry"),
            Registry::KindRegistry => write!(f, "Kind registry"),
        }
    }
}

/// Error type for every stage of a resolution.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataPointError {
    /// A token matched none of the recognised shapes
    #[error("Invalid reducer token '{token}': {message}")]
    ClassificationError { token: String, message: String },

    /// A well-formed token referenced a key that is not registered
    #[error("{registry} has no entry for '{key}'")]
    LookupError { key: String, registry: Registry },

    /// A bound reducer failed while running
    #[error("Reducer '{reducer}' failed: {message}")]
    ExecutionError { reducer: String, message: String },

    /// The network capability reported a failure
    #[error("Network request failed: {message}")]
    NetworkError {
        message: String,
        url: Option<String>,
        status: Option<u16>,
    },

    /// Invalid registration data or configuration
    #[error("Configuration error: {message}")]
    ConfigurationError {
        message: String,
        config_key: Option<String>,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    SerializationError { message: String, data_type: String },
}

impl DataPointError {
    /// Creates a classification error.
    pub fn classification(token: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ClassificationError {
            token: token.into(),
            message: message.into(),
        }
    }

    /// Creates a lookup error.
    pub fn lookup(key: impl Into<String>, registry: Registry) -> Self {
        Self::LookupError {
            key: key.into(),
            registry,
        }
    }

    /// Creates an execution error attributed to the named reducer.
    pub fn execution(reducer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExecutionError {
            reducer: reducer.into(),
            message: message.into(),
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
            url: None,
            status: None,
        }
    }

    /// Creates a network error for a request that reached the remote end.
    pub fn network_status(message: impl Into<String>, url: impl Into<String>, status: u16) -> Self {
        Self::NetworkError {
            message: message.into(),
            url: Some(url.into()),
            status: Some(status),
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            config_key: None,
        }
    }

    /// Creates a configuration error with the offending key.
    pub fn configuration_with_key(message: impl Into<String>, config_key: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            config_key: Some(config_key.into()),
        }
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
            data_type: data_type.into(),
        }
    }

    /// Gets the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            DataPointError::ClassificationError { .. } => ErrorCategory::Classification,
            DataPointError::LookupError { .. } => ErrorCategory::Lookup,
            DataPointError::ExecutionError { .. } => ErrorCategory::Execution,
            DataPointError::NetworkError { .. } => ErrorCategory::Execution,
            DataPointError::ConfigurationError { .. } => ErrorCategory::Configuration,
            DataPointError::SerializationError { .. } => ErrorCategory::Configuration,
        }
    }
}

/// Error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Token shape not recognised
    Classification,
    /// Registry miss
    Lookup,
    /// Failure while a reducer was running
    Execution,
    /// Registration or configuration problem
    Configuration,
}

impl From<serde_json::Error> for DataPointError {
    fn from(error: serde_json::Error) -> Self {
        DataPointError::serialization(error.to_string(), "json")
    }
}

impl From<toml::de::Error> for DataPointError {
    fn from(error: toml::de::Error) -> Self {
        DataPointError::serialization(error.to_string(), "toml")
    }
}

impl From<std::io::Error> for DataPointError {
    fn from(error: std::io::Error) -> Self {
        DataPointError::configuration(format!("IO error: {}", error))
    }
}

impl From<reqwest::Error> for DataPointError {
    fn from(error: reqwest::Error) -> Self {
        let message = if error.is_timeout() {
            format!("request timed out: {}", error)
        } else {
            error.to_string()
        };
        DataPointError::NetworkError {
            message,
            url: error.url().map(|url| url.to_string()),
            status: error.status().map(|status| status.as_u16()),
        }
    }
}
