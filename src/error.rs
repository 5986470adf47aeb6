//! Error types for model operations.

use thiserror::Error;

/// Result type alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors signalling precondition violations in model operations.
///
/// These are programmer errors: bad model declarations, wrong shapes handed
/// to `factory`, or merging data against a model that did not produce it.
/// Recoverable conditions (an attribute without a schema entry, a failed
/// `instance_of` during serialization, an unresolvable reference path) are
/// never reported through this type.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A model was declared without a usable type name.
    #[error("a non-empty type name is required to create a model")]
    InvalidTypeName,

    /// Model defaults must be a JSON object.
    #[error("defaults must be a JSON object, found {found}")]
    InvalidDefaults {
        /// The actual type found.
        found: &'static str,
    },

    /// A schema declaration failed recursive well-formedness.
    #[error("invalid schema: every reachable leaf must be a type definition")]
    InvalidSchema,

    /// Raw input to `factory` must be a JSON object.
    #[error("raw entity must be a JSON object, found {found}")]
    InvalidRawEntity {
        /// The actual type found.
        found: &'static str,
    },

    /// A parse hook returned something other than a keyed container.
    #[error("parse hook must return a JSON object, found {found}")]
    ParseHookContract {
        /// The actual type returned.
        found: &'static str,
    },

    /// `merge`/`merge_deep` was handed a base that the model did not produce.
    #[error("an instance of `{type_name}` is required to merge new attributes into it")]
    NotAnInstance {
        /// The owning model's type name.
        type_name: String,
    },

    /// Merge data must be a JSON object or a model instance.
    #[error("merge data must be a JSON object or model instance, found {found}")]
    NotMergeable {
        /// The actual type found.
        found: &'static str,
    },

    /// A value could not be parsed as a key path.
    #[error("a key path (string or array of strings) is required, found {found}")]
    InvalidKeyPath {
        /// The actual type found.
        found: &'static str,
    },

    /// A reference operation was handed a value that is not a reference.
    #[error("a reference instance is required to {operation} it")]
    NotARef {
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// Reference resolution requires a container as the root source.
    #[error("a container source is required to resolve references, found {found}")]
    InvalidSource {
        /// The actual type found.
        found: &'static str,
    },
}

impl ModelError {
    /// Create an invalid defaults error.
    #[inline]
    pub fn invalid_defaults(found: &serde_json::Value) -> Self {
        ModelError::InvalidDefaults {
            found: value_type_name(found),
        }
    }

    /// Create an invalid raw entity error.
    #[inline]
    pub fn invalid_raw_entity(found: &serde_json::Value) -> Self {
        ModelError::InvalidRawEntity {
            found: value_type_name(found),
        }
    }

    /// Create a parse hook contract error.
    #[inline]
    pub fn parse_hook_contract(found: &serde_json::Value) -> Self {
        ModelError::ParseHookContract {
            found: value_type_name(found),
        }
    }

    /// Create a not-an-instance error.
    #[inline]
    pub fn not_an_instance(type_name: impl Into<String>) -> Self {
        ModelError::NotAnInstance {
            type_name: type_name.into(),
        }
    }

    /// Create a not-mergeable error.
    #[inline]
    pub fn not_mergeable(found: &serde_json::Value) -> Self {
        ModelError::NotMergeable {
            found: value_type_name(found),
        }
    }

    /// Create an invalid key path error.
    #[inline]
    pub fn invalid_key_path(found: &serde_json::Value) -> Self {
        ModelError::InvalidKeyPath {
            found: value_type_name(found),
        }
    }

    /// Create an invalid source error.
    #[inline]
    pub fn invalid_source(found: &serde_json::Value) -> Self {
        ModelError::InvalidSource {
            found: value_type_name(found),
        }
    }
}

/// Get the type name of a JSON value.
#[inline]
pub fn value_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
