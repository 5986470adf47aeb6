//! Instance identity: the reserved meta attributes and the predicates built
//! on them.
//!
//! Every instance produced by a model carries two meta attributes: a
//! process-unique client identifier and the declared type name of the model
//! that produced it. Holding both is what makes a JSON object an instance.

use crate::{ModelError, ModelResult};
use serde_json::Value;

/// Meta attribute key holding the client identifier.
pub const CID: &str = "cid";

/// Meta attribute key holding the owning model's type name.
pub const TYPE_NAME: &str = "typeName";

/// Check whether a value is tagged as *some* model instance: a JSON object
/// holding both meta attributes. Safe to call on arbitrary values.
#[inline]
pub fn has_identity(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.contains_key(CID) && map.contains_key(TYPE_NAME),
        _ => false,
    }
}

/// The identity capability of one declared model: its type name and the
/// predicates for recognizing its instances.
#[derive(Clone, Debug)]
pub struct Identity {
    name: String,
}

impl Identity {
    /// Create an identity for the given type name.
    pub fn new(name: impl Into<String>) -> ModelResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(ModelError::InvalidTypeName);
        }
        Ok(Self { name })
    }

    /// The declared type name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check whether a value is an instance of this specific model: it has
    /// an identity and its tagged type name matches.
    #[inline]
    pub fn instance_of(&self, value: &Value) -> bool {
        has_identity(value)
            && value
                .get(TYPE_NAME)
                .and_then(Value::as_str)
                .is_some_and(|name| name == self.name)
    }

    /// Check whether a value is a collection whose every element is an
    /// instance of this model. Arrays are checked element-wise, objects
    /// value-wise. Empty collections qualify.
    pub fn collection_of(&self, value: &Value) -> bool {
        match value {
            Value::Array(items) => items.iter().all(|item| self.instance_of(item)),
            Value::Object(map) => {
                !has_identity(value) && map.values().all(|item| self.instance_of(item))
            }
            _ => false,
        }
    }
}
