//! Lazy references: key-path pointers into an external root data source.
//!
//! A reference is an instance of the reserved `__reference` model whose sole
//! declared attribute is its path. References are never resolved
//! automatically: parse leaves them alone and serialize reduces them to
//! their plain `{"path": [...]}` shape. Resolution is always an explicit
//! operation against an explicit source.

use crate::error::{ModelError, ModelResult};
use crate::identity::{CID, TYPE_NAME};
use crate::key_path::KeyPath;
use crate::model::{Model, ModelSpec};
use serde_json::{json, Value};
use std::sync::OnceLock;

/// The reserved type name of reference instances.
pub const REF_TYPE_NAME: &str = "__reference";

/// The reference model and its operations.
pub struct Ref;

impl Ref {
    /// The reserved reference model.
    pub fn model() -> &'static Model {
        static MODEL: OnceLock<Model> = OnceLock::new();
        MODEL.get_or_init(|| {
            Model::define(ModelSpec::new(REF_TYPE_NAME).with_defaults(json!({ "path": null })))
                .expect("reference model definition is valid (programming error)")
        })
    }

    /// Create a reference to the given key path.
    pub fn create(path: impl Into<KeyPath>) -> ModelResult<Value> {
        let path = path.into();
        Self::model().factory(&json!({ "path": path.to_value() }), Default::default())
    }

    /// Create a reference from a raw JSON path value (a string or an array
    /// of strings).
    pub fn parse(path: &Value) -> ModelResult<Value> {
        Self::create(KeyPath::parse(path)?)
    }

    /// Check whether a value is a reference instance.
    #[inline]
    pub fn instance_of(value: &Value) -> bool {
        Self::model().instance_of(value)
    }

    /// Check whether a value is a collection of reference instances.
    #[inline]
    pub fn collection_of(value: &Value) -> bool {
        Self::model().collection_of(value)
    }

    /// The key path a reference points at.
    pub fn path(reference: &Value) -> ModelResult<KeyPath> {
        if !Self::instance_of(reference) {
            return Err(ModelError::NotARef {
                operation: "read the path of",
            });
        }

        KeyPath::parse(reference.get("path").unwrap_or(&Value::Null))
    }

    /// Reduce a reference to its plain external shape: `{"path": [...]}`.
    pub fn serialize(reference: &Value) -> Value {
        match reference {
            Value::Object(map) => {
                let mut out = map.clone();
                out.remove(CID);
                out.remove(TYPE_NAME);
                Value::Object(out)
            }
            other => other.clone(),
        }
    }

    /// Resolve a reference against a root source.
    ///
    /// An unresolvable path is not an error: `Ok(None)` says the source has
    /// nothing at that location.
    pub fn resolve(reference: &Value, source: &Value) -> ModelResult<Option<Value>> {
        if !Self::instance_of(reference) {
            return Err(ModelError::NotARef {
                operation: "resolve",
            });
        }
        require_container(source)?;

        let path = Self::path(reference)?;
        Ok(get_in(source, &path).cloned())
    }

    /// Resolve an ordered collection of references, preserving order and
    /// absent entries.
    pub fn resolve_collection(refs: &Value, source: &Value) -> ModelResult<Vec<Option<Value>>> {
        if !Self::collection_of(refs) {
            return Err(ModelError::NotARef {
                operation: "resolve a collection of",
            });
        }
        require_container(source)?;

        let mut out = Vec::new();
        match refs {
            Value::Array(items) => {
                for reference in items {
                    out.push(Self::resolve(reference, source)?);
                }
            }
            Value::Object(map) => {
                for reference in map.values() {
                    out.push(Self::resolve(reference, source)?);
                }
            }
            _ => {}
        }

        Ok(out)
    }

    /// Replace references found in `subject` at the given paths with their
    /// resolved values from `source`.
    ///
    /// At each path the addressed value is replaced when it is a reference
    /// or a collection of references; anything else stays untouched. The
    /// walk then descends along the remaining path segments. Returns a new
    /// subject; the original is untouched.
    ///
    /// Absent targets materialize as JSON null, including a first segment
    /// the subject has no entry for. Subjects must be keyed objects: key
    /// paths are string-keyed, so indexed containers are not addressable
    /// here.
    pub fn replace_in(source: &Value, subject: &Value, paths: &[KeyPath]) -> ModelResult<Value> {
        require_container(source)?;
        let subject_map = match subject {
            Value::Object(map) => map,
            other => return Err(ModelError::invalid_source(other)),
        };

        let mut out = subject_map.clone();
        for path in paths {
            let Some(first) = path.first() else {
                continue;
            };

            let mut replaced = match out.get(first) {
                Some(current) => Self::replace_value(current, source)?,
                None => Value::Null,
            };

            let rest = path.rest();
            if !rest.is_empty() && replaced.is_object() {
                replaced = Self::replace_in(source, &replaced, &[rest])?;
            }

            out.insert(first.to_string(), replaced);
        }

        Ok(Value::Object(out))
    }

    /// Resolve one addressed value: a reference, a collection of
    /// references, or anything else (untouched).
    fn replace_value(value: &Value, source: &Value) -> ModelResult<Value> {
        if Self::instance_of(value) {
            return Ok(Self::resolve(value, source)?.unwrap_or(Value::Null));
        }

        if Self::collection_of(value) {
            return match value {
                Value::Array(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for reference in items {
                        out.push(Self::resolve(reference, source)?.unwrap_or(Value::Null));
                    }
                    Ok(Value::Array(out))
                }
                Value::Object(map) => {
                    let mut out = map.clone();
                    for (key, reference) in map {
                        out.insert(
                            key.clone(),
                            Self::resolve(reference, source)?.unwrap_or(Value::Null),
                        );
                    }
                    Ok(Value::Object(out))
                }
                _ => Ok(value.clone()),
            };
        }

        Ok(value.clone())
    }
}

fn require_container(source: &Value) -> ModelResult<()> {
    if source.is_object() || source.is_array() {
        Ok(())
    } else {
        Err(ModelError::invalid_source(source))
    }
}

/// Walk a key path through nested objects. Any missing or non-object
/// intermediate ends the walk.
fn get_in<'a>(source: &'a Value, path: &KeyPath) -> Option<&'a Value> {
    let mut current = source;
    for segment in path.segments() {
        current = current.get(segment)?;
    }
    Some(current)
}
