//! The merge engine: shallow and schema-aware deep merging of new
//! attributes into an existing instance.
//!
//! Both operations are pure: they produce a new instance and leave the base
//! untouched, and the base's meta attributes always survive.

use crate::error::{ModelError, ModelResult};
use crate::factory::FactoryOptions;
use crate::identity::{CID, TYPE_NAME};
use crate::model::Model;
use crate::schema::Schema;
use serde_json::{Map, Value};

/// Shallow-merge `data` into `base`, an instance of `model`.
///
/// Present keys of `data` overwrite; every other key of `base`, including
/// `cid` and `typeName`, survives.
pub(crate) fn merge(model: &Model, base: &Value, data: &Value) -> ModelResult<Value> {
    let base_map = instance_attrs(model, base)?;
    let mergeable = mergeable_instance(model, data)?;

    let mut out = base_map.clone();
    for (key, value) in mergeable {
        out.insert(key, value);
    }

    Ok(Value::Object(out))
}

/// Schema-aware deep merge of `data` into `base`, an instance of `model`.
pub(crate) fn merge_deep(model: &Model, base: &Value, data: &Value) -> ModelResult<Value> {
    let base_map = instance_attrs(model, base)?;
    let mergeable = mergeable_instance(model, data)?;

    let merged = merge_deep_with(base_map, &mergeable, Some(model.schema()))?;
    Ok(Value::Object(merged))
}

/// Require `base` to be an instance of the owning model.
fn instance_attrs<'a>(model: &Model, base: &'a Value) -> ModelResult<&'a Map<String, Value>> {
    match base {
        Value::Object(map) if model.instance_of(base) => Ok(map),
        _ => Err(ModelError::not_an_instance(model.type_name())),
    }
}

/// Normalize merge data into plain mergeable attributes.
///
/// Data that is already an instance of the model is used as-is. Anything
/// else is run through the model's factory and then filtered back down to
/// the keys actually present in the raw data, so defaults introduced by the
/// factory never leak into the merge as unintended overwrites. The meta
/// attributes are stripped either way.
fn mergeable_instance(model: &Model, data: &Value) -> ModelResult<Map<String, Value>> {
    let mut attrs = if model.instance_of(data) {
        match data {
            Value::Object(map) => map.clone(),
            _ => return Err(ModelError::not_mergeable(data)),
        }
    } else {
        let Value::Object(raw) = data else {
            return Err(ModelError::not_mergeable(data));
        };

        let built = model.factory(data, FactoryOptions::default())?;
        match built {
            Value::Object(map) => map
                .into_iter()
                .filter(|(key, _)| raw.contains_key(key))
                .collect(),
            other => return Err(ModelError::parse_hook_contract(&other)),
        }
    };

    attrs.remove(CID);
    attrs.remove(TYPE_NAME);
    Ok(attrs)
}

/// The recursive dual-path merge policy.
///
/// Fields without a schema definition merge structurally (objects key-wise,
/// arrays index-wise, scalars replace). Governed fields:
/// a type with a `merge_deep` capability is delegated to; a type without one
/// replaces; iterable schemas rebuild from the incoming value; nested object
/// schemas recurse when both sides are objects and replace otherwise.
fn merge_deep_with(
    current: &Map<String, Value>,
    next: &Map<String, Value>,
    schema: Option<&Schema>,
) -> ModelResult<Map<String, Value>> {
    let mut out = current.clone();

    for (key, next_value) in next {
        let current_value = current.get(key);
        let definition = schema.and_then(|s| s.definition(key));

        let merged = match definition {
            Some(Schema::Type(type_def)) if type_def.is_type() => match current_value {
                Some(current_value) if type_def.has_merge_deep() => {
                    type_def.merge_deep(current_value, next_value)?
                }
                _ => next_value.clone(),
            },
            Some(Schema::Iterable(iterable)) => iterable.merge_deep(next_value)?,
            Some(definition @ Schema::Object(_)) => match (current_value, next_value) {
                (Some(Value::Object(current_map)), Value::Object(next_map)) => Value::Object(
                    merge_deep_with(current_map, next_map, Some(definition))?,
                ),
                // structural mismatch: replace wholesale
                _ => next_value.clone(),
            },
            Some(Schema::Array(_)) => next_value.clone(),
            // ungoverned, or a schema entry with no capabilities
            _ => deep_merge_value(current_value, next_value),
        };

        out.insert(key.clone(), merged);
    }

    Ok(out)
}

/// Generic structural merge for ungoverned fields: objects merge key-wise,
/// arrays index-wise (surplus base elements survive), scalars are replaced
/// by the incoming value.
fn deep_merge_value(current: Option<&Value>, next: &Value) -> Value {
    match (current, next) {
        (Some(Value::Object(current_map)), Value::Object(next_map)) => {
            let mut out = current_map.clone();
            for (key, value) in next_map {
                out.insert(key.clone(), deep_merge_value(current_map.get(key), value));
            }
            Value::Object(out)
        }
        (Some(Value::Array(current_items)), Value::Array(next_items)) => {
            let mut out = current_items.clone();
            for (index, value) in next_items.iter().enumerate() {
                let merged = deep_merge_value(current_items.get(index), value);
                if index < out.len() {
                    out[index] = merged;
                } else {
                    out.push(merged);
                }
            }
            Value::Array(out)
        }
        _ => next.clone(),
    }
}
