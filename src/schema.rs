//! Schema nodes and field type definitions.
//!
//! A schema describes the expected shape of an entity's attributes. Leaves
//! are [`TypeDef`]s: capability sets describing how to construct, reduce,
//! recognize, and merge the value of a single field. Interior nodes describe
//! nested objects, homogeneous arrays, and typed iterable containers.

use crate::error::ModelResult;
use crate::factory::FactoryOptions;
use crate::model::{self, SerializeOptions};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Constructs a typed value from raw input.
pub type FactoryFn = Arc<dyn Fn(&Value, &FactoryOptions) -> ModelResult<Value> + Send + Sync>;

/// Reduces a typed value back to plain data.
pub type SerializeFn = Arc<dyn Fn(&Value, &SerializeOptions) -> ModelResult<Value> + Send + Sync>;

/// Recognizes values already constructed by this type.
pub type InstanceOfFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Reconciles a current and an incoming value for this type.
pub type MergeDeepFn = Arc<dyn Fn(&Value, &Value) -> ModelResult<Value> + Send + Sync>;

/// A field type definition: any subset of the four capabilities.
///
/// A `TypeDef` with no factory, serialize, or merge_deep capability is not a
/// type definition at all ([`TypeDef::is_type`] returns false) and a schema
/// holding one is rejected at model definition time.
///
/// # Examples
///
/// ```
/// use carve_model::TypeDef;
/// use serde_json::json;
///
/// let upper = TypeDef::new()
///     .with_factory(|raw, _| Ok(json!(raw.as_str().unwrap_or("").to_uppercase())))
///     .with_serialize(|value, _| Ok(json!(value.as_str().unwrap_or("").to_lowercase())));
///
/// assert!(upper.is_type());
/// ```
#[derive(Clone, Default)]
pub struct TypeDef {
    factory: Option<FactoryFn>,
    serialize: Option<SerializeFn>,
    instance_of: Option<InstanceOfFn>,
    merge_deep: Option<MergeDeepFn>,
}

impl TypeDef {
    /// Create an empty capability set.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a factory capability (builder pattern).
    pub fn with_factory<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &FactoryOptions) -> ModelResult<Value> + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(f));
        self
    }

    /// Add a serialize capability (builder pattern).
    pub fn with_serialize<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &SerializeOptions) -> ModelResult<Value> + Send + Sync + 'static,
    {
        self.serialize = Some(Arc::new(f));
        self
    }

    /// Add an instance predicate capability (builder pattern).
    pub fn with_instance_of<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.instance_of = Some(Arc::new(f));
        self
    }

    /// Add a deep-merge capability (builder pattern).
    pub fn with_merge_deep<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Value) -> ModelResult<Value> + Send + Sync + 'static,
    {
        self.merge_deep = Some(Arc::new(f));
        self
    }

    /// A value is a type definition iff it can construct, reduce, or merge.
    #[inline]
    pub fn is_type(&self) -> bool {
        self.factory.is_some() || self.serialize.is_some() || self.merge_deep.is_some()
    }

    /// Whether this type can construct values.
    #[inline]
    pub fn has_factory(&self) -> bool {
        self.factory.is_some()
    }

    /// Whether this type can reduce values to plain data.
    #[inline]
    pub fn has_serialize(&self) -> bool {
        self.serialize.is_some()
    }

    /// Whether this type can recognize its own values.
    #[inline]
    pub fn has_instance_of(&self) -> bool {
        self.instance_of.is_some()
    }

    /// Whether this type opts into field-level deep merging.
    #[inline]
    pub fn has_merge_deep(&self) -> bool {
        self.merge_deep.is_some()
    }

    /// Construct a value. Without the capability the raw value passes
    /// through unchanged.
    pub fn factory(&self, raw: &Value, options: &FactoryOptions) -> ModelResult<Value> {
        match &self.factory {
            Some(f) => f(raw, options),
            None => Ok(raw.clone()),
        }
    }

    /// Reduce a value. Without the capability the value passes through
    /// unchanged.
    pub fn serialize(&self, value: &Value, options: &SerializeOptions) -> ModelResult<Value> {
        match &self.serialize {
            Some(f) => f(value, options),
            None => Ok(value.clone()),
        }
    }

    /// Reconcile a current and an incoming value. Without the capability the
    /// incoming value replaces the current one wholesale.
    pub fn merge_deep(&self, current: &Value, next: &Value) -> ModelResult<Value> {
        match &self.merge_deep {
            Some(f) => f(current, next),
            None => Ok(next.clone()),
        }
    }
}

impl fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDef")
            .field("factory", &self.factory.is_some())
            .field("serialize", &self.serialize.is_some())
            .field("instance_of", &self.instance_of.is_some())
            .field("merge_deep", &self.merge_deep.is_some())
            .finish()
    }
}

/// Check whether a value satisfies a type's instance predicate.
///
/// Conservatively false when the type has no `instance_of` capability.
#[inline]
pub fn instance_of_type(type_def: &TypeDef, value: &Value) -> bool {
    match &type_def.instance_of {
        Some(f) => f(value),
        None => false,
    }
}

/// The container kind an [`IterableSchema`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterableKind {
    /// A plain ordered list; duplicates allowed.
    List,
    /// A set; duplicates collapse to the first occurrence.
    Set,
    /// An insertion-ordered set; duplicates collapse to the first occurrence.
    OrderedSet,
}

/// A schema node for a typed iterable container.
///
/// Produced by [`list_of`], [`set_of`], and [`ordered_set_of`]. The item
/// schema applies to every element of the container.
#[derive(Debug, Clone)]
pub struct IterableSchema {
    kind: IterableKind,
    item: Box<Schema>,
}

impl IterableSchema {
    /// Create an iterable schema for the given container kind.
    pub fn new(kind: IterableKind, item: impl Into<Schema>) -> Self {
        Self {
            kind,
            item: Box::new(item.into()),
        }
    }

    /// The container kind this schema produces.
    #[inline]
    pub fn kind(&self) -> IterableKind {
        self.kind
    }

    /// The schema applied to every element.
    #[inline]
    pub fn item_schema(&self) -> &Schema {
        &self.item
    }

    /// Build the container from raw input, mapping every element through the
    /// item schema. The `defaults` option does not propagate to items.
    pub fn factory(&self, raw: &Value, options: &FactoryOptions) -> ModelResult<Value> {
        let items = raw
            .as_array()
            .ok_or_else(|| crate::ModelError::invalid_raw_entity(raw))?;

        let item_options = options.without_defaults();
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(model::apply_parse_definition(
                &self.item,
                item,
                &item_options,
            )?);
        }

        Ok(Value::Array(self.collect(out)))
    }

    /// Reduce the container to a plain array, mapping every element through
    /// the item schema.
    pub fn serialize(&self, value: &Value, options: &SerializeOptions) -> ModelResult<Value> {
        let items = value
            .as_array()
            .ok_or_else(|| crate::ModelError::invalid_raw_entity(value))?;

        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(model::apply_serialize_definition(&self.item, item, options)?);
        }

        Ok(Value::Array(out))
    }

    /// Reconcile by whole-value replacement: the container is rebuilt from
    /// the incoming value directly, never merged element-wise.
    pub fn merge_deep(&self, next: &Value) -> ModelResult<Value> {
        match next {
            Value::Array(items) => Ok(Value::Array(self.collect(items.clone()))),
            other => Ok(other.clone()),
        }
    }

    /// Apply the container kind's collection semantics.
    fn collect(&self, items: Vec<Value>) -> Vec<Value> {
        match self.kind {
            IterableKind::List => items,
            // JSON arrays are ordered, so both set kinds keep first-occurrence order.
            IterableKind::Set | IterableKind::OrderedSet => {
                let mut out: Vec<Value> = Vec::with_capacity(items.len());
                for item in items {
                    if !out.contains(&item) {
                        out.push(item);
                    }
                }
                out
            }
        }
    }
}

/// A recursive description of the expected shape of an entity's fields.
#[derive(Debug, Clone)]
pub enum Schema {
    /// A leaf type definition.
    Type(TypeDef),
    /// A nested object: a schema per field.
    Object(BTreeMap<String, Schema>),
    /// Single-element-array shorthand: the child applies to every index.
    Array(Box<Schema>),
    /// A typed iterable container.
    Iterable(IterableSchema),
}

impl Schema {
    /// An empty object schema.
    pub fn empty() -> Self {
        Schema::Object(BTreeMap::new())
    }

    /// Build an object schema from field/schema pairs.
    ///
    /// # Examples
    ///
    /// ```
    /// use carve_model::{Schema, TypeDef};
    /// use serde_json::json;
    ///
    /// let schema = Schema::object([
    ///     ("title", TypeDef::new().with_factory(|v, _| Ok(v.clone())).into()),
    ///     ("tags", Schema::array(TypeDef::new().with_serialize(|v, _| Ok(v.clone())))),
    /// ]);
    /// assert!(schema.is_valid());
    /// ```
    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Schema)>,
    {
        Schema::Object(
            fields
                .into_iter()
                .map(|(key, schema)| (key.into(), schema))
                .collect(),
        )
    }

    /// Build a homogeneous-array schema: the item schema applies to every
    /// index.
    pub fn array(item: impl Into<Schema>) -> Self {
        Schema::Array(Box::new(item.into()))
    }

    /// Look up the schema definition governing `key`.
    ///
    /// Homogeneous arrays answer with their single child for any key,
    /// objects with the child at `key`, iterables with their item schema.
    /// Leaf types govern no keys.
    pub fn definition(&self, key: &str) -> Option<&Schema> {
        match self {
            Schema::Array(item) => Some(item),
            Schema::Object(fields) => fields.get(key),
            Schema::Iterable(iterable) => Some(iterable.item_schema()),
            Schema::Type(_) => None,
        }
    }

    /// Recursive well-formedness: every reachable leaf must be a type
    /// definition; iterable schemas qualify as-is.
    pub fn is_valid(&self) -> bool {
        match self {
            Schema::Type(type_def) => type_def.is_type(),
            Schema::Object(fields) => fields.values().all(Schema::is_valid),
            Schema::Array(item) => item.is_valid(),
            Schema::Iterable(_) => true,
        }
    }

    /// The leaf type definition, when this node is one.
    #[inline]
    pub fn as_type(&self) -> Option<&TypeDef> {
        match self {
            Schema::Type(type_def) => Some(type_def),
            _ => None,
        }
    }
}

impl From<TypeDef> for Schema {
    fn from(type_def: TypeDef) -> Self {
        Schema::Type(type_def)
    }
}

impl From<IterableSchema> for Schema {
    fn from(iterable: IterableSchema) -> Self {
        Schema::Iterable(iterable)
    }
}

/// A list container of the given item schema.
pub fn list_of(item: impl Into<Schema>) -> Schema {
    IterableSchema::new(IterableKind::List, item).into()
}

/// A set container of the given item schema.
pub fn set_of(item: impl Into<Schema>) -> Schema {
    IterableSchema::new(IterableKind::Set, item).into()
}

/// An insertion-ordered set container of the given item schema.
pub fn ordered_set_of(item: impl Into<Schema>) -> Schema {
    IterableSchema::new(IterableKind::OrderedSet, item).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn noop_type() -> TypeDef {
        TypeDef::new()
            .with_factory(|v, _| Ok(v.clone()))
            .with_serialize(|v, _| Ok(v.clone()))
    }

    #[test]
    fn test_is_type() {
        assert!(TypeDef::new().with_factory(|v, _| Ok(v.clone())).is_type());
        assert!(TypeDef::new().with_serialize(|v, _| Ok(v.clone())).is_type());
        assert!(TypeDef::new()
            .with_merge_deep(|_, n| Ok(n.clone()))
            .is_type());
        // an instance predicate alone cannot construct, reduce, or merge
        assert!(!TypeDef::new().with_instance_of(|_| true).is_type());
        assert!(!TypeDef::new().is_type());
    }

    #[test]
    fn test_instance_of_type() {
        let type_def = TypeDef::new()
            .with_factory(|v, _| Ok(v.clone()))
            .with_instance_of(|v| v == &json!("a"));

        assert!(instance_of_type(&type_def, &json!("a")));
        assert!(!instance_of_type(&type_def, &json!("b")));

        let without_predicate = TypeDef::new().with_factory(|v, _| Ok(v.clone()));
        assert!(!instance_of_type(&without_predicate, &json!("a")));
    }

    #[test]
    fn test_is_valid() {
        let type_schema: Schema = noop_type().into();
        assert!(type_schema.is_valid());

        assert!(Schema::object([("a", noop_type().into())]).is_valid());
        assert!(Schema::array(noop_type()).is_valid());
        assert!(Schema::object([(
            "a",
            Schema::object([("b", noop_type().into()), ("c", Schema::array(noop_type()))]),
        )])
        .is_valid());

        // a capability-free leaf invalidates the whole schema
        assert!(!Schema::object([("a", TypeDef::new().into())]).is_valid());
    }

    #[test]
    fn test_definition_lookup() {
        let schema = Schema::object([("a", noop_type().into())]);
        assert!(schema.definition("a").is_some());
        assert!(schema.definition("b").is_none());

        let array_schema = Schema::array(noop_type());
        assert!(array_schema.definition("anything").is_some());

        let iterable = list_of(noop_type());
        assert!(iterable.definition("anything").is_some());

        let leaf: Schema = noop_type().into();
        assert!(leaf.definition("a").is_none());
    }

    #[test]
    fn test_list_of_factory_maps_items() {
        let item = TypeDef::new().with_factory(|v, _| {
            Ok(json!(format!("{}modified", v.as_str().unwrap_or_default())))
        });

        let Schema::Iterable(schema) = list_of(item) else {
            panic!("list_of must produce an iterable schema");
        };

        let result = schema
            .factory(&json!(["some", "array"]), &FactoryOptions::default())
            .unwrap();
        assert_eq!(result, json!(["somemodified", "arraymodified"]));
    }

    #[test]
    fn test_list_of_serialize_maps_items() {
        let item = TypeDef::new().with_serialize(|v, _| {
            Ok(json!(format!("{}serialized", v.as_str().unwrap_or_default())))
        });

        let Schema::Iterable(schema) = list_of(item) else {
            panic!("list_of must produce an iterable schema");
        };

        let result = schema
            .serialize(&json!(["some", "array"]), &SerializeOptions::default())
            .unwrap();
        assert_eq!(result, json!(["someserialized", "arrayserialized"]));
    }

    #[test]
    fn test_set_of_deduplicates() {
        let Schema::Iterable(schema) = set_of(noop_type()) else {
            panic!("set_of must produce an iterable schema");
        };

        let result = schema
            .factory(&json!(["a", "b", "a"]), &FactoryOptions::default())
            .unwrap();
        assert_eq!(result, json!(["a", "b"]));
    }

    #[test]
    fn test_ordered_set_of_keeps_first_occurrence_order() {
        let Schema::Iterable(schema) = ordered_set_of(noop_type()) else {
            panic!("ordered_set_of must produce an iterable schema");
        };

        let result = schema
            .factory(&json!(["c", "b", "a", "b"]), &FactoryOptions::default())
            .unwrap();
        assert_eq!(result, json!(["c", "b", "a"]));
    }

    #[test]
    fn test_iterable_merge_deep_replaces_wholesale() {
        let Schema::Iterable(schema) = set_of(noop_type()) else {
            panic!("set_of must produce an iterable schema");
        };

        let merged = schema.merge_deep(&json!(["x", "x", "y"])).unwrap();
        assert_eq!(merged, json!(["x", "y"]));
    }
}
