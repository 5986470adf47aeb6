//! The model composition root.
//!
//! A [`Model`] binds identity, construction, schema-directed parse/serialize,
//! and the merge engine into one capability set per declared type. Models
//! are cheap-clone handles; every operation takes `&self` and closures may
//! capture a clone, so nothing depends on an implicit receiver.

use crate::error::{ModelError, ModelResult};
use crate::factory::{Factory, FactoryOptions, IdGenerator};
use crate::identity::{Identity, CID, TYPE_NAME};
use crate::merge;
use crate::reference::Ref;
use crate::schema::{instance_of_type, Schema, TypeDef};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Options accepted by [`Model::parse`].
#[derive(Clone, Debug, Default)]
pub struct ParseOptions {
    schema: Option<Schema>,
}

impl ParseOptions {
    /// Create empty options.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse against this schema instead of the model's own (builder
    /// pattern). Used when recursing into nested structures.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// Options accepted by [`Model::serialize`].
#[derive(Clone, Debug)]
pub struct SerializeOptions {
    /// Strip the `cid`/`typeName` meta attributes from the top-level result.
    /// Defaults to true.
    pub omit_meta: bool,
    schema: Option<Schema>,
}

impl SerializeOptions {
    /// Create default options (`omit_meta` true).
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep or strip the meta attributes (builder pattern).
    pub fn with_omit_meta(mut self, omit_meta: bool) -> Self {
        self.omit_meta = omit_meta;
        self
    }

    /// Serialize against this schema instead of the model's own (builder
    /// pattern).
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            omit_meta: true,
            schema: None,
        }
    }
}

/// Backwards compatibility with the 1.x positional-boolean form, where the
/// second argument to `serialize` was the `omit_meta` flag itself.
impl From<bool> for SerializeOptions {
    fn from(omit_meta: bool) -> Self {
        tracing::warn!(
            "passing a bare bool to serialize is deprecated; use SerializeOptions instead"
        );
        SerializeOptions::new().with_omit_meta(omit_meta)
    }
}

/// Declaration of a model: its type name, defaults, and schema.
///
/// # Examples
///
/// ```
/// use carve_model::{Model, ModelSpec};
/// use serde_json::json;
///
/// let todo = Model::define(
///     ModelSpec::new("todo").with_defaults(json!({"done": false})),
/// ).unwrap();
///
/// let instance = todo.factory(&json!({"title": "write docs"}), Default::default()).unwrap();
/// assert_eq!(instance["done"], false);
/// assert!(todo.instance_of(&instance));
/// ```
pub struct ModelSpec {
    type_name: String,
    defaults: Option<Value>,
    schema: Option<Schema>,
    id_gen: Option<Arc<dyn IdGenerator>>,
}

impl ModelSpec {
    /// Declare a model with the given type name.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            defaults: None,
            schema: None,
            id_gen: None,
        }
    }

    /// Per-field default values; must be a JSON object (builder pattern).
    pub fn with_defaults(mut self, defaults: Value) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// The schema governing this model's fields (builder pattern).
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Swap the client-identifier generator, e.g. for deterministic tests
    /// (builder pattern).
    pub fn with_id_generator(mut self, id_gen: impl IdGenerator + 'static) -> Self {
        self.id_gen = Some(Arc::new(id_gen));
        self
    }
}

impl fmt::Debug for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSpec")
            .field("type_name", &self.type_name)
            .field("defaults", &self.defaults)
            .field("schema", &self.schema)
            .finish()
    }
}

struct ModelInner {
    identity: Identity,
    factory: Factory,
    schema: Schema,
}

/// A declared model: identity, construction, parse/serialize, and merging
/// for one type of instance.
///
/// Cloning is cheap (the definition is shared behind an `Arc`) and the
/// definition is immutable once created.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

impl Model {
    /// Define a model from a full spec.
    ///
    /// Fails fast on an empty type name, non-object defaults, or a schema
    /// whose leaves are not type definitions.
    pub fn define(spec: ModelSpec) -> ModelResult<Self> {
        let identity = Identity::new(spec.type_name)?;

        let mut factory = Factory::new(spec.defaults.as_ref())?;
        if let Some(id_gen) = spec.id_gen {
            factory = factory.with_id_generator(id_gen);
        }

        let schema = match spec.schema {
            None => Schema::empty(),
            Some(schema) => {
                if !matches!(schema, Schema::Object(_)) || !schema.is_valid() {
                    return Err(ModelError::InvalidSchema);
                }
                schema
            }
        };

        Ok(Self {
            inner: Arc::new(ModelInner {
                identity,
                factory,
                schema,
            }),
        })
    }

    /// Define a model from a type name alone.
    pub fn named(type_name: impl Into<String>) -> ModelResult<Self> {
        Self::define(ModelSpec::new(type_name))
    }

    /// The declared type name.
    #[inline]
    pub fn type_name(&self) -> &str {
        self.inner.identity.name()
    }

    /// The model's default attributes.
    #[inline]
    pub fn defaults(&self) -> &Map<String, Value> {
        self.inner.factory.defaults()
    }

    /// The model's schema.
    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// Check whether a value is an instance of this model.
    #[inline]
    pub fn instance_of(&self, value: &Value) -> bool {
        self.inner.identity.instance_of(value)
    }

    /// Check whether a value is a collection of this model's instances.
    #[inline]
    pub fn collection_of(&self, value: &Value) -> bool {
        self.inner.identity.collection_of(value)
    }

    /// Construct a fresh instance from raw input.
    ///
    /// The raw attributes are merged over the defaults (raw wins), run
    /// through the parse step (the `parse` option if given, otherwise the
    /// model's schema-directed parse), and stamped with the meta attributes.
    pub fn factory(&self, raw: &Value, options: FactoryOptions) -> ModelResult<Value> {
        let merged = self.inner.factory.merged(raw, &options)?;
        let entity = Value::Object(merged);

        let parsed = match options.parse() {
            Some(hook) => hook(&entity, &options)?,
            None => self.parse(&entity, ParseOptions::default())?,
        };

        let Value::Object(attrs) = parsed else {
            return Err(ModelError::parse_hook_contract(&parsed));
        };

        Ok(self.inner.factory.stamp(attrs, self.type_name()))
    }

    /// Schema-directed construction of attribute values.
    ///
    /// Attributes without a schema definition pass through unchanged, as do
    /// falsy values, values a field type already recognizes as its own, and
    /// references (never resolved or re-typed here). Nested object and array
    /// schemas recurse; iterable schemas build their container.
    pub fn parse(&self, attrs: &Value, options: ParseOptions) -> ModelResult<Value> {
        let schema = options.schema.as_ref().unwrap_or(&self.inner.schema);
        parse_value(schema, attrs, &FactoryOptions::default())
    }

    /// Schema-directed reduction of an instance to plain data.
    ///
    /// The symmetric inverse of [`Model::parse`]. A field whose type rejects
    /// the value via `instance_of` passes through unchanged. With
    /// `omit_meta` (the default) the meta attributes are stripped from the
    /// top-level result only.
    ///
    /// Accepts a bare `bool` in place of options for 1.x compatibility; the
    /// flag is the `omit_meta` value.
    pub fn serialize(
        &self,
        instance: &Value,
        options: impl Into<SerializeOptions>,
    ) -> ModelResult<Value> {
        let mut options = options.into();

        if !instance.is_object() && !instance.is_array() {
            return Err(ModelError::invalid_raw_entity(instance));
        }

        // Consume the schema override here so nested model types fall back
        // to their own schemas while walking.
        let schema = options.schema.take();
        let schema = schema.as_ref().unwrap_or(&self.inner.schema);

        let partial = serialize_value(schema, instance, &options)?;

        if options.omit_meta {
            if let Value::Object(mut map) = partial {
                map.remove(CID);
                map.remove(TYPE_NAME);
                return Ok(Value::Object(map));
            }
        }

        Ok(partial)
    }

    /// Shallow-merge new attributes into an instance of this model.
    ///
    /// Returns a new instance; the original is untouched and keeps its
    /// `cid`.
    #[inline]
    pub fn merge(&self, base: &Value, data: &Value) -> ModelResult<Value> {
        merge::merge(self, base, data)
    }

    /// Schema-aware deep merge of new attributes into an instance of this
    /// model.
    ///
    /// Ungoverned fields merge structurally: objects key-wise, arrays
    /// index-wise, scalars replace. A field type exposing `merge_deep` is
    /// delegated to; nested object schemas recurse; any structural mismatch
    /// (and every iterable-typed field) replaces wholesale.
    #[inline]
    pub fn merge_deep(&self, base: &Value, data: &Value) -> ModelResult<Value> {
        merge::merge_deep(self, base, data)
    }

    /// This model as a field type definition, usable inside other models'
    /// schemas.
    ///
    /// The capabilities close over a clone of the model handle, which is
    /// also the escape hatch for self-referential construction: a model's
    /// own type can appear in its schema-building closure without any
    /// late-bound context.
    pub fn as_type(&self) -> TypeDef {
        let for_factory = self.clone();
        let for_serialize = self.clone();
        let for_instance = self.clone();
        let for_merge = self.clone();

        TypeDef::new()
            .with_factory(move |raw, options| for_factory.factory(raw, options.clone()))
            .with_serialize(move |value, options| for_serialize.serialize(value, options.clone()))
            .with_instance_of(move |value| for_instance.instance_of(value))
            .with_merge_deep(move |current, next| for_merge.merge_deep(current, next))
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("type_name", &self.type_name())
            .field("defaults", self.defaults())
            .field("schema", self.schema())
            .finish()
    }
}

impl From<&Model> for Schema {
    fn from(model: &Model) -> Self {
        Schema::Type(model.as_type())
    }
}

/// JS-style falsiness: values a field type is never handed.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Walk a value against a schema, constructing typed field values.
pub(crate) fn parse_value(
    schema: &Schema,
    value: &Value,
    options: &FactoryOptions,
) -> ModelResult<Value> {
    match (schema, value) {
        (Schema::Object(fields), Value::Object(attrs)) => {
            let mut out = Map::new();
            for (key, attr) in attrs {
                let parsed = match fields.get(key) {
                    Some(definition) if !is_falsy(attr) => {
                        apply_parse_definition(definition, attr, options)?
                    }
                    _ => attr.clone(),
                };
                out.insert(key.clone(), parsed);
            }
            Ok(Value::Object(out))
        }
        (Schema::Array(item), Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for entry in items {
                if is_falsy(entry) {
                    out.push(entry.clone());
                } else {
                    out.push(apply_parse_definition(item, entry, options)?);
                }
            }
            Ok(Value::Array(out))
        }
        (Schema::Iterable(iterable), Value::Array(_)) => iterable.factory(value, options),
        (Schema::Type(_), _) => apply_parse_definition(schema, value, options),
        // shape mismatch: leave the value alone
        _ => Ok(value.clone()),
    }
}

/// Apply one schema definition to one value during parse.
pub(crate) fn apply_parse_definition(
    definition: &Schema,
    value: &Value,
    options: &FactoryOptions,
) -> ModelResult<Value> {
    match definition {
        Schema::Type(type_def) => {
            // already constructed, or a lazy reference: nothing to do
            if !type_def.has_factory()
                || instance_of_type(type_def, value)
                || Ref::instance_of(value)
            {
                Ok(value.clone())
            } else {
                type_def.factory(value, options)
            }
        }
        Schema::Object(_) if value.is_object() => parse_value(definition, value, options),
        Schema::Array(_) if value.is_array() => parse_value(definition, value, options),
        Schema::Iterable(iterable) if value.is_array() => iterable.factory(value, options),
        _ => Ok(value.clone()),
    }
}

/// Walk a value against a schema, reducing typed field values to plain data.
pub(crate) fn serialize_value(
    schema: &Schema,
    value: &Value,
    options: &SerializeOptions,
) -> ModelResult<Value> {
    match (schema, value) {
        (Schema::Object(fields), Value::Object(attrs)) => {
            let mut out = Map::new();
            for (key, attr) in attrs {
                let serialized = match fields.get(key) {
                    Some(definition) if !is_falsy(attr) => {
                        apply_serialize_definition(definition, attr, options)?
                    }
                    _ => attr.clone(),
                };
                out.insert(key.clone(), serialized);
            }
            Ok(Value::Object(out))
        }
        (Schema::Array(item), Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for entry in items {
                if is_falsy(entry) {
                    out.push(entry.clone());
                } else {
                    out.push(apply_serialize_definition(item, entry, options)?);
                }
            }
            Ok(Value::Array(out))
        }
        (Schema::Iterable(iterable), Value::Array(_)) => iterable.serialize(value, options),
        (Schema::Type(_), _) => apply_serialize_definition(schema, value, options),
        _ => Ok(value.clone()),
    }
}

/// Apply one schema definition to one value during serialize.
pub(crate) fn apply_serialize_definition(
    definition: &Schema,
    value: &Value,
    options: &SerializeOptions,
) -> ModelResult<Value> {
    match definition {
        Schema::Type(type_def) => {
            if Ref::instance_of(value) {
                return Ok(Ref::serialize(value));
            }

            // non-strict: a value the type does not recognize stays as-is
            if !type_def.has_serialize()
                || (type_def.has_instance_of() && !instance_of_type(type_def, value))
            {
                Ok(value.clone())
            } else {
                type_def.serialize(value, options)
            }
        }
        Schema::Object(_) if value.is_object() => serialize_value(definition, value, options),
        Schema::Array(_) if value.is_array() => serialize_value(definition, value, options),
        Schema::Iterable(iterable) if value.is_array() => iterable.serialize(value, options),
        _ => Ok(value.clone()),
    }
}
