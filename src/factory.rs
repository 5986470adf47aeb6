//! Instance construction: defaults handling, raw-input merging, and meta
//! attribute stamping.

use crate::error::{ModelError, ModelResult};
use crate::identity::{CID, TYPE_NAME};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

/// A parse hook: receives the defaults-merged attributes and the factory
/// options, returns the attributes to stamp. Must return a JSON object.
pub type ParseHook = Arc<dyn Fn(&Value, &FactoryOptions) -> ModelResult<Value> + Send + Sync>;

/// Options accepted by [`crate::Model::factory`].
#[derive(Clone, Default)]
pub struct FactoryOptions {
    parse: Option<ParseHook>,
    defaults: Option<Map<String, Value>>,
}

impl FactoryOptions {
    /// Create empty options.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the parse step for this construction (builder pattern).
    ///
    /// The hook replaces the model's own schema-directed parse.
    pub fn with_parse<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value, &FactoryOptions) -> ModelResult<Value> + Send + Sync + 'static,
    {
        self.parse = Some(Arc::new(hook));
        self
    }

    /// Override the model's defaults for this construction (builder pattern).
    pub fn with_defaults(mut self, defaults: Map<String, Value>) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// The parse hook, if one was set.
    #[inline]
    pub fn parse(&self) -> Option<&ParseHook> {
        self.parse.as_ref()
    }

    /// The defaults override, if one was set.
    #[inline]
    pub fn defaults(&self) -> Option<&Map<String, Value>> {
        self.defaults.as_ref()
    }

    /// A copy of these options with the defaults dropped. Item factories of
    /// iterable schemas receive these: defaults apply to the owning entity,
    /// never to container elements.
    pub fn without_defaults(&self) -> Self {
        Self {
            parse: self.parse.clone(),
            defaults: None,
        }
    }
}

impl fmt::Debug for FactoryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryOptions")
            .field("parse", &self.parse.is_some())
            .field("defaults", &self.defaults)
            .finish()
    }
}

/// Supplies client identifiers for freshly constructed instances.
///
/// The default generator is process-unique only; callers needing global
/// uniqueness inject their own implementation (a deterministic one makes
/// instance snapshots testable).
pub trait IdGenerator: Send + Sync {
    /// Produce the next identifier.
    fn next(&self) -> String;
}

/// Process prefix shared by every [`CidGenerator`], chosen once.
fn process_prefix() -> &'static str {
    static PREFIX: OnceLock<String> = OnceLock::new();
    PREFIX.get_or_init(|| format!("cm-{}", Uuid::new_v4().simple()))
}

/// Process-wide counter shared by every [`CidGenerator`].
static COUNTER: AtomicU64 = AtomicU64::new(0);

/// The default client-identifier generator: a process-seeded random prefix
/// concatenated with a monotonically increasing counter.
#[derive(Debug, Default)]
pub struct CidGenerator;

impl CidGenerator {
    /// Create a generator using the shared process prefix and counter.
    pub fn new() -> Self {
        Self
    }
}

impl IdGenerator for CidGenerator {
    fn next(&self) -> String {
        let count = COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", process_prefix(), count)
    }
}

/// The construction capability of one declared model: its defaults and the
/// identifier generator used to stamp new instances.
#[derive(Clone)]
pub struct Factory {
    defaults: Map<String, Value>,
    id_gen: Arc<dyn IdGenerator>,
}

impl Factory {
    /// Create a factory with the given defaults. `None` means no defaults;
    /// anything other than a JSON object is rejected.
    pub fn new(defaults: Option<&Value>) -> ModelResult<Self> {
        let defaults = match defaults {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(other) => return Err(ModelError::invalid_defaults(other)),
        };

        Ok(Self {
            defaults,
            id_gen: Arc::new(CidGenerator::new()),
        })
    }

    /// Swap the identifier generator (builder pattern).
    pub fn with_id_generator(mut self, id_gen: Arc<dyn IdGenerator>) -> Self {
        self.id_gen = id_gen;
        self
    }

    /// The coerced defaults.
    #[inline]
    pub fn defaults(&self) -> &Map<String, Value> {
        &self.defaults
    }

    /// Merge raw input over the defaults; raw wins on conflicting keys.
    pub(crate) fn merged(
        &self,
        raw: &Value,
        options: &FactoryOptions,
    ) -> ModelResult<Map<String, Value>> {
        let raw_map = match raw {
            Value::Object(map) => map,
            other => return Err(ModelError::invalid_raw_entity(other)),
        };

        let mut merged = options
            .defaults()
            .cloned()
            .unwrap_or_else(|| self.defaults.clone());
        for (key, value) in raw_map {
            merged.insert(key.clone(), value.clone());
        }

        Ok(merged)
    }

    /// Stamp the meta attributes onto parsed attributes: a fresh client
    /// identifier and the owning model's type name.
    pub(crate) fn stamp(&self, mut attrs: Map<String, Value>, type_name: &str) -> Value {
        attrs.insert(CID.to_string(), Value::String(self.id_gen.next()));
        attrs.insert(
            TYPE_NAME.to_string(),
            Value::String(type_name.to_string()),
        );
        Value::Object(attrs)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("defaults", &self.defaults)
            .finish()
    }
}
