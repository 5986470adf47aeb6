//! Schema-directed immutable model layer over plain JSON values.
//!
//! `carve-model` turns raw JSON-like data into identity-tagged model
//! instances: it merges declared defaults, recursively parses nested values
//! according to a schema, and stamps each instance with a client identifier
//! and its type name. The same schema drives the reverse direction,
//! serializing instances back to plain data.
//!
//! # Core Concepts
//!
//! - **Model**: A declared entity type; owns a type name, defaults, and a schema
//! - **Schema**: Maps attribute keys to type definitions, nested shapes, or
//!   homogeneous containers
//! - **TypeDef**: The capability set of one schema'd type (factory, serialize,
//!   instance-of, deep-merge)
//! - **Ref**: A lazy pointer into an external data source, resolved on demand
//! - **KeyPath**: An ordered sequence of string keys addressing nested data
//!
//! # Pure Transitions
//!
//! Every operation is a pure function over `serde_json::Value`: inputs are
//! never mutated, and merging an instance always produces a new instance
//! that keeps the original's `cid` and `typeName`.
//!
//! # Quick Start
//!
//! ```
//! use carve_model::{Model, ModelSpec, SerializeOptions};
//! use serde_json::json;
//!
//! let person = Model::define(
//!     ModelSpec::new("person").with_defaults(json!({"age": 0, "tags": []})),
//! ).unwrap();
//!
//! // Construct an instance: defaults fill in, raw input wins, meta is stamped
//! let alice = person.factory(&json!({"name": "Alice"}), Default::default()).unwrap();
//! assert_eq!(alice["name"], "Alice");
//! assert_eq!(alice["age"], 0);
//! assert_eq!(alice["typeName"], "person");
//! assert!(person.instance_of(&alice));
//!
//! // Merge produces a new instance; identity survives
//! let older = person.merge(&alice, &json!({"age": 30})).unwrap();
//! assert_eq!(older["age"], 30);
//! assert_eq!(older["cid"], alice["cid"]);
//! assert_eq!(alice["age"], 0); // original untouched
//!
//! // Serialize strips the meta attributes
//! let plain = person.serialize(&older, SerializeOptions::default()).unwrap();
//! assert!(plain.get("cid").is_none());
//! ```
//!
//! # Nested Models
//!
//! Models participate in other models' schemas as schema types:
//!
//! ```
//! use carve_model::{Model, ModelSpec, Schema};
//! use serde_json::json;
//!
//! let address = Model::named("address").unwrap();
//! let person = Model::define(
//!     ModelSpec::new("person")
//!         .with_schema(Schema::object([("home", Schema::from(&address))])),
//! ).unwrap();
//!
//! let p = person
//!     .factory(&json!({"home": {"city": "Utrecht"}}), Default::default())
//!     .unwrap();
//! assert!(address.instance_of(&p["home"]));
//! ```

mod error;
mod factory;
mod identity;
mod key_path;
mod merge;
mod model;
mod reference;
mod schema;

// Core types
pub use error::{value_type_name, ModelError, ModelResult};
pub use identity::{has_identity, Identity, CID, TYPE_NAME};
pub use key_path::KeyPath;
pub use model::{Model, ModelSpec, ParseOptions, SerializeOptions};

// Schema types
pub use schema::{
    instance_of_type, list_of, ordered_set_of, set_of, FactoryFn, InstanceOfFn, IterableKind,
    IterableSchema, MergeDeepFn, Schema, SerializeFn, TypeDef,
};

// Construction types
pub use factory::{CidGenerator, Factory, FactoryOptions, IdGenerator, ParseHook};

// References
pub use reference::{Ref, REF_TYPE_NAME};

// Re-export serde_json::Value for convenience
pub use serde_json::Value;
