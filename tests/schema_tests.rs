//! Tests for schema-directed construction: custom field types, nested
//! shapes, homogeneous arrays, and iterable containers.

use carve_model::{
    list_of, ordered_set_of, set_of, Model, ModelError, ModelSpec, Ref, Schema, SerializeOptions,
    TypeDef,
};
use serde_json::json;

/// A field type that uppercases on construction and lowercases on reduction.
fn case_type() -> TypeDef {
    TypeDef::new()
        .with_factory(|raw, _| Ok(json!(raw.as_str().unwrap_or("").to_uppercase())))
        .with_serialize(|value, _| Ok(json!(value.as_str().unwrap_or("").to_lowercase())))
        .with_instance_of(|value| {
            value
                .as_str()
                .is_some_and(|s| !s.is_empty() && s == s.to_uppercase())
        })
}

// ============================================================================
// Schema validation at model definition
// ============================================================================

#[test]
fn test_define_rejects_capability_free_leaves() {
    let result = Model::define(
        ModelSpec::new("test").with_schema(Schema::object([("a", TypeDef::new().into())])),
    );
    assert!(matches!(result, Err(ModelError::InvalidSchema)));
}

#[test]
fn test_define_rejects_non_object_top_level_schema() {
    let result = Model::define(ModelSpec::new("test").with_schema(Schema::array(case_type())));
    assert!(matches!(result, Err(ModelError::InvalidSchema)));
}

#[test]
fn test_define_accepts_nested_valid_schema() {
    let schema = Schema::object([
        ("title", case_type().into()),
        (
            "meta",
            Schema::object([("tags", Schema::array(case_type()))]),
        ),
        ("words", set_of(case_type())),
    ]);

    assert!(Model::define(ModelSpec::new("test").with_schema(schema)).is_ok());
}

// ============================================================================
// Field types
// ============================================================================

#[test]
fn test_field_type_constructs_and_reduces() {
    let model = Model::define(
        ModelSpec::new("test").with_schema(Schema::object([("word", case_type().into())])),
    )
    .unwrap();

    let instance = model
        .factory(&json!({"word": "hello"}), Default::default())
        .unwrap();
    assert_eq!(instance["word"], "HELLO");

    let plain = model
        .serialize(&instance, SerializeOptions::default())
        .unwrap();
    assert_eq!(plain, json!({"word": "hello"}));
}

#[test]
fn test_field_type_skips_recognized_values() {
    let model = Model::define(
        ModelSpec::new("test").with_schema(Schema::object([("word", case_type().into())])),
    )
    .unwrap();

    // already an "instance" of the case type: left alone
    let instance = model
        .factory(&json!({"word": "LOUD"}), Default::default())
        .unwrap();
    assert_eq!(instance["word"], "LOUD");
}

#[test]
fn test_serialize_leaves_unrecognized_values_alone() {
    let model = Model::define(
        ModelSpec::new("test").with_schema(Schema::object([("word", case_type().into())])),
    )
    .unwrap();

    // a value the type's instance_of rejects is not reduced
    let raw = json!({"word": "already lower", "cid": "x", "typeName": "test"});
    let plain = model.serialize(&raw, SerializeOptions::default()).unwrap();
    assert_eq!(plain["word"], "already lower");
}

// ============================================================================
// Nested object and array schemas
// ============================================================================

#[test]
fn test_nested_object_schema_recurses() {
    let model = Model::define(ModelSpec::new("test").with_schema(Schema::object([(
        "outer",
        Schema::object([("inner", case_type().into())]),
    )])))
    .unwrap();

    let instance = model
        .factory(&json!({"outer": {"inner": "deep", "loose": 1}}), Default::default())
        .unwrap();

    assert_eq!(instance["outer"]["inner"], "DEEP");
    assert_eq!(instance["outer"]["loose"], 1);
}

#[test]
fn test_array_schema_applies_to_every_index() {
    let model = Model::define(
        ModelSpec::new("test").with_schema(Schema::object([("words", Schema::array(case_type()))])),
    )
    .unwrap();

    let instance = model
        .factory(&json!({"words": ["a", "b"]}), Default::default())
        .unwrap();
    assert_eq!(instance["words"], json!(["A", "B"]));

    let plain = model
        .serialize(&instance, SerializeOptions::default())
        .unwrap();
    assert_eq!(plain["words"], json!(["a", "b"]));
}

#[test]
fn test_array_schema_passes_non_array_values_through() {
    let model = Model::define(
        ModelSpec::new("test").with_schema(Schema::object([("words", Schema::array(case_type()))])),
    )
    .unwrap();

    let instance = model
        .factory(&json!({"words": "not an array"}), Default::default())
        .unwrap();
    assert_eq!(instance["words"], "not an array");
}

// ============================================================================
// Iterable containers
// ============================================================================

#[test]
fn test_list_of_models_builds_each_element() {
    let todo = Model::named("todo").unwrap();
    let board = Model::define(
        ModelSpec::new("board").with_schema(Schema::object([("todos", list_of(&todo))])),
    )
    .unwrap();

    let instance = board
        .factory(
            &json!({"todos": [{"title": "one"}, {"title": "two"}]}),
            Default::default(),
        )
        .unwrap();

    assert!(todo.collection_of(&instance["todos"]));
    assert_eq!(instance["todos"][0]["title"], "one");
    assert_eq!(instance["todos"][1]["title"], "two");
}

#[test]
fn test_set_of_collapses_duplicates() {
    let model = Model::define(
        ModelSpec::new("test").with_schema(Schema::object([("tags", set_of(case_type()))])),
    )
    .unwrap();

    let instance = model
        .factory(&json!({"tags": ["a", "b", "A"]}), Default::default())
        .unwrap();

    // "a" and "A" collide after construction
    assert_eq!(instance["tags"], json!(["A", "B"]));
}

#[test]
fn test_ordered_set_keeps_first_occurrence_order() {
    let model = Model::define(
        ModelSpec::new("test").with_schema(Schema::object([("tags", ordered_set_of(case_type()))])),
    )
    .unwrap();

    let instance = model
        .factory(&json!({"tags": ["c", "a", "b", "a"]}), Default::default())
        .unwrap();
    assert_eq!(instance["tags"], json!(["C", "A", "B"]));
}

#[test]
fn test_iterable_serializes_to_a_plain_array() {
    let todo = Model::named("todo").unwrap();
    let board = Model::define(
        ModelSpec::new("board").with_schema(Schema::object([("todos", set_of(&todo))])),
    )
    .unwrap();

    let instance = board
        .factory(&json!({"todos": [{"title": "one"}]}), Default::default())
        .unwrap();
    let plain = board
        .serialize(&instance, SerializeOptions::default())
        .unwrap();

    assert_eq!(plain, json!({"todos": [{"title": "one"}]}));
}

// ============================================================================
// References inside schemas
// ============================================================================

#[test]
fn test_parse_never_resolves_or_retypes_references() {
    let address = Model::named("address").unwrap();
    let person = Model::define(
        ModelSpec::new("person").with_schema(Schema::object([("home", Schema::from(&address))])),
    )
    .unwrap();

    let reference = Ref::create(["addresses", "primary"]).unwrap();
    let instance = person
        .factory(&json!({"home": reference.clone()}), Default::default())
        .unwrap();

    // the reference survives the typed field untouched
    assert_eq!(instance["home"], reference);
    assert!(Ref::instance_of(&instance["home"]));
}

#[test]
fn test_serialize_reduces_references_to_their_plain_shape() {
    let address = Model::named("address").unwrap();
    let person = Model::define(
        ModelSpec::new("person").with_schema(Schema::object([("home", Schema::from(&address))])),
    )
    .unwrap();

    let reference = Ref::create(["addresses", "primary"]).unwrap();
    let instance = person
        .factory(&json!({"home": reference}), Default::default())
        .unwrap();

    let plain = person
        .serialize(&instance, SerializeOptions::default())
        .unwrap();
    assert_eq!(plain["home"], json!({"path": ["addresses", "primary"]}));
}
