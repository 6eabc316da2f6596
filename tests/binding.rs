use bindery::config::Config;
use bindery::engine::mapping::BindOptions;
use bindery::engine_core::models::{FieldSchema, Schema};
use bindery::engine_core::outcome::Outcome;
use bindery::engine_core::value::{map_from_json, Map, Value};
use bindery::kernel::Kernel;
use serde_json::json;

fn kernel() -> Kernel {
    Kernel::new(Config::default()).unwrap()
}

fn input(v: serde_json::Value) -> Map {
    map_from_json(v)
}

#[test]
fn test_required_age_reports_field_name() {
    let kernel = kernel();
    let schema = Schema::new().field("age", FieldSchema::new("int").required().label("Age"));
    let err = kernel
        .bind(&schema, &Map::new(), &BindOptions::default())
        .unwrap_err();
    assert!(err.is(&Outcome::VAR_EMPTY));
    assert_eq!(kernel.text(&err, "default"), "Age must not be empty");
}

#[test]
fn test_default_fills_missing_value() {
    let schema = Schema::new().field("age", FieldSchema::new("int").required().default_value(18));
    let out = kernel()
        .bind(&schema, &Map::new(), &BindOptions::default())
        .unwrap();
    assert_eq!(out, input(json!({"age": 18})));
}

#[test]
fn test_nested_items_fail_on_second_element() {
    let item = Schema::new()
        .field("sku", FieldSchema::new("string").required())
        .field("qty", FieldSchema::new("int").required());
    let schema = Schema::new().field("items", FieldSchema::new("[json]").required().children(item));

    let err = kernel()
        .bind(
            &schema,
            &input(json!({"items": [{"sku": "a", "qty": 1}, {"sku": "b", "qty": "many"}]})),
            &BindOptions::default(),
        )
        .unwrap_err();
    assert!(err.is(&Outcome::VAR_ERROR));
    assert_eq!(err.args(), &[Value::from("qty")]);
}

#[test]
fn test_tolerant_mode_keeps_good_fields() {
    let schema = Schema::new()
        .field("id", FieldSchema::new("int").required())
        .field("email", FieldSchema::new("email").required())
        .field("nick", FieldSchema::new("string"));
    let out = kernel()
        .bind(
            &schema,
            &input(json!({"id": "7", "email": "nope", "nick": "ada"})),
            &BindOptions::default().tolerant(true),
        )
        .unwrap();
    assert_eq!(out, input(json!({"id": 7, "nick": "ada"})));
}

#[test]
fn test_output_depends_only_on_schema_and_input() {
    let kernel = kernel();
    let schema = Schema::new()
        .field("n", FieldSchema::new("float").required())
        .field("tags", FieldSchema::new("[string]"));
    let raw = input(json!({"n": "2.5", "tags": "a,b"}));
    let first = kernel.bind(&schema, &raw, &BindOptions::default()).unwrap();
    let second = kernel.bind(&schema, &raw, &BindOptions::default()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first["n"], Value::Float(2.5));
    assert_eq!(first["tags"], Value::list(["a", "b"]));
}

#[test]
fn test_enum_options() {
    let schema = Schema::new().field(
        "color",
        FieldSchema::new("enum").required().option("red", "Red").option("blue", "Blue"),
    );
    let kernel = kernel();
    assert!(kernel
        .bind(&schema, &input(json!({"color": "red"})), &BindOptions::default())
        .is_ok());
    let err = kernel
        .bind(&schema, &input(json!({"color": "green"})), &BindOptions::default())
        .unwrap_err();
    assert!(err.is(&Outcome::VAR_ERROR));
}

#[test]
fn test_encoded_field_decodes_back() {
    let kernel = kernel();
    let schema = Schema::new().field("uid", FieldSchema::new("int").required().encode("digit"));
    let out = kernel
        .bind(&schema, &input(json!({"uid": 42})), &BindOptions::default())
        .unwrap();
    let code = out["uid"].as_str().unwrap().to_string();
    assert_eq!(kernel.codecs().decrypt_digit(&code).unwrap(), 42);

    let back = Schema::new().field("uid", FieldSchema::new("int").required().decode("digit"));
    let out = kernel
        .bind(&back, &input(json!({"uid": code})), &BindOptions::default())
        .unwrap();
    assert_eq!(out["uid"], Value::Int(42));
}

#[test]
fn test_integer_list_field_encodes_as_digits() {
    let kernel = kernel();
    let schema = Schema::new().field("ids", FieldSchema::new("[int]").required().encode("digits"));
    let out = kernel
        .bind(&schema, &input(json!({"ids": [3, 1, 4]})), &BindOptions::default())
        .unwrap();
    let code = out["ids"].as_str().unwrap().to_string();
    assert_eq!(kernel.codecs().decrypt_digits(&code).unwrap(), vec![3, 1, 4]);

    let back = Schema::new().field("ids", FieldSchema::new("[int]").required().decode("digits"));
    let out = kernel
        .bind(&back, &input(json!({"ids": code})), &BindOptions::default())
        .unwrap();
    assert_eq!(out["ids"], Value::list([3i64, 1, 4]));
}
