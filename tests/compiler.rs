use jsonschema_core::{CancelToken, CompileError, Compiler, Url, UrlLoader};
use serde_json::json;

#[test]
fn two_documents() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource("main.json", br#"{"$ref": "obj.json"}"#)
        .expect("Valid JSON");
    compiler
        .add_resource("obj.json", br#"{"type": "object"}"#)
        .expect("Valid JSON");
    let schema = compiler.compile("main.json").expect("Valid schema");
    assert!(compiler.is_valid(schema, &json!({})));
    let error = compiler
        .validate(schema, &json!(5))
        .expect_err("Not an object");
    match error {
        jsonschema_core::ValidateError::Validation(error) => {
            assert_eq!(error.keyword_location, "/$ref/type");
        }
        other => panic!("Unexpected error: {other:?}"),
    }
}

#[test]
fn compilation_is_idempotent() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value("schema.json", json!({"type": "object"}))
        .expect("Valid resource");
    let first = compiler.compile("schema.json").expect("Valid schema");
    let second = compiler.compile("schema.json").expect("Valid schema");
    assert_eq!(first, second);
}

#[test]
fn same_instance_reference_cycle() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value("a.json", json!({"$ref": "b.json"}))
        .expect("Valid resource");
    compiler
        .add_resource_value("b.json", json!({"$ref": "a.json"}))
        .expect("Valid resource");
    let error = compiler.compile("a.json").expect_err("Infinite loop");
    match error {
        CompileError::InfiniteLoop { keyword_chain } => {
            assert!(
                keyword_chain.ends_with("$ref"),
                "Unexpected chain: {keyword_chain}"
            );
        }
        other => panic!("Unexpected error: {other}"),
    }
}

#[test]
fn cycle_through_child_instance_is_legitimate() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value(
            "list.json",
            json!({
                "type": "object",
                "properties": {
                    "next": {"$ref": "#"}
                }
            }),
        )
        .expect("Valid resource");
    let schema = compiler.compile("list.json").expect("Valid schema");
    assert!(compiler.is_valid(schema, &json!({"next": {"next": {}}})));
    assert!(!compiler.is_valid(schema, &json!({"next": 5})));
}

#[test]
fn mixed_cycle_reports_the_keyword_chain() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value(
            "chain.json",
            json!({
                "allOf": [{"$ref": "#"}]
            }),
        )
        .expect("Valid resource");
    let error = compiler.compile("chain.json").expect_err("Infinite loop");
    match error {
        CompileError::InfiniteLoop { keyword_chain } => {
            assert_eq!(keyword_chain, "allOf/0/$ref");
        }
        other => panic!("Unexpected error: {other}"),
    }
}

#[test]
fn unknown_dialect() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value(
            "schema.json",
            json!({"$schema": "http://example.com/custom-dialect"}),
        )
        .expect("Valid resource");
    let error = compiler.compile("schema.json").expect_err("Unknown dialect");
    assert!(matches!(error, CompileError::UnknownDialect { .. }));
}

#[test]
fn invalid_json_resources() {
    let mut compiler = Compiler::new();
    let error = compiler
        .add_resource("schema.json", b"{")
        .expect_err("Truncated JSON");
    assert!(matches!(error, CompileError::ParseSchema { .. }));

    let error = compiler
        .add_resource("schema.json", b"{} {}")
        .expect_err("More than one JSON value");
    assert!(matches!(error, CompileError::ParseSchema { .. }));
}

#[test]
fn missing_reference_target() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value("schema.json", json!({"$ref": "#/$defs/missing"}))
        .expect("Valid resource");
    let error = compiler.compile("schema.json").expect_err("Missing target");
    assert!(matches!(error, CompileError::UnresolvedReference { .. }));
}

#[test]
fn missing_anchor() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value("schema.json", json!({"$ref": "#nope"}))
        .expect("Valid resource");
    let error = compiler.compile("schema.json").expect_err("Missing anchor");
    assert!(matches!(error, CompileError::AnchorNotFound { .. }));
}

#[test]
fn anchors_resolve_within_their_resource() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value(
            "schema.json",
            json!({
                "$ref": "#item",
                "$defs": {
                    "x": {"$anchor": "item", "type": "integer"}
                }
            }),
        )
        .expect("Valid resource");
    let schema = compiler.compile("schema.json").expect("Valid schema");
    assert!(compiler.is_valid(schema, &json!(3)));
    assert!(!compiler.is_valid(schema, &json!("3")));
}

#[test]
fn no_partial_schemas_after_failure() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value("bad.json", json!({"$ref": "#/missing/target"}))
        .expect("Valid resource");
    compiler
        .add_resource_value("good.json", json!({"type": "string"}))
        .expect("Valid resource");
    compiler.compile("bad.json").expect_err("Missing target");
    let schema = compiler.compile("good.json").expect("Valid schema");
    assert!(compiler.is_valid(schema, &json!("ok")));
}

#[test]
fn cancelled_compilation() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value("schema.json", json!({"type": "object"}))
        .expect("Valid resource");
    let cancel = CancelToken::new();
    cancel.cancel();
    let error = compiler
        .compile_with("schema.json", &cancel)
        .expect_err("Cancelled");
    assert!(matches!(error, CompileError::Cancelled));
}

struct MapLoader;

impl UrlLoader for MapLoader {
    fn load(&self, url: &Url) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
        match url.path() {
            "/obj.json" => Ok(br#"{"type": "object"}"#.to_vec()),
            path => Err(format!("no entry for '{path}'").into()),
        }
    }
}

#[test]
fn custom_scheme_loader() {
    let mut compiler = Compiler::new();
    compiler.register_loader("map", Box::new(MapLoader));
    compiler
        .add_resource_value("schema.json", json!({"$ref": "map:///obj.json"}))
        .expect("Valid resource");
    let schema = compiler.compile("schema.json").expect("Valid schema");
    assert!(compiler.is_valid(schema, &json!({})));
    assert!(!compiler.is_valid(schema, &json!([])));
}

#[test]
fn loader_failures_are_load_errors() {
    let mut compiler = Compiler::new();
    compiler.register_loader("map", Box::new(MapLoader));
    compiler
        .add_resource_value("schema.json", json!({"$ref": "map:///missing.json"}))
        .expect("Valid resource");
    let error = compiler.compile("schema.json").expect_err("Missing entry");
    assert!(matches!(error, CompileError::Load { .. }));
}

#[test]
fn unregistered_scheme() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value("schema.json", json!({"$ref": "gopher://example.com/s.json"}))
        .expect("Valid resource");
    let error = compiler.compile("schema.json").expect_err("No loader");
    assert!(matches!(error, CompileError::UnsupportedUrlScheme { .. }));
}

#[test]
fn meta_validation_rejects_malformed_schemas() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value("schema.json", json!({"type": 123}))
        .expect("Valid resource");
    let error = compiler.compile("schema.json").expect_err("Malformed");
    assert!(matches!(error, CompileError::InvalidMetaSchema { .. }));
}

#[test]
fn keyword_checks_still_apply_without_meta_validation() {
    let mut compiler = Compiler::new();
    compiler.validate_schema(false);
    compiler
        .add_resource_value("schema.json", json!({"type": 123}))
        .expect("Valid resource");
    let error = compiler.compile("schema.json").expect_err("Malformed");
    assert!(matches!(error, CompileError::InvalidKeywordValue { .. }));
}

#[test]
fn duplicate_required_entries_are_rejected() {
    let mut compiler = Compiler::new();
    compiler.validate_schema(false);
    compiler
        .add_resource_value("schema.json", json!({"required": ["a", "a"]}))
        .expect("Valid resource");
    let error = compiler.compile("schema.json").expect_err("Duplicate");
    assert!(matches!(error, CompileError::InvalidKeywordValue { .. }));
}

#[test]
fn invalid_regex_fails_compilation() {
    let mut compiler = Compiler::new();
    compiler.validate_schema(false);
    compiler
        .add_resource_value("schema.json", json!({"pattern": "("}))
        .expect("Valid resource");
    let error = compiler.compile("schema.json").expect_err("Bad regex");
    assert!(matches!(error, CompileError::InvalidRegex { .. }));
}

#[test]
fn resource_cannot_be_replaced_after_compilation() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value("schema.json", json!({"type": "object"}))
        .expect("Valid resource");
    compiler.compile("schema.json").expect("Valid schema");
    let error = compiler
        .add_resource_value("schema.json", json!({"type": "string"}))
        .expect_err("Already compiled");
    assert!(matches!(error, CompileError::ResourceExists { .. }));
}

#[test]
fn official_meta_schemas_are_addressable() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value(
            "schema.json",
            json!({"$ref": "https://json-schema.org/draft/2020-12/schema"}),
        )
        .expect("Valid resource");
    let schema = compiler.compile("schema.json").expect("Valid schema");
    assert!(compiler.is_valid(schema, &json!({"type": "object"})));
    assert!(!compiler.is_valid(schema, &json!({"type": 12})));
}

#[test]
fn resources_are_addressable_by_root_id() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value(
            "tree.json",
            json!({
                "$id": "https://example.com/tree",
                "type": "object"
            }),
        )
        .expect("Valid resource");
    compiler
        .add_resource_value("main.json", json!({"$ref": "https://example.com/tree"}))
        .expect("Valid resource");
    let schema = compiler.compile("main.json").expect("Valid schema");
    assert!(compiler.is_valid(schema, &json!({})));
}

#[test]
fn annotations_are_extracted_on_demand() {
    let mut compiler = Compiler::new();
    compiler.extract_annotations(true);
    compiler
        .add_resource_value(
            "schema.json",
            json!({
                "title": "Person",
                "description": "A person record",
                "default": {"name": "unknown"},
                "deprecated": true,
                "type": "object"
            }),
        )
        .expect("Valid resource");
    let schema = compiler.compile("schema.json").expect("Valid schema");
    let node = compiler.schema(schema);
    assert_eq!(node.title(), Some("Person"));
    assert_eq!(node.description(), Some("A person record"));
    assert_eq!(node.default_value(), Some(&json!({"name": "unknown"})));
    assert!(node.deprecated());

    let mut plain = Compiler::new();
    plain
        .add_resource_value("schema.json", json!({"title": "Person"}))
        .expect("Valid resource");
    let schema = plain.compile("schema.json").expect("Valid schema");
    assert_eq!(plain.schema(schema).title(), None);
}

#[test]
#[should_panic(expected = "failed to compile")]
fn must_compile_panics_on_failure() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value("schema.json", json!({"$ref": "#/no/such/place"}))
        .expect("Valid resource");
    compiler.must_compile("schema.json");
}

#[test]
fn legacy_fragment_ids_act_as_anchors() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value(
            "schema.json",
            json!({
                "$schema": "http://json-schema.org/draft-07/schema#",
                "allOf": [{"$ref": "#foo"}],
                "definitions": {
                    "A": {"$id": "#foo", "type": "integer"}
                }
            }),
        )
        .expect("Valid resource");
    let schema = compiler.compile("schema.json").expect("Valid schema");
    assert!(compiler.is_valid(schema, &json!(4)));
    assert!(!compiler.is_valid(schema, &json!("4")));
}

#[test]
fn fragment_ids_are_rejected_in_modern_drafts() {
    let mut compiler = Compiler::new();
    compiler.validate_schema(false);
    compiler
        .add_resource_value(
            "schema.json",
            json!({"$defs": {"A": {"$id": "#foo"}}}),
        )
        .expect("Valid resource");
    let error = compiler.compile("schema.json").expect_err("Fragment id");
    assert!(matches!(error, CompileError::InvalidKeywordValue { .. }));
}
