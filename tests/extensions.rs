use jsonschema_core::{
    CompileError, Compiler, CompilerContext, ExtCompiler, ExtSchema, ValidationContext,
    ValidationError,
};
use serde_json::{json, Map, Value};

struct PowerOf;

impl ExtCompiler for PowerOf {
    fn compile(
        &self,
        _ctx: &mut CompilerContext<'_>,
        schema: &Map<String, Value>,
    ) -> Result<Option<Box<dyn ExtSchema>>, CompileError> {
        let Some(base) = schema.get("powerOf").and_then(Value::as_i64) else {
            return Ok(None);
        };
        Ok(Some(Box::new(PowerOfSchema(base))))
    }
}

#[derive(Debug)]
struct PowerOfSchema(i64);

impl ExtSchema for PowerOfSchema {
    fn validate(
        &self,
        ctx: &mut ValidationContext<'_, '_, '_, '_>,
        instance: &Value,
    ) -> Result<(), ValidationError> {
        let Some(mut n) = instance.as_i64() else {
            return Ok(());
        };
        let base = self.0;
        while n > 1 && n % base == 0 {
            n /= base;
        }
        if n == 1 {
            Ok(())
        } else {
            Err(ctx.error("powerOf", format!("{instance} not powerOf {base}")))
        }
    }
}

fn power_of_compiler() -> Compiler {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value(
            "powerOf-meta.json",
            json!({
                "properties": {
                    "powerOf": {
                        "type": "integer",
                        "exclusiveMinimum": 0
                    }
                }
            }),
        )
        .expect("Valid resource");
    let meta = compiler.compile("powerOf-meta.json").expect("Valid schema");
    compiler.register_extension(Some(meta), PowerOf);
    compiler
}

#[test]
fn power_of() {
    let mut compiler = power_of_compiler();
    compiler
        .add_resource_value("schema.json", json!({"powerOf": 10}))
        .expect("Valid resource");
    let schema = compiler.compile("schema.json").expect("Valid schema");
    assert!(compiler.is_valid(schema, &json!(100)));
    assert!(compiler.is_valid(schema, &json!("not a number")));
    let error = compiler
        .validate(schema, &json!(111))
        .expect_err("Not a power of ten");
    assert!(error.to_string().contains("111 not powerOf 10"));
}

#[test]
fn extension_meta_schema_guards_compilation() {
    let mut compiler = power_of_compiler();
    compiler
        .add_resource_value("schema.json", json!({"powerOf": "ten"}))
        .expect("Valid resource");
    let error = compiler.compile("schema.json").expect_err("Not an integer");
    assert!(matches!(error, CompileError::InvalidMetaSchema { .. }));
}

#[test]
fn extensions_ignore_unrelated_schemas() {
    let mut compiler = power_of_compiler();
    compiler
        .add_resource_value("schema.json", json!({"type": "integer"}))
        .expect("Valid resource");
    let schema = compiler.compile("schema.json").expect("Valid schema");
    assert!(compiler.is_valid(schema, &json!(7)));
}

/// A keyword that marks every present property as evaluated, so
/// `unevaluatedProperties` no longer sees them.
struct AcceptAll;

impl ExtCompiler for AcceptAll {
    fn compile(
        &self,
        _ctx: &mut CompilerContext<'_>,
        schema: &Map<String, Value>,
    ) -> Result<Option<Box<dyn ExtSchema>>, CompileError> {
        if schema.get("acceptAllProperties") == Some(&Value::Bool(true)) {
            Ok(Some(Box::new(AcceptAllSchema)))
        } else {
            Ok(None)
        }
    }
}

#[derive(Debug)]
struct AcceptAllSchema;

impl ExtSchema for AcceptAllSchema {
    fn validate(
        &self,
        ctx: &mut ValidationContext<'_, '_, '_, '_>,
        instance: &Value,
    ) -> Result<(), ValidationError> {
        if let Some(object) = instance.as_object() {
            for name in object.keys() {
                ctx.evaluated_prop(name);
            }
        }
        Ok(())
    }
}

#[test]
fn extensions_participate_in_evaluation_tracking() {
    let mut marked = Compiler::new();
    marked.register_extension(None, AcceptAll);
    marked
        .add_resource_value(
            "schema.json",
            json!({
                "acceptAllProperties": true,
                "unevaluatedProperties": false
            }),
        )
        .expect("Valid resource");
    let schema = marked.compile("schema.json").expect("Valid schema");
    assert!(marked.is_valid(schema, &json!({"a": 1, "b": 2})));

    let mut plain = Compiler::new();
    plain
        .add_resource_value(
            "schema.json",
            json!({"unevaluatedProperties": false}),
        )
        .expect("Valid resource");
    let schema = plain.compile("schema.json").expect("Valid schema");
    assert!(!plain.is_valid(schema, &json!({"a": 1})));
}

/// A keyword that applies a sibling-defined schema to the same instance,
/// exercising sub-compilation through the extension context.
struct SelfCheck;

impl ExtCompiler for SelfCheck {
    fn compile(
        &self,
        ctx: &mut CompilerContext<'_>,
        schema: &Map<String, Value>,
    ) -> Result<Option<Box<dyn ExtSchema>>, CompileError> {
        if !schema.contains_key("selfCheck") {
            return Ok(None);
        }
        let target = ctx.compile_relative("selfCheck", true)?;
        Ok(Some(Box::new(SelfCheckSchema(target))))
    }
}

#[derive(Debug)]
struct SelfCheckSchema(jsonschema_core::SchemaIndex);

impl ExtSchema for SelfCheckSchema {
    fn validate(
        &self,
        ctx: &mut ValidationContext<'_, '_, '_, '_>,
        _instance: &Value,
    ) -> Result<(), ValidationError> {
        ctx.validate_in_place(self.0, "selfCheck")
    }
}

#[test]
fn extensions_can_request_sub_compilation() {
    let mut compiler = Compiler::new();
    compiler.register_extension(None, SelfCheck);
    compiler
        .add_resource_value(
            "schema.json",
            json!({"selfCheck": {"required": ["id"]}}),
        )
        .expect("Valid resource");
    let schema = compiler.compile("schema.json").expect("Valid schema");
    assert!(compiler.is_valid(schema, &json!({"id": 1})));
    assert!(!compiler.is_valid(schema, &json!({})));
}
