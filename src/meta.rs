//! Embedded official meta-schemas and the shared meta-validators.
use ahash::AHashMap;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::{
    compiler::Compiler,
    drafts::Draft,
    error::{ErrorKind, ValidateError, ValidationError},
    schema::SchemaIndex,
    validate,
};

fn parse(text: &str) -> Value {
    serde_json::from_str(text).expect("Embedded meta-schemas are valid JSON")
}

/// The 18 documents of the five supported meta-schema families.
static DOCS: Lazy<Vec<(&'static str, Value)>> = Lazy::new(|| {
    vec![
        (
            "http://json-schema.org/draft-04/schema",
            parse(include_str!("metaschemas/draft4.json")),
        ),
        (
            "http://json-schema.org/draft-06/schema",
            parse(include_str!("metaschemas/draft6.json")),
        ),
        (
            "http://json-schema.org/draft-07/schema",
            parse(include_str!("metaschemas/draft7.json")),
        ),
        (
            "https://json-schema.org/draft/2019-09/schema",
            parse(include_str!("metaschemas/draft2019-09/schema.json")),
        ),
        (
            "https://json-schema.org/draft/2019-09/meta/core",
            parse(include_str!("metaschemas/draft2019-09/core.json")),
        ),
        (
            "https://json-schema.org/draft/2019-09/meta/applicator",
            parse(include_str!("metaschemas/draft2019-09/applicator.json")),
        ),
        (
            "https://json-schema.org/draft/2019-09/meta/validation",
            parse(include_str!("metaschemas/draft2019-09/validation.json")),
        ),
        (
            "https://json-schema.org/draft/2019-09/meta/meta-data",
            parse(include_str!("metaschemas/draft2019-09/meta-data.json")),
        ),
        (
            "https://json-schema.org/draft/2019-09/meta/format",
            parse(include_str!("metaschemas/draft2019-09/format.json")),
        ),
        (
            "https://json-schema.org/draft/2019-09/meta/content",
            parse(include_str!("metaschemas/draft2019-09/content.json")),
        ),
        (
            "https://json-schema.org/draft/2020-12/schema",
            parse(include_str!("metaschemas/draft2020-12/schema.json")),
        ),
        (
            "https://json-schema.org/draft/2020-12/meta/core",
            parse(include_str!("metaschemas/draft2020-12/core.json")),
        ),
        (
            "https://json-schema.org/draft/2020-12/meta/applicator",
            parse(include_str!("metaschemas/draft2020-12/applicator.json")),
        ),
        (
            "https://json-schema.org/draft/2020-12/meta/unevaluated",
            parse(include_str!("metaschemas/draft2020-12/unevaluated.json")),
        ),
        (
            "https://json-schema.org/draft/2020-12/meta/validation",
            parse(include_str!("metaschemas/draft2020-12/validation.json")),
        ),
        (
            "https://json-schema.org/draft/2020-12/meta/meta-data",
            parse(include_str!("metaschemas/draft2020-12/meta-data.json")),
        ),
        (
            "https://json-schema.org/draft/2020-12/meta/format-annotation",
            parse(include_str!("metaschemas/draft2020-12/format-annotation.json")),
        ),
        (
            "https://json-schema.org/draft/2020-12/meta/content",
            parse(include_str!("metaschemas/draft2020-12/content.json")),
        ),
    ]
});

pub(crate) fn is_meta_url(url: &str) -> bool {
    DOCS.iter().any(|(known, _)| *known == url)
}

/// The embedded document behind a standard meta-schema URL, so user
/// schemas may `$ref` the official dialects without any loader.
pub(crate) fn standard_resource(url: &str) -> Option<Value> {
    DOCS.iter()
        .find(|(known, _)| *known == url)
        .map(|(_, doc)| doc.clone())
}

struct MetaValidators {
    compiler: Compiler,
    roots: AHashMap<Draft, SchemaIndex>,
}

static META: Lazy<MetaValidators> = Lazy::new(|| {
    let mut compiler = Compiler::new();
    compiler.validate_schema(false);
    let mut roots = AHashMap::with_capacity(5);
    for draft in [
        Draft::Draft4,
        Draft::Draft6,
        Draft::Draft7,
        Draft::Draft201909,
        Draft::Draft202012,
    ] {
        let index = compiler
            .compile(draft.meta_schema_url())
            .expect("Embedded meta-schemas compile");
        roots.insert(draft, index);
    }
    MetaValidators { compiler, roots }
});

/// Validate a schema document against its draft's meta-schema.
pub(crate) fn validate_document(draft: Draft, doc: &Value) -> Result<(), Box<ValidationError>> {
    let meta = &*META;
    let index = meta.roots[&draft];
    match validate::validate(&meta.compiler, index, doc, None) {
        Ok(()) => Ok(()),
        Err(ValidateError::Validation(error)) => Err(error),
        Err(other) => Err(Box::new(ValidationError::new(
            draft.meta_schema_url().to_string(),
            String::new(),
            String::new(),
            ErrorKind::Custom {
                message: other.to_string(),
            },
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_well_formed_schemas() {
        for draft in [
            Draft::Draft4,
            Draft::Draft6,
            Draft::Draft7,
            Draft::Draft201909,
            Draft::Draft202012,
        ] {
            let doc = json!({"type": "object", "properties": {"a": {"type": "string"}}});
            validate_document(draft, &doc).expect("Well-formed schema");
        }
    }

    #[test]
    fn rejects_malformed_type() {
        for draft in [Draft::Draft4, Draft::Draft7, Draft::Draft202012] {
            let doc = json!({"type": 123});
            validate_document(draft, &doc).expect_err("Malformed schema");
        }
    }

    #[test]
    fn rejects_malformed_properties() {
        let doc = json!({"properties": {"a": 42}});
        validate_document(Draft::Draft202012, &doc).expect_err("Malformed schema");
    }
}
