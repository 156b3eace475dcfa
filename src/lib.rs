//! A JSON Schema compiler and validator.
//!
//! Schemas are compiled into an in-memory validation graph, then arbitrary
//! `serde_json` values are validated against it, producing hierarchical
//! error reports on failure.
//!
//! ## Supported drafts
//!
//! - Draft 2020-12 (including `$dynamicRef`/`$dynamicAnchor`)
//! - Draft 2019-09 (including `$recursiveRef`/`$recursiveAnchor`)
//! - Draft 7
//! - Draft 6
//! - Draft 4
//!
//! The draft is selected per resource from its `$schema` declaration,
//! falling back to a compiler-wide default.
//!
//! # One-off validation
//!
//! ```rust
//! use serde_json::json;
//!
//! let schema = json!({"type": "object"});
//! assert!(jsonschema_core::is_valid(&schema, &json!({"foo": "bar"})));
//! assert!(!jsonschema_core::is_valid(&schema, &json!(42)));
//! ```
//!
//! # Reusable compilers
//!
//! A [`Compiler`] holds a resource store and every schema it compiled;
//! resources may reference each other freely:
//!
//! ```rust
//! use serde_json::json;
//! use jsonschema_core::Compiler;
//!
//! let mut compiler = Compiler::new();
//! compiler
//!     .add_resource("main.json", br#"{"$ref": "obj.json"}"#)
//!     .expect("Valid JSON");
//! compiler
//!     .add_resource("obj.json", br#"{"type": "object"}"#)
//!     .expect("Valid JSON");
//! let schema = compiler.compile("main.json").expect("Valid schema");
//!
//! assert!(compiler.is_valid(schema, &json!({})));
//! let error = compiler
//!     .validate(schema, &json!(5))
//!     .expect_err("Not an object");
//! println!("{error:#}");
//! ```
//!
//! # Error reports
//!
//! Validation failures come back as a single [`ValidationError`] tree;
//! [`ValidationError::basic_output`] and
//! [`ValidationError::detailed_output`] render the standard output
//! formats.
//!
//! # Remote references
//!
//! References to `file://` URLs are loaded from disk (feature
//! `resolve-file`, enabled by default); `http(s)://` URLs require the
//! `resolve-http` feature. Additional schemes plug in through
//! [`Compiler::register_loader`].
mod cancel;
mod compiler;
mod content;
mod drafts;
mod error;
mod extension;
mod formats;
mod helpers;
mod loader;
mod meta;
mod output;
mod paths;
mod resource;
mod schema;
mod types;
mod uris;
mod validate;

pub use cancel::CancelToken;
pub use compiler::Compiler;
pub use drafts::Draft;
pub use error::{CompileError, ErrorKind, ValidateError, ValidationError};
pub use extension::{CompilerContext, ExtCompiler, ExtSchema, ValidationContext};
pub use loader::UrlLoader;
pub use output::OutputUnit;
pub use schema::{Schema, SchemaIndex};
pub use types::{JsonType, JsonTypeSet};
pub use url::Url;

use serde_json::Value;

/// Validate `instance` against `schema` in one shot.
///
/// For repeated validation, build a [`Compiler`] once and reuse the
/// compiled schema instead.
///
/// # Panics
///
/// Panics if `schema` is not a valid schema document.
#[must_use]
pub fn is_valid(schema: &Value, instance: &Value) -> bool {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value("schema.json", schema.clone())
        .expect("A fresh compiler accepts any resource");
    let compiled = compiler.must_compile("schema.json");
    compiler.is_valid(compiled, instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn one_off_validation() {
        assert!(is_valid(&json!({"minimum": 3}), &json!(5)));
        assert!(!is_valid(&json!({"minimum": 3}), &json!(2)));
    }

    #[test]
    #[should_panic(expected = "failed to compile")]
    fn one_off_rejects_bad_schemas() {
        is_valid(&json!({"type": 17}), &json!(5));
    }
}
