//! User-defined keywords.
//!
//! An [`ExtCompiler`] inspects each raw schema object and may return an
//! [`ExtSchema`], which the engine then calls on every validated value.
//!
//! ```rust
//! use serde_json::{json, Map, Value};
//! use jsonschema_core::{
//!     CompileError, Compiler, CompilerContext, ExtCompiler, ExtSchema,
//!     ValidationContext, ValidationError,
//! };
//!
//! struct PowerOf;
//!
//! impl ExtCompiler for PowerOf {
//!     fn compile(
//!         &self,
//!         _ctx: &mut CompilerContext<'_>,
//!         schema: &Map<String, Value>,
//!     ) -> Result<Option<Box<dyn ExtSchema>>, CompileError> {
//!         let Some(base) = schema.get("powerOf").and_then(Value::as_i64) else {
//!             // The keyword is absent: nothing to compile.
//!             return Ok(None);
//!         };
//!         Ok(Some(Box::new(PowerOfSchema(base))))
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct PowerOfSchema(i64);
//!
//! impl ExtSchema for PowerOfSchema {
//!     fn validate(
//!         &self,
//!         ctx: &mut ValidationContext<'_, '_, '_, '_>,
//!         instance: &Value,
//!     ) -> Result<(), ValidationError> {
//!         let Some(mut n) = instance.as_i64() else {
//!             return Ok(());
//!         };
//!         let base = self.0;
//!         while n > 1 && n % base == 0 {
//!             n /= base;
//!         }
//!         if n == 1 {
//!             Ok(())
//!         } else {
//!             Err(ctx.error("powerOf", format!("{instance} not powerOf {base}")))
//!         }
//!     }
//! }
//!
//! let mut compiler = Compiler::new();
//! compiler.register_extension(None, PowerOf);
//! compiler
//!     .add_resource_value("schema.json", json!({"powerOf": 10}))
//!     .expect("Valid resource");
//! let schema = compiler.compile("schema.json").expect("Valid schema");
//! assert!(compiler.is_valid(schema, &json!(100)));
//! assert!(!compiler.is_valid(schema, &json!(111)));
//! ```
use std::fmt;

use serde_json::{Map, Value};
use url::Url;

use crate::{
    cancel::CancelToken,
    compiler::{Compiler, SchemaRef},
    drafts::Draft,
    error::{CompileError, ErrorKind, ValidationError},
    paths::{InstancePath, Segment},
    schema::{Schema, SchemaIndex},
    uris,
    validate::{Engine, EngineError, Uneval},
};

/// Compiles custom keywords into an [`ExtSchema`].
pub trait ExtCompiler: Send + Sync {
    /// Compile the custom keywords in `schema`.
    ///
    /// Return `Ok(None)` when the keywords handled by this extension are
    /// absent.
    ///
    /// # Errors
    ///
    /// Any [`CompileError`] aborts the enclosing compile call.
    fn compile(
        &self,
        ctx: &mut CompilerContext<'_>,
        schema: &Map<String, Value>,
    ) -> Result<Option<Box<dyn ExtSchema>>, CompileError>;
}

/// The compiled form of custom keyword(s), attached to a schema node.
pub trait ExtSchema: Send + Sync + fmt::Debug {
    /// Validate `instance`; construct errors through
    /// [`ValidationContext::error`] so they fit the core error tree.
    ///
    /// # Errors
    ///
    /// A [`ValidationError`] marks the instance as failing this keyword.
    fn validate(
        &self,
        ctx: &mut ValidationContext<'_, '_, '_, '_>,
        instance: &Value,
    ) -> Result<(), ValidationError>;
}

/// Compilation context handed to extensions, exposing sub-compilation with
/// correct cycle tracking.
pub struct CompilerContext<'a> {
    pub(crate) compiler: &'a mut Compiler,
    pub(crate) res_url: &'a str,
    pub(crate) floc: &'a str,
    pub(crate) base: &'a Url,
    pub(crate) draft: Draft,
    pub(crate) stack: &'a mut Vec<SchemaRef>,
    pub(crate) cancel: &'a CancelToken,
}

impl CompilerContext<'_> {
    /// The draft the surrounding schema is compiled under.
    #[must_use]
    pub fn draft(&self) -> Draft {
        self.draft
    }

    /// Compile the value at `pointer` (relative to the current schema) into
    /// a schema node.
    ///
    /// `same_instance` tells whether the current schema and the compiled
    /// one apply to the same instance value; it keeps reference-cycle
    /// detection exact.
    ///
    /// # Errors
    ///
    /// Any [`CompileError`], including [`CompileError::InfiniteLoop`].
    pub fn compile_relative(
        &mut self,
        pointer: &str,
        same_instance: bool,
    ) -> Result<SchemaIndex, CompileError> {
        let rel = pointer.strip_prefix('/').unwrap_or(pointer);
        let floc = format!("{}/{rel}", self.floc);
        if same_instance {
            self.compiler
                .compile_at(self.res_url, floc, self.stack, rel.to_string(), self.cancel)
        } else {
            let mut fresh = Vec::new();
            self.compiler
                .compile_at(self.res_url, floc, &mut fresh, rel.to_string(), self.cancel)
        }
    }

    /// Compile the schema referenced by `reference`, resolved against the
    /// current base URL. `keyword_path` is the relative location of the
    /// referencing keyword, used in cycle reports.
    ///
    /// # Errors
    ///
    /// Any [`CompileError`], including [`CompileError::InfiniteLoop`].
    pub fn compile_ref(
        &mut self,
        reference: &str,
        keyword_path: &str,
        same_instance: bool,
    ) -> Result<SchemaIndex, CompileError> {
        let target = uris::resolve(self.base, reference)?;
        if same_instance {
            self.compiler
                .compile_url(&target, self.stack, keyword_path.to_string(), self.cancel)
        } else {
            let mut fresh = Vec::new();
            self.compiler
                .compile_url(&target, &mut fresh, keyword_path.to_string(), self.cancel)
        }
    }
}

/// Validation context handed to extensions: evaluation marking,
/// sub-validation and error construction.
pub struct ValidationContext<'e, 'c, 'v, 'p> {
    pub(crate) engine: &'e mut Engine<'c>,
    pub(crate) uneval: &'e mut Uneval<'v>,
    pub(crate) v: &'v Value,
    pub(crate) vloc: &'e InstancePath<'p>,
    pub(crate) kloc: &'e str,
    pub(crate) iloc: &'e str,
    pub(crate) sch: &'e Schema,
    pub(crate) track: bool,
    pub(crate) fatal: Option<EngineError>,
}

impl ValidationContext<'_, '_, '_, '_> {
    /// Mark a property of the current object as evaluated, for
    /// `unevaluatedProperties`.
    pub fn evaluated_prop(&mut self, name: &str) {
        self.uneval.props.remove(name);
    }

    /// Mark an index of the current array as evaluated, for
    /// `unevaluatedItems`.
    pub fn evaluated_item(&mut self, index: usize) {
        self.uneval.items.remove(&index);
    }

    /// Validate the current instance value against another schema, as
    /// in-place applicators such as `allOf` do. Evaluation annotations of a
    /// passing subschema carry over to the current frame.
    ///
    /// # Errors
    ///
    /// A [`ValidationError`] suitable for grouping into the extension's
    /// own error.
    pub fn validate_in_place(
        &mut self,
        schema: SchemaIndex,
        keyword_path: &str,
    ) -> Result<(), ValidationError> {
        let kloc = format!("{}/{keyword_path}", self.kloc);
        match self.engine.eval(schema, self.v, self.vloc, &kloc, self.track) {
            Ok(child) => {
                self.uneval.intersect(&child);
                Ok(())
            }
            Err(EngineError::Validation(error)) => Err(error),
            Err(fatal) => {
                self.fatal = Some(fatal);
                Err(self.aborted())
            }
        }
    }

    /// Validate a property value of the current object against a schema.
    ///
    /// # Errors
    ///
    /// A [`ValidationError`] suitable for grouping into the extension's
    /// own error.
    pub fn validate_property(
        &mut self,
        schema: SchemaIndex,
        keyword_path: &str,
        name: &str,
        value: &Value,
    ) -> Result<(), ValidationError> {
        let kloc = format!("{}/{keyword_path}", self.kloc);
        let vloc = self.vloc.push(Segment::Property(name));
        match self.engine.eval(schema, value, &vloc, &kloc, false) {
            Ok(_) => Ok(()),
            Err(EngineError::Validation(error)) => Err(error),
            Err(fatal) => {
                self.fatal = Some(fatal);
                Err(self.aborted())
            }
        }
    }

    /// Validate an item of the current array against a schema.
    ///
    /// # Errors
    ///
    /// A [`ValidationError`] suitable for grouping into the extension's
    /// own error.
    pub fn validate_item(
        &mut self,
        schema: SchemaIndex,
        keyword_path: &str,
        index: usize,
        value: &Value,
    ) -> Result<(), ValidationError> {
        let kloc = format!("{}/{keyword_path}", self.kloc);
        let vloc = self.vloc.push(Segment::Index(index));
        match self.engine.eval(schema, value, &vloc, &kloc, false) {
            Ok(_) => Ok(()),
            Err(EngineError::Validation(error)) => Err(error),
            Err(fatal) => {
                self.fatal = Some(fatal);
                Err(self.aborted())
            }
        }
    }

    /// Construct a validation error for the keyword at `keyword_path`
    /// (relative to the current schema), with a custom message.
    #[must_use]
    pub fn error(&self, keyword_path: &str, message: impl Into<String>) -> ValidationError {
        ValidationError::new(
            format!("{}/{keyword_path}", self.sch.location()),
            format!("{}/{keyword_path}", self.kloc),
            self.iloc.to_string(),
            ErrorKind::Custom {
                message: message.into(),
            },
        )
    }

    fn aborted(&self) -> ValidationError {
        ValidationError::new(
            self.sch.location().to_string(),
            self.kloc.to_string(),
            self.iloc.to_string(),
            ErrorKind::Custom {
                message: "validation aborted".to_string(),
            },
        )
    }
}
