//! Error types for schema compilation and instance validation.
use std::error::Error;
use std::fmt;

use serde_json::{Number, Value};

use crate::types::JsonTypeSet;

/// An error that aborts schema compilation.
///
/// Compile-time failures are fatal for the affected `compile` call; no
/// partially built schema is handed back.
#[derive(Debug)]
#[non_exhaustive]
pub enum CompileError {
    /// A location could not be parsed as a URL.
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    /// No loader is registered for the URL scheme.
    UnsupportedUrlScheme { url: String },
    /// The loader failed to fetch a resource.
    Load {
        url: String,
        source: Box<dyn Error + Send + Sync>,
    },
    /// The loaded bytes are not exactly one JSON value.
    ParseSchema {
        url: String,
        source: serde_json::Error,
    },
    /// `$schema` names a specification this crate does not know.
    UnknownDialect { dialect: String },
    /// A resource with compiled schemas is already registered at this URL.
    ResourceExists { url: String },
    /// A schema does not conform to its draft's meta-schema.
    InvalidMetaSchema {
        url: String,
        cause: Box<ValidationError>,
    },
    /// A `pattern` or `patternProperties` regex does not compile.
    InvalidRegex {
        location: String,
        pattern: String,
        source: Box<fancy_regex::Error>,
    },
    /// A keyword holds a malformed value.
    InvalidKeywordValue {
        location: String,
        keyword: &'static str,
        detail: String,
    },
    /// A schema location holds something other than an object or boolean.
    InvalidSchemaType {
        location: String,
        got: &'static str,
    },
    /// A reference points to a location that does not exist.
    UnresolvedReference { reference: String },
    /// An anchor is not declared within the target resource.
    AnchorNotFound { url: String, anchor: String },
    /// A reference cycle in which every applicator applies to the same
    /// instance value; validation could never terminate.
    InfiniteLoop { keyword_chain: String },
    /// Compilation was cancelled through a [`crate::CancelToken`].
    Cancelled,
}

impl CompileError {
    pub(crate) fn invalid_url(url: impl Into<String>, source: url::ParseError) -> CompileError {
        CompileError::InvalidUrl {
            url: url.into(),
            source,
        }
    }
    pub(crate) fn load(
        url: impl Into<String>,
        source: Box<dyn Error + Send + Sync>,
    ) -> CompileError {
        CompileError::Load {
            url: url.into(),
            source,
        }
    }
    pub(crate) fn unknown_dialect(dialect: impl Into<String>) -> CompileError {
        CompileError::UnknownDialect {
            dialect: dialect.into(),
        }
    }
    pub(crate) fn invalid_regex(
        location: impl Into<String>,
        pattern: impl Into<String>,
        source: fancy_regex::Error,
    ) -> CompileError {
        CompileError::InvalidRegex {
            location: location.into(),
            pattern: pattern.into(),
            source: Box::new(source),
        }
    }
    pub(crate) fn invalid_keyword_value(
        location: impl Into<String>,
        keyword: &'static str,
        detail: impl Into<String>,
    ) -> CompileError {
        CompileError::InvalidKeywordValue {
            location: location.into(),
            keyword,
            detail: detail.into(),
        }
    }
    pub(crate) fn unresolved_reference(reference: impl Into<String>) -> CompileError {
        CompileError::UnresolvedReference {
            reference: reference.into(),
        }
    }
    pub(crate) fn anchor_not_found(
        url: impl Into<String>,
        anchor: impl Into<String>,
    ) -> CompileError {
        CompileError::AnchorNotFound {
            url: url.into(),
            anchor: anchor.into(),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::InvalidUrl { url, source } => {
                write!(f, "invalid URL '{url}': {source}")
            }
            CompileError::UnsupportedUrlScheme { url } => {
                write!(f, "no loader registered for the scheme of '{url}'")
            }
            CompileError::Load { url, source } => {
                write!(f, "failed to load '{url}': {source}")
            }
            CompileError::ParseSchema { url, source } => {
                write!(f, "'{url}' is not a valid JSON document: {source}")
            }
            CompileError::UnknownDialect { dialect } => {
                write!(f, "unknown dialect '{dialect}'")
            }
            CompileError::ResourceExists { url } => {
                write!(f, "resource '{url}' already exists")
            }
            CompileError::InvalidMetaSchema { url, cause } => {
                write!(f, "'{url}' does not conform to its meta-schema: {cause}")
            }
            CompileError::InvalidRegex {
                location,
                pattern,
                source,
            } => {
                write!(f, "{location}: invalid regex '{pattern}': {source}")
            }
            CompileError::InvalidKeywordValue {
                location,
                keyword,
                detail,
            } => {
                write!(f, "{location}: invalid '{keyword}': {detail}")
            }
            CompileError::InvalidSchemaType { location, got } => {
                write!(f, "{location}: expected a schema object or boolean, but got {got}")
            }
            CompileError::UnresolvedReference { reference } => {
                write!(f, "reference '{reference}' does not exist")
            }
            CompileError::AnchorNotFound { url, anchor } => {
                write!(f, "anchor '{anchor}' does not exist in '{url}'")
            }
            CompileError::InfiniteLoop { keyword_chain } => {
                write!(f, "infinite loop through {keyword_chain}")
            }
            CompileError::Cancelled => f.write_str("compilation was cancelled"),
        }
    }
}

impl Error for CompileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CompileError::InvalidUrl { source, .. } => Some(source),
            CompileError::Load { source, .. } => Some(&**source),
            CompileError::ParseSchema { source, .. } => Some(source),
            CompileError::InvalidMetaSchema { cause, .. } => Some(&**cause),
            CompileError::InvalidRegex { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

/// A node of the hierarchical validation error tree.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The schema URL plus the keyword path within it.
    pub absolute_keyword_location: String,
    /// Keyword path relative to the validation root.
    pub keyword_location: String,
    /// JSON Pointer into the instance.
    pub instance_location: String,
    /// What failed.
    pub kind: ErrorKind,
    /// Errors reported by applicators and references under this node.
    pub causes: Vec<ValidationError>,
}

impl ValidationError {
    pub(crate) fn new(
        absolute_keyword_location: String,
        keyword_location: String,
        instance_location: String,
        kind: ErrorKind,
    ) -> ValidationError {
        ValidationError {
            absolute_keyword_location,
            keyword_location,
            instance_location,
            kind,
            causes: Vec::new(),
        }
    }

    /// Group `causes` under `parent`, as applicators such as `allOf` do.
    #[must_use]
    pub fn group(mut parent: ValidationError, causes: Vec<ValidationError>) -> ValidationError {
        parent.causes.extend(causes);
        parent
    }

    /// Leaf errors in depth-first order.
    pub(crate) fn leaves(&self) -> Vec<&ValidationError> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, into: &mut Vec<&'a ValidationError>) {
        if self.causes.is_empty() {
            into.push(self);
        } else {
            for cause in &self.causes {
                cause.collect_leaves(into);
            }
        }
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        for _ in 0..depth {
            f.write_str("  ")?;
        }
        write!(
            f,
            "'{}' does not validate with '{}': {}",
            self.instance_location, self.absolute_keyword_location, self.kind
        )?;
        for cause in &self.causes {
            f.write_str("\n")?;
            cause.fmt_tree(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            self.fmt_tree(f, 0)
        } else {
            write!(
                f,
                "'{}' does not validate with '{}': {}",
                self.instance_location, self.absolute_keyword_location, self.kind
            )
        }
    }
}

impl Error for ValidationError {}

fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T], quote: bool) -> fmt::Result {
    let mut first = true;
    for item in items {
        if !first {
            f.write_str(", ")?;
        }
        first = false;
        if quote {
            write!(f, "'{item}'")?;
        } else {
            write!(f, "{item}")?;
        }
    }
    Ok(())
}

/// What a single [`ValidationError`] node reports.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Summary node grouping several keyword failures at one location.
    Group,
    /// Nothing is valid against the `false` schema.
    FalseSchema,
    Type {
        got: &'static str,
        want: JsonTypeSet,
    },
    Enum {
        want: Vec<Value>,
    },
    Const {
        want: Value,
    },
    Minimum {
        got: Number,
        want: Number,
    },
    Maximum {
        got: Number,
        want: Number,
    },
    ExclusiveMinimum {
        got: Number,
        want: Number,
    },
    ExclusiveMaximum {
        got: Number,
        want: Number,
    },
    MultipleOf {
        got: Number,
        want: Number,
    },
    MinLength {
        got: usize,
        want: u64,
    },
    MaxLength {
        got: usize,
        want: u64,
    },
    Pattern {
        got: String,
        want: String,
    },
    MinItems {
        got: usize,
        want: u64,
    },
    MaxItems {
        got: usize,
        want: u64,
    },
    UniqueItems {
        first: usize,
        second: usize,
    },
    MinProperties {
        got: usize,
        want: u64,
    },
    MaxProperties {
        got: usize,
        want: u64,
    },
    Required {
        missing: Vec<String>,
    },
    DependentRequired {
        property: String,
        missing: Vec<String>,
    },
    AdditionalProperties {
        unexpected: Vec<String>,
    },
    AdditionalItems {
        limit: usize,
    },
    UnevaluatedProperties {
        unexpected: Vec<String>,
    },
    UnevaluatedItems {
        unexpected: Vec<usize>,
    },
    Contains,
    MinContains {
        got: usize,
        want: u64,
    },
    MaxContains {
        got: usize,
        want: u64,
    },
    Not,
    AnyOf,
    OneOfNone,
    OneOfMany {
        matched: Vec<usize>,
    },
    Format {
        want: String,
    },
    ContentEncoding {
        want: String,
        detail: String,
    },
    ContentMediaType {
        want: String,
        detail: String,
    },
    ContentSchema,
    /// Raised by extension keywords.
    Custom {
        message: String,
    },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Group => f.write_str("does not validate"),
            ErrorKind::FalseSchema => f.write_str("not allowed by false schema"),
            ErrorKind::Type { got, want } => write!(f, "expected {want}, but got {got}"),
            ErrorKind::Enum { want } => {
                f.write_str("value must be one of ")?;
                join(f, want, false)
            }
            ErrorKind::Const { want } => write!(f, "value must be {want}"),
            ErrorKind::Minimum { got, want } => write!(f, "must be >= {want}, but got {got}"),
            ErrorKind::Maximum { got, want } => write!(f, "must be <= {want}, but got {got}"),
            ErrorKind::ExclusiveMinimum { got, want } => {
                write!(f, "must be > {want}, but got {got}")
            }
            ErrorKind::ExclusiveMaximum { got, want } => {
                write!(f, "must be < {want}, but got {got}")
            }
            ErrorKind::MultipleOf { got, want } => {
                write!(f, "{got} is not a multiple of {want}")
            }
            ErrorKind::MinLength { got, want } => {
                write!(f, "length must be >= {want}, but got {got}")
            }
            ErrorKind::MaxLength { got, want } => {
                write!(f, "length must be <= {want}, but got {got}")
            }
            ErrorKind::Pattern { got, want } => {
                write!(f, "'{got}' does not match pattern '{want}'")
            }
            ErrorKind::MinItems { got, want } => {
                write!(f, "minimum {want} items required, but found {got} items")
            }
            ErrorKind::MaxItems { got, want } => {
                write!(f, "maximum {want} items required, but found {got} items")
            }
            ErrorKind::UniqueItems { first, second } => {
                write!(f, "items at {first} and {second} are equal")
            }
            ErrorKind::MinProperties { got, want } => {
                write!(f, "minimum {want} properties required, but found {got}")
            }
            ErrorKind::MaxProperties { got, want } => {
                write!(f, "maximum {want} properties required, but found {got}")
            }
            ErrorKind::Required { missing } => {
                f.write_str("missing properties ")?;
                join(f, missing, true)
            }
            ErrorKind::DependentRequired { property, missing } => {
                f.write_str("properties ")?;
                join(f, missing, true)?;
                write!(f, " required, if '{property}' is present")
            }
            ErrorKind::AdditionalProperties { unexpected } => {
                f.write_str("additional properties ")?;
                join(f, unexpected, true)?;
                f.write_str(" not allowed")
            }
            ErrorKind::AdditionalItems { limit } => {
                write!(f, "items at indexes >= {limit} not allowed")
            }
            ErrorKind::UnevaluatedProperties { unexpected } => {
                f.write_str("unevaluated properties ")?;
                join(f, unexpected, true)?;
                f.write_str(" not allowed")
            }
            ErrorKind::UnevaluatedItems { unexpected } => {
                f.write_str("unevaluated items at indexes ")?;
                join(f, unexpected, false)?;
                f.write_str(" not allowed")
            }
            ErrorKind::Contains => f.write_str("no items match the 'contains' schema"),
            ErrorKind::MinContains { got, want } => {
                write!(f, "minimum {want} matching items required, but found {got}")
            }
            ErrorKind::MaxContains { got, want } => {
                write!(f, "maximum {want} matching items required, but found {got}")
            }
            ErrorKind::Not => f.write_str("'not' failed"),
            ErrorKind::AnyOf => f.write_str("'anyOf' failed, none matched"),
            ErrorKind::OneOfNone => f.write_str("'oneOf' failed, none matched"),
            ErrorKind::OneOfMany { matched } => {
                f.write_str("'oneOf' failed, subschemas ")?;
                join(f, matched, false)?;
                f.write_str(" matched")
            }
            ErrorKind::Format { want } => {
                write!(f, "value is not a valid '{want}'")
            }
            ErrorKind::ContentEncoding { want, detail } => {
                write!(f, "value is not {want} encoded: {detail}")
            }
            ErrorKind::ContentMediaType { want, detail } => {
                write!(f, "value is not of media type '{want}': {detail}")
            }
            ErrorKind::ContentSchema => f.write_str("decoded content does not validate"),
            ErrorKind::Custom { message } => f.write_str(message),
        }
    }
}

/// The outcome of a failed `validate` call.
#[derive(Debug)]
#[non_exhaustive]
pub enum ValidateError {
    /// The instance does not conform to the schema.
    Validation(Box<ValidationError>),
    /// The instance holds a value this crate cannot interpret as JSON.
    InvalidJsonType {
        instance_location: String,
        detail: String,
    },
    /// Validation was cancelled through a [`crate::CancelToken`], keeping
    /// the error tree gathered so far.
    Cancelled {
        partial: Option<Box<ValidationError>>,
    },
}

impl fmt::Display for ValidateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidateError::Validation(error) => fmt::Display::fmt(error, f),
            ValidateError::InvalidJsonType {
                instance_location,
                detail,
            } => {
                write!(f, "'{instance_location}' is not a valid JSON value: {detail}")
            }
            ValidateError::Cancelled { .. } => f.write_str("validation was cancelled"),
        }
    }
}

impl Error for ValidateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ValidateError::Validation(error) => Some(&**error),
            _ => None,
        }
    }
}

impl From<ValidationError> for ValidateError {
    fn from(error: ValidationError) -> ValidateError {
        ValidateError::Validation(Box::new(error))
    }
}
