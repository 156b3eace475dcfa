//! The compiled schema model.
use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use fancy_regex::Regex;
use serde_json::{Number, Value};

use crate::{drafts::Draft, extension::ExtSchema, types::JsonTypeSet};

/// Handle to a compiled schema node within its owning [`crate::Compiler`].
///
/// Handles are stable for the lifetime of the compiler: compiling the same
/// location twice yields the same handle.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SchemaIndex(pub(crate) usize);

/// `items` as a single schema (Draft 2020-12 and schema-form legacy
/// drafts) or a positional list (array form before 2020-12).
#[derive(Debug)]
pub(crate) enum Items {
    Schema(SchemaIndex),
    Array(Vec<SchemaIndex>),
}

/// A statically resolved `$dynamicRef` with the anchor to re-resolve
/// through the dynamic scope, if the target declares one.
#[derive(Debug)]
pub(crate) struct DynamicRef {
    pub(crate) fallback: SchemaIndex,
    pub(crate) anchor: Option<String>,
}

/// A format assertion baked at compile time.
#[derive(Clone)]
pub(crate) struct FormatCheck {
    pub(crate) name: String,
    pub(crate) check: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
    pub(crate) assert: bool,
}

impl fmt::Debug for FormatCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatCheck")
            .field("name", &self.name)
            .field("assert", &self.assert)
            .finish_non_exhaustive()
    }
}

pub(crate) type DecodeFn =
    Arc<dyn Fn(&str) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> + Send + Sync>;
pub(crate) type MediaTypeFn =
    Arc<dyn Fn(&[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> + Send + Sync>;

#[derive(Clone)]
pub(crate) struct ContentEncoding {
    pub(crate) name: String,
    pub(crate) decode: DecodeFn,
}

impl fmt::Debug for ContentEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentEncoding")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub(crate) struct ContentMediaType {
    pub(crate) name: String,
    pub(crate) parse: MediaTypeFn,
}

impl fmt::Debug for ContentMediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentMediaType")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A compiled schema node.
///
/// One node exists per `(resource URL, JSON Pointer)` location; cyclic
/// schemas are represented as back-edges through [`SchemaIndex`]. A node is
/// immutable once its owning `compile` call returns.
#[derive(Debug, Default)]
pub struct Schema {
    pub(crate) idx: SchemaIndex,
    /// `resource URL + "#" + fragment location`.
    pub(crate) location: String,
    pub(crate) draft: Draft,
    /// The node at this schema's resource root; carries the dynamic
    /// anchor table consulted by `$dynamicRef`.
    pub(crate) resource_root: SchemaIndex,
    /// `Some` for the boolean schemas `true`/`false`.
    pub(crate) boolean: Option<bool>,

    // Reference keywords.
    pub(crate) ref_: Option<SchemaIndex>,
    pub(crate) recursive_ref: Option<SchemaIndex>,
    pub(crate) recursive_anchor: bool,
    pub(crate) dynamic_ref: Option<DynamicRef>,
    /// Populated on resource roots only.
    pub(crate) dynamic_anchors: AHashMap<String, SchemaIndex>,

    // Logic applicators.
    pub(crate) all_of: Vec<SchemaIndex>,
    pub(crate) any_of: Vec<SchemaIndex>,
    pub(crate) one_of: Vec<SchemaIndex>,
    pub(crate) not: Option<SchemaIndex>,
    pub(crate) if_: Option<SchemaIndex>,
    pub(crate) then: Option<SchemaIndex>,
    pub(crate) else_: Option<SchemaIndex>,

    // Generic keywords.
    pub(crate) types: JsonTypeSet,
    pub(crate) enum_: Option<Vec<Value>>,
    pub(crate) const_: Option<Value>,
    pub(crate) format: Option<FormatCheck>,

    // Numbers.
    pub(crate) minimum: Option<Number>,
    pub(crate) maximum: Option<Number>,
    pub(crate) exclusive_minimum: Option<Number>,
    pub(crate) exclusive_maximum: Option<Number>,
    pub(crate) multiple_of: Option<Number>,

    // Strings.
    pub(crate) min_length: Option<u64>,
    pub(crate) max_length: Option<u64>,
    pub(crate) pattern: Option<Regex>,

    // Arrays.
    pub(crate) items: Option<Items>,
    pub(crate) prefix_items: Vec<SchemaIndex>,
    pub(crate) additional_items: Option<SchemaIndex>,
    pub(crate) contains: Option<SchemaIndex>,
    pub(crate) min_contains: Option<u64>,
    pub(crate) max_contains: Option<u64>,
    pub(crate) min_items: Option<u64>,
    pub(crate) max_items: Option<u64>,
    pub(crate) unique_items: bool,

    // Objects.
    pub(crate) properties: AHashMap<String, SchemaIndex>,
    pub(crate) pattern_properties: Vec<(Regex, SchemaIndex)>,
    pub(crate) additional_properties: Option<SchemaIndex>,
    pub(crate) property_names: Option<SchemaIndex>,
    pub(crate) required: Vec<String>,
    pub(crate) dependent_required: Vec<(String, Vec<String>)>,
    pub(crate) dependent_schemas: Vec<(String, SchemaIndex)>,
    pub(crate) min_properties: Option<u64>,
    pub(crate) max_properties: Option<u64>,
    pub(crate) unevaluated_properties: Option<SchemaIndex>,
    pub(crate) unevaluated_items: Option<SchemaIndex>,

    // Content.
    pub(crate) content_encoding: Option<ContentEncoding>,
    pub(crate) content_media_type: Option<ContentMediaType>,
    pub(crate) content_schema: Option<SchemaIndex>,
    pub(crate) assert_content: bool,

    // Annotations, present iff annotation extraction was enabled.
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) comment: Option<String>,
    pub(crate) default: Option<Value>,
    pub(crate) examples: Option<Vec<Value>>,
    pub(crate) read_only: bool,
    pub(crate) write_only: bool,
    pub(crate) deprecated: bool,

    /// Compiled third-party keywords, in registration order.
    pub(crate) extensions: Vec<Box<dyn ExtSchema>>,
}

impl Schema {
    /// The schema's absolute location: resource URL plus JSON Pointer.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The draft this schema was compiled under.
    #[must_use]
    pub fn draft(&self) -> Draft {
        self.draft
    }

    /// `title`, if annotation extraction was enabled.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// `description`, if annotation extraction was enabled.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// `$comment`, if annotation extraction was enabled.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// `default`, if annotation extraction was enabled.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// `examples`, if annotation extraction was enabled.
    #[must_use]
    pub fn examples(&self) -> Option<&[Value]> {
        self.examples.as_deref()
    }

    /// `readOnly`, if annotation extraction was enabled.
    #[must_use]
    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// `writeOnly`, if annotation extraction was enabled.
    #[must_use]
    pub fn write_only(&self) -> bool {
        self.write_only
    }

    /// `deprecated`, if annotation extraction was enabled.
    #[must_use]
    pub fn deprecated(&self) -> bool {
        self.deprecated
    }
}
