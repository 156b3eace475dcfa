//! Specification versions and their keyword tables.
use serde_json::Value;

use crate::error::CompileError;

/// JSON Schema specification versions.
#[non_exhaustive]
#[derive(Debug, Default, PartialEq, Copy, Clone, Hash, Eq, PartialOrd, Ord)]
pub enum Draft {
    /// JSON Schema Draft 4
    Draft4,
    /// JSON Schema Draft 6
    Draft6,
    /// JSON Schema Draft 7
    Draft7,
    /// JSON Schema Draft 2019-09
    Draft201909,
    /// JSON Schema Draft 2020-12
    #[default]
    Draft202012,
}

/// How a keyword holds subschemas.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum SubschemaKind {
    /// The keyword value is a single schema.
    One,
    /// The keyword value is an array of schemas.
    Many,
    /// The keyword value is an object whose values are schemas.
    Map,
    /// A single schema or an array of schemas (`items` before 2020-12).
    SchemaOrArray,
    /// An object whose values are schemas or arrays of property names
    /// (`dependencies` before 2019-09).
    SchemaOrStringsMap,
}

impl Draft {
    /// Identify a draft from its `$schema` URI.
    pub(crate) fn from_url(url: &str) -> Option<Draft> {
        match url.trim_end_matches('#') {
            "https://json-schema.org/draft/2020-12/schema" => Some(Draft::Draft202012),
            "https://json-schema.org/draft/2019-09/schema" => Some(Draft::Draft201909),
            "http://json-schema.org/draft-07/schema" => Some(Draft::Draft7),
            "http://json-schema.org/draft-06/schema" => Some(Draft::Draft6),
            "http://json-schema.org/draft-04/schema" => Some(Draft::Draft4),
            _ => None,
        }
    }

    /// Detect which draft applies to the given document.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::UnknownDialect`] for an unrecognized
    /// `$schema` value.
    pub fn detect(self, contents: &Value) -> Result<Draft, CompileError> {
        match contents
            .as_object()
            .and_then(|contents| contents.get("$schema"))
            .and_then(Value::as_str)
        {
            Some(url) => {
                Draft::from_url(url).ok_or_else(|| CompileError::unknown_dialect(url))
            }
            None => Ok(self),
        }
    }

    /// The URL of this draft's meta-schema.
    #[must_use]
    pub fn meta_schema_url(self) -> &'static str {
        match self {
            Draft::Draft4 => "http://json-schema.org/draft-04/schema",
            Draft::Draft6 => "http://json-schema.org/draft-06/schema",
            Draft::Draft7 => "http://json-schema.org/draft-07/schema",
            Draft::Draft201909 => "https://json-schema.org/draft/2019-09/schema",
            Draft::Draft202012 => "https://json-schema.org/draft/2020-12/schema",
        }
    }

    /// The keyword that declares a base URI: `id` in Draft 4, `$id` later.
    pub(crate) fn id_keyword(self) -> &'static str {
        match self {
            Draft::Draft4 => "id",
            _ => "$id",
        }
    }

    pub(crate) fn id_of<'a>(self, contents: &'a Value) -> Option<&'a str> {
        contents
            .as_object()
            .and_then(|schema| schema.get(self.id_keyword()))
            .and_then(Value::as_str)
    }

    /// Whether `id`/`$id` may carry a fragment and double as an anchor.
    pub(crate) fn allows_id_fragment(self) -> bool {
        self <= Draft::Draft7
    }

    pub(crate) fn has_anchor_keyword(self) -> bool {
        self >= Draft::Draft201909
    }

    pub(crate) fn has_dynamic_keywords(self) -> bool {
        self == Draft::Draft202012
    }

    pub(crate) fn has_recursive_keywords(self) -> bool {
        self == Draft::Draft201909
    }

    /// In 2019-09+ keywords adjacent to `$ref` are honored; before that
    /// `$ref` replaces the whole schema object.
    pub(crate) fn honors_ref_siblings(self) -> bool {
        self >= Draft::Draft201909
    }

    /// Whether evaluation annotations propagate back through `$ref`.
    pub(crate) fn propagates_ref_annotations(self) -> bool {
        self >= Draft::Draft201909
    }

    /// Whether `format` asserts by default under this draft.
    pub(crate) fn asserts_formats_by_default(self) -> bool {
        self <= Draft::Draft7
    }

    /// Draft 4 treats `1.0` as a number, not an integer.
    pub(crate) fn strict_integers(self) -> bool {
        self == Draft::Draft4
    }

    /// How `keyword` holds subschemas under this draft, if it does at all.
    /// Used to discover `$id` declarations and anchors without descending
    /// into non-schema values such as `enum` members.
    pub(crate) fn subschema_kind(self, keyword: &str) -> Option<SubschemaKind> {
        match keyword {
            "additionalProperties" | "not" => Some(SubschemaKind::One),
            "additionalItems" if self < Draft::Draft202012 => Some(SubschemaKind::One),
            "items" => Some(if self == Draft::Draft202012 {
                SubschemaKind::One
            } else {
                SubschemaKind::SchemaOrArray
            }),
            "prefixItems" if self == Draft::Draft202012 => Some(SubschemaKind::Many),
            "allOf" | "anyOf" | "oneOf" => Some(SubschemaKind::Many),
            "properties" | "patternProperties" | "definitions" => Some(SubschemaKind::Map),
            "$defs" if self >= Draft::Draft201909 => Some(SubschemaKind::Map),
            "dependencies" if self <= Draft::Draft7 => Some(SubschemaKind::SchemaOrStringsMap),
            "dependentSchemas" if self >= Draft::Draft201909 => Some(SubschemaKind::Map),
            "contains" | "propertyNames" if self >= Draft::Draft6 => Some(SubschemaKind::One),
            "if" | "then" | "else" if self >= Draft::Draft7 => Some(SubschemaKind::One),
            "unevaluatedProperties" | "unevaluatedItems" | "contentSchema"
                if self >= Draft::Draft201909 =>
            {
                Some(SubschemaKind::One)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(&json!({"$schema": "https://json-schema.org/draft/2020-12/schema"}), Draft::Draft202012; "2020-12")]
    #[test_case(&json!({"$schema": "https://json-schema.org/draft/2020-12/schema#"}), Draft::Draft202012; "2020-12 with empty fragment")]
    #[test_case(&json!({"$schema": "https://json-schema.org/draft/2019-09/schema"}), Draft::Draft201909; "2019-09")]
    #[test_case(&json!({"$schema": "http://json-schema.org/draft-07/schema#"}), Draft::Draft7; "draft 7")]
    #[test_case(&json!({"$schema": "http://json-schema.org/draft-06/schema#"}), Draft::Draft6; "draft 6")]
    #[test_case(&json!({"$schema": "http://json-schema.org/draft-04/schema#"}), Draft::Draft4; "draft 4")]
    #[test_case(&json!({}), Draft::Draft7; "fallback without $schema")]
    fn detection(contents: &Value, expected: Draft) {
        let detected = Draft::Draft7.detect(contents).expect("Known dialect");
        assert_eq!(detected, expected);
    }

    #[test]
    fn unknown_dialect() {
        let error = Draft::Draft7
            .detect(&json!({"$schema": "http://example.com/custom"}))
            .expect_err("Unknown dialect");
        assert_eq!(
            error.to_string(),
            "unknown dialect 'http://example.com/custom'"
        );
    }

    #[test_case(Draft::Draft4, "prefixItems", None; "no prefixItems in draft 4")]
    #[test_case(Draft::Draft202012, "prefixItems", Some(SubschemaKind::Many); "prefixItems in 2020-12")]
    #[test_case(Draft::Draft7, "dependencies", Some(SubschemaKind::SchemaOrStringsMap); "dependencies in draft 7")]
    #[test_case(Draft::Draft202012, "dependencies", None; "no dependencies in 2020-12")]
    #[test_case(Draft::Draft7, "items", Some(SubschemaKind::SchemaOrArray); "array items in draft 7")]
    #[test_case(Draft::Draft202012, "items", Some(SubschemaKind::One); "schema items in 2020-12")]
    fn keyword_tables(draft: Draft, keyword: &str, expected: Option<SubschemaKind>) {
        assert_eq!(draft.subschema_kind(keyword), expected);
    }
}
