//! JSON instance types and compact sets of them for the `type` keyword.
use std::fmt;

use serde_json::Value;

/// The seven JSON Schema instance types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JsonType {
    Array,
    Boolean,
    Integer,
    Null,
    Number,
    Object,
    String,
}

impl JsonType {
    pub(crate) fn from_keyword(keyword: &str) -> Option<JsonType> {
        match keyword {
            "array" => Some(JsonType::Array),
            "boolean" => Some(JsonType::Boolean),
            "integer" => Some(JsonType::Integer),
            "null" => Some(JsonType::Null),
            "number" => Some(JsonType::Number),
            "object" => Some(JsonType::Object),
            "string" => Some(JsonType::String),
            _ => None,
        }
    }

    const fn as_bit(self) -> u8 {
        match self {
            JsonType::Array => 1,
            JsonType::Boolean => 1 << 1,
            JsonType::Integer => 1 << 2,
            JsonType::Null => 1 << 3,
            JsonType::Number => 1 << 4,
            JsonType::Object => 1 << 5,
            JsonType::String => 1 << 6,
        }
    }

    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            JsonType::Array => "array",
            JsonType::Boolean => "boolean",
            JsonType::Integer => "integer",
            JsonType::Null => "null",
            JsonType::Number => "number",
            JsonType::Object => "object",
            JsonType::String => "string",
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The name of the primitive type of a JSON value ("integer" is never
/// returned; numeric refinement is draft-dependent).
pub(crate) fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A set of [`JsonType`] backed by a bit mask.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct JsonTypeSet(u8);

impl JsonTypeSet {
    pub(crate) const fn empty() -> JsonTypeSet {
        JsonTypeSet(0)
    }

    pub(crate) const fn add(self, ty: JsonType) -> JsonTypeSet {
        JsonTypeSet(self.0 | ty.as_bit())
    }

    pub(crate) const fn contains(self, ty: JsonType) -> bool {
        self.0 & ty.as_bit() != 0
    }

    pub(crate) const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub(crate) fn iter(self) -> impl Iterator<Item = JsonType> {
        [
            JsonType::Array,
            JsonType::Boolean,
            JsonType::Integer,
            JsonType::Null,
            JsonType::Number,
            JsonType::Object,
            JsonType::String,
        ]
        .into_iter()
        .filter(move |ty| self.contains(*ty))
    }
}

impl fmt::Display for JsonTypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for ty in self.iter() {
            if !first {
                f.write_str(" or ")?;
            }
            first = false;
            fmt::Display::fmt(&ty, f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_membership() {
        let types = JsonTypeSet::empty()
            .add(JsonType::Object)
            .add(JsonType::Null);
        assert!(types.contains(JsonType::Object));
        assert!(types.contains(JsonType::Null));
        assert!(!types.contains(JsonType::String));
        assert_eq!(types.to_string(), "null or object");
    }
}
