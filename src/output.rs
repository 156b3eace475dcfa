//! Standard output formats for validation errors.
use serde::Serialize;

use crate::error::ValidationError;

/// A single output unit in the JSON Schema output format.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputUnit {
    pub valid: bool,
    pub keyword_location: String,
    pub absolute_keyword_location: String,
    pub instance_location: String,
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<OutputUnit>,
}

impl OutputUnit {
    fn leaf(error: &ValidationError) -> OutputUnit {
        OutputUnit {
            valid: false,
            keyword_location: error.keyword_location.clone(),
            absolute_keyword_location: error.absolute_keyword_location.clone(),
            instance_location: error.instance_location.clone(),
            error: error.kind.to_string(),
            errors: Vec::new(),
        }
    }

    fn tree(error: &ValidationError) -> OutputUnit {
        let mut unit = OutputUnit::leaf(error);
        unit.errors = error.causes.iter().map(OutputUnit::tree).collect();
        unit
    }
}

impl ValidationError {
    /// The `detailed` output format: a tree mirroring the error hierarchy.
    #[must_use]
    pub fn detailed_output(&self) -> OutputUnit {
        OutputUnit::tree(self)
    }

    /// The `basic` output format: a flat list of leaf errors.
    #[must_use]
    pub fn basic_output(&self) -> Vec<OutputUnit> {
        self.leaves().into_iter().map(OutputUnit::leaf).collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{ErrorKind, ValidationError};

    fn sample() -> ValidationError {
        let first = ValidationError::new(
            "s#/allOf/0/type".to_string(),
            "/allOf/0/type".to_string(),
            "/foo".to_string(),
            ErrorKind::Type {
                got: "string",
                want: crate::types::JsonTypeSet::empty().add(crate::types::JsonType::Number),
            },
        );
        let second = ValidationError::new(
            "s#/allOf/1/minLength".to_string(),
            "/allOf/1/minLength".to_string(),
            "/foo".to_string(),
            ErrorKind::MinLength { got: 1, want: 3 },
        );
        ValidationError::group(
            ValidationError::new(
                "s#".to_string(),
                String::new(),
                String::new(),
                ErrorKind::Group,
            ),
            vec![first, second],
        )
    }

    #[test]
    fn detailed_keeps_hierarchy() {
        let output = sample().detailed_output();
        assert!(!output.valid);
        assert_eq!(output.errors.len(), 2);
        assert!(output.errors.iter().all(|unit| unit.errors.is_empty()));
    }

    #[test]
    fn basic_flattens_to_leaves() {
        let output = sample().basic_output();
        assert_eq!(output.len(), 2);
        assert_eq!(output[0].keyword_location, "/allOf/0/type");
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let unit = sample().detailed_output();
        let rendered = serde_json::to_value(&unit).expect("Serializable");
        assert!(rendered.get("keywordLocation").is_some());
        assert!(rendered.get("absoluteKeywordLocation").is_some());
    }
}
