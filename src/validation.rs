//! Field-level validation for Folio entities.
//!
//! Every check is stateless and reports a [`FieldError`] instead of failing,
//! so a model can collect all problems in one pass. [`Validator`] is the
//! collector the models use in their `validate()` methods.

use std::fmt;

use serde::Serialize;
use validator::{ValidateLength, ValidateRange};

/// Field is missing or blank.
pub const REQUIRED: &str = "required";
/// Text is shorter than allowed.
pub const TOO_SHORT: &str = "too_short";
/// Text is longer than allowed.
pub const TOO_LONG: &str = "too_long";
/// Number outside the allowed bounds.
pub const OUT_OF_RANGE: &str = "out_of_range";
/// Value does not match the expected format.
pub const INVALID_FORMAT: &str = "invalid_format";
/// Value contains characters that are not allowed.
pub const INVALID_CHARACTERS: &str = "invalid_characters";
/// Value refers to the entity itself or to something it cannot reference.
pub const INVALID_REFERENCE: &str = "invalid_reference";
/// Hierarchy would become deeper than configured.
pub const MAX_DEPTH: &str = "max_depth";

/// A single field-level rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Name of the offending field.
    pub field: String,
    /// Human readable message.
    pub message: String,
    /// Machine readable code.
    pub code: String,
}

impl FieldError {
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check that a text value is present and not blank.
pub fn required(field: &str, value: &str) -> Option<FieldError> {
    if value.trim().is_empty() {
        return Some(FieldError::new(
            field,
            format!("{field} is required"),
            REQUIRED,
        ));
    }
    None
}

/// Check that a text value has between `min` and `max` characters.
pub fn length(field: &str, value: &str, min: usize, max: usize) -> Option<FieldError> {
    if value.validate_length(Some(min as u64), Some(max as u64), None) {
        return None;
    }
    let count = value.chars().count();
    if count < min {
        Some(FieldError::new(
            field,
            format!("{field} must be at least {min} characters"),
            TOO_SHORT,
        ))
    } else {
        Some(FieldError::new(
            field,
            format!("{field} must be at most {max} characters"),
            TOO_LONG,
        ))
    }
}

/// Check an optional text value against a maximum length.
pub fn max_length(field: &str, value: Option<&str>, max: usize) -> Option<FieldError> {
    match value {
        Some(v) if !v.validate_length(None, Some(max as u64), None) => Some(FieldError::new(
            field,
            format!("{field} must be at most {max} characters"),
            TOO_LONG,
        )),
        _ => None,
    }
}

/// Check that a number lies within `min..=max`.
pub fn range(field: &str, value: i64, min: i64, max: i64) -> Option<FieldError> {
    if value.validate_range(Some(min), Some(max), None, None) {
        return None;
    }
    Some(FieldError::new(
        field,
        format!("{field} must be between {min} and {max}"),
        OUT_OF_RANGE,
    ))
}

/// Check that a value is a `#RRGGBB` hex color.
pub fn hex_color(field: &str, value: &str) -> Option<FieldError> {
    let valid = value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        return None;
    }
    Some(FieldError::new(
        field,
        format!("{field} must be a #RRGGBB hex color"),
        INVALID_FORMAT,
    ))
}

/// Check that a name does not contain the path separator or control characters.
pub fn path_segment(field: &str, value: &str) -> Option<FieldError> {
    if value.contains('/') || value.chars().any(|c| c.is_control()) {
        return Some(FieldError::new(
            field,
            format!("{field} must not contain '/' or control characters"),
            INVALID_CHARACTERS,
        ));
    }
    None
}

/// Trim an optional text value, mapping blank input to `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Collects field errors for a model's `validate()`.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error if the check produced one.
    pub fn check(&mut self, result: Option<FieldError>) -> &mut Self {
        if let Some(error) = result {
            self.errors.push(error);
        }
        self
    }

    /// Required text with length bounds; the length check is skipped when blank.
    pub fn text(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
        if let Some(error) = required(field, value) {
            self.errors.push(error);
        } else {
            self.check(length(field, value, min, max));
        }
        self
    }

    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max: usize) -> &mut Self {
        self.check(max_length(field, value, max))
    }

    pub fn range(&mut self, field: &str, value: i64, min: i64, max: i64) -> &mut Self {
        self.check(range(field, value, min, max))
    }

    pub fn push(&mut self, error: FieldError) -> &mut Self {
        self.errors.push(error);
        self
    }

    pub fn finish(&mut self) -> Vec<FieldError> {
        std::mem::take(&mut self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required() {
        assert!(required("name", "Docs").is_none());
        let err = required("name", "   ").unwrap();
        assert_eq!(err.code, REQUIRED);
        assert_eq!(err.field, "name");
    }

    #[test]
    fn test_length_counts_characters() {
        assert!(length("name", "日本語", 1, 3).is_none());
        assert_eq!(length("name", "abcd", 1, 3).unwrap().code, TOO_LONG);
        assert_eq!(length("name", "", 1, 3).unwrap().code, TOO_SHORT);
    }

    #[test]
    fn test_max_length_optional() {
        assert!(max_length("description", None, 5).is_none());
        assert!(max_length("description", Some("12345"), 5).is_none());
        assert_eq!(
            max_length("description", Some("123456"), 5).unwrap().code,
            TOO_LONG
        );
    }

    #[test]
    fn test_range() {
        assert!(range("size", 0, 0, 10).is_none());
        assert!(range("size", 10, 0, 10).is_none());
        assert_eq!(range("size", -1, 0, 10).unwrap().code, OUT_OF_RANGE);
        assert_eq!(range("size", 11, 0, 10).unwrap().code, OUT_OF_RANGE);
    }

    #[test]
    fn test_hex_color() {
        assert!(hex_color("color", "#1a2B3c").is_none());
        assert!(hex_color("color", "1a2b3c").is_some());
        assert!(hex_color("color", "#12345g").is_some());
        assert!(hex_color("color", "#fff").is_some());
    }

    #[test]
    fn test_path_segment() {
        assert!(path_segment("name", "Reports 2024").is_none());
        assert_eq!(
            path_segment("name", "a/b").unwrap().code,
            INVALID_CHARACTERS
        );
    }

    #[test]
    fn test_normalize_optional() {
        assert_eq!(normalize_optional(Some("  x ".to_string())), Some("x".to_string()));
        assert_eq!(normalize_optional(Some("   ".to_string())), None);
        assert_eq!(normalize_optional(None), None);
    }

    #[test]
    fn test_validator_collects_all() {
        let errors = Validator::new()
            .text("name", "", 1, 10)
            .optional_text("description", Some("too long text"), 4)
            .range("level", -1, 0, 5)
            .finish();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].code, REQUIRED);
        assert_eq!(errors[1].code, TOO_LONG);
        assert_eq!(errors[2].code, OUT_OF_RANGE);
    }
}
