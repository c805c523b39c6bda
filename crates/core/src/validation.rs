//! Field-level validation errors.
//!
//! Input DTOs expose a `validate()` method that collects every problem at
//! once, so a form can highlight all invalid fields in a single round trip.

use std::fmt;

use serde::Serialize;

use crate::Email;

/// One invalid field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Dotted path of the field in the request body, e.g. `shippingAddress.city`.
    pub field: String,
    pub message: String,
}

/// A set of invalid fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub fields: Vec<FieldError>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.fields.iter().map(|e| e.field.as_str()).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether a given field was reported.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.fields.iter().any(|e| e.field == field)
    }

    /// Merge errors from a nested object, prefixing their field paths.
    pub fn nest(&mut self, prefix: &str, nested: Self) {
        for err in nested.fields {
            self.fields.push(FieldError {
                field: format!("{prefix}.{}", err.field),
                message: err.message,
            });
        }
    }

    /// `Ok(())` when no error was collected.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one field is invalid.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Require a non-blank string no longer than `max` characters.
    pub fn require_text(&mut self, field: &str, value: &str, max: usize) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, "is required");
        } else if trimmed.chars().count() > max {
            self.add(field, format!("must be at most {max} characters"));
        }
    }

    /// Check an optional string's length when present.
    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(value) = value
            && value.trim().chars().count() > max
        {
            self.add(field, format!("must be at most {max} characters"));
        }
    }

    /// Require a syntactically valid email.
    pub fn require_email(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "is required");
        } else if let Err(e) = Email::parse(value) {
            self.add(field, e.to_string());
        }
    }
}

/// Trim a string and turn blanks into `None`.
#[must_use]
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// `ILIKE` pattern matching `term` anywhere, with SQL wildcards escaped.
///
/// Returns `None` for a missing or blank term.
#[must_use]
pub fn contains_pattern(term: Option<&str>) -> Option<String> {
    let term = non_blank(term)?;
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{escaped}%"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_all_errors() {
        let mut errors = ValidationErrors::new();
        errors.require_text("firstName", "  ", 50);
        errors.require_text("lastName", "Martin", 50);
        errors.require_email("email", "nope");
        assert!(errors.has("firstName"));
        assert!(!errors.has("lastName"));
        assert!(errors.has("email"));
        assert!(errors.clone().into_result().is_err());
        assert_eq!(errors.to_string(), "invalid fields: firstName, email");
    }

    #[test]
    fn test_length_limit_counts_chars() {
        let mut errors = ValidationErrors::new();
        errors.require_text("name", "éééé", 4);
        assert!(errors.is_empty());
        errors.require_text("name", "ééééé", 4);
        assert!(errors.has("name"));
    }

    #[test]
    fn test_nest_prefixes_fields() {
        let mut inner = ValidationErrors::new();
        inner.add("city", "is required");
        let mut outer = ValidationErrors::new();
        outer.nest("shippingAddress", inner);
        assert!(outer.has("shippingAddress.city"));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(Some(" a ")), Some("a".to_owned()));
        assert_eq!(non_blank(None), None);
    }
}
