//! Schema validation helpers.
//!
//! Validates a resource configuration (`serde_json::Value`) against a
//! [`Schema`]: required attributes must be present, types must match, and
//! each attribute's [`Validator`] must accept the value.
//!
//! # Example
//!
//! ```
//! use snowflake_provider::schema::{Attribute, Schema, Validator};
//! use snowflake_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute(
//!         "data_retention_days",
//!         Attribute::optional_int64().with_validator(Validator::int_between(0, 90)),
//!     );
//!
//! assert!(validate(&schema, &json!({"name": "S", "data_retention_days": 5})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "S", "data_retention_days": 91}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("data_retention_days".to_string()));
//! ```

use crate::schema::{Attribute, AttributeType, Diagnostic, DiagnosticSeverity, Schema, Validator};
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed-only attributes are skipped (provider sets these)
/// - Attribute types must match the schema
/// - Validators run on present values of the right type
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return diagnostics,
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value))),
            );
            return diagnostics;
        }
    };

    for name in schema.attribute_names() {
        if let Some(attr) = schema.attribute(name) {
            validate_attribute(attr, obj.get(name), name, &mut diagnostics);
        }
    }
    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
///
/// This is a convenience wrapper around [`validate`] that returns a Result.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.is_read_only() {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        }
        Some(v) => {
            if !type_matches(attr.attr_type, v) {
                diagnostics.push(type_error(path, attr.attr_type, v));
                return;
            }
            if let Some(validator) = &attr.validator {
                if let Err(detail) = run_validator(validator, v) {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid value for attribute '{}'", path))
                            .with_detail(detail)
                            .with_attribute(path),
                    );
                }
            }
        }
    }
}

fn type_matches(attr_type: AttributeType, value: &Value) -> bool {
    match attr_type {
        AttributeType::String => value.is_string(),
        AttributeType::Int64 => is_int64(value),
        AttributeType::Bool => value.is_boolean(),
    }
}

fn run_validator(validator: &Validator, value: &Value) -> Result<(), String> {
    match validator {
        Validator::IntBetween { min, max } => {
            let n = as_int64(value).ok_or_else(|| "expected an integer".to_string())?;
            if n < *min || n > *max {
                return Err(format!(
                    "expected value to be in the range ({} - {}), got {}",
                    min, max, n
                ));
            }
            Ok(())
        }
        Validator::StringInSlice {
            values,
            ignore_case,
        } => {
            let s = value.as_str().unwrap_or_default();
            let found = values.iter().any(|candidate| {
                if *ignore_case {
                    candidate.eq_ignore_ascii_case(s)
                } else {
                    candidate == s
                }
            });
            if found {
                Ok(())
            } else {
                Err(format!("expected one of {:?}, got {}", values, s))
            }
        }
        Validator::Password => validate_password(value.as_str().unwrap_or_default()),
    }
}

/// Check a password against Snowflake's policy.
///
/// Passwords must be 8 to 256 characters long and contain at least one
/// digit, one uppercase letter and one lowercase letter.
pub fn validate_password(password: &str) -> Result<(), String> {
    let len = password.chars().count();
    if len < 8 {
        return Err("password must be at least 8 characters".to_string());
    }
    if len > 256 {
        return Err("password must be at most 256 characters".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("password must contain at least one digit".to_string());
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err("password must contain at least one uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err("password must contain at least one lowercase letter".to_string());
    }
    Ok(())
}

// Helper functions

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The integer held by `value`. Floats are rejected even without a fraction,
/// since the adapters render and decode integers exactly.
pub(crate) fn as_int64(value: &Value) -> Option<i64> {
    value.as_i64()
}

fn is_int64(value: &Value) -> bool {
    as_int64(value).is_some()
}

fn type_error(path: &str, expected: AttributeType, got: &Value) -> Diagnostic {
    let expected = match expected {
        AttributeType::String => "string",
        AttributeType::Int64 => "int64",
        AttributeType::Bool => "bool",
    };
    Diagnostic {
        severity: DiagnosticSeverity::Error,
        summary: format!("Invalid type for attribute '{}'", path),
        detail: Some(format!(
            "Expected {}, got {}",
            expected,
            value_type_name(got)
        )),
        attribute: Some(path.to_string()),
    }
}
