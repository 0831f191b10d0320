//! Schema validation helpers.
//!
//! Validates resource configuration (`serde_json::Value`) against a
//! [`Schema`]: attribute presence, attribute types, and the value
//! constraints declared with [`Validator`].
//!
//! # Example
//!
//! ```
//! use hemmer_provider_random::schema::{Attribute, Schema, Validator};
//! use hemmer_provider_random::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("length", Attribute::required_int64().with_validator(Validator::AtLeast(1)));
//!
//! assert!(validate(&schema, &json!({"length": 8})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"length": 0}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("length".to_string()));
//! ```

use crate::schema::{Attribute, AttributeType, Diagnostic, Schema, Validator};
use serde_json::{Map, Value};

/// Validate a configuration value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - The configuration must be an object (or null, which is treated as empty)
/// - Attributes not declared in the schema are rejected
/// - Required attributes must be present and non-null
/// - Computed-only attributes are skipped (the provider sets these)
/// - Attribute types must match the schema
/// - Declared validators run against non-null values
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let empty = Map::new();
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => &empty,
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value))),
            );
            return diagnostics;
        },
    };

    for name in obj.keys() {
        if schema.attribute(name).is_none() {
            diagnostics.push(
                Diagnostic::error(format!("Unsupported attribute '{}'", name))
                    .with_detail("This attribute is not declared by the resource schema")
                    .with_attribute(name.as_str()),
            );
        }
    }

    for (name, attr) in &schema.attributes {
        let attr_value = obj.get(name);
        // Constraints only make sense on well-typed values
        if validate_attribute(attr, attr_value, name, &mut diagnostics) {
            if let Some(v) = attr_value {
                run_validators(schema, obj, attr, v, name, &mut diagnostics);
            }
        }
    }

    diagnostics
}

/// Validate a configuration value, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a configuration value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

/// Returns true when a non-null, well-typed value is present.
fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> bool {
    if attr.flags.is_computed_only() {
        return false;
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
            false
        },
        Some(v) => {
            let before = diagnostics.len();
            validate_attribute_type(&attr.attr_type, v, path, diagnostics);
            let well_typed = diagnostics.len() == before;
            if let Some(message) = &attr.deprecation_message {
                diagnostics.push(
                    Diagnostic::warning(format!("Attribute '{}' is deprecated", path))
                        .with_detail(message.as_str())
                        .with_attribute(path),
                );
            }
            well_typed
        },
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        },
        AttributeType::Int64 => {
            if as_int64(value).is_none() {
                diagnostics.push(type_error(path, "int64", value));
            }
        },
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        },
        AttributeType::List(element_type) => {
            if let Some(arr) = value.as_array() {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "list", value));
            }
        },
        AttributeType::Map(value_type) => {
            if let Some(obj) = value.as_object() {
                for (key, val) in obj {
                    // Map elements may be null
                    if val.is_null() {
                        continue;
                    }
                    let key_path = format!("{}.{}", path, key);
                    validate_attribute_type(value_type, val, &key_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "map", value));
            }
        },
    }
}

fn run_validators(
    schema: &Schema,
    obj: &Map<String, Value>,
    attr: &Attribute,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Some(n) = as_int64(value) else {
        return;
    };

    for validator in &attr.validators {
        match validator {
            Validator::AtLeast(min) => {
                if n < *min {
                    diagnostics.push(
                        Diagnostic::error("Invalid Attribute Value")
                            .with_detail(format!(
                                "Attribute {} value must be at least {}, got: {}",
                                path, min, n
                            ))
                            .with_attribute(path),
                    );
                }
            },
            Validator::AtLeastSumOf(siblings) => {
                let sum: i64 = siblings
                    .iter()
                    .map(|name| sibling_int(schema, obj, name))
                    .fold(0i64, |acc, v| acc.saturating_add(v));
                if n < sum {
                    diagnostics.push(
                        Diagnostic::error("Invalid Attribute Value")
                            .with_detail(format!(
                                "Attribute {} value must be at least sum of {}, got: {}",
                                path,
                                siblings.join(" + "),
                                n
                            ))
                            .with_attribute(path),
                    );
                }
            },
        }
    }
}

/// Configured value of a sibling int64 attribute, falling back to its default.
fn sibling_int(schema: &Schema, obj: &Map<String, Value>, name: &str) -> i64 {
    obj.get(name)
        .and_then(as_int64)
        .or_else(|| {
            schema
                .attribute(name)
                .and_then(|a| a.default.as_ref())
                .and_then(as_int64)
        })
        .unwrap_or(0)
}

/// Interpret a JSON value as an int64, accepting integral floats.
pub(crate) fn as_int64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64().and_then(|f| {
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                    Some(f as i64)
                } else {
                    None
                }
            })
        }),
        _ => None,
    }
}

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

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!(
            "Expected {}, got {}",
            expected,
            value_type_name(got)
        ))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeFlags, DiagnosticSeverity};
    use serde_json::json;

    fn string_like_schema() -> Schema {
        Schema::new(2)
            .with_attribute(
                "length",
                Attribute::required_int64()
                    .with_validator(Validator::AtLeast(1))
                    .with_validator(Validator::AtLeastSumOf(vec![
                        "min_upper".to_string(),
                        "min_lower".to_string(),
                    ])),
            )
            .with_attribute(
                "min_upper",
                Attribute::optional_computed_int64()
                    .with_default(json!(0))
                    .with_validator(Validator::AtLeast(0)),
            )
            .with_attribute(
                "min_lower",
                Attribute::optional_computed_int64()
                    .with_default(json!(0))
                    .with_validator(Validator::AtLeast(0)),
            )
            .with_attribute("result", Attribute::computed_string())
    }

    #[test]
    fn test_validate_required() {
        let schema = string_like_schema();

        assert!(validate(&schema, &json!({"length": 10})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("length".to_string()));

        let diagnostics = validate(&schema, &json!({"length": null}));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_validate_wrong_type() {
        let schema = string_like_schema();
        let diagnostics = validate(&schema, &json!({"length": "ten"}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_int64_accepts_integral_float() {
        let schema = string_like_schema();
        assert!(validate(&schema, &json!({"length": 10.0})).is_empty());
        assert_eq!(validate(&schema, &json!({"length": 10.5})).len(), 1);
    }

    #[test]
    fn test_validate_at_least() {
        let schema = string_like_schema();
        let diagnostics = validate(&schema, &json!({"length": 0}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0]
            .detail
            .as_deref()
            .unwrap()
            .contains("must be at least 1"));

        let diagnostics = validate(&schema, &json!({"length": 4, "min_upper": -1}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("min_upper".to_string()));
    }

    #[test]
    fn test_validate_at_least_sum_of() {
        let schema = string_like_schema();

        assert!(validate(&schema, &json!({"length": 4, "min_upper": 2, "min_lower": 2})).is_empty());

        let diagnostics = validate(&schema, &json!({"length": 3, "min_upper": 2, "min_lower": 2}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("length".to_string()));
        assert!(diagnostics[0]
            .detail
            .as_deref()
            .unwrap()
            .contains("min_upper + min_lower"));
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        let schema = string_like_schema();
        assert!(validate(&schema, &json!({"length": 4, "result": 123})).is_empty());
    }

    #[test]
    fn test_validate_unsupported_attribute() {
        let schema = string_like_schema();
        let diagnostics = validate(&schema, &json!({"length": 4, "colour": "blue"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("colour".to_string()));
    }

    #[test]
    fn test_validate_map_allows_null_values() {
        let schema = Schema::v0().with_attribute("keepers", Attribute::keepers());

        assert!(validate(&schema, &json!({"keepers": {"a": "1", "b": null}})).is_empty());

        let diagnostics = validate(&schema, &json!({"keepers": {"a": 1}}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("keepers.a".to_string()));
    }

    #[test]
    fn test_validate_list() {
        let schema = Schema::v0().with_attribute(
            "input",
            Attribute::new(
                AttributeType::list(AttributeType::String),
                AttributeFlags::required(),
            ),
        );

        assert!(validate(&schema, &json!({"input": ["a", "b"]})).is_empty());
        assert!(validate(&schema, &json!({"input": []})).is_empty());

        let diagnostics = validate(&schema, &json!({"input": ["a", 2]}));
        assert_eq!(diagnostics[0].attribute, Some("input.1".to_string()));
    }

    #[test]
    fn test_validate_deprecated_attribute_warns() {
        let schema = Schema::v0().with_attribute(
            "number",
            Attribute::optional_computed_bool().deprecated("Use numeric instead."),
        );

        let diagnostics = validate(&schema, &json!({"number": true}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, DiagnosticSeverity::Warning);
        assert!(validate(&schema, &json!({})).is_empty());
    }

    #[test]
    fn test_null_config_treated_as_empty() {
        let schema = Schema::v0().with_attribute("keepers", Attribute::keepers());
        assert!(is_valid(&schema, &Value::Null));
    }

    #[test]
    fn test_validate_result_helper() {
        let schema = string_like_schema();
        assert!(validate_result(&schema, &json!({"length": 1})).is_ok());
        assert_eq!(validate_result(&schema, &json!({})).unwrap_err().len(), 1);
    }

    #[test]
    fn test_validate_root_not_object() {
        let schema = string_like_schema();
        let diagnostics = validate(&schema, &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));
    }
}
