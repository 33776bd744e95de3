use crate::engine::error::ErrorInfo;
use crate::engine::form::field::{FieldDescriptor, FieldKind, ScalarField, ScalarType};
use crate::engine::form::path::FieldPath;
use crate::engine::form::state::FormState;
use crate::engine::form::walk::walk_visible;
use crate::engine::utils::is_empty_value;
use log::{debug, warn};
use regex::Regex;
use serde_json::Value;

pub const REQUIRED: &str = "REQUIRED";
pub const PATTERN_MISMATCH: &str = "PATTERN_MISMATCH";
pub const BELOW_MINIMUM: &str = "BELOW_MINIMUM";
pub const ABOVE_MAXIMUM: &str = "ABOVE_MAXIMUM";
pub const INVALID_OPTION: &str = "INVALID_OPTION";
pub const INVALID_TYPE: &str = "INVALID_TYPE";

/// Submit-time validation of the visible fields of a form.
///
/// Hidden fields and unselected discriminator branches are never validated.
/// Every violation is reported; validation does not stop at the first error.
pub fn validate_form(
    fields: &[FieldDescriptor],
    state: &FormState,
    patterns: &[Regex],
) -> Vec<ErrorInfo> {
    let mut errors = Vec::new();

    walk_visible(fields, state, &mut |field, path, value| {
        validate_field(field, path, value, patterns, &mut errors);
    });

    debug!("Form validation finished with {} error(s)", errors.len());
    errors
}

fn validate_field(
    field: &FieldDescriptor,
    path: &FieldPath,
    value: Option<&Value>,
    patterns: &[Regex],
    errors: &mut Vec<ErrorInfo>,
) {
    let mut report = |code: &str, message: String| {
        debug!("Validation failed for {path}: {message}");
        errors.push(
            ErrorInfo::builder(code, message)
                .path(path.to_string())
                .field_id(&field.id)
                .build(),
        );
    };

    match &field.kind {
        // An absent toggle is simply off
        FieldKind::Boolean { .. } => {}
        FieldKind::Object { .. } => {}
        FieldKind::Discriminated(d) => match d.resolve(value) {
            None if field.required => {
                report(REQUIRED, format!("{} is required", field.title));
            }
            Some(selected) if !d.has_option(&selected) => {
                report(INVALID_OPTION, format!("{} is not a valid {}", selected, field.title));
            }
            _ => {}
        },
        FieldKind::Enum(e) => match value {
            v if is_empty_value(v) => {
                if field.required {
                    report(REQUIRED, format!("{} is required", field.title));
                }
            }
            Some(v) if !e.options.contains(v) => {
                report(INVALID_OPTION, format!("{} is not a valid {}", v, field.title));
            }
            _ => {}
        },
        FieldKind::ArraySimple { .. } | FieldKind::ArrayComplex { .. } => {
            if field.required && is_empty_value(value) {
                report(REQUIRED, format!("{} is required", field.title));
            }
        }
        FieldKind::Scalar(scalar) => {
            if is_empty_value(value) {
                if field.required {
                    report(REQUIRED, format!("{} is required", field.title));
                }
                return;
            }
            if let Some(value) = value {
                for (code, message) in check_scalar(field, scalar, value, patterns) {
                    report(code, message);
                }
            }
        }
    }
}

fn check_scalar(
    field: &FieldDescriptor,
    scalar: &ScalarField,
    value: &Value,
    patterns: &[Regex],
) -> Vec<(&'static str, String)> {
    let mut failures = Vec::new();

    match scalar.value_type {
        ScalarType::String => {
            let (Some(pattern), Some(text)) = (&scalar.pattern, value.as_str()) else {
                return failures;
            };
            match scalar.pattern_index.and_then(|index| patterns.get(index)) {
                Some(regex) => {
                    if !regex.is_match(text) {
                        failures.push((
                            PATTERN_MISMATCH,
                            format!("{} must match {}", field.title, pattern),
                        ));
                    }
                }
                None => warn!("Pattern for {} was not compiled, skipping check", field.id),
            }
        }
        ScalarType::Number | ScalarType::Integer => {
            let number = match value.as_f64() {
                Some(n) if scalar.value_type == ScalarType::Number || n.fract() == 0.0 => n,
                _ => {
                    let expected = if scalar.value_type == ScalarType::Integer {
                        "an integer"
                    } else {
                        "a number"
                    };
                    failures.push((INVALID_TYPE, format!("{} must be {}", field.title, expected)));
                    return failures;
                }
            };
            if let Some(minimum) = scalar.minimum.filter(|m| number < *m) {
                failures.push((
                    BELOW_MINIMUM,
                    format!("{} must be at least {}", field.title, minimum),
                ));
            }
            if let Some(maximum) = scalar.maximum.filter(|m| number > *m) {
                failures.push((
                    ABOVE_MAXIMUM,
                    format!("{} must be at most {}", field.title, maximum),
                ));
            }
        }
    }

    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::form::compiler::SpecCompiler;
    use serde_json::json;

    fn run(spec: Value, state: Value) -> Vec<ErrorInfo> {
        let mut compiler = SpecCompiler::new();
        let fields = compiler.compile_spec(&spec).unwrap();
        let state = FormState::from_value(state).unwrap();
        validate_form(&fields, &state, compiler.pattern_cache())
    }

    fn codes(errors: &[ErrorInfo]) -> Vec<(String, String)> {
        errors
            .iter()
            .map(|e| (e.path.clone().unwrap_or_default(), e.code.clone()))
            .collect()
    }

    #[test]
    fn test_required_fields() {
        let errors = run(
            json!({
                "required": ["host", "schemas", "enabled", "region"],
                "properties": {
                    "host": {"type": "string", "title": "Host"},
                    "schemas": {"type": "array", "items": {"type": "string"}},
                    "enabled": {"type": "boolean"},
                    "region": {"type": "string", "enum": ["a"]},
                    "optional": {"type": "string"}
                }
            }),
            json!({"host": "   ", "schemas": []}),
        );

        assert_eq!(
            codes(&errors),
            vec![
                ("host".to_string(), REQUIRED.to_string()),
                ("region".to_string(), REQUIRED.to_string()),
                ("schemas".to_string(), REQUIRED.to_string()),
            ]
        );
        assert_eq!(errors[0].message, "Host is required");
        assert_eq!(errors[0].field_id.as_deref(), Some("host"));
    }

    #[test]
    fn test_pattern_and_range() {
        let errors = run(
            json!({
                "properties": {
                    "host": {"type": "string", "pattern": "^[a-z.]+$"},
                    "port": {"type": "integer", "minimum": 1, "maximum": 65535},
                    "ratio": {"type": "number", "maximum": 1}
                }
            }),
            json!({"host": "DB.INTERNAL", "port": 70000, "ratio": 0.5}),
        );

        assert_eq!(
            codes(&errors),
            vec![
                ("host".to_string(), PATTERN_MISMATCH.to_string()),
                ("port".to_string(), ABOVE_MAXIMUM.to_string()),
            ]
        );
    }

    #[test]
    fn test_type_and_option_checks() {
        let errors = run(
            json!({
                "properties": {
                    "port": {"type": "integer"},
                    "mode": {"type": "string", "enum": ["full", "incremental"]}
                }
            }),
            json!({"port": 1.5, "mode": "append"}),
        );

        assert_eq!(
            codes(&errors),
            vec![
                ("mode".to_string(), INVALID_OPTION.to_string()),
                ("port".to_string(), INVALID_TYPE.to_string()),
            ]
        );
    }

    #[test]
    fn test_hidden_and_inactive_branches_are_skipped() {
        let errors = run(
            json!({
                "required": ["auth"],
                "properties": {
                    "internal": {"type": "string", "airbyte_hidden": true, "pattern": "^x$"},
                    "auth": {"type": "object", "oneOf": [
                        {"required": ["key"], "properties": {"method": {"const": "key"}, "key": {"type": "string"}}},
                        {"required": ["token"], "properties": {"method": {"const": "token"}, "token": {"type": "string"}}}
                    ]}
                }
            }),
            json!({"internal": "nope", "auth": {"method": "token"}}),
        );

        assert_eq!(
            codes(&errors),
            vec![("auth.token".to_string(), REQUIRED.to_string())]
        );
    }

    #[test]
    fn test_required_discriminator_without_selection() {
        let errors = run(
            json!({
                "required": ["auth"],
                "properties": {
                    "auth": {"type": "object", "oneOf": [
                        {"properties": {"method": {"const": "key"}}}
                    ]}
                }
            }),
            json!({}),
        );
        assert_eq!(codes(&errors), vec![("auth".to_string(), REQUIRED.to_string())]);
    }

    #[test]
    fn test_array_items_validated_with_concrete_paths() {
        let errors = run(
            json!({
                "properties": {
                    "tables": {"type": "array", "items": {"type": "object", "required": ["name"], "properties": {
                        "name": {"type": "string"}
                    }}}
                }
            }),
            json!({"tables": [{"name": "orders"}, {}]}),
        );
        assert_eq!(
            codes(&errors),
            vec![("tables.1.name".to_string(), REQUIRED.to_string())]
        );
    }
}
