use crate::engine::error::{FormflowError, Result};
use crate::engine::form::field::{
    ConstOption, DiscriminatedField, EnumField, FieldDescriptor, FieldKind, ScalarField,
    ScalarType,
};
use crate::engine::form::path::{FieldPath, PathSegment};
use log::{debug, error, warn};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Wrapper key used when connector definitions are stored with their metadata
const SPEC_WRAPPER_KEY: &str = "connectionSpecification";
const HIDDEN_KEY: &str = "airbyte_hidden";
const SECRET_KEY: &str = "airbyte_secret";

/// Compiles a connector specification into field descriptors
///
/// `pattern` constraints are compiled once here and cached; descriptors refer
/// to them by index.
pub struct SpecCompiler {
    pattern_cache: Vec<Regex>,
}

impl Default for SpecCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecCompiler {
    /// Create a new SpecCompiler
    pub fn new() -> Self {
        Self {
            pattern_cache: Vec::new(),
        }
    }

    /// Get the pattern cache
    pub fn pattern_cache(&self) -> &[Regex] {
        &self.pattern_cache
    }

    /// Consume the compiler and return its pattern cache
    pub fn into_patterns(self) -> Vec<Regex> {
        self.pattern_cache
    }

    /// Compile a connector specification.
    ///
    /// Accepts the bare object schema or a document wrapping it under
    /// `connectionSpecification`.
    pub fn compile_spec(&mut self, spec: &Value) -> Result<Vec<FieldDescriptor>> {
        let root = spec.get(SPEC_WRAPPER_KEY).unwrap_or(spec);
        if !root.is_object() {
            return Err(FormflowError::Schema(
                "connector specification must be a JSON object".to_string(),
            ));
        }

        let fields = self.compile_properties(root, &FieldPath::root(), None, None)?;
        debug!("Compiled connector specification into {} fields", fields.len());
        Ok(fields)
    }

    /// Compile the `properties` of an object schema, sorted by `order` then name
    fn compile_properties(
        &mut self,
        schema: &Value,
        base: &FieldPath,
        parent_value: Option<&Value>,
        skip_key: Option<&str>,
    ) -> Result<Vec<FieldDescriptor>> {
        let properties = match schema.get("properties") {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(FormflowError::Schema(format!(
                    "'properties' at '{base}' must be an object"
                )));
            }
        };

        let required: HashSet<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut fields = Vec::with_capacity(properties.len());
        for (name, property) in properties {
            if skip_key == Some(name.as_str()) {
                continue;
            }
            let field = self.compile_field(
                name,
                property,
                base.child(name.as_str()),
                required.contains(name.as_str()),
                parent_value,
            )?;
            fields.push(field);
        }

        fields.sort_by(|a, b| {
            let a_order = a.order.unwrap_or(i64::MAX);
            let b_order = b.order.unwrap_or(i64::MAX);
            a_order
                .cmp(&b_order)
                .then_with(|| a.path.last_key().cmp(&b.path.last_key()))
        });

        Ok(fields)
    }

    fn compile_field(
        &mut self,
        name: &str,
        property: &Value,
        path: FieldPath,
        required: bool,
        parent_value: Option<&Value>,
    ) -> Result<FieldDescriptor> {
        let schema = property.as_object().ok_or_else(|| {
            FormflowError::Schema(format!("property '{path}' must be an object"))
        })?;

        let mut hidden = flag(schema, HIDDEN_KEY);
        let kind = if let Some(constant) = schema.get("const") {
            // A constant outside a oneOf branch is never user-editable
            hidden = true;
            let mut scalar = ScalarField::new(scalar_type_of(constant));
            scalar.default = Some(constant.clone());
            scalar.constant = Some(constant.clone());
            FieldKind::Scalar(scalar)
        } else {
            match resolve_type(schema) {
                "object" => self.compile_object(schema, &path)?,
                "array" => self.compile_array(schema, &path)?,
                "boolean" => FieldKind::Boolean {
                    default: schema.get("default").and_then(Value::as_bool),
                },
                "number" => self.compile_scalar(schema, ScalarType::Number, &path),
                "integer" => self.compile_scalar(schema, ScalarType::Integer, &path),
                "string" => self.compile_scalar(schema, ScalarType::String, &path),
                other => {
                    warn!("Unknown type '{other}' for field {path}, treating as string");
                    self.compile_scalar(schema, ScalarType::String, &path)
                }
            }
        };

        let id = match parent_value {
            Some(value) => format!("{}[{}]", path.id(), value_label(value)),
            None => path.id(),
        };

        Ok(FieldDescriptor {
            id,
            title: schema
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or(name)
                .to_string(),
            description: schema
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            required,
            hidden,
            order: schema.get("order").and_then(Value::as_i64),
            parent_value: parent_value.cloned(),
            path,
            kind,
        })
    }

    fn compile_object(&mut self, schema: &Map<String, Value>, path: &FieldPath) -> Result<FieldKind> {
        if let Some(options) = schema.get("oneOf") {
            let options = options.as_array().ok_or_else(|| {
                FormflowError::Schema(format!("'oneOf' at '{path}' must be an array"))
            })?;
            return self.compile_discriminator(options, path);
        }

        let sub_fields = self.compile_properties(&Value::Object(schema.clone()), path, None, None)?;
        Ok(FieldKind::Object { sub_fields })
    }

    /// Compile a `oneOf` object into a discriminated field.
    ///
    /// The constant key is the first property declaring `const` in any branch.
    fn compile_discriminator(&mut self, options: &[Value], path: &FieldPath) -> Result<FieldKind> {
        let const_key = options.iter().find_map(|option| {
            option
                .get("properties")
                .and_then(Value::as_object)?
                .iter()
                .find(|(_, prop)| prop.get("const").is_some())
                .map(|(key, _)| key.clone())
        });

        if const_key.is_none() {
            warn!("Discriminated field {path} has no const key, falling back to raw values");
        }

        let mut const_options = Vec::with_capacity(options.len());
        let mut sub_fields = Vec::new();

        for (i, option) in options.iter().enumerate() {
            if !option.is_object() {
                return Err(FormflowError::Schema(format!(
                    "option {i} of '{path}' must be an object"
                )));
            }

            let title = option.get("title").and_then(Value::as_str);
            let value = const_key
                .as_deref()
                .and_then(|key| option.get("properties")?.get(key)?.get("const"))
                .cloned()
                .or_else(|| title.map(|t| Value::String(t.to_string())));

            let Some(value) = value else {
                error!("Option {i} of discriminated field {path} has neither const nor title, skipping");
                continue;
            };

            const_options.push(ConstOption {
                title: title
                    .map(str::to_string)
                    .unwrap_or_else(|| value_label(&value)),
                description: option
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                value: value.clone(),
            });

            let branch = self.compile_properties(option, path, Some(&value), const_key.as_deref())?;
            sub_fields.extend(branch);
        }

        Ok(FieldKind::Discriminated(DiscriminatedField {
            const_key,
            options: const_options,
            sub_fields,
        }))
    }

    fn compile_array(&mut self, schema: &Map<String, Value>, path: &FieldPath) -> Result<FieldKind> {
        let items = schema.get("items");
        let is_object_items = items
            .map(|items| {
                items.get("type").and_then(Value::as_str) == Some("object")
                    || items.get("properties").is_some()
            })
            .unwrap_or(false);

        if let (true, Some(items)) = (is_object_items, items) {
            let item_path = path.child(PathSegment::Item);
            let item_fields = self.compile_properties(items, &item_path, None, None)?;
            return Ok(FieldKind::ArrayComplex { item_fields });
        }

        let default = schema
            .get("default")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(FieldKind::ArraySimple { default })
    }

    fn compile_scalar(
        &mut self,
        schema: &Map<String, Value>,
        value_type: ScalarType,
        path: &FieldPath,
    ) -> FieldKind {
        if let Some(options) = schema.get("enum").and_then(Value::as_array) {
            return FieldKind::Enum(EnumField {
                options: options.clone(),
                default: schema.get("default").cloned(),
            });
        }

        let mut scalar = ScalarField::new(value_type);
        scalar.secret = flag(schema, SECRET_KEY);
        scalar.multiline = flag(schema, "multiline");
        scalar.default = schema.get("default").cloned();
        scalar.minimum = schema.get("minimum").and_then(Value::as_f64);
        scalar.maximum = schema.get("maximum").and_then(Value::as_f64);
        scalar.examples = schema
            .get("examples")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        if let Some(pattern) = schema.get("pattern").and_then(Value::as_str) {
            scalar.pattern = Some(pattern.to_string());
            match Regex::new(pattern) {
                Ok(regex) => {
                    let index = self.pattern_cache.len();
                    self.pattern_cache.push(regex);
                    scalar.pattern_index = Some(index);
                    debug!("Pattern for field {path} compiled at index {index}");
                }
                Err(e) => {
                    error!("Failed to compile pattern for field {path}: {e}");
                }
            }
        }

        FieldKind::Scalar(scalar)
    }
}

fn flag(schema: &Map<String, Value>, key: &str) -> bool {
    schema.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Resolve the JSON-schema type, ignoring `null` in type unions
fn resolve_type(schema: &Map<String, Value>) -> &str {
    match schema.get("type") {
        Some(Value::String(t)) => t,
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null")
            .unwrap_or("string"),
        _ if schema.contains_key("oneOf") || schema.contains_key("properties") => "object",
        _ if schema.contains_key("items") => "array",
        _ => "string",
    }
}

fn scalar_type_of(value: &Value) -> ScalarType {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => ScalarType::Integer,
        Value::Number(_) => ScalarType::Number,
        _ => ScalarType::String,
    }
}

fn value_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(spec: Value) -> (Vec<FieldDescriptor>, Vec<Regex>) {
        let mut compiler = SpecCompiler::new();
        let fields = compiler.compile_spec(&spec).unwrap();
        (fields, compiler.into_patterns())
    }

    #[test]
    fn test_scalar_flags_and_order() {
        let (fields, _) = compile(json!({
            "type": "object",
            "required": ["host"],
            "properties": {
                "password": {"type": "string", "airbyte_secret": true, "order": 2},
                "host": {"type": "string", "title": "Host", "order": 0},
                "port": {"type": "integer", "default": 5432, "minimum": 0, "maximum": 65536, "order": 1},
                "internal": {"type": "string", "airbyte_hidden": true}
            }
        }));

        let names: Vec<String> = fields.iter().map(|f| f.id.clone()).collect();
        assert_eq!(names, vec!["host", "port", "password", "internal"]);

        assert!(fields[0].required);
        assert_eq!(fields[0].title, "Host");
        assert_eq!(fields[2].title, "password");
        assert!(fields[2].is_secret());
        assert!(fields[3].hidden);

        match &fields[1].kind {
            FieldKind::Scalar(s) => {
                assert_eq!(s.value_type, ScalarType::Integer);
                assert_eq!(s.default, Some(json!(5432)));
                assert_eq!(s.maximum, Some(65536.0));
            }
            other => panic!("expected scalar, got {other:?}"),
        }
    }

    #[test]
    fn test_wrapped_spec_and_enum() {
        let (fields, _) = compile(json!({
            "connectionSpecification": {
                "properties": {
                    "region": {"type": "string", "enum": ["us-east-1", "eu-west-1"], "default": "us-east-1"}
                }
            }
        }));

        assert_eq!(fields.len(), 1);
        assert_eq!(
            fields[0].kind,
            FieldKind::Enum(EnumField {
                options: vec![json!("us-east-1"), json!("eu-west-1")],
                default: Some(json!("us-east-1")),
            })
        );
    }

    #[test]
    fn test_one_of_becomes_discriminator() {
        let (fields, _) = compile(json!({
            "properties": {
                "storage": {
                    "type": "object",
                    "title": "Storage",
                    "oneOf": [
                        {
                            "title": "AWS",
                            "required": ["bucket"],
                            "properties": {
                                "provider": {"type": "string", "const": "aws"},
                                "bucket": {"type": "string"},
                                "secret_key": {"type": "string", "airbyte_secret": true}
                            }
                        },
                        {
                            "title": "GCS",
                            "properties": {
                                "provider": {"type": "string", "const": "gcs"},
                                "bucket": {"type": "string", "default": "raw"}
                            }
                        }
                    ]
                }
            }
        }));

        let FieldKind::Discriminated(d) = &fields[0].kind else {
            panic!("expected discriminated field");
        };
        assert_eq!(d.const_key.as_deref(), Some("provider"));
        assert_eq!(d.options.len(), 2);
        assert_eq!(d.options[1].value, json!("gcs"));
        assert_eq!(d.options[1].title, "GCS");

        let aws_key = json!("aws");
        let aws: Vec<&FieldDescriptor> = d.branch(&aws_key).collect();
        assert_eq!(aws.len(), 2);
        assert_eq!(aws[0].id, "storage.bucket[aws]");
        assert!(aws[0].required);
        assert_eq!(aws[0].path, FieldPath::parse("storage.bucket"));

        let gcs_key = json!("gcs");
        let gcs: Vec<&FieldDescriptor> = d.branch(&gcs_key).collect();
        assert_eq!(gcs.len(), 1);
        assert!(!gcs[0].required);
    }

    #[test]
    fn test_one_of_without_const_falls_back_to_title() {
        let (fields, _) = compile(json!({
            "properties": {
                "mode": {
                    "type": "object",
                    "oneOf": [
                        {"title": "Standard", "properties": {}},
                        {"title": "Advanced", "properties": {"level": {"type": "integer"}}}
                    ]
                }
            }
        }));

        let FieldKind::Discriminated(d) = &fields[0].kind else {
            panic!("expected discriminated field");
        };
        assert_eq!(d.const_key, None);
        assert_eq!(d.options[0].value, json!("Standard"));
        assert_eq!(d.branch(&json!("Advanced")).count(), 1);
    }

    #[test]
    fn test_arrays() {
        let (fields, _) = compile(json!({
            "properties": {
                "schemas": {"type": "array", "items": {"type": "string"}, "default": ["public"]},
                "tables": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["name"],
                        "properties": {
                            "name": {"type": "string"},
                            "sync_mode": {"type": "string", "enum": ["full", "incremental"]}
                        }
                    }
                }
            }
        }));

        assert_eq!(
            fields[0].kind,
            FieldKind::ArraySimple {
                default: vec![json!("public")]
            }
        );
        let FieldKind::ArrayComplex { item_fields } = &fields[1].kind else {
            panic!("expected complex array");
        };
        assert_eq!(item_fields[0].path.to_string(), "tables.*.name");
        assert!(item_fields[0].required);
    }

    #[test]
    fn test_nullable_type_union_and_const() {
        let (fields, _) = compile(json!({
            "properties": {
                "schema": {"type": ["null", "string"]},
                "version": {"const": 2}
            }
        }));

        match &fields[0].kind {
            FieldKind::Scalar(s) => assert_eq!(s.value_type, ScalarType::String),
            other => panic!("expected scalar, got {other:?}"),
        }
        assert!(fields[1].hidden);
        assert_eq!(fields[1].default_value(), Some(json!(2)));
        assert_eq!(fields[1].constant_value(), Some(&json!(2)));
    }

    #[test]
    fn test_patterns_are_cached() {
        let (fields, patterns) = compile(json!({
            "properties": {
                "host": {"type": "string", "pattern": "^[a-z.]+$"},
                "broken": {"type": "string", "pattern": "(["}
            }
        }));

        assert_eq!(patterns.len(), 1);
        let FieldKind::Scalar(broken) = &fields[0].kind else {
            panic!("expected scalar");
        };
        assert_eq!(broken.pattern_index, None);
        let FieldKind::Scalar(host) = &fields[1].kind else {
            panic!("expected scalar");
        };
        assert_eq!(host.pattern_index, Some(0));
    }

    #[test]
    fn test_malformed_specs() {
        let mut compiler = SpecCompiler::new();
        assert!(compiler.compile_spec(&json!("nope")).is_err());
        assert!(
            compiler
                .compile_spec(&json!({"properties": []}))
                .is_err()
        );
        assert!(
            compiler
                .compile_spec(&json!({"properties": {"x": {"type": "object", "oneOf": {}}}}))
                .is_err()
        );
    }
}
