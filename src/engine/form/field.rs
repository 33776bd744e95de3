use crate::engine::form::path::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single compiled field of a connector specification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDescriptor {
    /// Unique, path-derived identifier
    pub id: String,
    /// Location in the configuration object. Item templates contain `*`.
    pub path: FieldPath,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    /// Discriminator value of the parent under which this field is shown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_value: Option<Value>,
    pub kind: FieldKind,
}

/// Field kinds, one per control the form renders
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Scalar(ScalarField),
    Enum(EnumField),
    Boolean {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<bool>,
    },
    Discriminated(DiscriminatedField),
    Object {
        sub_fields: Vec<FieldDescriptor>,
    },
    ArraySimple {
        #[serde(default)]
        default: Vec<Value>,
    },
    ArrayComplex {
        item_fields: Vec<FieldDescriptor>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    String,
    Number,
    Integer,
}

impl ScalarType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ScalarType::Number | ScalarType::Integer)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalarField {
    pub value_type: ScalarType,
    #[serde(default)]
    pub secret: bool,
    #[serde(default)]
    pub multiline: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Fixed value declared with `const`; always written to the state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Index into the compiled pattern cache
    #[serde(skip)]
    pub pattern_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Value>,
}

impl ScalarField {
    pub fn new(value_type: ScalarType) -> Self {
        Self {
            value_type,
            secret: false,
            multiline: false,
            default: None,
            constant: None,
            pattern: None,
            pattern_index: None,
            minimum: None,
            maximum: None,
            examples: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnumField {
    pub options: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// One selectable branch of a discriminated object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConstOption {
    pub value: Value,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscriminatedField {
    /// Property holding the selected constant. `None` for malformed specs, in
    /// which case the raw state value is treated as the discriminator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub const_key: Option<String>,
    pub options: Vec<ConstOption>,
    /// Sub-fields of every branch, each tagged with its `parent_value`
    pub sub_fields: Vec<FieldDescriptor>,
}

impl DiscriminatedField {
    pub fn has_option(&self, value: &Value) -> bool {
        self.options.iter().any(|o| &o.value == value)
    }

    /// Sub-fields belonging to the branch selected by `value`
    pub fn branch<'a>(&'a self, value: &'a Value) -> impl Iterator<Item = &'a FieldDescriptor> {
        self.sub_fields
            .iter()
            .filter(move |f| f.parent_value.as_ref() == Some(value))
    }

    /// Resolve the live discriminator value from the state stored at the field.
    ///
    /// Accepts both the object shape `{const_key: value}` and the legacy bare
    /// primitive shape.
    pub fn resolve(&self, stored: Option<&Value>) -> Option<Value> {
        match (stored?, &self.const_key) {
            (Value::Object(map), Some(key)) => map.get(key).filter(|v| !v.is_null()).cloned(),
            (Value::Object(_), None) => None,
            (Value::Null, _) => None,
            (primitive, _) => Some(primitive.clone()),
        }
    }
}

impl FieldDescriptor {
    /// Declared default value, if the kind carries one
    pub fn default_value(&self) -> Option<Value> {
        match &self.kind {
            FieldKind::Scalar(s) => s.default.clone(),
            FieldKind::Enum(e) => e.default.clone(),
            FieldKind::Boolean { default } => default.map(Value::Bool),
            FieldKind::ArraySimple { default } if !default.is_empty() => {
                Some(Value::Array(default.clone()))
            }
            _ => None,
        }
    }

    pub fn constant_value(&self) -> Option<&Value> {
        match &self.kind {
            FieldKind::Scalar(s) => s.constant.as_ref(),
            _ => None,
        }
    }

    /// Value written when the field is first populated: the constant if there
    /// is one, otherwise the default of a visible field
    pub fn initial_value(&self) -> Option<Value> {
        if let Some(constant) = self.constant_value() {
            return Some(constant.clone());
        }
        if self.hidden {
            return None;
        }
        self.default_value()
    }

    /// Direct children of object-like kinds
    pub fn children(&self) -> &[FieldDescriptor] {
        match &self.kind {
            FieldKind::Discriminated(d) => &d.sub_fields,
            FieldKind::Object { sub_fields } => sub_fields,
            FieldKind::ArrayComplex { item_fields } => item_fields,
            _ => &[],
        }
    }

    pub fn is_secret(&self) -> bool {
        matches!(&self.kind, FieldKind::Scalar(s) if s.secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn discriminator() -> DiscriminatedField {
        DiscriminatedField {
            const_key: Some("storage".to_string()),
            options: vec![
                ConstOption {
                    value: json!("S3"),
                    title: "AWS".to_string(),
                    description: None,
                },
                ConstOption {
                    value: json!("GCS"),
                    title: "Google Cloud".to_string(),
                    description: None,
                },
            ],
            sub_fields: Vec::new(),
        }
    }

    #[test]
    fn test_resolve_object_and_legacy_shapes() {
        let d = discriminator();
        assert_eq!(d.resolve(Some(&json!({"storage": "S3"}))), Some(json!("S3")));
        assert_eq!(d.resolve(Some(&json!("GCS"))), Some(json!("GCS")));
        assert_eq!(d.resolve(Some(&json!({}))), None);
        assert_eq!(d.resolve(Some(&json!(null))), None);
        assert_eq!(d.resolve(None), None);
    }

    #[test]
    fn test_resolve_without_const_key_uses_raw_value() {
        let mut d = discriminator();
        d.const_key = None;
        assert_eq!(d.resolve(Some(&json!("S3"))), Some(json!("S3")));
        assert_eq!(d.resolve(Some(&json!({"storage": "S3"}))), None);
    }

    #[test]
    fn test_kind_serializes_with_type_tag() {
        let kind = FieldKind::Boolean {
            default: Some(true),
        };
        assert_eq!(
            serde_json::to_value(&kind).unwrap(),
            json!({"type": "boolean", "default": true})
        );
    }

    fn scalar(name: &str, hidden: bool, scalar: ScalarField) -> FieldDescriptor {
        FieldDescriptor {
            id: name.to_string(),
            path: FieldPath::parse(name),
            title: name.to_string(),
            description: None,
            required: false,
            hidden,
            order: None,
            parent_value: None,
            kind: FieldKind::Scalar(scalar),
        }
    }

    #[test]
    fn test_initial_value_rules() {
        let mut with_default = ScalarField::new(ScalarType::String);
        with_default.default = Some(json!("abc"));
        assert_eq!(
            scalar("host", false, with_default.clone()).initial_value(),
            Some(json!("abc"))
        );
        // Hidden defaults are never seeded
        assert_eq!(scalar("token", true, with_default).initial_value(), None);

        let mut constant = ScalarField::new(ScalarType::Integer);
        constant.default = Some(json!(2));
        constant.constant = Some(json!(2));
        let version = scalar("version", true, constant);
        assert_eq!(version.constant_value(), Some(&json!(2)));
        assert_eq!(version.initial_value(), Some(json!(2)));
    }
}
