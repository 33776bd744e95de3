//! # Control Tree Rendering
//!
//! Turns compiled field descriptors plus the live form state into a tree of
//! [`Control`]s. The tree is plain data; drawing it is left to the UI layer.
//!
//! Visibility rules:
//! - a field with `hidden = true` produces no control at all
//! - a discriminator sub-field only appears when the discriminator currently
//!   resolves to that sub-field's `parent_value`
//! - array item templates are rendered once per item, with the item index
//!   substituted into every path

use crate::engine::form::field::{ConstOption, FieldDescriptor, FieldKind, ScalarType};
use crate::engine::form::path::FieldPath;
use crate::engine::form::state::FormState;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Control {
    pub field_id: String,
    /// Concrete path (no item placeholders)
    pub path: FieldPath,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    pub widget: Widget,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Widget {
    Text {
        value: Option<String>,
        multiline: bool,
        secret: bool,
        masked: bool,
    },
    Number {
        value: Option<Number>,
        integer: bool,
        minimum: Option<f64>,
        maximum: Option<f64>,
    },
    Select {
        options: Vec<SelectOption>,
        selected: Option<Value>,
    },
    Toggle {
        on: bool,
    },
    Tags {
        values: Vec<Value>,
    },
    Discriminator {
        options: Vec<ConstOption>,
        selected: Option<Value>,
        children: Vec<Control>,
    },
    Group {
        children: Vec<Control>,
    },
    List {
        items: Vec<ListItem>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectOption {
    pub value: Value,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListItem {
    pub index: usize,
    pub children: Vec<Control>,
}

/// Render options that live outside the configuration object
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Concrete paths (dot notation) of secret fields shown in clear text
    pub revealed_secrets: HashSet<String>,
}

/// Render the control tree for `fields` against `state`
pub fn render(fields: &[FieldDescriptor], state: &FormState, options: &RenderOptions) -> Vec<Control> {
    Renderer { state, options }.render_fields(fields.iter(), &[])
}

struct Renderer<'a> {
    state: &'a FormState,
    options: &'a RenderOptions,
}

impl Renderer<'_> {
    fn render_fields<'f>(
        &self,
        fields: impl Iterator<Item = &'f FieldDescriptor>,
        indices: &[usize],
    ) -> Vec<Control> {
        fields
            .filter_map(|field| self.render_field(field, indices))
            .collect()
    }

    fn render_field(&self, field: &FieldDescriptor, indices: &[usize]) -> Option<Control> {
        if field.hidden {
            return None;
        }

        let path = resolve_path(&field.path, indices);
        let current = self.state.get(&path).filter(|v| !v.is_null());

        let widget = match &field.kind {
            FieldKind::Scalar(scalar) if scalar.value_type.is_numeric() => Widget::Number {
                value: current
                    .or(scalar.default.as_ref())
                    .and_then(Value::as_number)
                    .cloned(),
                integer: scalar.value_type == ScalarType::Integer,
                minimum: scalar.minimum,
                maximum: scalar.maximum,
            },
            FieldKind::Scalar(scalar) => Widget::Text {
                value: current.or(scalar.default.as_ref()).map(display_text),
                multiline: scalar.multiline,
                secret: scalar.secret,
                masked: scalar.secret
                    && !self.options.revealed_secrets.contains(&path.to_string()),
            },
            FieldKind::Enum(e) => Widget::Select {
                options: e
                    .options
                    .iter()
                    .map(|value| SelectOption {
                        label: display_text(value),
                        value: value.clone(),
                    })
                    .collect(),
                selected: current.or(e.default.as_ref()).cloned(),
            },
            FieldKind::Boolean { default } => Widget::Toggle {
                on: current
                    .and_then(Value::as_bool)
                    .unwrap_or(default.unwrap_or(false)),
            },
            FieldKind::ArraySimple { default } => Widget::Tags {
                values: current
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_else(|| default.clone()),
            },
            FieldKind::Discriminated(d) => {
                let selected = d.resolve(current);
                let children = match &selected {
                    Some(value) => self.render_fields(d.branch(value), indices),
                    None => Vec::new(),
                };
                Widget::Discriminator {
                    options: d.options.clone(),
                    selected,
                    children,
                }
            }
            FieldKind::Object { sub_fields } => Widget::Group {
                children: self.render_fields(sub_fields.iter(), indices),
            },
            FieldKind::ArrayComplex { item_fields } => {
                let len = current.and_then(Value::as_array).map_or(0, Vec::len);
                let items = (0..len)
                    .map(|index| {
                        let mut nested = indices.to_vec();
                        nested.push(index);
                        ListItem {
                            index,
                            children: self.render_fields(item_fields.iter(), &nested),
                        }
                    })
                    .collect();
                Widget::List { items }
            }
        };

        Some(Control {
            field_id: field.id.clone(),
            label: field.title.clone(),
            description: field.description.clone(),
            required: field.required,
            path,
            widget,
        })
    }
}

/// Substitute array indices, outermost first, into a template path
pub fn resolve_path(template: &FieldPath, indices: &[usize]) -> FieldPath {
    indices
        .iter()
        .fold(template.clone(), |path, index| path.with_index(*index))
}

fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Control {
    /// Depth-first search for a control by concrete path
    pub fn find<'a>(controls: &'a [Control], path: &FieldPath) -> Option<&'a Control> {
        for control in controls {
            if &control.path == path {
                return Some(control);
            }
            let nested = match &control.widget {
                Widget::Discriminator { children, .. } | Widget::Group { children } => {
                    Self::find(children, path)
                }
                Widget::List { items } => items.iter().find_map(|item| Self::find(&item.children, path)),
                _ => None,
            };
            if nested.is_some() {
                return nested;
            }
        }
        None
    }
}
