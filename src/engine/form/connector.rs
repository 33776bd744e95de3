use crate::engine::error::{ErrorInfo, FormflowError, Result};
use crate::engine::form::compiler::SpecCompiler;
use crate::engine::form::field::{FieldDescriptor, FieldKind, ScalarType};
use crate::engine::form::path::FieldPath;
use crate::engine::form::render::{Control, RenderOptions, render};
use crate::engine::form::state::FormState;
use crate::engine::form::validation::validate_form;
use crate::engine::form::walk::{locate, walk_all, walk_visible};
use log::{debug, info};
use regex::Regex;
use serde_json::{Map, Number, Value};

/// A connector configuration form: compiled descriptors bound to live state.
///
/// All edits go through the typed operations below, which keep the state
/// tree consistent with the descriptor tree (e.g. a selected discriminator
/// always stores its constant key).
#[derive(Debug, Clone)]
pub struct ConnectorForm {
    fields: Vec<FieldDescriptor>,
    patterns: Vec<Regex>,
    state: FormState,
    render_options: RenderOptions,
}

impl ConnectorForm {
    /// Compile a connector specification into a form holding only its constants
    pub fn from_spec(spec: &Value) -> Result<Self> {
        let mut compiler = SpecCompiler::new();
        let fields = compiler.compile_spec(spec)?;
        let mut form = Self {
            fields,
            patterns: compiler.into_patterns(),
            state: FormState::new(),
            render_options: RenderOptions::default(),
        };
        form.apply_constants()?;
        Ok(form)
    }

    /// Bind existing configuration, normalizing legacy discriminator values
    /// and restoring declared constants
    pub fn with_state(mut self, value: Value) -> Result<Self> {
        self.state = FormState::from_value(value)?;
        let normalized = self.normalize_legacy()?;
        if normalized > 0 {
            info!("Normalized {normalized} legacy discriminator value(s)");
        }
        self.apply_constants()?;
        Ok(self)
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn value(&self) -> &Value {
        self.state.value()
    }

    /// Populate every field that has no value yet with its initial value.
    ///
    /// Visible fields get their declared default; hidden fields only their constant.
    pub fn seed_defaults(&mut self) -> Result<usize> {
        let mut pending = Vec::new();
        walk_all(&self.fields, &self.state, &mut |field, path, current| {
            if current.is_none() {
                if let Some(default) = field.initial_value() {
                    pending.push((path.clone(), default));
                }
            }
        });

        let count = pending.len();
        for (path, default) in pending {
            self.state.set(&path, default)?;
        }
        debug!("Seeded {count} default value(s)");
        Ok(count)
    }

    /// Convert bare primitive discriminator values into `{const_key: value}`
    pub fn normalize_legacy(&mut self) -> Result<usize> {
        let mut pending = Vec::new();
        walk_visible(&self.fields, &self.state, &mut |field, path, current| {
            let (FieldKind::Discriminated(d), Some(current)) = (&field.kind, current) else {
                return;
            };
            if let Some(key) = &d.const_key {
                if !current.is_object() && d.has_option(current) {
                    let mut normalized = Map::new();
                    normalized.insert(key.clone(), current.clone());
                    pending.push((path.clone(), Value::Object(normalized)));
                }
            }
        });

        let count = pending.len();
        for (path, value) in pending {
            debug!("Normalizing legacy discriminator value at {path}");
            self.state.set(&path, value)?;
        }
        Ok(count)
    }

    pub fn render(&self) -> Vec<Control> {
        render(&self.fields, &self.state, &self.render_options)
    }

    /// Choose a branch of a discriminated field.
    ///
    /// The state at `path` becomes exactly `{const_key: value}` plus the
    /// initial values of the chosen branch; values entered for any other
    /// branch are discarded. Re-selecting the active branch keeps its values.
    pub fn select_const(&mut self, path: &FieldPath, value: Value) -> Result<()> {
        let field = self.field_at(path)?;
        let FieldKind::Discriminated(d) = &field.kind else {
            return Err(kind_mismatch(field, "a discriminated object"));
        };
        if !d.has_option(&value) {
            return Err(FormflowError::Validation(format!(
                "{value} is not an option of {}",
                field.title
            )));
        }

        let current = self.state.get(path);
        let stored_shape = d.const_key.is_none() || current.is_some_and(Value::is_object);
        if stored_shape && d.resolve(current).as_ref() == Some(&value) {
            debug!("{value} is already selected for {path}");
            return Ok(());
        }

        let replacement = match &d.const_key {
            Some(key) => {
                let mut object = Map::new();
                object.insert(key.clone(), value.clone());
                for sub_field in d.branch(&value) {
                    if let (Some(name), Some(initial)) =
                        (sub_field.path.last_key(), sub_field.initial_value())
                    {
                        object.insert(name.to_string(), initial);
                    }
                }
                Value::Object(object)
            }
            None => value.clone(),
        };

        debug!("Selected {value} for {path}");
        self.state.set(path, replacement)?;
        self.apply_constants()?;
        Ok(())
    }

    /// Pick an enum value; anything outside the declared options is rejected
    pub fn select_enum(&mut self, path: &FieldPath, value: Value) -> Result<()> {
        let field = self.field_at(path)?;
        let FieldKind::Enum(e) = &field.kind else {
            return Err(kind_mismatch(field, "an enum"));
        };
        if !e.options.contains(&value) {
            return Err(FormflowError::Validation(format!(
                "{value} is not an option of {}",
                field.title
            )));
        }
        self.state.set(path, value)
    }

    pub fn set_bool(&mut self, path: &FieldPath, on: bool) -> Result<()> {
        let field = self.field_at(path)?;
        if !matches!(field.kind, FieldKind::Boolean { .. }) {
            return Err(kind_mismatch(field, "a boolean"));
        }
        self.state.set(path, Value::Bool(on))
    }

    /// Replace the values of a free-entry multi-value field
    pub fn set_tags(&mut self, path: &FieldPath, values: Vec<Value>) -> Result<()> {
        let field = self.field_at(path)?;
        if !matches!(field.kind, FieldKind::ArraySimple { .. }) {
            return Err(kind_mismatch(field, "a tag list"));
        }
        self.state.set(path, Value::Array(values))
    }

    /// Apply text typed into a scalar input.
    ///
    /// Numeric fields parse the text; text that does not parse (including
    /// empty text) clears the stored value instead of keeping a stale one.
    pub fn set_text(&mut self, path: &FieldPath, raw: &str) -> Result<()> {
        let field = self.field_at(path)?;
        let FieldKind::Scalar(scalar) = &field.kind else {
            return Err(kind_mismatch(field, "a text or number input"));
        };

        let parsed = match scalar.value_type {
            ScalarType::String => Some(Value::String(raw.to_string())),
            ScalarType::Integer => raw.trim().parse::<i64>().ok().map(Value::from),
            ScalarType::Number => parse_number(raw.trim()).map(Value::Number),
        };

        match parsed {
            Some(value) => self.state.set(path, value),
            None => {
                debug!("Clearing {path}: '{raw}' is not a valid number");
                self.state.clear(path);
                Ok(())
            }
        }
    }

    /// Append an item to an array-of-objects field, returning its index.
    ///
    /// The new item holds the initial values of required item fields and
    /// every item constant.
    pub fn add_item(&mut self, path: &FieldPath) -> Result<usize> {
        let field = self.field_at(path)?;
        let FieldKind::ArrayComplex { item_fields } = &field.kind else {
            return Err(kind_mismatch(field, "a list of objects"));
        };

        let mut item = Map::new();
        for item_field in item_fields
            .iter()
            .filter(|f| f.required || f.constant_value().is_some())
        {
            if let (Some(name), Some(initial)) = (item_field.path.last_key(), item_field.initial_value()) {
                item.insert(name.to_string(), initial);
            }
        }

        let mut items = self.array_at(path)?;
        items.push(Value::Object(item));
        let index = items.len() - 1;
        self.state.set(path, Value::Array(items))?;
        self.apply_constants()?;
        debug!("Added item {index} to {path}");
        Ok(index)
    }

    /// Remove exactly the item at `index`
    pub fn remove_item(&mut self, path: &FieldPath, index: usize) -> Result<()> {
        let field = self.field_at(path)?;
        if !matches!(field.kind, FieldKind::ArrayComplex { .. }) {
            return Err(kind_mismatch(field, "a list of objects"));
        }

        let mut items = self.array_at(path)?;
        if index >= items.len() {
            return Err(FormflowError::Path(format!(
                "{path} has {} item(s), cannot remove index {index}",
                items.len()
            )));
        }
        items.remove(index);
        self.state.set(path, Value::Array(items))
    }

    /// Flip a secret field between masked and clear text; returns true when revealed
    pub fn toggle_secret(&mut self, path: &FieldPath) -> Result<bool> {
        let field = self.field_at(path)?;
        if !field.is_secret() {
            return Err(kind_mismatch(field, "a secret"));
        }

        let key = path.to_string();
        let revealed = &mut self.render_options.revealed_secrets;
        if revealed.remove(&key) {
            Ok(false)
        } else {
            revealed.insert(key);
            Ok(true)
        }
    }

    pub fn validate(&self) -> Vec<ErrorInfo> {
        validate_form(&self.fields, &self.state, &self.patterns)
    }

    /// Validate and hand back the configuration object
    pub fn submit(&self) -> Result<Value> {
        let errors = self.validate();
        if errors.is_empty() {
            info!("Connector form submitted");
            Ok(self.state.value().clone())
        } else {
            info!("Connector form rejected with {} error(s)", errors.len());
            Err(FormflowError::InvalidForm { errors })
        }
    }

    /// Write every reachable constant whose stored value differs from it
    fn apply_constants(&mut self) -> Result<usize> {
        let mut pending = Vec::new();
        walk_all(&self.fields, &self.state, &mut |field, path, current| {
            if let Some(constant) = field.constant_value() {
                if current != Some(constant) {
                    pending.push((path.clone(), constant.clone()));
                }
            }
        });

        let count = pending.len();
        for (path, constant) in pending {
            debug!("Writing constant {constant} at {path}");
            self.state.set(&path, constant)?;
        }
        Ok(count)
    }

    fn field_at(&self, path: &FieldPath) -> Result<&FieldDescriptor> {
        if !path.is_concrete() {
            return Err(FormflowError::Path(format!(
                "{path} still contains an item placeholder"
            )));
        }
        locate(&self.fields, &self.state, path)
            .ok_or_else(|| FormflowError::Field(format!("no visible field at {path}")))
    }

    fn array_at(&self, path: &FieldPath) -> Result<Vec<Value>> {
        match self.state.get(path) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items.clone()),
            Some(other) => Err(FormflowError::Path(format!(
                "{path} holds {other}, expected a list"
            ))),
        }
    }
}

fn kind_mismatch(field: &FieldDescriptor, expected: &str) -> FormflowError {
    FormflowError::Field(format!("{} is not {expected}", field.id))
}

/// Integers stay integers; non-finite values are rejected
fn parse_number(raw: &str) -> Option<Number> {
    if let Ok(integer) = raw.parse::<i64>() {
        return Some(Number::from(integer));
    }
    raw.parse::<f64>().ok().and_then(Number::from_f64)
}
