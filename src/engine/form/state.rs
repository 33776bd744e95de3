use crate::engine::error::{FormflowError, Result};
use crate::engine::form::path::FieldPath;
use crate::engine::utils::{get_at, remove_at, set_at};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// The configuration object being edited, plus a log of every mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormState {
    value: Value,
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Change {
    pub path: Arc<str>,
    pub old_value: Arc<Value>,
    pub new_value: Arc<Value>,
    pub timestamp: DateTime<Utc>,
}

impl Default for FormState {
    fn default() -> Self {
        Self::new()
    }
}

impl FormState {
    pub fn new() -> Self {
        Self {
            value: Value::Object(Map::new()),
            changes: Vec::new(),
        }
    }

    /// Wrap an existing configuration. A non-object root is rejected.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(_) => Ok(Self {
                value,
                changes: Vec::new(),
            }),
            Value::Null => Ok(Self::new()),
            other => Err(FormflowError::Path(format!(
                "form state root must be an object, got {other}"
            ))),
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        get_at(&self.value, path)
    }

    pub fn set(&mut self, path: &FieldPath, value: Value) -> Result<()> {
        let new_value = Arc::new(value.clone());
        let old = set_at(&mut self.value, path, value).map_err(FormflowError::Path)?;
        self.record(path, old.unwrap_or(Value::Null), new_value);
        Ok(())
    }

    /// Remove the value at `path`; clearing an absent value is a no-op
    pub fn clear(&mut self, path: &FieldPath) {
        if let Some(old) = remove_at(&mut self.value, path) {
            self.record(path, old, Arc::new(Value::Null));
        }
    }

    fn record(&mut self, path: &FieldPath, old_value: Value, new_value: Arc<Value>) {
        self.changes.push(Change {
            path: Arc::from(path.to_string()),
            old_value: Arc::new(old_value),
            new_value,
            timestamp: Utc::now(),
        });
    }
}
