//! # Utility Functions Module
//!
//! Helpers for navigating and mutating the JSON configuration tree by
//! [`FieldPath`]:
//! - Reading values at a path
//! - Writing values, creating intermediate objects or arrays as needed
//! - Removing values
//! - Emptiness checks used by required-field validation

use crate::engine::form::path::{FieldPath, PathSegment};
use serde_json::{Map, Value};

/// Get the value at `path`.
///
/// Returns None for missing keys, out-of-range indices, unresolved item
/// placeholders, or when a segment does not match the container type.
pub fn get_at<'b>(data: &'b Value, path: &FieldPath) -> Option<&'b Value> {
    let mut current = data;

    for segment in path.segments() {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key)?,
            (PathSegment::Index(index), Value::Array(arr)) => arr.get(*index)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Get a mutable reference to the value at `path`
pub fn get_at_mut<'b>(data: &'b mut Value, path: &FieldPath) -> Option<&'b mut Value> {
    let mut current = data;

    for segment in path.segments() {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get_mut(key)?,
            (PathSegment::Index(index), Value::Array(arr)) => arr.get_mut(*index)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Set the value at `path`, returning the previous value.
///
/// Missing intermediate containers are created (an object, or an array when
/// the following segment is an index). A null intermediate is replaced. Any
/// other mismatch between segment and container leaves `data` untouched and
/// returns `Err` with the offending prefix.
pub fn set_at(data: &mut Value, path: &FieldPath, value: Value) -> Result<Option<Value>, String> {
    let segments = path.segments();
    if segments.is_empty() {
        return Ok(Some(std::mem::replace(data, value)));
    }

    let mut current = data;
    for (i, segment) in segments.iter().enumerate() {
        let is_last = i == segments.len() - 1;
        let next_is_index = matches!(segments.get(i + 1), Some(PathSegment::Index(_)));

        if current.is_null() {
            *current = match segment {
                PathSegment::Index(_) => Value::Array(Vec::new()),
                _ => Value::Object(Map::new()),
            };
        }

        match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => {
                if is_last {
                    return Ok(map.insert(key.clone(), value));
                }
                current = map.entry(key.clone()).or_insert_with(|| {
                    if next_is_index {
                        Value::Array(Vec::new())
                    } else {
                        Value::Object(Map::new())
                    }
                });
            }
            (PathSegment::Index(index), Value::Array(arr)) => {
                // Expand array if necessary (fill with nulls)
                while arr.len() <= *index {
                    arr.push(Value::Null);
                }
                if is_last {
                    return Ok(Some(std::mem::replace(&mut arr[*index], value)));
                }
                current = &mut arr[*index];
            }
            (PathSegment::Item, _) => {
                return Err(format!("unresolved item placeholder in '{path}'"));
            }
            _ => {
                let prefix = FieldPath::new(segments[..=i].to_vec());
                return Err(format!("cannot navigate into '{prefix}'"));
            }
        }
    }

    Ok(None)
}

/// Remove the value at `path`.
///
/// Object keys are deleted; array elements are removed and later elements
/// shift down. Returns the removed value if there was one.
pub fn remove_at(data: &mut Value, path: &FieldPath) -> Option<Value> {
    let parent_path = path.parent()?;
    let parent = get_at_mut(data, &parent_path)?;

    match (path.segments().last()?, parent) {
        (PathSegment::Key(key), Value::Object(map)) => map.remove(key),
        (PathSegment::Index(index), Value::Array(arr)) if *index < arr.len() => {
            Some(arr.remove(*index))
        }
        _ => None,
    }
}

/// Absent-equivalent values for required checks
pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(arr)) => arr.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_at() {
        let data = json!({
            "source": {
                "host": "db.internal",
                "tables": [
                    {"name": "orders", "cursor": "updated_at"},
                    {"name": "users"}
                ]
            },
            "streams": ["a", "b"]
        });

        assert_eq!(
            get_at(&data, &FieldPath::parse("source.host")),
            Some(&json!("db.internal"))
        );
        assert_eq!(
            get_at(&data, &FieldPath::parse("source.tables.1.name")),
            Some(&json!("users"))
        );
        assert_eq!(get_at(&data, &FieldPath::parse("streams.1")), Some(&json!("b")));

        // Non-existent paths
        assert_eq!(get_at(&data, &FieldPath::parse("source.port")), None);
        assert_eq!(get_at(&data, &FieldPath::parse("streams.10")), None);
        assert_eq!(get_at(&data, &FieldPath::parse("source.tables.*.name")), None);
        assert_eq!(get_at(&data, &FieldPath::parse("source.host.inner")), None);
    }

    #[test]
    fn test_set_at_creates_intermediates() {
        let mut data = json!({});
        set_at(&mut data, &FieldPath::parse("credentials.auth_type"), json!("key")).unwrap();
        assert_eq!(data, json!({"credentials": {"auth_type": "key"}}));

        let mut data = json!({});
        set_at(&mut data, &FieldPath::parse("tables.1.name"), json!("users")).unwrap();
        assert_eq!(data, json!({"tables": [null, {"name": "users"}]}));
    }

    #[test]
    fn test_set_at_returns_previous() {
        let mut data = json!({"port": 5432});
        let old = set_at(&mut data, &FieldPath::parse("port"), json!(6543)).unwrap();
        assert_eq!(old, Some(json!(5432)));
        assert_eq!(data, json!({"port": 6543}));
    }

    #[test]
    fn test_set_at_rejects_bad_paths() {
        let mut data = json!({"host": "x"});
        assert!(set_at(&mut data, &FieldPath::parse("host.name"), json!(1)).is_err());
        assert!(set_at(&mut data, &FieldPath::parse("tables.*.name"), json!(1)).is_err());
        assert_eq!(data["host"], json!("x"));
    }

    #[test]
    fn test_remove_at() {
        let mut data = json!({"a": {"b": 1, "c": 2}, "list": [1, 2, 3]});
        assert_eq!(remove_at(&mut data, &FieldPath::parse("a.b")), Some(json!(1)));
        assert_eq!(remove_at(&mut data, &FieldPath::parse("list.1")), Some(json!(2)));
        assert_eq!(remove_at(&mut data, &FieldPath::parse("list.9")), None);
        assert_eq!(data, json!({"a": {"c": 2}, "list": [1, 3]}));
    }

    #[test]
    fn test_is_empty_value() {
        assert!(is_empty_value(None));
        assert!(is_empty_value(Some(&json!(null))));
        assert!(is_empty_value(Some(&json!("  "))));
        assert!(is_empty_value(Some(&json!([]))));
        assert!(!is_empty_value(Some(&json!(false))));
        assert!(!is_empty_value(Some(&json!(0))));
    }
}
