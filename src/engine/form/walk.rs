use crate::engine::form::field::{FieldDescriptor, FieldKind};
use crate::engine::form::path::{FieldPath, PathSegment};
use crate::engine::form::render::resolve_path;
use crate::engine::form::state::FormState;
use serde_json::Value;

/// Visit every visible field depth-first with its concrete path and current value.
///
/// Hidden fields are skipped along with their descendants, and only the
/// active branch of a discriminator is entered.
pub fn walk_visible<F>(fields: &[FieldDescriptor], state: &FormState, visitor: &mut F)
where
    F: FnMut(&FieldDescriptor, &FieldPath, Option<&Value>),
{
    let refs: Vec<&FieldDescriptor> = fields.iter().collect();
    walk(&refs, state, &[], false, visitor);
}

/// Like [`walk_visible`], but hidden fields and their descendants are visited too
pub fn walk_all<F>(fields: &[FieldDescriptor], state: &FormState, visitor: &mut F)
where
    F: FnMut(&FieldDescriptor, &FieldPath, Option<&Value>),
{
    let refs: Vec<&FieldDescriptor> = fields.iter().collect();
    walk(&refs, state, &[], true, visitor);
}

fn walk<F>(
    fields: &[&FieldDescriptor],
    state: &FormState,
    indices: &[usize],
    include_hidden: bool,
    visitor: &mut F,
) where
    F: FnMut(&FieldDescriptor, &FieldPath, Option<&Value>),
{
    for &field in fields {
        if field.hidden && !include_hidden {
            continue;
        }

        let path = resolve_path(&field.path, indices);
        let current = state.get(&path).filter(|v| !v.is_null());
        visitor(field, &path, current);

        match &field.kind {
            FieldKind::Discriminated(d) => {
                if let Some(selected) = d.resolve(current) {
                    let branch: Vec<&FieldDescriptor> = d.branch(&selected).collect();
                    walk(&branch, state, indices, include_hidden, visitor);
                }
            }
            FieldKind::Object { sub_fields } => {
                let children: Vec<&FieldDescriptor> = sub_fields.iter().collect();
                walk(&children, state, indices, include_hidden, visitor);
            }
            FieldKind::ArrayComplex { item_fields } => {
                let len = current.and_then(Value::as_array).map_or(0, Vec::len);
                let children: Vec<&FieldDescriptor> = item_fields.iter().collect();
                for index in 0..len {
                    let mut nested = indices.to_vec();
                    nested.push(index);
                    walk(&children, state, &nested, include_hidden, visitor);
                }
            }
            _ => {}
        }
    }
}

/// Find the descriptor that owns a concrete path.
///
/// Item placeholders match any index. Hidden fields and their descendants are
/// never found. Inside a discriminator only the active branch is searched, so a
/// path belonging to an unselected branch is not found.
pub fn locate<'a>(
    fields: &'a [FieldDescriptor],
    state: &FormState,
    path: &FieldPath,
) -> Option<&'a FieldDescriptor> {
    let refs: Vec<&'a FieldDescriptor> = fields.iter().collect();
    locate_in(&refs, state, path)
}

fn locate_in<'a>(
    fields: &[&'a FieldDescriptor],
    state: &FormState,
    path: &FieldPath,
) -> Option<&'a FieldDescriptor> {
    for &field in fields {
        if field.hidden {
            continue;
        }
        let template = field.path.segments();
        let concrete = path.segments();
        if template.len() > concrete.len() || !segments_match(template, &concrete[..template.len()]) {
            continue;
        }
        if template.len() == concrete.len() {
            return Some(field);
        }

        let children: Vec<&'a FieldDescriptor> = match &field.kind {
            FieldKind::Discriminated(d) => {
                let owner = FieldPath::new(concrete[..template.len()].to_vec());
                match d.resolve(state.get(&owner)) {
                    Some(selected) => d
                        .sub_fields
                        .iter()
                        .filter(|f| f.parent_value.as_ref() == Some(&selected))
                        .collect(),
                    None => continue,
                }
            }
            FieldKind::Object { sub_fields } => sub_fields.iter().collect(),
            FieldKind::ArrayComplex { item_fields } => item_fields.iter().collect(),
            _ => continue,
        };

        if let Some(found) = locate_in(&children, state, path) {
            return Some(found);
        }
    }
    None
}

fn segments_match(template: &[PathSegment], concrete: &[PathSegment]) -> bool {
    template.iter().zip(concrete).all(|(t, c)| match (t, c) {
        (PathSegment::Item, PathSegment::Index(_)) => true,
        (t, c) => t == c,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::form::compiler::SpecCompiler;
    use serde_json::json;

    fn fields() -> Vec<FieldDescriptor> {
        SpecCompiler::new()
            .compile_spec(&json!({
                "properties": {
                    "auth": {"type": "object", "oneOf": [
                        {"title": "Key", "properties": {"method": {"const": "key"}, "key": {"type": "string"}}},
                        {"title": "OAuth", "properties": {"method": {"const": "oauth"}, "client_id": {"type": "string"}}}
                    ]},
                    "secret_flag": {"type": "boolean", "airbyte_hidden": true},
                    "tables": {"type": "array", "items": {"type": "object", "properties": {
                        "name": {"type": "string"}
                    }}}
                }
            }))
            .unwrap()
    }

    #[test]
    fn test_walk_visits_active_branch_and_items() {
        let fields = fields();
        let state = FormState::from_value(json!({
            "auth": {"method": "oauth", "client_id": "abc"},
            "tables": [{"name": "a"}, {"name": "b"}]
        }))
        .unwrap();

        let mut visited = Vec::new();
        walk_visible(&fields, &state, &mut |_, path, _| visited.push(path.to_string()));
        assert_eq!(
            visited,
            vec!["auth", "auth.client_id", "tables", "tables.0.name", "tables.1.name"]
        );
    }

    #[test]
    fn test_locate_respects_active_branch() {
        let fields = fields();
        let state = FormState::from_value(json!({"auth": {"method": "key"}})).unwrap();

        let found = locate(&fields, &state, &FieldPath::parse("auth.key")).unwrap();
        assert_eq!(found.id, "auth.key[key]");
        assert!(locate(&fields, &state, &FieldPath::parse("auth.client_id")).is_none());

        assert!(locate(&fields, &state, &FieldPath::parse("secret_flag")).is_none());
        assert!(locate(&fields, &state, &FieldPath::parse("auth.method")).is_none());

        let item = locate(&fields, &state, &FieldPath::parse("tables.3.name")).unwrap();
        assert_eq!(item.path.to_string(), "tables.*.name");
        assert!(locate(&fields, &state, &FieldPath::parse("missing")).is_none());
    }

    #[test]
    fn test_walk_all_includes_hidden_fields() {
        let fields = fields();
        let state = FormState::from_value(json!({"auth": {"method": "key"}})).unwrap();

        let mut visited = Vec::new();
        walk_all(&fields, &state, &mut |_, path, _| visited.push(path.to_string()));
        assert_eq!(visited, vec!["auth", "auth.key", "secret_flag", "tables"]);
    }
}
