//! Dot-notation path navigation over document values.
//!
//! `resolve` distinguishes an absent path (`None`) from a path that is
//! present with a null value (`Some(&Value::Null)`). Lists are never
//! indexed by a path segment: a list reached before the last segment
//! ends the walk as absent.

use crate::types::Value;

/// Resolve a dotted path from `root`. The empty path resolves to `root`.
pub fn resolve<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Map(fields) => fields.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Join a parent path and a field name with `.`.
pub fn join(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", parent, field)
    }
}

/// Path of the `i`-th element of the list at `parent`.
pub fn index(parent: &str, i: usize) -> String {
    format!("{}[{}]", parent, i)
}

/// Name a path for reasons and missing-path lists; the empty path is "root".
pub fn display(path: &str) -> &str {
    if path.is_empty() {
        "root"
    } else {
        path
    }
}
