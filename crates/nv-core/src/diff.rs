//! Structural change-sets between two JSON documents.
//!
//! `diff(a, b)` produces the ordered list of changes turning `a` into `b`.
//! `apply` replays that list forward and `revert` undoes it, walking the
//! list backwards and applying the inverse of each change. Both are pure:
//! they return a new document and leave the input untouched.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{NarrationError, DIFF_REPLAY_FAILED};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{}", key),
            Self::Index(index) => write!(f, "[{}]", index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Change {
    Added {
        path: Vec<PathSegment>,
        value: Value,
    },
    Removed {
        path: Vec<PathSegment>,
        old: Value,
    },
    Edited {
        path: Vec<PathSegment>,
        old: Value,
        new: Value,
    },
}

impl Change {
    pub fn path(&self) -> &[PathSegment] {
        match self {
            Self::Added { path, .. } | Self::Removed { path, .. } | Self::Edited { path, .. } => {
                path
            }
        }
    }
}

pub fn diff(lhs: &Value, rhs: &Value) -> Vec<Change> {
    let mut changes = Vec::new();
    let mut path = Vec::new();
    diff_into(lhs, rhs, &mut path, &mut changes);
    changes
}

fn diff_into(lhs: &Value, rhs: &Value, path: &mut Vec<PathSegment>, out: &mut Vec<Change>) {
    if lhs == rhs {
        return;
    }

    match (lhs, rhs) {
        (Value::Object(left), Value::Object(right)) => {
            for (key, left_value) in left {
                path.push(PathSegment::Key(key.clone()));
                match right.get(key) {
                    Some(right_value) => diff_into(left_value, right_value, path, out),
                    None => out.push(Change::Removed {
                        path: path.clone(),
                        old: left_value.clone(),
                    }),
                }
                path.pop();
            }
            for (key, right_value) in right {
                if left.contains_key(key) {
                    continue;
                }
                path.push(PathSegment::Key(key.clone()));
                out.push(Change::Added {
                    path: path.clone(),
                    value: right_value.clone(),
                });
                path.pop();
            }
        }
        (Value::Array(left), Value::Array(right)) => {
            let common = left.len().min(right.len());
            for index in 0..common {
                path.push(PathSegment::Index(index));
                diff_into(&left[index], &right[index], path, out);
                path.pop();
            }
            // tail removals run last-to-first so each one hits the current end
            for index in (common..left.len()).rev() {
                path.push(PathSegment::Index(index));
                out.push(Change::Removed {
                    path: path.clone(),
                    old: left[index].clone(),
                });
                path.pop();
            }
            for (index, value) in right.iter().enumerate().skip(common) {
                path.push(PathSegment::Index(index));
                out.push(Change::Added {
                    path: path.clone(),
                    value: value.clone(),
                });
                path.pop();
            }
        }
        _ => out.push(Change::Edited {
            path: path.clone(),
            old: lhs.clone(),
            new: rhs.clone(),
        }),
    }
}

pub fn apply(target: &Value, changes: &[Change]) -> Result<Value, NarrationError> {
    let mut document = target.clone();
    for change in changes {
        match change {
            Change::Added { path, value } => insert_at(&mut document, path, value.clone())?,
            Change::Removed { path, .. } => remove_at(&mut document, path)?,
            Change::Edited { path, new, .. } => replace_at(&mut document, path, new.clone())?,
        }
    }
    Ok(document)
}

pub fn revert(target: &Value, changes: &[Change]) -> Result<Value, NarrationError> {
    let mut document = target.clone();
    for change in changes.iter().rev() {
        match change {
            Change::Added { path, .. } => remove_at(&mut document, path)?,
            Change::Removed { path, old } => insert_at(&mut document, path, old.clone())?,
            Change::Edited { path, old, .. } => replace_at(&mut document, path, old.clone())?,
        }
    }
    Ok(document)
}

fn format_path(path: &[PathSegment]) -> String {
    if path.is_empty() {
        return "<root>".to_string();
    }
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

fn unresolved(path: &[PathSegment], reason: &str) -> NarrationError {
    NarrationError::new(
        DIFF_REPLAY_FAILED,
        format!("Cannot {} at \"{}\".", reason, format_path(path)),
    )
}

fn resolve_mut<'a>(
    root: &'a mut Value,
    path: &[PathSegment],
) -> Result<&'a mut Value, NarrationError> {
    let mut current = root;
    for segment in path {
        let next = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get_mut(key),
            (PathSegment::Index(index), Value::Array(items)) => items.get_mut(*index),
            _ => None,
        };
        current = next.ok_or_else(|| unresolved(path, "resolve path"))?;
    }
    Ok(current)
}

fn insert_at(root: &mut Value, path: &[PathSegment], value: Value) -> Result<(), NarrationError> {
    let Some((last, parent_path)) = path.split_last() else {
        *root = value;
        return Ok(());
    };
    let parent = resolve_mut(root, parent_path).map_err(|_| unresolved(path, "insert"))?;
    match (last, parent) {
        (PathSegment::Key(key), Value::Object(map)) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        (PathSegment::Index(index), Value::Array(items)) if *index <= items.len() => {
            items.insert(*index, value);
            Ok(())
        }
        _ => Err(unresolved(path, "insert")),
    }
}

fn remove_at(root: &mut Value, path: &[PathSegment]) -> Result<(), NarrationError> {
    let Some((last, parent_path)) = path.split_last() else {
        return Err(unresolved(path, "remove the document root"));
    };
    let parent = resolve_mut(root, parent_path).map_err(|_| unresolved(path, "remove"))?;
    match (last, parent) {
        (PathSegment::Key(key), Value::Object(map)) => map
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| unresolved(path, "remove")),
        (PathSegment::Index(index), Value::Array(items)) if *index < items.len() => {
            items.remove(*index);
            Ok(())
        }
        _ => Err(unresolved(path, "remove")),
    }
}

fn replace_at(root: &mut Value, path: &[PathSegment], value: Value) -> Result<(), NarrationError> {
    let slot = resolve_mut(root, path).map_err(|_| unresolved(path, "edit"))?;
    *slot = value;
    Ok(())
}
