//! Patch application.
//!
//! Patches are pure functions from the current value at a path to the next
//! one. The dispatcher resolves the patch value first and writes the result
//! back through the store.

use serde_json::{Map, Value};

use super::model::PatchOp;
use crate::binding::expr::strict_eq;

/// Per-element predicate for `remove`, called with `(item, index)`.
pub type Predicate<'a> = &'a dyn Fn(&Value, usize) -> bool;

/// Compute the value a patch leaves at its path.
///
/// - `set` replaces.
/// - `merge` shallow-merges an object into the current value. A current
///   value that is not an object is treated as `{}`; a patch value that is
///   not an object leaves the current value untouched.
/// - `append` pushes onto an array, starting a new one when the current
///   value is not an array.
/// - `remove` filters an array by `predicate`, else by `id` when the patch
///   value carries one, else by equality (an element also matches when its
///   `id` equals a scalar patch value).
/// - `delete` tombstones the path to `null`; the key stays.
pub fn apply(op: PatchOp, current: &Value, value: Value, predicate: Option<Predicate<'_>>) -> Value {
    match op {
        PatchOp::Set => value,
        PatchOp::Merge => merge(current, value),
        PatchOp::Append => match current {
            Value::Array(items) => {
                let mut items = items.clone();
                items.push(value);
                Value::Array(items)
            }
            _ => Value::Array(vec![value]),
        },
        PatchOp::Remove => remove(current, &value, predicate),
        PatchOp::Delete => Value::Null,
    }
}

fn merge(current: &Value, value: Value) -> Value {
    let Value::Object(patch) = value else {
        tracing::warn!(found = ?value, "merge patch value is not an object, ignoring");
        return current.clone();
    };
    let mut base = match current {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    base.extend(patch);
    Value::Object(base)
}

fn remove(current: &Value, value: &Value, predicate: Option<Predicate<'_>>) -> Value {
    let Value::Array(items) = current else {
        return current.clone();
    };

    let target_id = value.get("id").filter(|id| !id.is_null());
    let kept = items
        .iter()
        .enumerate()
        .filter(|(index, item)| {
            let matched = match (predicate, target_id) {
                (Some(predicate), _) => predicate(item, *index),
                (None, Some(id)) => item.get("id").is_some_and(|item_id| strict_eq(item_id, id)),
                (None, None) => {
                    strict_eq(item, value)
                        || (!value.is_object()
                            && item.get("id").is_some_and(|item_id| strict_eq(item_id, value)))
                }
            };
            !matched
        })
        .map(|(_, item)| item.clone())
        .collect();
    Value::Array(kept)
}
