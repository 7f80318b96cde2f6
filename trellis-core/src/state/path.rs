//! Dotted paths into JSON values.
//!
//! `tasks.0.title` and `tasks[0].title` are equivalent. The first segment of
//! a state path names the entry, the rest navigate into its value.

use serde_json::{Map, Value};
use smallvec::SmallVec;

/// Parsed path segments.
pub type Segments = SmallVec<[String; 4]>;

/// Split a path into segments. Empty segments are dropped.
pub fn split(path: &str) -> Segments {
    path.split(['.', '[', ']'])
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read the value at `segments`, or `null` if any step is missing.
///
/// `length` on an array or string yields its length.
pub fn lookup<S: AsRef<str>>(value: &Value, segments: &[S]) -> Value {
    let mut current = value;
    for (i, segment) in segments.iter().enumerate() {
        let segment = segment.as_ref();
        let last = i + 1 == segments.len();
        current = match current {
            Value::Object(map) => match map.get(segment) {
                Some(next) => next,
                None => return Value::Null,
            },
            Value::Array(items) => {
                if segment == "length" && last {
                    return Value::from(items.len());
                }
                match segment.parse::<usize>().ok().and_then(|i| items.get(i)) {
                    Some(next) => next,
                    None => return Value::Null,
                }
            }
            Value::String(s) if segment == "length" && last => {
                return Value::from(s.chars().count());
            }
            _ => return Value::Null,
        };
    }
    current.clone()
}

/// Write `new_value` at `segments` inside `target`, creating intermediate
/// objects as needed.
///
/// An array index equal to the length appends. A larger index is refused
/// with a warning and leaves `target` unchanged. A scalar in the way is
/// replaced by an object.
pub fn assign<S: AsRef<str>>(target: &mut Value, segments: &[S], new_value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *target = new_value;
        return;
    };
    let first = first.as_ref();

    if let Value::Array(items) = target {
        if let Ok(index) = first.parse::<usize>() {
            if index == items.len() {
                items.push(Value::Null);
            }
            match items.get_mut(index) {
                Some(slot) => assign(slot, rest, new_value),
                None => tracing::warn!(
                    index,
                    len = items.len(),
                    "ignoring write past the end of an array"
                ),
            }
            return;
        }
    }

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        let slot = map.entry(first.to_string()).or_insert(Value::Null);
        assign(slot, rest, new_value);
    }
}

/// Build a fresh value holding `new_value` at `segments`.
pub fn build<S: AsRef<str>>(segments: &[S], new_value: Value) -> Value {
    let mut root = Value::Null;
    assign(&mut root, segments, new_value);
    root
}
