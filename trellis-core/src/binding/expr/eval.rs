//! Evaluation of parsed expressions over JSON values.
//!
//! Coercions follow JavaScript: `null` is `0` in arithmetic, `+` with a
//! string operand concatenates, comparisons of two strings are
//! lexicographic, `&&` / `||` / `??` return an operand rather than a boolean.
//! `null` stands in for both `null` and `undefined`. Results that are not
//! finite numbers become `null`.

use serde_json::{Number, Value};

use super::parser::{BinaryOp, Expr, Root, UnaryOp};
use crate::context::Context;
use crate::state::{path, StateScope, Store};

/// What an expression may read.
pub struct Env<'a> {
    pub ctx: &'a Context,
    pub store: &'a Store,
}

impl Env<'_> {
    /// `state.<path>`: local scope first, then workspace.
    pub fn state(&self, path: &str) -> Value {
        lookup_state(self.store, path)
    }

    fn root(&self, root: Root) -> Value {
        match root {
            Root::Props => self.ctx.props_value(),
            Root::State => {
                let mut merged = match self.store.get(StateScope::Workspace, "") {
                    Value::Object(map) => map,
                    _ => Default::default(),
                };
                if let Value::Object(local) = self.store.get(StateScope::Local, "") {
                    merged.extend(local);
                }
                Value::Object(merged)
            }
            Root::Workspace => self.store.get(StateScope::Workspace, ""),
            Root::App => self.store.get(StateScope::App, ""),
        }
    }

    fn read_path(&self, root: Root, segments: &[String]) -> Value {
        if segments.is_empty() {
            return self.root(root);
        }
        // Only the first segment addresses a signal; the rest navigate its value
        let (first, rest) = (&segments[0], &segments[1..]);
        let value = match root {
            Root::Props => self.ctx.props.get(first.as_str()).cloned().unwrap_or(Value::Null),
            Root::State => self.state(first),
            Root::Workspace => self.store.get(StateScope::Workspace, first),
            Root::App => self.store.get(StateScope::App, first),
        };
        path::lookup(&value, rest)
    }
}

/// Read `path` from local state, falling back to workspace state.
pub(crate) fn lookup_state(store: &Store, path: &str) -> Value {
    // Tracks the local entry (or the local scope version when missing)
    let local = store.get(StateScope::Local, path);
    if store.contains(StateScope::Local, path) {
        local
    } else {
        store.get(StateScope::Workspace, path)
    }
}

pub fn evaluate(expr: &Expr, env: &Env<'_>) -> Value {
    match expr {
        Expr::Literal(value) => value.clone(),
        Expr::Array(items) => Value::Array(items.iter().map(|e| evaluate(e, env)).collect()),
        Expr::Root(root) => env.root(*root),
        Expr::Member { .. } => match root_path(expr, env) {
            Some((root, segments)) => env.read_path(root, &segments),
            None => {
                let Expr::Member { object, property } = expr else {
                    return Value::Null;
                };
                let object = evaluate(object, env);
                let key = property_key(&evaluate(property, env));
                path::lookup(&object, &[key])
            }
        },
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, env);
            match op {
                UnaryOp::Not => Value::Bool(!truthy(&value)),
                UnaryOp::Neg => number(-to_number(&value)),
                UnaryOp::Plus => number(to_number(&value)),
            }
        }
        Expr::Binary { op, lhs, rhs } => binary(*op, lhs, rhs, env),
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            if truthy(&evaluate(test, env)) {
                evaluate(consequent, env)
            } else {
                evaluate(alternate, env)
            }
        }
    }
}

/// Flatten `root.a[b].c` into a root and string segments, evaluating
/// computed keys. Returns `None` if the chain does not start at a root.
fn root_path(expr: &Expr, env: &Env<'_>) -> Option<(Root, Vec<String>)> {
    match expr {
        Expr::Root(root) => Some((*root, Vec::new())),
        Expr::Member { object, property } => {
            let (root, mut segments) = root_path(object, env)?;
            segments.push(property_key(&evaluate(property, env)));
            Some((root, segments))
        }
        _ => None,
    }
}

fn property_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => to_display_string(other),
    }
}

fn binary(op: BinaryOp, lhs: &Expr, rhs: &Expr, env: &Env<'_>) -> Value {
    // Short-circuit operators evaluate the right side lazily
    match op {
        BinaryOp::And => {
            let left = evaluate(lhs, env);
            return if truthy(&left) { evaluate(rhs, env) } else { left };
        }
        BinaryOp::Or => {
            let left = evaluate(lhs, env);
            return if truthy(&left) { left } else { evaluate(rhs, env) };
        }
        BinaryOp::Coalesce => {
            let left = evaluate(lhs, env);
            return if left.is_null() { evaluate(rhs, env) } else { left };
        }
        _ => {}
    }

    let a = evaluate(lhs, env);
    let b = evaluate(rhs, env);
    match op {
        BinaryOp::Add => add(&a, &b),
        BinaryOp::Sub => number(to_number(&a) - to_number(&b)),
        BinaryOp::Mul => number(to_number(&a) * to_number(&b)),
        BinaryOp::Div => number(to_number(&a) / to_number(&b)),
        BinaryOp::Mod => number(to_number(&a) % to_number(&b)),
        BinaryOp::Lt => Value::Bool(compare(&a, &b).is_some_and(|o| o.is_lt())),
        BinaryOp::Le => Value::Bool(compare(&a, &b).is_some_and(|o| o.is_le())),
        BinaryOp::Gt => Value::Bool(compare(&a, &b).is_some_and(|o| o.is_gt())),
        BinaryOp::Ge => Value::Bool(compare(&a, &b).is_some_and(|o| o.is_ge())),
        BinaryOp::LooseEq => Value::Bool(loose_eq(&a, &b)),
        BinaryOp::LooseNe => Value::Bool(!loose_eq(&a, &b)),
        BinaryOp::StrictEq => Value::Bool(strict_eq(&a, &b)),
        BinaryOp::StrictNe => Value::Bool(!strict_eq(&a, &b)),
        BinaryOp::And | BinaryOp::Or | BinaryOp::Coalesce => Value::Null,
    }
}

fn add(a: &Value, b: &Value) -> Value {
    let stringy = |v: &Value| matches!(v, Value::String(_) | Value::Array(_) | Value::Object(_));
    if stringy(a) || stringy(b) {
        let mut s = concat_string(a);
        s.push_str(&concat_string(b));
        Value::String(s)
    } else {
        number(to_number(a) + to_number(b))
    }
}

fn concat_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        other => to_display_string(other),
    }
}

fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => to_number(a).partial_cmp(&to_number(b)),
    }
}

/// Build a JSON number, normalizing integral values to integers.
///
/// NaN and the infinities have no JSON form and become `null`.
pub fn number(n: f64) -> Value {
    if !n.is_finite() {
        return Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Value::from(n as i64);
    }
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

/// JavaScript truthiness.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// JavaScript `Number(value)`.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [single] => to_number(single),
            _ => f64::NAN,
        },
        Value::Object(_) => f64::NAN,
    }
}

/// Text form of a value, as rendered in a text node.
///
/// `null` renders as the empty string; arrays join their items with `,`.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
            (None, Some(f)) => f.to_string(),
            (None, None) => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(to_display_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// `===`. Numbers compare by value regardless of representation; arrays and
/// objects compare structurally.
pub fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// `==`.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(_), Value::String(_))
        | (Value::String(_), Value::Number(_))
        | (Value::Bool(_), _)
        | (_, Value::Bool(_)) => to_number(a) == to_number(b),
        _ => strict_eq(a, b),
    }
}
