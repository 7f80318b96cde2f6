//! Built-in actions.
//!
//! Ready-made reducers a view can dispatch without declaring an action.
//! Arguments come from the dispatch context's props; paths are scoped paths
//! (`app.filters.status`) defaulting to the workspace scope.
//!
//! | name     | props                                          |
//! |----------|------------------------------------------------|
//! | `filter` | `source`, `target`?, `field` + `value`, or `predicate` |
//! | `sort`   | `path`, `by`?, `order`? (`asc` / `desc`)       |
//! | `select` | `path`? (default `selected`), `value`          |
//! | `toggle` | `path`                                         |
//! | `reset`  | `path`                                         |

use std::cmp::Ordering;

use serde_json::Value;

use crate::binding::expr::{self, loose_eq, to_display_string, to_number, truthy, Expr};
use crate::context::Context;
use crate::state::{path, ScopedPath, StateScope, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Filter,
    Sort,
    Select,
    Toggle,
    Reset,
}

impl Builtin {
    pub const ALL: [Builtin; 5] = [
        Builtin::Filter,
        Builtin::Sort,
        Builtin::Select,
        Builtin::Toggle,
        Builtin::Reset,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "filter" => Some(Builtin::Filter),
            "sort" => Some(Builtin::Sort),
            "select" => Some(Builtin::Select),
            "toggle" => Some(Builtin::Toggle),
            "reset" => Some(Builtin::Reset),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Filter => "filter",
            Builtin::Sort => "sort",
            Builtin::Select => "select",
            Builtin::Toggle => "toggle",
            Builtin::Reset => "reset",
        }
    }

    /// Run against `store`, reading arguments from `ctx.props`.
    pub fn run(&self, ctx: &Context, store: &Store) {
        store.runtime().batch(|| match self {
            Builtin::Filter => filter(ctx, store),
            Builtin::Sort => sort(ctx, store),
            Builtin::Select => select(ctx, store),
            Builtin::Toggle => toggle(ctx, store),
            Builtin::Reset => reset(ctx, store),
        });
    }
}

fn path_arg(ctx: &Context, name: &str, builtin: Builtin) -> Option<ScopedPath> {
    match ctx.prop(name) {
        Value::String(p) if !p.is_empty() => Some(ScopedPath::parse(&p, StateScope::Workspace)),
        _ => {
            tracing::warn!(builtin = builtin.name(), arg = name, "missing path argument");
            None
        }
    }
}

fn filter(ctx: &Context, store: &Store) {
    let Some(source) = path_arg(ctx, "source", Builtin::Filter) else {
        return;
    };
    let target = match ctx.prop("target") {
        Value::String(p) if !p.is_empty() => ScopedPath::parse(&p, StateScope::Workspace),
        _ => ScopedPath {
            scope: source.scope,
            path: format!("{}Filtered", source.path),
        },
    };

    let items = match store.get_untracked(source.scope, &source.path) {
        Value::Array(items) => items,
        _ => Vec::new(),
    };

    let predicate = match ctx.prop("predicate") {
        Value::String(text) => match Expr::parse(&text) {
            Ok(expr) => Some(expr),
            Err(err) => {
                tracing::warn!(error = %err, "filter predicate does not parse");
                return;
            }
        },
        _ => None,
    };
    let field = ctx.prop("field");
    let wanted = ctx.prop("value");

    let kept: Vec<Value> = items
        .into_iter()
        .enumerate()
        .filter(|(index, item)| match &predicate {
            Some(expr) => {
                let item_ctx = ctx
                    .with_prop("item", item.clone())
                    .with_prop("index", Value::from(*index));
                truthy(&expr::evaluate_expr(expr, &item_ctx, store))
            }
            // No value selects everything, so `filter` doubles as "clear filter"
            None if wanted.is_null() => true,
            None => {
                let actual = match &field {
                    Value::String(f) => path::lookup(item, &path::split(f)),
                    _ => item.clone(),
                };
                loose_eq(&actual, &wanted)
            }
        })
        .map(|(_, item)| item)
        .collect();

    store.set(target.scope, &target.path, Value::Array(kept));
}

fn sort(ctx: &Context, store: &Store) {
    let Some(target) = path_arg(ctx, "path", Builtin::Sort) else {
        return;
    };
    let Value::Array(mut items) = store.get_untracked(target.scope, &target.path) else {
        return;
    };

    let by = match ctx.prop("by") {
        Value::String(by) => Some(path::split(&by)),
        _ => None,
    };
    let descending = matches!(ctx.prop("order"), Value::String(o) if o.eq_ignore_ascii_case("desc"));

    let key = |item: &Value| match &by {
        Some(segments) => path::lookup(item, segments),
        None => item.clone(),
    };
    // Stable sort keeps equal keys in their current order
    items.sort_by(|a, b| {
        let ordering = compare_values(&key(a), &key(b));
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });

    store.set(target.scope, &target.path, Value::Array(items));
}

/// Total order for sorting: nulls first, then numbers, then strings.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) | Value::Number(_) => 1,
            Value::String(_) => 2,
            Value::Array(_) | Value::Object(_) => 3,
        }
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ if rank(a) == 1 && rank(b) == 1 => to_number(a)
            .partial_cmp(&to_number(b))
            .unwrap_or(Ordering::Equal),
        _ => rank(a)
            .cmp(&rank(b))
            .then_with(|| to_display_string(a).cmp(&to_display_string(b))),
    }
}

fn select(ctx: &Context, store: &Store) {
    let target = match ctx.prop("path") {
        Value::String(p) if !p.is_empty() => ScopedPath::parse(&p, StateScope::Workspace),
        _ => ScopedPath {
            scope: StateScope::Workspace,
            path: "selected".to_string(),
        },
    };
    store.set(target.scope, &target.path, ctx.prop("value"));
}

fn toggle(ctx: &Context, store: &Store) {
    let Some(target) = path_arg(ctx, "path", Builtin::Toggle) else {
        return;
    };
    let current = store.get_untracked(target.scope, &target.path);
    store.set(target.scope, &target.path, Value::Bool(!truthy(&current)));
}

fn reset(ctx: &Context, store: &Store) {
    let Some(target) = path_arg(ctx, "path", Builtin::Reset) else {
        return;
    };
    if !store.reset(target.scope, &target.path) {
        tracing::debug!(scope = %target.scope, path = %target.path, "reset of unknown entry");
    }
}
