//! Binding resolution.

use serde_json::Value;

use super::expr;
use super::model::Binding;
use crate::context::Context;
use crate::error::BindingError;
use crate::state::{StateScope, Store};

/// Resolve a binding to a value.
///
/// Never fails: a derived expression that does not parse or evaluate is
/// logged and resolves to `null`.
pub fn resolve_binding(binding: &Binding, ctx: &Context, store: &Store) -> Value {
    match try_resolve_binding(binding, ctx, store) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(
                component = ctx.component_id.as_deref().unwrap_or("-"),
                error = %err,
                "binding resolution failed"
            );
            Value::Null
        }
    }
}

/// Resolve a binding, reporting derived-expression failures.
pub fn try_resolve_binding(
    binding: &Binding,
    ctx: &Context,
    store: &Store,
) -> Result<Value, BindingError> {
    let value = match binding {
        Binding::Literal { value } => value.clone(),
        Binding::Prop { path } => ctx.prop(path),
        Binding::State { path } => expr::lookup_state(store, path),
        Binding::WorkspaceState { path } => store.get(StateScope::Workspace, path),
        Binding::AppState { path } => store.get(StateScope::App, path),
        Binding::Derived { expr: source } => {
            expr::evaluate(source, ctx, store).map_err(|source_err| BindingError::Derived {
                expr: source.clone(),
                source: source_err,
            })?
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Effect, Runtime};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn literal_is_constant() {
        let store = Store::in_memory(&Runtime::new());
        let ctx = Context::new().with_prop("x", json!(1));
        assert_eq!(resolve_binding(&Binding::literal(5), &ctx, &store), json!(5));
        assert_eq!(resolve_binding(&Binding::literal(5), &Context::new(), &store), json!(5));
    }

    #[test]
    fn failing_derived_resolves_to_null() {
        let store = Store::in_memory(&Runtime::new());
        let ctx = Context::new();
        let binding = Binding::derived("state.count +");

        assert_eq!(resolve_binding(&binding, &ctx, &store), Value::Null);
        assert!(matches!(
            try_resolve_binding(&binding, &ctx, &store),
            Err(BindingError::Derived { .. })
        ));
    }

    #[test]
    fn oversized_chain_resolves_to_null() {
        let store = Store::in_memory(&Runtime::new());
        let binding = Binding::derived(format!("1{}", "+1".repeat(10_000)));
        assert_eq!(resolve_binding(&binding, &Context::new(), &store), Value::Null);
    }

    #[test]
    fn scoped_bindings() {
        let store = Store::in_memory(&Runtime::new());
        store.set(StateScope::Workspace, "filter", json!("open"));
        store.set(StateScope::App, "theme", json!("dark"));
        let ctx = Context::new().with_prop("item", json!({"id": 3}));

        assert_eq!(resolve_binding(&Binding::state("filter"), &ctx, &store), json!("open"));
        assert_eq!(resolve_binding(&Binding::workspace("filter"), &ctx, &store), json!("open"));
        assert_eq!(resolve_binding(&Binding::app("theme"), &ctx, &store), json!("dark"));
        assert_eq!(resolve_binding(&Binding::prop("item.id"), &ctx, &store), json!(3));
    }

    #[test]
    fn derived_tracks_what_it_reads() {
        let runtime = Runtime::new();
        let store = Store::in_memory(&runtime);
        store.set(StateScope::Workspace, "a", json!(1));
        store.set(StateScope::Workspace, "b", json!(1));

        let runs = Arc::new(AtomicUsize::new(0));
        let s = store.clone();
        let r = runs.clone();
        let _effect = Effect::new(&runtime, move || {
            resolve_binding(&Binding::derived("workspace.a * 2"), &Context::new(), &s);
            r.fetch_add(1, Ordering::SeqCst);
        });

        store.set(StateScope::Workspace, "b", json!(2));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        store.set(StateScope::Workspace, "a", json!(2));
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
