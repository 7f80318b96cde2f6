//! Evaluation context shared by the renderer, the binding resolver and the
//! dispatcher.
//!
//! A `Context` is built fresh for every render pass or dispatch and is never
//! persisted. Child contexts are derived by shadowing (`with_prop`), so a
//! loop body sees its item without disturbing the caller's props.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::action::Action;
use crate::state::path;
use crate::view::ViewNode;

/// Resolves action names for a particular component tree.
///
/// Consulted before the dispatcher's own registry, so a component can
/// override or add actions locally.
pub trait ActionLookup: Send + Sync {
    fn lookup(&self, name: &str) -> Option<Arc<Action>>;
}

impl ActionLookup for HashMap<String, Arc<Action>> {
    fn lookup(&self, name: &str) -> Option<Arc<Action>> {
        self.get(name).cloned()
    }
}

/// Per-render (or per-dispatch) bundle of inputs.
#[derive(Clone, Default)]
pub struct Context {
    pub component_id: Option<String>,
    pub props: Map<String, Value>,
    pub slots: HashMap<String, Arc<Vec<ViewNode>>>,
    pub semantic: Map<String, Value>,
    pub actions: Option<Arc<dyn ActionLookup>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_component_id(mut self, id: impl Into<String>) -> Self {
        self.component_id = Some(id.into());
        self
    }

    /// Shadow (or add) one prop.
    pub fn with_prop(&self, key: impl Into<String>, value: Value) -> Self {
        let mut next = self.clone();
        next.props.insert(key.into(), value);
        next
    }

    pub fn with_props(mut self, props: Map<String, Value>) -> Self {
        self.props = props;
        self
    }

    pub fn with_slot(mut self, name: impl Into<String>, content: Vec<ViewNode>) -> Self {
        self.slots.insert(name.into(), Arc::new(content));
        self
    }

    pub fn with_semantic(mut self, semantic: Map<String, Value>) -> Self {
        self.semantic = semantic;
        self
    }

    pub fn with_actions(mut self, actions: Arc<dyn ActionLookup>) -> Self {
        self.actions = Some(actions);
        self
    }

    /// Read a dotted path from the props. Missing paths read as `null`.
    pub fn prop(&self, path: &str) -> Value {
        let segments = path::split(path);
        match segments.split_first() {
            Some((first, rest)) => match self.props.get(first.as_str()) {
                Some(value) => path::lookup(value, rest),
                None => Value::Null,
            },
            None => Value::Object(self.props.clone()),
        }
    }

    /// The props as one JSON object.
    pub fn props_value(&self) -> Value {
        Value::Object(self.props.clone())
    }

    /// Look up an action through the context's own lookup, if any.
    pub fn lookup_action(&self, name: &str) -> Option<Arc<Action>> {
        self.actions.as_ref().and_then(|actions| actions.lookup(name))
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("component_id", &self.component_id)
            .field("props", &self.props)
            .field("slots", &self.slots.keys().collect::<Vec<_>>())
            .field("semantic", &self.semantic)
            .field("actions", &self.actions.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prop_paths() {
        let ctx = Context::new().with_prop("task", json!({"title": "write", "tags": ["a", "b"]}));
        assert_eq!(ctx.prop("task.title"), json!("write"));
        assert_eq!(ctx.prop("task.tags.1"), json!("b"));
        assert_eq!(ctx.prop("task.tags.length"), json!(2));
        assert_eq!(ctx.prop("missing"), Value::Null);
    }

    #[test]
    fn with_prop_shadows_without_touching_parent() {
        let parent = Context::new().with_prop("item", json!(1));
        let child = parent.with_prop("item", json!(2));

        assert_eq!(parent.prop("item"), json!(1));
        assert_eq!(child.prop("item"), json!(2));
    }
}
