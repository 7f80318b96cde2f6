//! Action descriptors.
//!
//! Produced by the UI compiler as JSON:
//!
//! ```json
//! {
//!   "name": "addTask",
//!   "transitions": [{
//!     "scope": "workspace",
//!     "targetPath": "tasks",
//!     "update": {"op": "append", "value": {"kind": "prop", "path": "task"}}
//!   }],
//!   "effect": {"type": "toast", "message": "Added"}
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::api::Method;
use crate::binding::Binding;
use crate::state::{NotificationKind, StateScope};

/// A named bundle of state transitions plus at most one effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub name: String,
    #[serde(default)]
    pub transitions: Vec<StateTransition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<SideEffect>,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transitions: Vec::new(),
            effect: None,
        }
    }

    pub fn transition(mut self, scope: StateScope, target_path: impl Into<String>, update: Patch) -> Self {
        self.transitions.push(StateTransition {
            scope,
            target_path: target_path.into(),
            update,
        });
        self
    }

    pub fn effect(mut self, effect: SideEffect) -> Self {
        self.effect = Some(effect);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateTransition {
    #[serde(default = "default_scope")]
    pub scope: StateScope,
    pub target_path: String,
    pub update: Patch,
}

fn default_scope() -> StateScope {
    StateScope::Workspace
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Set,
    Merge,
    Append,
    Remove,
    Delete,
}

/// One state mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    pub op: PatchOp,
    #[serde(default)]
    pub value: Binding,
    /// For `remove`: an expression evaluated per element with `props.item`
    /// and `props.index`; truthy elements are removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
}

impl Patch {
    fn new(op: PatchOp, value: Binding) -> Self {
        Self {
            op,
            value,
            predicate: None,
        }
    }

    pub fn set(value: impl Into<Binding>) -> Self {
        Self::new(PatchOp::Set, value.into())
    }

    pub fn merge(value: impl Into<Binding>) -> Self {
        Self::new(PatchOp::Merge, value.into())
    }

    pub fn append(value: impl Into<Binding>) -> Self {
        Self::new(PatchOp::Append, value.into())
    }

    pub fn remove(value: impl Into<Binding>) -> Self {
        Self::new(PatchOp::Remove, value.into())
    }

    pub fn remove_where(predicate: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Remove,
            value: Binding::default(),
            predicate: Some(predicate.into()),
        }
    }

    pub fn delete() -> Self {
        Self::new(PatchOp::Delete, Binding::default())
    }
}

/// The declared side effect of an action, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SideEffect {
    Fetch(FetchEffect),
    Navigate(NavigateEffect),
    Log(LogEffect),
    Toast(ToastEffect),
    Custom(CustomEffect),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchEffect {
    /// Backend service, e.g. `task_service`.
    pub service: String,
    /// Explicit entity name; derived from `service` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<Method>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(default)]
    pub inputs: IndexMap<String, Binding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_success: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<String>,
}

impl FetchEffect {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            entity: None,
            method: None,
            operation: None,
            inputs: IndexMap::new(),
            on_success: None,
            on_error: None,
        }
    }

    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn input(mut self, name: impl Into<String>, binding: impl Into<Binding>) -> Self {
        self.inputs.insert(name.into(), binding.into());
        self
    }

    pub fn on_success(mut self, action: impl Into<String>) -> Self {
        self.on_success = Some(action.into());
        self
    }

    pub fn on_error(mut self, action: impl Into<String>) -> Self {
        self.on_error = Some(action.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateEffect {
    /// Route template with `{name}` or `:name` placeholders.
    #[serde(alias = "route")]
    pub to: String,
    #[serde(default)]
    pub params: IndexMap<String, Binding>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEffect {
    #[serde(default)]
    pub level: LogLevel,
    pub message: Binding,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Binding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToastEffect {
    #[serde(default, alias = "variant")]
    pub kind: NotificationKind,
    pub message: Binding,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomEffect {
    pub name: String,
    #[serde(default)]
    pub args: IndexMap<String, Binding>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_compiler_output() {
        let action: Action = serde_json::from_value(json!({
            "name": "loadTasks",
            "transitions": [{
                "targetPath": "filter",
                "update": {"op": "set", "value": "all"}
            }],
            "effect": {
                "type": "fetch",
                "service": "task_service",
                "operation": "list",
                "onSuccess": "tasksLoaded"
            }
        }))
        .unwrap();

        assert_eq!(action.transitions[0].scope, StateScope::Workspace);
        assert_eq!(action.transitions[0].update, Patch::set("all"));
        let Some(SideEffect::Fetch(fetch)) = action.effect else {
            panic!("expected fetch effect");
        };
        assert_eq!(fetch.service, "task_service");
        assert_eq!(fetch.on_success.as_deref(), Some("tasksLoaded"));
    }

    #[test]
    fn effect_kinds() {
        let toast: SideEffect =
            serde_json::from_value(json!({"type": "toast", "variant": "success", "message": "ok"}))
                .unwrap();
        assert!(matches!(toast, SideEffect::Toast(t) if t.kind == NotificationKind::Success));

        let nav: SideEffect =
            serde_json::from_value(json!({"type": "navigate", "route": "/tasks/:id"})).unwrap();
        assert!(matches!(nav, SideEffect::Navigate(n) if n.to == "/tasks/:id"));

        let log: SideEffect =
            serde_json::from_value(json!({"type": "log", "message": "hi"})).unwrap();
        assert!(matches!(log, SideEffect::Log(l) if l.level == LogLevel::Info));
    }

    #[test]
    fn transitions_without_effect() {
        let action: Action = serde_json::from_value(json!({"name": "noop"})).unwrap();
        assert!(action.transitions.is_empty());
        assert!(action.effect.is_none());
    }
}
