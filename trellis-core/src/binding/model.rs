//! Binding descriptors.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A declarative "how to get a value".
///
/// Serialized with a `kind` tag:
///
/// ```json
/// {"kind": "workspaceState", "path": "tasks"}
/// {"kind": "derived", "expr": "state.count + 1"}
/// ```
///
/// Any JSON value that is not a tagged binding deserializes as a literal, so
/// `"Save"` and `{"kind": "literal", "value": "Save"}` are equivalent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Binding {
    Literal { value: Value },
    Prop { path: String },
    State { path: String },
    WorkspaceState { path: String },
    AppState { path: String },
    Derived { expr: String },
}

impl Binding {
    pub fn literal(value: impl Into<Value>) -> Self {
        Binding::Literal {
            value: value.into(),
        }
    }

    pub fn prop(path: impl Into<String>) -> Self {
        Binding::Prop { path: path.into() }
    }

    pub fn state(path: impl Into<String>) -> Self {
        Binding::State { path: path.into() }
    }

    pub fn workspace(path: impl Into<String>) -> Self {
        Binding::WorkspaceState { path: path.into() }
    }

    pub fn app(path: impl Into<String>) -> Self {
        Binding::AppState { path: path.into() }
    }

    pub fn derived(expr: impl Into<String>) -> Self {
        Binding::Derived { expr: expr.into() }
    }
}

impl Default for Binding {
    fn default() -> Self {
        Binding::Literal { value: Value::Null }
    }
}

impl From<Value> for Binding {
    fn from(value: Value) -> Self {
        Binding::Literal { value }
    }
}

impl From<&str> for Binding {
    fn from(text: &str) -> Self {
        Binding::literal(text)
    }
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum Tagged {
    Literal {
        #[serde(default)]
        value: Value,
    },
    Prop {
        path: String,
    },
    State {
        path: String,
    },
    WorkspaceState {
        path: String,
    },
    AppState {
        path: String,
    },
    Derived {
        expr: String,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    Tagged(Tagged),
    Literal(Value),
}

impl<'de> Deserialize<'de> for Binding {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Tagged(Tagged::Literal { value }) => Binding::Literal { value },
            Repr::Tagged(Tagged::Prop { path }) => Binding::Prop { path },
            Repr::Tagged(Tagged::State { path }) => Binding::State { path },
            Repr::Tagged(Tagged::WorkspaceState { path }) => Binding::WorkspaceState { path },
            Repr::Tagged(Tagged::AppState { path }) => Binding::AppState { path },
            Repr::Tagged(Tagged::Derived { expr }) => Binding::Derived { expr },
            Repr::Literal(value) => Binding::Literal { value },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tagged_bindings() {
        let binding: Binding =
            serde_json::from_value(json!({"kind": "workspaceState", "path": "tasks"})).unwrap();
        assert_eq!(binding, Binding::workspace("tasks"));

        let binding: Binding =
            serde_json::from_value(json!({"kind": "derived", "expr": "props.n * 2"})).unwrap();
        assert_eq!(binding, Binding::derived("props.n * 2"));
    }

    #[test]
    fn literal_shorthand() {
        let binding: Binding = serde_json::from_value(json!("Save")).unwrap();
        assert_eq!(binding, Binding::literal("Save"));

        let binding: Binding = serde_json::from_value(json!({"label": "x"})).unwrap();
        assert_eq!(binding, Binding::literal(json!({"label": "x"})));

        // A malformed tagged binding degrades to a literal of itself
        let binding: Binding = serde_json::from_value(json!({"kind": "prop"})).unwrap();
        assert_eq!(binding, Binding::literal(json!({"kind": "prop"})));
    }

    #[test]
    fn serializes_with_kind_tag() {
        let value = serde_json::to_value(Binding::prop("item.title")).unwrap();
        assert_eq!(value, json!({"kind": "prop", "path": "item.title"}));
    }
}
