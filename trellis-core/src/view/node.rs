//! Declarative view trees.
//!
//! Trees are produced by the UI compiler as JSON and consumed read-only.
//! Optional fields default, so a partially specified node still renders.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::binding::Binding;

/// One node of a view tree, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ViewNode {
    Element(ElementNode),
    Conditional(ConditionalNode),
    Loop(LoopNode),
    Slot(SlotNode),
    Text(TextNode),
}

/// A component instance: `component` names the factory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementNode {
    pub component: String,
    #[serde(default)]
    pub props: IndexMap<String, Binding>,
    #[serde(default)]
    pub children: Vec<ViewNode>,
    /// Semantic metadata overrides for this node and its subtree.
    #[serde(default)]
    pub semantic: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalNode {
    pub condition: Binding,
    pub then: Box<ViewNode>,
    #[serde(default, rename = "else", skip_serializing_if = "Option::is_none")]
    pub otherwise: Option<Box<ViewNode>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopNode {
    pub items: Binding,
    #[serde(default = "default_item_var")]
    pub item_var: String,
    /// Path into each item for its key; `id` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<String>,
    pub template: Box<ViewNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotNode {
    #[serde(default = "default_slot_name")]
    pub name: String,
    #[serde(default)]
    pub fallback: Vec<ViewNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    #[serde(alias = "text")]
    pub value: Binding,
}

fn default_item_var() -> String {
    "item".to_string()
}

fn default_slot_name() -> String {
    "default".to_string()
}

impl ViewNode {
    pub fn element(component: impl Into<String>) -> ElementNode {
        ElementNode {
            component: component.into(),
            props: IndexMap::new(),
            children: Vec::new(),
            semantic: Map::new(),
        }
    }

    pub fn text(value: impl Into<Binding>) -> Self {
        ViewNode::Text(TextNode {
            value: value.into(),
        })
    }

    pub fn conditional(condition: Binding, then: ViewNode, otherwise: Option<ViewNode>) -> Self {
        ViewNode::Conditional(ConditionalNode {
            condition,
            then: Box::new(then),
            otherwise: otherwise.map(Box::new),
        })
    }

    pub fn each(items: Binding, item_var: impl Into<String>, template: ViewNode) -> Self {
        ViewNode::Loop(LoopNode {
            items,
            item_var: item_var.into(),
            key_path: None,
            template: Box::new(template),
        })
    }

    pub fn slot(name: impl Into<String>, fallback: Vec<ViewNode>) -> Self {
        ViewNode::Slot(SlotNode {
            name: name.into(),
            fallback,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl ElementNode {
    pub fn prop(mut self, name: impl Into<String>, binding: impl Into<Binding>) -> Self {
        self.props.insert(name.into(), binding.into());
        self
    }

    pub fn child(mut self, child: ViewNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn semantic(mut self, key: impl Into<String>, value: Value) -> Self {
        self.semantic.insert(key.into(), value);
        self
    }
}

impl From<ElementNode> for ViewNode {
    fn from(node: ElementNode) -> Self {
        ViewNode::Element(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_compiler_output() {
        let tree = ViewNode::from_json(
            r#"{
                "kind": "element",
                "component": "List",
                "props": {"title": "Tasks", "count": {"kind": "workspaceState", "path": "tasks.length"}},
                "children": [{
                    "kind": "loop",
                    "items": {"kind": "workspaceState", "path": "tasks"},
                    "itemVar": "task",
                    "template": {"kind": "text", "value": {"kind": "prop", "path": "task.title"}}
                }]
            }"#,
        )
        .unwrap();

        let ViewNode::Element(list) = tree else {
            panic!("expected element");
        };
        assert_eq!(list.component, "List");
        assert_eq!(list.props["title"], Binding::literal("Tasks"));
        assert!(matches!(&list.children[0], ViewNode::Loop(l) if l.item_var == "task"));
    }

    #[test]
    fn optional_fields_default() {
        let node: ViewNode = serde_json::from_value(json!({
            "kind": "loop",
            "items": [1, 2],
            "template": {"kind": "slot"}
        }))
        .unwrap();

        let ViewNode::Loop(each) = node else {
            panic!("expected loop");
        };
        assert_eq!(each.item_var, "item");
        assert_eq!(each.key_path, None);
        assert_eq!(
            *each.template,
            ViewNode::Slot(SlotNode {
                name: "default".into(),
                fallback: vec![]
            })
        );
    }

    #[test]
    fn conditional_else_key() {
        let node: ViewNode = serde_json::from_value(json!({
            "kind": "conditional",
            "condition": true,
            "then": {"kind": "text", "text": "yes"},
            "else": {"kind": "text", "text": "no"}
        }))
        .unwrap();
        assert!(matches!(node, ViewNode::Conditional(c) if c.otherwise.is_some()));
    }
}
