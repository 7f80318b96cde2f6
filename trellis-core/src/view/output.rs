//! Rendered output.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A live node produced by rendering a [`ViewNode`](super::ViewNode).
///
/// Output trees compare structurally, so a mounted view only notifies its
/// dependents when a re-render actually changes something.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Node {
    Element(Element),
    Text { text: String },
    Fragment {
        children: Vec<Node>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    #[serde(default)]
    pub props: Map<String, Value>,
    #[serde(default)]
    pub children: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub semantic: Map<String, Value>,
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text { text: text.into() }
    }

    pub fn element(tag: impl Into<String>, props: Map<String, Value>, children: Vec<Node>) -> Self {
        Node::Element(Element {
            tag: tag.into(),
            props,
            children,
            ..Element::default()
        })
    }

    pub fn fragment(children: Vec<Node>) -> Self {
        Node::Fragment {
            children,
            key: None,
        }
    }

    /// An empty fragment, the output of "render nothing".
    pub fn empty() -> Self {
        Self::fragment(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Node::Fragment { children, .. } if children.is_empty())
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Node::Element(element) => element.key.as_deref(),
            Node::Fragment { key, .. } => key.as_deref(),
            Node::Text { .. } => None,
        }
    }

    /// Attach a key. Text cannot carry one, so it is wrapped in a keyed
    /// fragment.
    pub fn with_key(self, key: String) -> Self {
        match self {
            Node::Element(mut element) => {
                element.key = Some(key);
                Node::Element(element)
            }
            Node::Fragment { children, .. } => Node::Fragment {
                children,
                key: Some(key),
            },
            text @ Node::Text { .. } => Node::Fragment {
                children: vec![text],
                key: Some(key),
            },
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(element) => &element.children,
            Node::Fragment { children, .. } => children,
            Node::Text { .. } => &[],
        }
    }

    /// Concatenated text of the subtree.
    pub fn text_content(&self) -> String {
        match self {
            Node::Text { text } => text.clone(),
            other => other.children().iter().map(Node::text_content).collect(),
        }
    }
}
