//! Component registry.
//!
//! The component library registers one factory per name. Lookup is by exact
//! string; a name nobody registered resolves to [`GenericTag`], which renders
//! a plain element named after the identifier.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};

use super::output::Node;

/// A renderable component.
pub trait Component: Send + Sync {
    fn render(&self, props: Map<String, Value>, children: Vec<Node>) -> Node;
}

impl<F> Component for F
where
    F: Fn(Map<String, Value>, Vec<Node>) -> Node + Send + Sync,
{
    fn render(&self, props: Map<String, Value>, children: Vec<Node>) -> Node {
        self(props, children)
    }
}

/// Fallback for unregistered names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericTag {
    pub tag: String,
}

impl Component for GenericTag {
    fn render(&self, props: Map<String, Value>, children: Vec<Node>) -> Node {
        Node::element(self.tag.clone(), props, children)
    }
}

/// Result of a lookup.
pub enum Resolved {
    Registered(Arc<dyn Component>),
    Generic(GenericTag),
}

impl Resolved {
    pub fn is_generic(&self) -> bool {
        matches!(self, Resolved::Generic(_))
    }

    pub fn render(&self, props: Map<String, Value>, children: Vec<Node>) -> Node {
        match self {
            Resolved::Registered(component) => component.render(props, children),
            Resolved::Generic(tag) => tag.render(props, children),
        }
    }
}

/// Name to factory map.
#[derive(Default)]
pub struct ComponentRegistry {
    components: RwLock<IndexMap<String, Arc<dyn Component>>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a component.
    pub fn register(&self, name: impl Into<String>, component: impl Component + 'static) {
        self.components
            .write()
            .insert(name.into(), Arc::new(component));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.components.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.read().contains_key(name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.components.read().keys().cloned().collect()
    }

    pub fn resolve(&self, name: &str) -> Resolved {
        match self.get(name) {
            Some(component) => Resolved::Registered(component),
            None => Resolved::Generic(GenericTag {
                tag: name.to_string(),
            }),
        }
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registered_component_renders() {
        let registry = ComponentRegistry::new();
        registry.register("Badge", |props: Map<String, Value>, _children: Vec<Node>| {
            let label = props.get("label").and_then(Value::as_str).unwrap_or_default();
            Node::element("span", Map::new(), vec![Node::text(label)])
        });

        let resolved = registry.resolve("Badge");
        assert!(!resolved.is_generic());

        let mut props = Map::new();
        props.insert("label".into(), json!("new"));
        assert_eq!(resolved.render(props, vec![]).text_content(), "new");
    }

    #[test]
    fn unknown_names_fall_back_to_generic_tag() {
        let registry = ComponentRegistry::new();
        let resolved = registry.resolve("FancyChart");
        assert!(resolved.is_generic());

        let node = resolved.render(Map::new(), vec![Node::text("x")]);
        let element = node.as_element().unwrap();
        assert_eq!(element.tag, "FancyChart");
        assert_eq!(element.children, vec![Node::text("x")]);
    }
}
