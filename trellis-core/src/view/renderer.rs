//! The view renderer.
//!
//! # How Rendering Works
//!
//! Rendering is a recursive walk over the [`ViewNode`] tree that appends
//! output nodes to a buffer:
//!
//! - `element` resolves its props, renders its children and hands both to
//!   the component found in the registry (or the generic tag fallback).
//! - `conditional` renders one branch, or nothing.
//! - `loop` renders its template once per item in a shadowed context and
//!   keys each result.
//! - `slot` splices the caller's slot content, or the fallback.
//! - `text` resolves its binding to a string.
//!
//! Structural nodes (`conditional`, `loop`, `slot`) emit zero or more nodes
//! into the parent, so they never introduce wrapper elements.
//!
//! # Semantic Metadata
//!
//! Every element carries the metadata it inherited merged with its own
//! overrides. Children inherit that merged map minus the `view` key, which
//! only describes the root of a view.
//!
//! Bindings read state through signals, so rendering inside an effect or a
//! memo (see [`Renderer::mount`]) tracks everything the output depends on.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::node::{ConditionalNode, ElementNode, LoopNode, SlotNode, TextNode, ViewNode};
use super::output::Node;
use super::registry::ComponentRegistry;
use crate::binding::expr::{to_display_string, truthy};
use crate::binding::resolve_binding;
use crate::context::Context;
use crate::reactive::Memo;
use crate::state::{path, Store};

/// Metadata key that applies to the root element only.
pub const ROOT_ONLY_KEY: &str = "view";

const DEFAULT_KEY_PATH: &str = "id";

#[derive(Clone)]
pub struct Renderer {
    store: Store,
    registry: Arc<ComponentRegistry>,
}

impl Renderer {
    pub fn new(store: Store, registry: Arc<ComponentRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    /// Render a tree into a single node.
    ///
    /// A tree that renders to several roots is wrapped in a fragment; one that
    /// renders to nothing yields [`Node::empty`].
    pub fn render(&self, node: &ViewNode, ctx: &Context) -> Node {
        let mut nodes = self.render_nodes(node, ctx);
        if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            Node::fragment(nodes)
        }
    }

    /// Render a tree into its list of root nodes.
    pub fn render_nodes(&self, node: &ViewNode, ctx: &Context) -> Vec<Node> {
        let mut out = Vec::new();
        self.render_into(node, ctx, &ctx.semantic, &mut out);
        out
    }

    /// Keep a rendered tree current.
    ///
    /// The returned memo re-renders whenever state the output read changes,
    /// and notifies its own dependents only when the output differs.
    pub fn mount(&self, node: ViewNode, ctx: Context) -> Memo<Node> {
        let renderer = self.clone();
        Memo::new(self.store.runtime(), move || renderer.render(&node, &ctx))
    }

    fn render_into(
        &self,
        node: &ViewNode,
        ctx: &Context,
        inherited: &Map<String, Value>,
        out: &mut Vec<Node>,
    ) {
        match node {
            ViewNode::Element(element) => out.push(self.render_element(element, ctx, inherited)),
            ViewNode::Conditional(conditional) => {
                self.render_conditional(conditional, ctx, inherited, out)
            }
            ViewNode::Loop(each) => self.render_loop(each, ctx, inherited, out),
            ViewNode::Slot(slot) => self.render_slot(slot, ctx, inherited, out),
            ViewNode::Text(text) => out.push(self.render_text(text, ctx)),
        }
    }

    fn render_element(
        &self,
        element: &ElementNode,
        ctx: &Context,
        inherited: &Map<String, Value>,
    ) -> Node {
        let props: Map<String, Value> = element
            .props
            .iter()
            .map(|(name, binding)| (name.clone(), resolve_binding(binding, ctx, &self.store)))
            .collect();

        let mut semantic = inherited.clone();
        semantic.extend(element.semantic.clone());

        let mut for_children = semantic.clone();
        for_children.remove(ROOT_ONLY_KEY);

        let mut children = Vec::new();
        for child in &element.children {
            self.render_into(child, ctx, &for_children, &mut children);
        }

        let component = self.registry.resolve(&element.component);
        if component.is_generic() {
            tracing::debug!(component = %element.component, "no registered component, rendering generic tag");
        }

        let mut rendered = component.render(props, children);
        if let Node::Element(output) = &mut rendered {
            for (key, value) in semantic {
                output.semantic.entry(key).or_insert(value);
            }
        }
        rendered
    }

    fn render_conditional(
        &self,
        conditional: &ConditionalNode,
        ctx: &Context,
        inherited: &Map<String, Value>,
        out: &mut Vec<Node>,
    ) {
        let condition = resolve_binding(&conditional.condition, ctx, &self.store);
        if truthy(&condition) {
            self.render_into(&conditional.then, ctx, inherited, out);
        } else if let Some(otherwise) = &conditional.otherwise {
            self.render_into(otherwise, ctx, inherited, out);
        }
    }

    fn render_loop(
        &self,
        each: &LoopNode,
        ctx: &Context,
        inherited: &Map<String, Value>,
        out: &mut Vec<Node>,
    ) {
        let items = match resolve_binding(&each.items, ctx, &self.store) {
            Value::Array(items) => items,
            Value::Null => return,
            other => {
                tracing::warn!(
                    item_var = %each.item_var,
                    found = %type_name(&other),
                    "loop source is not an array, rendering nothing"
                );
                return;
            }
        };

        let key_path = path::split(each.key_path.as_deref().unwrap_or(DEFAULT_KEY_PATH));
        let index_var = format!("{}Index", each.item_var);

        for (index, item) in items.into_iter().enumerate() {
            let key = match path::lookup(&item, &key_path) {
                Value::Null => index.to_string(),
                value => to_display_string(&value),
            };
            let item_ctx = ctx
                .with_prop(each.item_var.clone(), item)
                .with_prop(index_var.clone(), Value::from(index));

            let mut rendered = Vec::new();
            self.render_into(&each.template, &item_ctx, inherited, &mut rendered);
            match rendered.len() {
                0 => {}
                1 => out.extend(rendered.into_iter().map(|node| node.with_key(key.clone()))),
                _ => out.push(Node::fragment(rendered).with_key(key)),
            }
        }
    }

    fn render_slot(
        &self,
        slot: &SlotNode,
        ctx: &Context,
        inherited: &Map<String, Value>,
        out: &mut Vec<Node>,
    ) {
        let content = match ctx.slots.get(&slot.name) {
            Some(content) => content.as_slice(),
            None => slot.fallback.as_slice(),
        };
        for node in content {
            self.render_into(node, ctx, inherited, out);
        }
    }

    fn render_text(&self, text: &TextNode, ctx: &Context) -> Node {
        let value = resolve_binding(&text.value, ctx, &self.store);
        Node::text(to_display_string(&value))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ----- Tests -----

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Binding;
    use crate::reactive::{Effect, Runtime};
    use crate::state::StateScope;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn renderer() -> Renderer {
        let store = Store::in_memory(&Runtime::new());
        Renderer::new(store, Arc::new(ComponentRegistry::new()))
    }

    fn semantic(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn element_with_text_child() {
        let renderer = renderer();
        let tree: ViewNode = ViewNode::element("Button")
            .prop("label", "Save")
            .child(ViewNode::text(Binding::prop("caption")))
            .into();
        let ctx = Context::new().with_prop("caption", json!("click me"));

        let node = renderer.render(&tree, &ctx);
        let element = node.as_element().unwrap();
        assert_eq!(element.tag, "Button");
        assert_eq!(element.props["label"], json!("Save"));
        assert_eq!(node.text_content(), "click me");
    }

    #[test]
    fn registered_component_receives_props_and_children() {
        let renderer = renderer();
        renderer.registry().register(
            "Card",
            |props: Map<String, Value>, children: Vec<Node>| {
                let mut wrapped = vec![Node::text(
                    props.get("title").and_then(Value::as_str).unwrap_or_default(),
                )];
                wrapped.extend(children);
                Node::element("section", Map::new(), wrapped)
            },
        );

        let tree: ViewNode = ViewNode::element("Card")
            .prop("title", "Hello ")
            .child(ViewNode::text("world"))
            .into();
        let node = renderer.render(&tree, &Context::new());
        assert_eq!(node.as_element().unwrap().tag, "section");
        assert_eq!(node.text_content(), "Hello world");
    }

    #[test]
    fn conditional_renders_nothing_without_else() {
        let renderer = renderer();
        let tree = ViewNode::conditional(Binding::literal(false), ViewNode::text("shown"), None);
        assert!(renderer.render(&tree, &Context::new()).is_empty());

        let tree = ViewNode::conditional(
            Binding::literal(0),
            ViewNode::text("yes"),
            Some(ViewNode::text("no")),
        );
        assert_eq!(renderer.render(&tree, &Context::new()), Node::text("no"));
    }

    #[test]
    fn loop_shadows_context_and_keys_items() {
        let renderer = renderer();
        renderer.store().set(
            StateScope::Workspace,
            "tasks",
            json!([{"id": 7, "title": "a"}, {"title": "b"}]),
        );
        let tree = ViewNode::each(
            Binding::workspace("tasks"),
            "task",
            ViewNode::element("Row")
                .prop("title", Binding::prop("task.title"))
                .prop("position", Binding::prop("taskIndex"))
                .into(),
        );

        let node = renderer.render(&tree, &Context::new());
        let rows = node.children();
        assert_eq!(rows.len(), 2);
        // First item keyed by id, second falls back to its index
        assert_eq!(rows[0].key(), Some("7"));
        assert_eq!(rows[1].key(), Some("1"));
        assert_eq!(rows[1].as_element().unwrap().props["title"], json!("b"));
        assert_eq!(rows[1].as_element().unwrap().props["position"], json!(1));
    }

    #[test]
    fn loop_with_custom_key_path() {
        let renderer = renderer();
        let tree = ViewNode::Loop(LoopNode {
            items: Binding::literal(json!([{"slug": "x"}, {"slug": "y"}])),
            item_var: "page".into(),
            key_path: Some("slug".into()),
            template: Box::new(ViewNode::text(Binding::prop("page.slug"))),
        });

        let nodes = renderer.render_nodes(&tree, &Context::new());
        let keys: Vec<_> = nodes.iter().map(|n| n.key().map(str::to_owned)).collect();
        assert_eq!(keys, vec![Some("x".to_string()), Some("y".to_string())]);
    }

    #[test]
    fn loop_over_non_array_renders_nothing() {
        let renderer = renderer();
        let tree = ViewNode::each(Binding::literal(5), "item", ViewNode::text("x"));
        assert!(renderer.render_nodes(&tree, &Context::new()).is_empty());
    }

    #[test]
    fn slot_content_then_fallback() {
        let renderer = renderer();
        let tree = ViewNode::slot("footer", vec![ViewNode::text("default footer")]);

        let plain = renderer.render(&tree, &Context::new());
        assert_eq!(plain.text_content(), "default footer");

        let ctx = Context::new().with_slot("footer", vec![ViewNode::text("custom")]);
        assert_eq!(renderer.render(&tree, &ctx).text_content(), "custom");

        let empty = ViewNode::slot("header", vec![]);
        assert!(renderer.render(&empty, &Context::new()).is_empty());
    }

    #[test]
    fn text_coercion() {
        let renderer = renderer();
        let ctx = Context::new().with_prop("n", json!(3)).with_prop("flag", json!(true));
        assert_eq!(
            renderer.render(&ViewNode::text(Binding::prop("n")), &ctx),
            Node::text("3")
        );
        assert_eq!(
            renderer.render(&ViewNode::text(Binding::prop("flag")), &ctx),
            Node::text("true")
        );
        assert_eq!(
            renderer.render(&ViewNode::text(Binding::prop("missing")), &ctx),
            Node::text("")
        );
    }

    #[test]
    fn semantic_metadata_propagates_except_view() {
        let renderer = renderer();
        let tree: ViewNode = ViewNode::element("Page")
            .semantic("entity", json!("task"))
            .child(
                ViewNode::element("Field")
                    .semantic("field", json!("title"))
                    .into(),
            )
            .into();
        let ctx = Context::new().with_semantic(semantic(&[("view", json!("list"))]));

        let node = renderer.render(&tree, &ctx);
        let root = node.as_element().unwrap();
        assert_eq!(
            root.semantic,
            semantic(&[("view", json!("list")), ("entity", json!("task"))])
        );

        let child = root.children[0].as_element().unwrap();
        assert_eq!(
            child.semantic,
            semantic(&[("entity", json!("task")), ("field", json!("title"))])
        );
    }

    #[test]
    fn failing_binding_still_renders() {
        let renderer = renderer();
        let tree: ViewNode = ViewNode::element("Label")
            .prop("text", Binding::derived("state.count +"))
            .into();
        let node = renderer.render(&tree, &Context::new());
        assert_eq!(node.as_element().unwrap().props["text"], Value::Null);
    }

    #[test]
    fn mounted_view_follows_state() {
        let renderer = renderer();
        let store = renderer.store().clone();
        store.set(StateScope::Workspace, "title", json!("first"));

        let view = renderer.mount(
            ViewNode::text(Binding::workspace("title")),
            Context::new(),
        );
        assert_eq!(view.get(), Node::text("first"));

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let v = view.signal();
        let _observer = Effect::new(store.runtime(), move || {
            v.get();
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.set(StateScope::Workspace, "title", json!("second"));
        assert_eq!(view.get(), Node::text("second"));
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        // Unrelated state does not re-render the view's observers
        store.set(StateScope::Workspace, "other", json!(1));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
