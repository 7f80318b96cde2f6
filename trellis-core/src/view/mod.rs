//! View Renderer
//!
//! Turns immutable [`ViewNode`] trees into [`Node`] output, calling into the
//! component library through [`ComponentRegistry`].

mod node;
mod output;
mod registry;
mod renderer;

pub use node::{ConditionalNode, ElementNode, LoopNode, SlotNode, TextNode, ViewNode};
pub use output::{Element, Node};
pub use registry::{Component, ComponentRegistry, GenericTag, Resolved};
pub use renderer::{Renderer, ROOT_ONLY_KEY};
