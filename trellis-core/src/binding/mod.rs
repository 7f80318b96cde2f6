//! Binding Resolver
//!
//! Maps a declarative [`Binding`] plus a [`Context`](crate::Context) to a
//! value. Every kind is a plain lookup except `derived`, which runs the
//! restricted expression interpreter in [`expr`].

pub mod expr;
mod model;
mod resolver;

pub use model::Binding;
pub use resolver::{resolve_binding, try_resolve_binding};
